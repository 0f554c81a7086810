//! Report Persistence
//!
//! The storage seam used by the generation pipeline.

use async_trait::async_trait;

use crate::models::report::{NewReport, Report};
use crate::services::entities::extract_entities;
use crate::storage::Database;
use crate::utils::error::AppResult;

/// Persists finished reports.
///
/// `create_report` must be atomic: on error nothing of the report is stored
/// and the thread still points at its previous report.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(&self, report: NewReport) -> AppResult<Report>;
}

/// `ReportStore` backed by the SQLite database.
#[derive(Clone)]
pub struct SqliteReportStore {
    db: Database,
}

impl SqliteReportStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        self.db
            .run_blocking(move |db| {
                let entities = extract_entities(&report.html_content);
                db.insert_report(&report, &entities)
            })
            .await
    }
}
