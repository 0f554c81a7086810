//! Report Models
//!
//! Persisted report versions and the data needed to create one.

use serde::{Deserialize, Serialize};

use assetworks_core::{Insight, ReportSection};

/// Generation details recorded alongside a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub model: String,
    pub provider: String,
    pub prompt: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
}

/// One immutable version of a thread's report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub thread_id: String,
    /// 1-based, increasing per thread
    pub version: u32,
    pub html_content: String,
    pub sections: Vec<ReportSection>,
    pub insights: Vec<Insight>,
    pub metadata: ReportMetadata,
    pub created_at: String,
}

/// Lightweight listing entry for a thread's report history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub version: u32,
    pub section_count: usize,
    pub insight_count: usize,
    pub model: String,
    pub created_at: String,
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            version: report.version,
            section_count: report.sections.len(),
            insight_count: report.insights.len(),
            model: report.metadata.model.clone(),
            created_at: report.created_at.clone(),
        }
    }
}

/// Everything the pipeline hands to the store after a successful stream
#[derive(Debug, Clone)]
pub struct NewReport {
    pub thread_id: String,
    pub html_content: String,
    pub sections: Vec<ReportSection>,
    pub insights: Vec<Insight>,
    pub metadata: ReportMetadata,
}

/// Public share link for a report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportShare {
    pub token: String,
    pub report_id: String,
    pub created_at: String,
}
