//! SQLite Database
//!
//! Embedded database for threads, messages, report versions, share links and
//! extracted entities, using rusqlite with r2d2 connection pooling.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;

use assetworks_core::CoreError;

use crate::models::report::{NewReport, Report, ReportShare};
use crate::models::thread::{Thread, ThreadEntity, ThreadMessage, ThreadRole};
use crate::services::entities::ExtractedEntity;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{database_path, ensure_parent_dir};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Title given to threads created without one
pub const DEFAULT_THREAD_TITLE: &str = "New Report";

const REPORT_COLUMNS: &str =
    "id, thread_id, version, html_content, sections, insights, metadata, created_at";

/// Current time as an RFC 3339 timestamp with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create an in-memory database for testing.
    ///
    /// A single pooled connection keeps every caller on the same in-memory
    /// database.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open the database at `~/.assetworks/reports.db`
    pub fn new() -> AppResult<Self> {
        Self::open(&database_path()?)
    }

    /// Open (or create) the database at the given path
    pub fn open(db_path: &Path) -> AppResult<Self> {
        ensure_parent_dir(db_path)?;

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        {
            let conn = db.get_connection()?;
            let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        }
        db.init_schema()?;

        tracing::info!(path = %db_path.display(), "Database opened");
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                current_report_id TEXT,
                report_history TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                version INTEGER NOT NULL,
                html_content TEXT NOT NULL,
                sections TEXT NOT NULL,
                insights TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (thread_id, version)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                report_id TEXT REFERENCES reports(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS report_shares (
                token TEXT PRIMARY KEY,
                report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
                revoked INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS report_entities (
                report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
                thread_id TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                mentions INTEGER NOT NULL,
                PRIMARY KEY (report_id, kind, name)
            )",
            [],
        )?;

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_reports_thread ON reports(thread_id, version);
             CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id, created_at);
             CREATE INDEX IF NOT EXISTS idx_shares_report ON report_shares(report_id);
             CREATE INDEX IF NOT EXISTS idx_entities_thread ON report_entities(thread_id);",
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }

    /// Run `f` on the blocking thread pool.
    ///
    /// rusqlite calls block, and a busy writer can hold them for up to the
    /// busy timeout, so async callers go through here.
    pub async fn run_blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Database) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| AppError::internal(format!("Database task failed: {}", e)))?
    }

    // ========================================================================
    // Threads
    // ========================================================================

    /// Create a new, empty thread
    pub fn create_thread(&self, title: Option<&str>) -> AppResult<Thread> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_THREAD_TITLE);
        let now = now_timestamp();
        let thread = Thread {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            current_report_id: None,
            report_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO threads (id, title, current_report_id, report_history, created_at, updated_at)
             VALUES (?1, ?2, NULL, '[]', ?3, ?4)",
            params![thread.id, thread.title, thread.created_at, thread.updated_at],
        )?;

        Ok(thread)
    }

    /// Get a thread by ID
    pub fn get_thread(&self, id: &str) -> AppResult<Option<Thread>> {
        let conn = self.get_connection()?;
        let thread = conn
            .query_row(
                "SELECT id, title, current_report_id, report_history, created_at, updated_at
                 FROM threads WHERE id = ?1",
                params![id],
                Self::row_to_thread,
            )
            .optional()?;
        Ok(thread)
    }

    /// List all threads, most recently updated first
    pub fn list_threads(&self) -> AppResult<Vec<Thread>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, current_report_id, report_history, created_at, updated_at
             FROM threads ORDER BY updated_at DESC, id ASC",
        )?;
        let threads = stmt
            .query_map([], Self::row_to_thread)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(threads)
    }

    fn row_to_thread(row: &Row<'_>) -> rusqlite::Result<Thread> {
        Ok(Thread {
            id: row.get(0)?,
            title: row.get(1)?,
            current_report_id: row.get(2)?,
            report_history: json_column(row, 3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Append a message to a thread
    pub fn insert_message(
        &self,
        thread_id: &str,
        role: ThreadRole,
        content: &str,
        report_id: Option<&str>,
    ) -> AppResult<ThreadMessage> {
        let message = ThreadMessage {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            role,
            content: content.to_string(),
            report_id: report_id.map(str::to_string),
            created_at: now_timestamp(),
        };

        let conn = self.get_connection()?;
        let updated = conn.execute(
            "UPDATE threads SET updated_at = ?2 WHERE id = ?1",
            params![thread_id, message.created_at],
        )?;
        if updated == 0 {
            return Err(AppError::not_found(format!("Thread {}", thread_id)));
        }
        conn.execute(
            "INSERT INTO messages (id, thread_id, role, content, report_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.thread_id,
                message.role.as_str(),
                message.content,
                message.report_id,
                message.created_at
            ],
        )?;

        Ok(message)
    }

    /// List a thread's messages in chronological order.
    ///
    /// With `limit`, only the most recent `limit` messages are returned.
    pub fn list_messages(&self, thread_id: &str, limit: Option<usize>) -> AppResult<Vec<ThreadMessage>> {
        let conn = self.get_connection()?;
        // rowid breaks ties between messages written in the same millisecond
        let mut stmt = conn.prepare(
            "SELECT id, thread_id, role, content, report_id, created_at FROM (
                 SELECT rowid AS seq, * FROM messages WHERE thread_id = ?1
                 ORDER BY created_at DESC, seq DESC LIMIT ?2
             ) ORDER BY created_at ASC, seq ASC",
        )?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let messages = stmt
            .query_map(params![thread_id, limit], |row| {
                let role: String = row.get(2)?;
                Ok(ThreadMessage {
                    id: row.get(0)?,
                    thread_id: row.get(1)?,
                    role: role.parse().map_err(|e: CoreError| {
                        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
                    })?,
                    content: row.get(3)?,
                    report_id: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    // ========================================================================
    // Reports
    // ========================================================================

    /// Persist a finished report in one `IMMEDIATE` transaction.
    ///
    /// Inserts the next report version, moves the thread's current report
    /// pointer, appends to its report history, records the assistant message
    /// and the report's entities. Nothing is written if any step fails.
    pub fn insert_report(
        &self,
        new_report: &NewReport,
        entities: &[ExtractedEntity],
    ) -> AppResult<Report> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let history_json: Option<String> = tx
            .query_row(
                "SELECT report_history FROM threads WHERE id = ?1",
                params![new_report.thread_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(history_json) = history_json else {
            return Err(AppError::not_found(format!("Thread {}", new_report.thread_id)));
        };
        let mut history: Vec<String> = serde_json::from_str(&history_json)?;

        let version: u32 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM reports WHERE thread_id = ?1",
            params![new_report.thread_id],
            |row| row.get(0),
        )?;

        let report = Report {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: new_report.thread_id.clone(),
            version,
            html_content: new_report.html_content.clone(),
            sections: new_report.sections.clone(),
            insights: new_report.insights.clone(),
            metadata: new_report.metadata.clone(),
            created_at: now_timestamp(),
        };

        tx.execute(
            "INSERT INTO reports (id, thread_id, version, html_content, sections, insights, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.id,
                report.thread_id,
                report.version,
                report.html_content,
                serde_json::to_string(&report.sections)?,
                serde_json::to_string(&report.insights)?,
                serde_json::to_string(&report.metadata)?,
                report.created_at
            ],
        )?;

        history.push(report.id.clone());
        tx.execute(
            "UPDATE threads SET current_report_id = ?2, report_history = ?3, updated_at = ?4
             WHERE id = ?1",
            params![
                report.thread_id,
                report.id,
                serde_json::to_string(&history)?,
                report.created_at
            ],
        )?;

        tx.execute(
            "INSERT INTO messages (id, thread_id, role, content, report_id, created_at)
             VALUES (?1, ?2, 'assistant', ?3, ?4, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                report.thread_id,
                report.html_content,
                report.id,
                report.created_at
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO report_entities (report_id, thread_id, name, kind, mentions)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entity in entities {
                stmt.execute(params![
                    report.id,
                    report.thread_id,
                    entity.name,
                    entity.kind.as_str(),
                    entity.mentions
                ])?;
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// Get a report by ID
    pub fn get_report(&self, id: &str) -> AppResult<Option<Report>> {
        let conn = self.get_connection()?;
        let report = conn
            .query_row(
                &format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS),
                params![id],
                Self::row_to_report,
            )
            .optional()?;
        Ok(report)
    }

    /// List a thread's reports, newest version first
    pub fn list_reports(&self, thread_id: &str) -> AppResult<Vec<Report>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reports WHERE thread_id = ?1 ORDER BY version DESC",
            REPORT_COLUMNS
        ))?;
        let reports = stmt
            .query_map(params![thread_id], Self::row_to_report)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    fn row_to_report(row: &Row<'_>) -> rusqlite::Result<Report> {
        Ok(Report {
            id: row.get(0)?,
            thread_id: row.get(1)?,
            version: row.get(2)?,
            html_content: row.get(3)?,
            sections: json_column(row, 4)?,
            insights: json_column(row, 5)?,
            metadata: json_column(row, 6)?,
            created_at: row.get(7)?,
        })
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Entities aggregated over every report of a thread, most mentioned first
    pub fn list_thread_entities(&self, thread_id: &str) -> AppResult<Vec<ThreadEntity>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT e.name, e.kind, SUM(e.mentions) AS total, COUNT(DISTINCT e.report_id),
                    (SELECT e2.report_id FROM report_entities e2
                     JOIN reports r2 ON r2.id = e2.report_id
                     WHERE e2.thread_id = ?1 AND e2.kind = e.kind AND e2.name = e.name
                     ORDER BY r2.version DESC LIMIT 1)
             FROM report_entities e
             WHERE e.thread_id = ?1
             GROUP BY e.kind, e.name
             ORDER BY total DESC, e.name ASC",
        )?;
        let entities = stmt
            .query_map(params![thread_id], |row| {
                Ok(ThreadEntity {
                    name: row.get(0)?,
                    kind: row.get(1)?,
                    mentions: row.get(2)?,
                    report_count: row.get(3)?,
                    last_report_id: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    // ========================================================================
    // Sharing
    // ========================================================================

    /// Create a share token for a report, or return its active one
    pub fn create_share(&self, report_id: &str) -> AppResult<ReportShare> {
        let conn = self.get_connection()?;

        let exists = conn
            .query_row(
                "SELECT 1 FROM reports WHERE id = ?1",
                params![report_id],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_none() {
            return Err(AppError::not_found(format!("Report {}", report_id)));
        }

        let existing = conn
            .query_row(
                "SELECT token, report_id, created_at FROM report_shares
                 WHERE report_id = ?1 AND revoked = 0
                 ORDER BY created_at DESC LIMIT 1",
                params![report_id],
                |row| {
                    Ok(ReportShare {
                        token: row.get(0)?,
                        report_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        if let Some(share) = existing {
            return Ok(share);
        }

        let share = ReportShare {
            token: uuid::Uuid::new_v4().simple().to_string(),
            report_id: report_id.to_string(),
            created_at: now_timestamp(),
        };
        conn.execute(
            "INSERT INTO report_shares (token, report_id, revoked, created_at)
             VALUES (?1, ?2, 0, ?3)",
            params![share.token, share.report_id, share.created_at],
        )?;
        Ok(share)
    }

    /// Revoke every active share token of a report; returns how many
    pub fn revoke_shares(&self, report_id: &str) -> AppResult<usize> {
        let conn = self.get_connection()?;
        let revoked = conn.execute(
            "UPDATE report_shares SET revoked = 1 WHERE report_id = ?1 AND revoked = 0",
            params![report_id],
        )?;
        Ok(revoked)
    }

    /// Resolve an active share token to its report
    pub fn get_shared_report(&self, token: &str) -> AppResult<Option<Report>> {
        let conn = self.get_connection()?;
        let report = conn
            .query_row(
                "SELECT r.id, r.thread_id, r.version, r.html_content, r.sections, r.insights,
                        r.metadata, r.created_at
                 FROM report_shares s JOIN reports r ON r.id = s.report_id
                 WHERE s.token = ?1 AND s.revoked = 0",
                params![token],
                Self::row_to_report,
            )
            .optional()?;
        Ok(report)
    }
}

/// Decode a JSON text column.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
