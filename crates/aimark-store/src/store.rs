//! Report store trait, backend selection and SQLite storage.

use std::path::Path;

use aimark_core::{AimarkError, CommitReport, DatabaseBackend, DatabaseConfig};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::server::PostgresStore;

/// A report row as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    /// Row id assigned on insert.
    pub id: i64,
    /// Full commit hash.
    pub commit_hash: String,
    /// Commit message.
    pub commit_message: Option<String>,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Countable lines.
    pub total_lines: u64,
    /// Lines inside AI-generated regions.
    pub ai_lines: u64,
    /// AI share in percent.
    pub ai_percentage: f64,
    /// Insert time, `YYYY-MM-DD HH:MM:SS` UTC.
    pub report_date: String,
}

/// Destination for analyzed commit reports.
pub trait ReportStore {
    /// Persist `report`, returning the new row id.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Database`] if the row cannot be written.
    fn insert(&mut self, report: &CommitReport) -> Result<i64, AimarkError>;

    /// Up to `limit` most recent rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Database`] on query failure.
    fn recent(&mut self, limit: usize) -> Result<Vec<StoredReport>, AimarkError>;
}

/// Open the store selected by `config.backend`.
///
/// With the SQLite backend, server fields set away from their defaults
/// (including through `AIMARK_DB_HOST` or `AIMARK_DB_PASSWORD`) are reported
/// with a warning, since they have no effect there.
///
/// # Errors
///
/// Returns [`AimarkError::Database`] if the selected store cannot be opened.
///
/// # Examples
///
/// ```
/// use aimark_core::DatabaseConfig;
/// use aimark_store::store::open_store;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = DatabaseConfig {
///     database: dir.path().join("reports.db").to_string_lossy().into_owned(),
///     ..DatabaseConfig::default()
/// };
/// let mut store = open_store(&config).unwrap();
/// assert!(store.recent(10).unwrap().is_empty());
/// ```
pub fn open_store(config: &DatabaseConfig) -> Result<Box<dyn ReportStore>, AimarkError> {
    match config.backend {
        DatabaseBackend::Sqlite => {
            let unused = config.unused_server_fields();
            if !unused.is_empty() {
                warn!(
                    fields = %unused.join(", "),
                    path = %config.database,
                    "server settings have no effect with the sqlite backend; set backend = \"postgres\" to use them"
                );
            }
            Ok(Box::new(SqliteStore::open(config)?))
        }
        DatabaseBackend::Postgres => Ok(Box::new(PostgresStore::connect(config)?)),
    }
}

/// SQLite-backed [`ReportStore`].
///
/// # Examples
///
/// ```
/// use aimark_store::store::{ReportStore, SqliteStore};
///
/// let mut store = SqliteStore::in_memory().unwrap();
/// assert!(store.recent(10).unwrap().is_empty());
/// ```
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database named by `config.database`.
    ///
    /// Creates the parent directory and the schema if missing.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Database`] if the database cannot be opened.
    pub fn open(config: &DatabaseConfig) -> Result<Self, AimarkError> {
        debug!(db = %config.redacted(), "opening report database");
        Self::open_path(Path::new(&config.database))
    }

    /// Open or create a database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Database`] if the database cannot be opened.
    pub fn open_path(path: &Path) -> Result<Self, AimarkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AimarkError::Database(format!("failed to create database directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| AimarkError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, AimarkError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            AimarkError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), AimarkError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS ai_reports (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    commit_hash TEXT NOT NULL,
                    commit_message TEXT,
                    author_name TEXT NOT NULL,
                    author_email TEXT NOT NULL,
                    total_lines INTEGER NOT NULL,
                    ai_lines INTEGER NOT NULL,
                    ai_percentage REAL NOT NULL,
                    report_date TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS ai_reports_date ON ai_reports(report_date);
                ",
            )
            .map_err(|e| AimarkError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }
}

impl ReportStore for SqliteStore {
    fn insert(&mut self, report: &CommitReport) -> Result<i64, AimarkError> {
        self.conn
            .execute(
                "INSERT INTO ai_reports
                 (commit_hash, commit_message, author_name, author_email,
                  total_lines, ai_lines, ai_percentage)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    report.commit.hash,
                    report.commit.message,
                    report.commit.author_name,
                    report.commit.author_email,
                    report.counters.total_lines as i64,
                    report.counters.ai_lines as i64,
                    report.ai_percentage,
                ],
            )
            .map_err(|e| AimarkError::Database(format!("failed to insert report: {e}")))?;

        let id = self.conn.last_insert_rowid();
        debug!(id, hash = %report.commit.hash, "stored report");
        Ok(id)
    }

    fn recent(&mut self, limit: usize) -> Result<Vec<StoredReport>, AimarkError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, commit_hash, commit_message, author_name, author_email,
                        total_lines, ai_lines, ai_percentage, report_date
                 FROM ai_reports
                 ORDER BY report_date DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(|e| AimarkError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StoredReport {
                    id: row.get(0)?,
                    commit_hash: row.get(1)?,
                    commit_message: row.get(2)?,
                    author_name: row.get(3)?,
                    author_email: row.get(4)?,
                    total_lines: row.get::<_, i64>(5)? as u64,
                    ai_lines: row.get::<_, i64>(6)? as u64,
                    ai_percentage: row.get(7)?,
                    report_date: row.get(8)?,
                })
            })
            .map_err(|e| AimarkError::Database(format!("failed to query reports: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AimarkError::Database(format!("failed to read report row: {e}")))
    }
}

/// Fixed-width listing of stored reports.
///
/// # Examples
///
/// ```
/// use aimark_store::store::format_recent_table;
///
/// let table = format_recent_table(&[]);
/// assert!(table.starts_with("ID"));
/// ```
pub fn format_recent_table(rows: &[StoredReport]) -> String {
    let mut out = format!(
        "{:<5} {:<15} {:<30} {:<20} {:<8} {:<8} {:<6} {:<20}\n",
        "ID", "Commit Hash", "Commit Message", "Author", "Total", "AI", "AI%", "Date"
    );
    out.push_str(&"-".repeat(120));
    out.push('\n');

    for row in rows {
        let message = row.commit_message.as_deref().unwrap_or("");
        out.push_str(&format!(
            "{:<5} {:<15} {:<30} {:<20} {:<8} {:<8} {:<6.1} {}\n",
            row.id,
            truncate(&row.commit_hash, 12),
            truncate(message, 28),
            truncate(&row.author_name, 18),
            row.total_lines,
            row.ai_lines,
            row.ai_percentage,
            row.report_date,
        ));
    }
    out
}

/// First `max_chars` characters of `s`.
///
/// # Examples
///
/// ```
/// use aimark_store::store::truncate;
///
/// assert_eq!(truncate("ёжик в тумане", 4), "ёжик");
/// assert_eq!(truncate("abc", 12), "abc");
/// ```
pub fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
