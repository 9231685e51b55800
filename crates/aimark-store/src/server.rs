//! PostgreSQL storage for commit reports.

use std::time::Duration;

use aimark_core::{AimarkError, CommitReport, DatabaseConfig};
use postgres::{Client, NoTls, Row};
use tracing::debug;

use crate::store::{ReportStore, StoredReport};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgreSQL-backed [`ReportStore`].
///
/// Uses every connection field of [`DatabaseConfig`]: `host`, `port`,
/// `database` (the database name), `user` and `password`.
///
/// # Examples
///
/// ```no_run
/// use aimark_core::{DatabaseBackend, DatabaseConfig};
/// use aimark_store::server::PostgresStore;
/// use aimark_store::store::ReportStore;
///
/// let config = DatabaseConfig {
///     backend: DatabaseBackend::Postgres,
///     database: "ai_code_reports".into(),
///     ..DatabaseConfig::default()
/// };
/// let mut store = PostgresStore::connect(&config).unwrap();
/// for row in store.recent(5).unwrap() {
///     println!("{} {}", row.id, row.commit_hash);
/// }
/// ```
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connect to the server described by `config` and create the schema if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Database`] if the server cannot be reached, the
    /// login is rejected, or the schema cannot be created.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, AimarkError> {
        debug!(db = %config.redacted(), "connecting to report database");

        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .connect_timeout(CONNECT_TIMEOUT);
        if let Some(password) = &config.password {
            pg.password(password);
        }

        let client = pg.connect(NoTls).map_err(|e| {
            AimarkError::Database(format!(
                "failed to connect to {}: {e}",
                config.redacted()
            ))
        })?;

        let mut store = Self { client };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&mut self) -> Result<(), AimarkError> {
        self.client
            .batch_execute(
                "
                CREATE TABLE IF NOT EXISTS ai_reports (
                    id SERIAL PRIMARY KEY,
                    commit_hash TEXT NOT NULL,
                    commit_message TEXT,
                    author_name TEXT NOT NULL,
                    author_email TEXT NOT NULL,
                    total_lines BIGINT NOT NULL,
                    ai_lines BIGINT NOT NULL,
                    ai_percentage DOUBLE PRECISION NOT NULL,
                    report_date TIMESTAMP NOT NULL DEFAULT now()
                );

                CREATE INDEX IF NOT EXISTS ai_reports_date ON ai_reports(report_date);
                ",
            )
            .map_err(|e| AimarkError::Database(format!("failed to create schema: {e}")))
    }
}

impl ReportStore for PostgresStore {
    fn insert(&mut self, report: &CommitReport) -> Result<i64, AimarkError> {
        let row = self
            .client
            .query_one(
                "INSERT INTO ai_reports
                 (commit_hash, commit_message, author_name, author_email,
                  total_lines, ai_lines, ai_percentage)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING id::BIGINT",
                &[
                    &report.commit.hash,
                    &report.commit.message,
                    &report.commit.author_name,
                    &report.commit.author_email,
                    &(report.counters.total_lines as i64),
                    &(report.counters.ai_lines as i64),
                    &report.ai_percentage,
                ],
            )
            .map_err(|e| AimarkError::Database(format!("failed to insert report: {e}")))?;

        let id: i64 = row
            .try_get(0)
            .map_err(|e| AimarkError::Database(format!("failed to read inserted id: {e}")))?;
        debug!(id, hash = %report.commit.hash, "stored report");
        Ok(id)
    }

    fn recent(&mut self, limit: usize) -> Result<Vec<StoredReport>, AimarkError> {
        // Casts tolerate a pre-existing table with narrower column types.
        let rows = self
            .client
            .query(
                "SELECT id::BIGINT, commit_hash, commit_message, author_name, author_email,
                        total_lines::BIGINT, ai_lines::BIGINT,
                        ai_percentage::DOUBLE PRECISION,
                        to_char(report_date, 'YYYY-MM-DD HH24:MI:SS')
                 FROM ai_reports
                 ORDER BY report_date DESC, id DESC
                 LIMIT $1",
                &[&(limit as i64)],
            )
            .map_err(|e| AimarkError::Database(format!("failed to query reports: {e}")))?;

        rows.iter()
            .map(stored_report)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AimarkError::Database(format!("failed to read report row: {e}")))
    }
}

fn stored_report(row: &Row) -> Result<StoredReport, postgres::Error> {
    Ok(StoredReport {
        id: row.try_get(0)?,
        commit_hash: row.try_get(1)?,
        commit_message: row.try_get(2)?,
        author_name: row.try_get(3)?,
        author_email: row.try_get(4)?,
        total_lines: row.try_get::<_, i64>(5)? as u64,
        ai_lines: row.try_get::<_, i64>(6)? as u64,
        ai_percentage: row.try_get(7)?,
        report_date: row.try_get(8)?,
    })
}
