use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AimarkError;
use crate::types::LanguageFamily;

/// Environment variable overriding `[database].password`.
pub const PASSWORD_ENV: &str = "AIMARK_DB_PASSWORD";
/// Environment variable overriding `[database].host`.
pub const HOST_ENV: &str = "AIMARK_DB_HOST";

/// Top-level configuration loaded from `.aimark.toml`.
///
/// Resolution order: CLI flags > env vars > config file > defaults.
///
/// # Examples
///
/// ```
/// use aimark_core::AimarkConfig;
///
/// let config = AimarkConfig::default();
/// assert_eq!(config.report.recent_limit, 10);
/// assert!(config.database.enabled);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AimarkConfig {
    /// Report database connection options.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Report file and debug output settings.
    #[serde(default)]
    pub report: ReportConfig,
    /// Marker detection settings.
    #[serde(default)]
    pub markers: MarkersConfig,
}

impl AimarkConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::FileNotFound`] if the file does not exist,
    /// [`AimarkError::Io`] if it cannot be read, or [`AimarkError::Toml`] if
    /// the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, AimarkError> {
        if !path.exists() {
            return Err(AimarkError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use aimark_core::AimarkConfig;
    ///
    /// let toml = r#"
    /// [database]
    /// port = 6543
    /// "#;
    /// let config = AimarkConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.database.port, 6543);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, AimarkError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `AIMARK_DB_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.database.password = Some(password);
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.database.host = host;
        }
        self
    }
}

/// Which store reports are written to.
///
/// # Examples
///
/// ```
/// use aimark_core::{AimarkConfig, DatabaseBackend};
///
/// let config = AimarkConfig::from_toml("[database]\nbackend = \"postgres\"").unwrap();
/// assert_eq!(config.database.backend, DatabaseBackend::Postgres);
/// assert_eq!(DatabaseBackend::default(), DatabaseBackend::Sqlite);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// Local SQLite file named by `database`.
    #[default]
    Sqlite,
    /// PostgreSQL server reached through `host`, `port`, `database`, `user`
    /// and `password`.
    #[serde(alias = "postgresql")]
    Postgres,
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseBackend::Sqlite => write!(f, "sqlite"),
            DatabaseBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Report database options.
///
/// With the default SQLite backend `database` is a file path and the server
/// fields are unused (see [`DatabaseConfig::unused_server_fields`]). With the
/// Postgres backend all five connection fields are used.
///
/// # Examples
///
/// ```
/// use aimark_core::DatabaseConfig;
///
/// let config = DatabaseConfig::default();
/// assert_eq!(config.host, "localhost");
/// assert_eq!(config.port, 5432);
/// assert_eq!(config.database, "ai_code_reports.db");
/// assert!(config.password.is_none());
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Persist reports at all (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Storage backend (default: sqlite).
    #[serde(default)]
    pub backend: DatabaseBackend,
    /// Database host (default: `"localhost"`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Database port (default: 5432).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name; the SQLite file path (default: `"ai_code_reports.db"`).
    #[serde(default = "default_database")]
    pub database: String,
    /// Database user (default: `"postgres"`).
    #[serde(default = "default_user")]
    pub user: String,
    /// Database password.
    pub password: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "ai_code_reports.db".into()
}

fn default_user() -> String {
    "postgres".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: DatabaseBackend::default(),
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: default_user(),
            password: None,
        }
    }
}

impl DatabaseConfig {
    /// Connection description safe to print, password masked.
    ///
    /// # Examples
    ///
    /// ```
    /// use aimark_core::DatabaseConfig;
    ///
    /// let config = DatabaseConfig {
    ///     password: Some("hunter2".into()),
    ///     ..DatabaseConfig::default()
    /// };
    /// let shown = config.redacted();
    /// assert_eq!(shown, "postgres:***@localhost:5432/ai_code_reports.db");
    /// ```
    pub fn redacted(&self) -> String {
        let secret = if self.password.is_some() { ":***" } else { "" };
        format!(
            "{}{secret}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    /// Server connection fields that were changed from their defaults but
    /// have no effect because the SQLite backend is active.
    ///
    /// # Examples
    ///
    /// ```
    /// use aimark_core::DatabaseConfig;
    ///
    /// let config = DatabaseConfig {
    ///     host: "db.internal".into(),
    ///     ..DatabaseConfig::default()
    /// };
    /// assert_eq!(config.unused_server_fields(), vec!["host"]);
    /// ```
    pub fn unused_server_fields(&self) -> Vec<&'static str> {
        if self.backend != DatabaseBackend::Sqlite {
            return Vec::new();
        }
        let mut fields = Vec::new();
        if self.host != default_host() {
            fields.push("host");
        }
        if self.port != default_port() {
            fields.push("port");
        }
        if self.user != default_user() {
            fields.push("user");
        }
        if self.password.is_some() {
            fields.push("password");
        }
        fields
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("enabled", &self.enabled)
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Report output settings.
///
/// # Examples
///
/// ```
/// use aimark_core::ReportConfig;
/// use std::path::PathBuf;
///
/// let config = ReportConfig::default();
/// assert_eq!(config.file, PathBuf::from("ai_report.txt"));
/// assert!(config.diff_dump.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// File the text report and metrics footer are appended to.
    #[serde(default = "default_report_file")]
    pub file: PathBuf,
    /// Write the raw diff of each analyzed commit here.
    pub diff_dump: Option<PathBuf>,
    /// Rows shown after a successful database insert (default: 10).
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_report_file() -> PathBuf {
    PathBuf::from("ai_report.txt")
}

fn default_recent_limit() -> usize {
    10
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file: default_report_file(),
            diff_dump: None,
            recent_limit: default_recent_limit(),
        }
    }
}

/// Marker detection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkersConfig {
    /// Extra extension mappings, e.g. `tf = "script"`. Keys are matched
    /// case-insensitively and take precedence over the built-in table.
    #[serde(default)]
    pub extensions: HashMap<String, LanguageFamily>,
}
