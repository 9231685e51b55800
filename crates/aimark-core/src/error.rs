use std::path::PathBuf;

/// Errors that can occur while analyzing a commit.
///
/// Each variant wraps a specific error domain. Only [`AimarkError::Git`] and
/// [`AimarkError::Config`] abort a run; the others are recovered from by the
/// caller (tree fallback, skipped file, unsaved row).
///
/// # Examples
///
/// ```
/// use aimark_core::AimarkError;
///
/// let err = AimarkError::Config("port must be positive".into());
/// assert!(err.to_string().contains("port must be positive"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum AimarkError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(aimark::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(aimark::config))]
    Config(String),

    /// Repository or commit could not be opened.
    #[error("git error: {0}")]
    #[diagnostic(
        code(aimark::git),
        help("check the repository path and that the commit exists")
    )]
    Git(String),

    /// Diff between a commit and its parent could not be computed.
    #[error("diff retrieval failed: {0}")]
    #[diagnostic(code(aimark::diff))]
    DiffRetrieval(String),

    /// A single file's content could not be read or decoded.
    #[error("failed to read '{path}': {reason}")]
    #[diagnostic(code(aimark::file_read))]
    FileRead { path: String, reason: String },

    /// Report database failure.
    #[error("database error: {0}")]
    #[diagnostic(code(aimark::database))]
    Database(String),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(aimark::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(aimark::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(aimark::not_found))]
    FileNotFound(PathBuf),
}
