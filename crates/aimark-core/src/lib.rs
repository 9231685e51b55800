//! Core types, configuration, and error handling for aimark.
//!
//! This crate provides the shared foundation used by all other aimark crates:
//! - [`AimarkError`]: unified error type using `thiserror`
//! - [`AimarkConfig`]: configuration loaded from `.aimark.toml`
//! - Shared types: [`LanguageFamily`], [`Counters`], [`CommitMeta`],
//!   [`CommitReport`], [`TreeFile`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    AimarkConfig, DatabaseBackend, DatabaseConfig, MarkersConfig, ReportConfig, HOST_ENV, PASSWORD_ENV,
};
pub use error::AimarkError;
pub use types::{
    AnalysisMode, CommitMeta, CommitReport, Counters, LanguageFamily, OutputFormat, TreeFile,
};

/// A convenience `Result` type for aimark operations.
pub type Result<T> = std::result::Result<T, AimarkError>;
