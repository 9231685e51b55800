//! Persistence of commit reports.
//!
//! Stores one row per analyzed commit, in a local SQLite file or on a
//! PostgreSQL server, and lists the most recent rows back for display.

pub mod server;
pub mod store;
