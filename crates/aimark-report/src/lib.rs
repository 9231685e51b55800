//! Commit analysis and AI-share reports.
//!
//! [`analyze::analyze_commit`] chooses between the diff and the full tree of a
//! commit, walks the chosen source, and hands the counters to
//! [`report::build`]. The [`report`] module renders the result and appends it
//! to the running report file.

pub mod analyze;
pub mod report;
