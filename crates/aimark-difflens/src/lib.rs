//! Marker detection and line accounting over diffs and file trees.
//!
//! Detects AI-generated region markers per language family, classifies each
//! added line as AI or plain, and accumulates per-commit counters from either
//! a unified diff or the full contents of a commit tree. Pure: no git or
//! filesystem access happens here.

pub mod classify;
pub mod markers;
pub mod source;
pub mod walker;
