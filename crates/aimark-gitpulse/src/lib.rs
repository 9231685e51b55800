//! Repository access for commit analysis.
//!
//! Opens a git repository with git2 and exposes, for one commit, exactly what
//! the analysis needs: metadata, the unified diff against the first parent,
//! and the full contents of the commit tree.

pub mod repo;
