//! Commit analysis: pick a line source, walk it, build the report.
//!
//! A commit with a parent is analyzed through the added lines of its diff.
//! A root commit, a commit whose diff cannot be produced, and a diff without
//! any added file are analyzed through the full contents of the commit tree.

use std::path::PathBuf;

use aimark_core::{AimarkError, AnalysisMode, CommitMeta, CommitReport, Counters, TreeFile};
use aimark_difflens::markers::MarkerRegistry;
use aimark_difflens::source::{DiffLines, TreeFiles};
use aimark_difflens::walker::walk;
use aimark_gitpulse::repo::CommitSnapshot;
use tracing::{debug, info, warn};

use crate::report;

/// Read access to one commit.
pub trait CommitSource {
    /// Commit metadata.
    fn meta(&self) -> &CommitMeta;

    /// Zero-context unified diff against the first parent.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::DiffRetrieval`] when no diff can be produced.
    fn diff_text(&self) -> Result<String, AimarkError>;

    /// Every file of the commit tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be listed.
    fn tree_files(&self) -> Result<Vec<TreeFile>, AimarkError>;
}

impl CommitSource for CommitSnapshot<'_> {
    fn meta(&self) -> &CommitMeta {
        CommitSnapshot::meta(self)
    }

    fn diff_text(&self) -> Result<String, AimarkError> {
        CommitSnapshot::diff_text(self)
    }

    fn tree_files(&self) -> Result<Vec<TreeFile>, AimarkError> {
        CommitSnapshot::tree_files(self)
    }
}

/// Knobs for [`analyze_commit`].
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Write the raw diff text here before walking it.
    pub diff_dump: Option<PathBuf>,
}

/// Result of analyzing one commit.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The finished report.
    pub report: CommitReport,
    /// Raw diff text, when one was retrieved.
    pub diff: Option<String>,
}

/// Analyze one commit.
///
/// Never fails on recoverable problems: a missing diff falls back to tree
/// mode, unreadable files are skipped with a warning, and a failing tree
/// listing leaves the counters at zero.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use aimark_difflens::markers::MarkerRegistry;
/// use aimark_gitpulse::repo::GitRepository;
/// use aimark_report::analyze::{analyze_commit, AnalyzeOptions};
///
/// let repo = GitRepository::open(Path::new(".")).unwrap();
/// let commit = repo.commit("HEAD").unwrap();
/// let analysis = analyze_commit(&commit, &MarkerRegistry::new(), &AnalyzeOptions::default());
/// println!("{:.2}% AI", analysis.report.ai_percentage);
/// ```
pub fn analyze_commit<S>(source: &S, registry: &MarkerRegistry, options: &AnalyzeOptions) -> Analysis
where
    S: CommitSource + ?Sized,
{
    let meta = source.meta();

    if meta.parent_count == 0 {
        info!(hash = %meta.hash, "root commit, analyzing full tree");
        let counters = walk_tree(source, registry);
        return Analysis {
            report: report::build(counters, meta.clone(), AnalysisMode::Tree),
            diff: None,
        };
    }

    let diff = match source.diff_text() {
        Ok(diff) => diff,
        Err(error) => {
            warn!(hash = %meta.hash, %error, "diff unavailable, analyzing full tree");
            let counters = walk_tree(source, registry);
            return Analysis {
                report: report::build(counters, meta.clone(), AnalysisMode::Tree),
                diff: None,
            };
        }
    };

    if let Some(path) = &options.diff_dump {
        match std::fs::write(path, &diff) {
            Ok(()) => debug!(path = %path.display(), "wrote diff dump"),
            Err(error) => warn!(path = %path.display(), %error, "failed to write diff dump"),
        }
    }

    let counters = walk(&DiffLines::new(&diff), registry);
    if counters.files_changed > 0 {
        return Analysis {
            report: report::build(counters, meta.clone(), AnalysisMode::Diff),
            diff: Some(diff),
        };
    }

    info!(hash = %meta.hash, "diff adds no files, analyzing full tree");
    let counters = walk_tree(source, registry);
    Analysis {
        report: report::build(counters, meta.clone(), AnalysisMode::Tree),
        diff: Some(diff),
    }
}

fn walk_tree<S>(source: &S, registry: &MarkerRegistry) -> Counters
where
    S: CommitSource + ?Sized,
{
    match source.tree_files() {
        Ok(files) => walk(&TreeFiles::new(&files), registry),
        Err(error) => {
            warn!(%error, "failed to list commit tree");
            Counters::default()
        }
    }
}
