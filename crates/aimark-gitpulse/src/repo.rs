//! Commit access via git2.
//!
//! Resolves a commit, extracts its metadata, renders the zero-context patch
//! against its first parent, and reads every blob of its tree.

use std::path::Path;

use aimark_core::{AimarkError, CommitMeta, TreeFile};
use chrono::{DateTime, Utc};
use git2::{Commit, DiffFormat, DiffOptions, ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use tracing::debug;

/// An opened git repository.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use aimark_gitpulse::repo::GitRepository;
///
/// let repo = GitRepository::open(Path::new(".")).unwrap();
/// let commit = repo.commit("HEAD").unwrap();
/// println!("{} by {}", commit.meta().short_hash(), commit.meta().author_name);
/// ```
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Git`] if `path` is not a git repository.
    pub fn open(path: &Path) -> Result<Self, AimarkError> {
        let repo = Repository::open(path).map_err(|e| {
            AimarkError::Git(format!(
                "failed to open repository at {}: {}",
                path.display(),
                e.message()
            ))
        })?;
        Ok(Self { repo })
    }

    /// Resolve `rev` (full or abbreviated hash, branch, `HEAD~2`, ...) to a commit.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Git`] if `rev` does not name a commit.
    pub fn commit(&self, rev: &str) -> Result<CommitSnapshot<'_>, AimarkError> {
        let commit = self
            .repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| AimarkError::Git(format!("failed to resolve commit '{rev}': {}", e.message())))?;

        let meta = commit_meta(&commit);
        debug!(hash = %meta.hash, parents = meta.parent_count, "resolved commit");
        Ok(CommitSnapshot {
            repo: &self.repo,
            commit,
            meta,
        })
    }
}

/// A resolved commit together with the repository it lives in.
pub struct CommitSnapshot<'repo> {
    repo: &'repo Repository,
    commit: Commit<'repo>,
    meta: CommitMeta,
}

impl CommitSnapshot<'_> {
    /// Author, message, date and parent count.
    pub fn meta(&self) -> &CommitMeta {
        &self.meta
    }

    /// Unified diff from the first parent to this commit with zero context
    /// lines, the equivalent of `git diff <hash>^! -U0`.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::DiffRetrieval`] for a root commit or when the
    /// diff cannot be computed or rendered.
    pub fn diff_text(&self) -> Result<String, AimarkError> {
        let diff_err = |what: &str, e: git2::Error| {
            AimarkError::DiffRetrieval(format!("{what}: {}", e.message()))
        };

        let parent = self
            .commit
            .parent(0)
            .map_err(|e| diff_err("failed to get parent", e))?;
        let parent_tree = parent
            .tree()
            .map_err(|e| diff_err("failed to get parent tree", e))?;
        let commit_tree = self
            .commit
            .tree()
            .map_err(|e| diff_err("failed to get commit tree", e))?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(0);
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&parent_tree), Some(&commit_tree), Some(&mut diff_opts))
            .map_err(|e| diff_err("failed to compute diff", e))?;

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(|e| diff_err("failed to render diff", e))?;

        debug!(bytes = text.len(), "rendered commit diff");
        Ok(text)
    }

    /// Every blob of the commit tree in pre-order, decoded as UTF-8.
    ///
    /// A blob that cannot be loaded or decoded is returned with an
    /// [`AimarkError::FileRead`] content instead of failing the whole walk.
    ///
    /// # Errors
    ///
    /// Returns [`AimarkError::Git`] if the tree itself cannot be walked.
    pub fn tree_files(&self) -> Result<Vec<TreeFile>, AimarkError> {
        let tree = self
            .commit
            .tree()
            .map_err(|e| AimarkError::Git(format!("failed to get commit tree: {}", e.message())))?;

        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                let path = format!("{root}{}", String::from_utf8_lossy(entry.name_bytes()));
                let content = self.read_blob(&path, entry.id());
                files.push(TreeFile { path, content });
            }
            TreeWalkResult::Ok
        })
        .map_err(|e| AimarkError::Git(format!("failed to walk tree: {}", e.message())))?;

        debug!(count = files.len(), "collected tree files");
        Ok(files)
    }

    fn read_blob(&self, path: &str, id: git2::Oid) -> Result<String, AimarkError> {
        let file_read = |reason: String| AimarkError::FileRead {
            path: path.to_string(),
            reason,
        };
        let blob = self
            .repo
            .find_blob(id)
            .map_err(|e| file_read(e.message().to_string()))?;
        std::str::from_utf8(blob.content())
            .map(str::to_string)
            .map_err(|e| file_read(e.to_string()))
    }
}

fn commit_meta(commit: &Commit<'_>) -> CommitMeta {
    let author = commit.author();
    CommitMeta {
        hash: commit.id().to_string(),
        author_name: String::from_utf8_lossy(author.name_bytes()).into_owned(),
        author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
        message: String::from_utf8_lossy(commit.message_bytes())
            .trim()
            .to_string(),
        committed_at: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
            .unwrap_or_default(),
        parent_count: commit.parent_count(),
    }
}
