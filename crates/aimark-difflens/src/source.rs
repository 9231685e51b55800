//! Line sources feeding the walker: added lines of a unified diff, or every
//! line of every file in a commit tree.

use aimark_core::{AimarkError, AnalysisMode, TreeFile};

use crate::markers::extension_of;

/// One step of a line source.
#[derive(Debug, Clone, Copy)]
pub enum SourceEvent<'a> {
    /// A new file begins; subsequent lines belong to it.
    FileStart {
        /// Path relative to the repository root.
        path: &'a str,
    },
    /// A content line of the current file, without diff prefix.
    Line(&'a str),
    /// The current file's content could not be read.
    Unreadable {
        /// Path of the unreadable file.
        path: &'a str,
        /// Why it could not be read.
        error: &'a AimarkError,
    },
}

/// A finite, restartable sequence of file boundaries and content lines.
///
/// Each call to [`LineSource::events`] starts from the beginning. Events
/// borrow the underlying text for `'a`, not the source itself.
pub trait LineSource<'a> {
    /// Events in input order.
    fn events(&self) -> Box<dyn Iterator<Item = SourceEvent<'a>> + 'a>;

    /// Which analysis mode this source represents.
    fn mode(&self) -> AnalysisMode;
}

/// Added lines of a unified diff, as produced by `git diff -U0`.
///
/// `+++ b/<path>` opens a file. `+` lines of the open file are content. Any
/// other `+++` header (e.g. `+++ /dev/null`) closes the current file, and all
/// other lines are ignored. Inside a hunk the `@@` line counts are honored, so
/// an added line whose text starts with `++ b/` is not mistaken for a header.
///
/// # Examples
///
/// ```
/// use aimark_difflens::source::{DiffLines, LineSource, SourceEvent};
///
/// let diff = "+++ b/app.py\n@@ -0,0 +1,1 @@\n+x = 1\n";
/// let events: Vec<_> = DiffLines::new(diff).events().collect();
/// assert!(matches!(events[0], SourceEvent::FileStart { path: "app.py" }));
/// assert!(matches!(events[1], SourceEvent::Line("x = 1")));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiffLines<'a> {
    text: &'a str,
}

impl<'a> DiffLines<'a> {
    /// Wrap raw unified diff text.
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

impl<'a> LineSource<'a> for DiffLines<'a> {
    fn events(&self) -> Box<dyn Iterator<Item = SourceEvent<'a>> + 'a> {
        let text: &'a str = self.text;
        let mut state = DiffState::default();
        Box::new(
            text.lines()
                .filter_map(move |raw| state.step(raw.trim_end_matches('\r'))),
        )
    }

    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Diff
    }
}

#[derive(Debug, Default)]
struct DiffState {
    active: bool,
    old_remaining: u32,
    new_remaining: u32,
}

impl DiffState {
    fn in_hunk(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    fn step<'a>(&mut self, line: &'a str) -> Option<SourceEvent<'a>> {
        if self.in_hunk() {
            return self.hunk_line(line);
        }

        if let Some(header) = line.strip_prefix("+++ ") {
            return match parse_new_path(header) {
                Some(path) => {
                    self.active = true;
                    Some(SourceEvent::FileStart { path })
                }
                None => {
                    self.active = false;
                    None
                }
            };
        }

        if line.starts_with("@@ ") {
            if let Some((old, new)) = parse_hunk_counts(line) {
                self.old_remaining = old;
                self.new_remaining = new;
            }
            return None;
        }

        if line.starts_with("diff --git ") {
            self.active = false;
            return None;
        }

        match line.strip_prefix('+') {
            Some(content) if self.active => Some(SourceEvent::Line(content)),
            _ => None,
        }
    }

    fn hunk_line<'a>(&mut self, line: &'a str) -> Option<SourceEvent<'a>> {
        match line.as_bytes().first() {
            Some(b'+') => {
                self.new_remaining = self.new_remaining.saturating_sub(1);
                self.active.then(|| SourceEvent::Line(&line[1..]))
            }
            Some(b'-') => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                None
            }
            Some(b'\\') => None,
            _ => {
                // Context line (or an empty line standing in for one).
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
                None
            }
        }
    }
}

fn parse_new_path(header: &str) -> Option<&str> {
    header.trim_matches('"').strip_prefix("b/")
}

/// Old and new line counts from `@@ -a[,b] +c[,d] @@`.
fn parse_hunk_counts(line: &str) -> Option<(u32, u32)> {
    let inner = line.strip_prefix("@@ ")?;
    let inner = &inner[..inner.find(" @@")?];
    let (old, new) = inner.split_once(' ')?;
    let old = range_count(old.strip_prefix('-')?)?;
    let new = range_count(new.strip_prefix('+')?)?;
    Some((old, new))
}

fn range_count(range: &str) -> Option<u32> {
    match range.split_once(',') {
        Some((_, count)) => count.parse().ok(),
        None => range.parse::<u32>().ok().map(|_| 1),
    }
}

/// Full contents of the files in a commit tree.
///
/// Files without an extension are skipped entirely. An unreadable file yields
/// its [`SourceEvent::FileStart`] followed by [`SourceEvent::Unreadable`].
///
/// # Examples
///
/// ```
/// use aimark_core::TreeFile;
/// use aimark_difflens::source::{LineSource, TreeFiles};
///
/// let files = vec![
///     TreeFile { path: "main.c".into(), content: Ok("int x;\n".into()) },
///     TreeFile { path: "LICENSE".into(), content: Ok("MIT\n".into()) },
/// ];
/// assert_eq!(TreeFiles::new(&files).events().count(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TreeFiles<'a> {
    files: &'a [TreeFile],
}

impl<'a> TreeFiles<'a> {
    /// Wrap the files of a commit tree.
    pub fn new(files: &'a [TreeFile]) -> Self {
        Self { files }
    }
}

impl<'a> LineSource<'a> for TreeFiles<'a> {
    fn events(&self) -> Box<dyn Iterator<Item = SourceEvent<'a>> + 'a> {
        let files: &'a [TreeFile] = self.files;
        Box::new(
            files
                .iter()
                .filter(|file| extension_of(&file.path).is_some())
                .flat_map(file_events),
        )
    }

    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Tree
    }
}

fn file_events(file: &TreeFile) -> Box<dyn Iterator<Item = SourceEvent<'_>> + '_> {
    let start = std::iter::once(SourceEvent::FileStart { path: &file.path });
    match &file.content {
        Ok(text) => Box::new(start.chain(text.lines().map(SourceEvent::Line))),
        Err(error) => Box::new(start.chain(std::iter::once(SourceEvent::Unreadable {
            path: &file.path,
            error,
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<'a>(source: &dyn LineSource<'a>) -> Vec<String> {
        source
            .events()
            .map(|event| match event {
                SourceEvent::FileStart { path } => format!("file:{path}"),
                SourceEvent::Line(text) => format!("line:{text}"),
                SourceEvent::Unreadable { path, .. } => format!("unreadable:{path}"),
            })
            .collect()
    }

    #[test]
    fn empty_diff_has_no_events() {
        assert!(collect(&DiffLines::new("")).is_empty());
    }

    #[test]
    fn only_added_lines_are_emitted() {
        let diff = "\
diff --git a/src/main.rs b/src/main.rs
index abc1234..def5678 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,4 @@
 fn main() {
+    println!(\"hello\");
-    old();
     let x = 1;
 }
";
        assert_eq!(
            collect(&DiffLines::new(diff)),
            vec!["file:src/main.rs", "line:    println!(\"hello\");"]
        );
    }

    #[test]
    fn headerless_patch_lines_follow_file_start() {
        let diff = "+++ b/app.py\n+# AI-generated start\n+x = 1\n";
        assert_eq!(
            collect(&DiffLines::new(diff)),
            vec!["file:app.py", "line:# AI-generated start", "line:x = 1"]
        );
    }

    #[test]
    fn added_lines_before_any_header_are_ignored() {
        let diff = "+orphan\n+++ b/a.js\n+kept\n";
        assert_eq!(collect(&DiffLines::new(diff)), vec!["file:a.js", "line:kept"]);
    }

    #[test]
    fn deleted_file_closes_current_file() {
        let diff = "\
--- a/keep.py
+++ b/keep.py
@@ -0,0 +1 @@
+a = 1
--- a/gone.py
+++ /dev/null
@@ -1 +0,0 @@
-b = 2
+stray
";
        assert_eq!(
            collect(&DiffLines::new(diff)),
            vec!["file:keep.py", "line:a = 1"]
        );
    }

    #[test]
    fn hunk_counts_protect_content_that_looks_like_a_header() {
        let diff = "\
+++ b/notes.md
@@ -0,0 +1,2 @@
+++ b/not-a-file
+after
";
        assert_eq!(
            collect(&DiffLines::new(diff)),
            vec!["file:notes.md", "line:++ b/not-a-file", "line:after"]
        );
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let diff = "+++ b/win.cs\r\n+var x = 1;\r\n";
        assert_eq!(
            collect(&DiffLines::new(diff)),
            vec!["file:win.cs", "line:var x = 1;"]
        );
    }

    #[test]
    fn quoted_header_path() {
        let diff = "+++ \"b/src/my file.ts\"\n+let a;\n";
        assert_eq!(
            collect(&DiffLines::new(diff)),
            vec!["file:src/my file.ts", "line:let a;"]
        );
    }

    #[test]
    fn events_outlive_the_source_value() {
        let diff = String::from("+++ b/a.js\n+one\n");
        let events: Vec<SourceEvent<'_>> = DiffLines::new(&diff).events().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], SourceEvent::Line("one")));

        let files = vec![TreeFile {
            path: "b.py".into(),
            content: Ok("x = 1\n".into()),
        }];
        let events: Vec<SourceEvent<'_>> = TreeFiles::new(&files).events().collect();
        assert!(matches!(events[0], SourceEvent::FileStart { path: "b.py" }));
    }

    #[test]
    fn events_are_restartable() {
        let diff = "+++ b/a.js\n+one\n";
        let source = DiffLines::new(diff);
        assert_eq!(collect(&source), collect(&source));
    }

    #[test]
    fn hunk_header_counts() {
        assert_eq!(parse_hunk_counts("@@ -1,3 +1,4 @@ fn main"), Some((3, 4)));
        assert_eq!(parse_hunk_counts("@@ -5 +6,0 @@"), Some((1, 0)));
        assert_eq!(parse_hunk_counts("@@ -0,0 +1 @@"), Some((0, 1)));
        assert_eq!(parse_hunk_counts("@@ garbage @@"), None);
    }

    #[test]
    fn tree_skips_files_without_extension() {
        let files = vec![
            TreeFile {
                path: "Makefile".into(),
                content: Ok("all:\n".into()),
            },
            TreeFile {
                path: "pkg.v2/Makefile".into(),
                content: Ok("build:\n".into()),
            },
            TreeFile {
                path: "src/lib.rs".into(),
                content: Ok("pub fn f() {}\n\nmod x;\n".into()),
            },
        ];
        assert_eq!(
            collect(&TreeFiles::new(&files)),
            vec!["file:src/lib.rs", "line:pub fn f() {}", "line:", "line:mod x;"]
        );
    }

    #[test]
    fn tree_reports_unreadable_files() {
        let files = vec![TreeFile {
            path: "logo.png".into(),
            content: Err(AimarkError::FileRead {
                path: "logo.png".into(),
                reason: "invalid utf-8".into(),
            }),
        }];
        assert_eq!(
            collect(&TreeFiles::new(&files)),
            vec!["file:logo.png", "unreadable:logo.png"]
        );
    }

    #[test]
    fn modes() {
        assert_eq!(DiffLines::new("").mode(), AnalysisMode::Diff);
        assert_eq!(TreeFiles::new(&[]).mode(), AnalysisMode::Tree);
    }
}
