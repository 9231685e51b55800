//! Accumulates counters over a [`LineSource`].

use aimark_core::{Counters, LanguageFamily};
use tracing::{debug, trace, warn};

use crate::classify::{classify, Transition};
use crate::markers::MarkerRegistry;
use crate::source::{LineSource, SourceEvent};

/// Per-file walk state. The region flag never carries over to the next file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCursor<'a> {
    /// File the following lines belong to.
    pub current_file: &'a str,
    /// Marker syntax for the file.
    pub family: LanguageFamily,
    /// Inside an AI-generated region.
    pub in_ai_region: bool,
    /// Tally for this file alone; folded into the commit total on close.
    pub counters: Counters,
}

impl<'a> FileCursor<'a> {
    /// Cursor at the top of `path`, outside any region, with the file itself
    /// already counted.
    pub fn open(path: &'a str, registry: &MarkerRegistry) -> Self {
        let mut counters = Counters::default();
        counters.record_file();
        Self {
            current_file: path,
            family: registry.family_for_path(path),
            in_ai_region: false,
            counters,
        }
    }

    fn step(&mut self, text: &str) {
        let was_in_region = self.in_ai_region;
        let class = classify(text, self.family, was_in_region);

        match class.transition(was_in_region) {
            Transition::Entered => debug!(file = self.current_file, "AI region start"),
            Transition::Exited => debug!(file = self.current_file, "AI region end"),
            Transition::Redundant => debug!(
                file = self.current_file,
                marker = text.trim(),
                "marker does not change region state"
            ),
            Transition::Unchanged => {}
        }
        self.in_ai_region = class.next_in_region;

        if class.countable {
            self.counters.record_line(was_in_region);
            if was_in_region {
                trace!(file = self.current_file, line = text, "AI line");
            } else {
                trace!(file = self.current_file, line = text, "plain line");
            }
        }
    }

    fn close(self) -> Counters {
        if self.in_ai_region {
            debug!(
                file = self.current_file,
                "AI region still open at end of file"
            );
        }
        debug!(
            file = self.current_file,
            lines = self.counters.total_lines,
            ai_lines = self.counters.ai_lines,
            "file done"
        );
        self.counters
    }
}

/// Walk `source` and count its lines.
///
/// Every file boundary counts as a changed file and resets the region flag.
/// Blank lines are skipped; marker lines toggle the flag without being
/// counted; every other line counts, and counts as AI when the flag is set.
///
/// # Examples
///
/// ```
/// use aimark_difflens::markers::MarkerRegistry;
/// use aimark_difflens::source::DiffLines;
/// use aimark_difflens::walker::walk;
///
/// let diff = "+++ b/app.py\n+# AI-generated start\n+x = 1\n+# AI-generated end\n+y = 2\n";
/// let counters = walk(&DiffLines::new(diff), &MarkerRegistry::new());
/// assert_eq!(counters.total_lines, 2);
/// assert_eq!(counters.ai_lines, 1);
/// assert_eq!(counters.files_changed, 1);
/// ```
pub fn walk<'a, S>(source: &S, registry: &MarkerRegistry) -> Counters
where
    S: LineSource<'a> + ?Sized,
{
    let mut counters = Counters::default();
    let mut cursor: Option<FileCursor<'a>> = None;

    for event in source.events() {
        match event {
            SourceEvent::FileStart { path } => {
                if let Some(done) = cursor.take() {
                    counters += done.close();
                }
                let next = FileCursor::open(path, registry);
                debug!(file = path, family = %next.family, mode = %source.mode(), "processing file");
                cursor = Some(next);
            }
            SourceEvent::Line(text) => {
                let Some(cursor) = cursor.as_mut() else {
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }
                cursor.step(text);
            }
            SourceEvent::Unreadable { path, error } => {
                warn!(file = path, %error, "skipping unreadable file");
            }
        }
    }
    if let Some(done) = cursor {
        counters += done.close();
    }

    counters
}
