//! Per-line classification against a family's marker pair.

use aimark_core::LanguageFamily;

use crate::markers::markers_for;

/// Outcome of classifying one line.
///
/// # Examples
///
/// ```
/// use aimark_core::LanguageFamily;
/// use aimark_difflens::classify::{classify, Transition};
///
/// let c = classify("  # AI-generated start", LanguageFamily::ScriptLike, false);
/// assert!(!c.countable);
/// assert!(c.next_in_region);
/// assert_eq!(c.transition(false), Transition::Entered);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The line counts toward the totals (it is not a marker).
    pub countable: bool,
    /// Region state after this line.
    pub next_in_region: bool,
}

/// Region change caused by a classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A start marker opened a region.
    Entered,
    /// An end marker closed a region.
    Exited,
    /// A marker that left the state as it was (start inside a region, end
    /// outside one).
    Redundant,
    /// An ordinary line.
    Unchanged,
}

impl Classification {
    /// Region change relative to the state the line was classified in.
    pub fn transition(&self, in_region: bool) -> Transition {
        match (self.countable, in_region, self.next_in_region) {
            (true, _, _) => Transition::Unchanged,
            (false, false, true) => Transition::Entered,
            (false, true, false) => Transition::Exited,
            (false, _, _) => Transition::Redundant,
        }
    }
}

/// Classify `line` for `family` given the current region state.
///
/// The start marker is tested before the end marker, and both before the line
/// is considered countable. Marker lines never count. Callers filter blank
/// lines before calling this.
///
/// # Examples
///
/// ```
/// use aimark_core::LanguageFamily;
/// use aimark_difflens::classify::classify;
///
/// let c = classify("let total = a + b;", LanguageFamily::CLike, true);
/// assert!(c.countable);
/// assert!(c.next_in_region);
/// ```
pub fn classify(line: &str, family: LanguageFamily, in_region: bool) -> Classification {
    let trimmed = line.trim();
    let markers = markers_for(family);

    if markers.start.is_match(trimmed) {
        return Classification {
            countable: false,
            next_in_region: true,
        };
    }
    if markers.end.is_match(trimmed) {
        return Classification {
            countable: false,
            next_in_region: false,
        };
    }

    Classification {
        countable: true,
        next_in_region: in_region,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_marker_opens_region() {
        let c = classify("// AI-generated start", LanguageFamily::CLike, false);
        assert_eq!(
            c,
            Classification {
                countable: false,
                next_in_region: true
            }
        );
    }

    #[test]
    fn end_marker_closes_region() {
        let c = classify("/* AI-generated end */", LanguageFamily::StyleSheet, true);
        assert_eq!(
            c,
            Classification {
                countable: false,
                next_in_region: false
            }
        );
        assert_eq!(c.transition(true), Transition::Exited);
    }

    #[test]
    fn repeated_start_is_idempotent() {
        let c = classify("# AI-generated start", LanguageFamily::ScriptLike, true);
        assert!(!c.countable);
        assert!(c.next_in_region);
        assert_eq!(c.transition(true), Transition::Redundant);
    }

    #[test]
    fn end_outside_region_is_idempotent() {
        let c = classify("<!-- AI-generated end -->", LanguageFamily::Markup, false);
        assert!(!c.countable);
        assert!(!c.next_in_region);
        assert_eq!(c.transition(false), Transition::Redundant);
    }

    #[test]
    fn plain_line_keeps_state() {
        for in_region in [false, true] {
            let c = classify("x = 1", LanguageFamily::ScriptLike, in_region);
            assert!(c.countable);
            assert_eq!(c.next_in_region, in_region);
            assert_eq!(c.transition(in_region), Transition::Unchanged);
        }
    }

    #[test]
    fn other_family_marker_is_countable() {
        let c = classify("# AI-generated start", LanguageFamily::CLike, false);
        assert!(c.countable);
        assert!(!c.next_in_region);
    }

    #[test]
    fn line_with_both_markers_counts_as_start() {
        let c = classify(
            "// AI-generated start // AI-generated end",
            LanguageFamily::CLike,
            false,
        );
        assert!(!c.countable);
        assert!(c.next_in_region);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let c = classify("\t  // AI-generated end  \r", LanguageFamily::CLike, true);
        assert!(!c.next_in_region);
    }
}
