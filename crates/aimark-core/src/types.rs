use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AimarkError;

/// A group of file extensions sharing one comment-marker syntax.
///
/// # Examples
///
/// ```
/// use aimark_core::LanguageFamily;
///
/// let family: LanguageFamily = "script".parse().unwrap();
/// assert_eq!(family, LanguageFamily::ScriptLike);
/// assert_eq!(LanguageFamily::default(), LanguageFamily::CLike);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LanguageFamily {
    /// `// AI-generated start` (JavaScript, Java, C, C++, C#, TypeScript, ...).
    #[default]
    #[serde(alias = "c")]
    CLike,
    /// `# AI-generated start` (Python, Ruby, shell, ...).
    #[serde(alias = "script")]
    ScriptLike,
    /// `<!-- AI-generated start -->` (HTML, XML).
    #[serde(alias = "html")]
    Markup,
    /// `/* AI-generated start */` (CSS, SCSS, Less).
    #[serde(alias = "style", alias = "css")]
    StyleSheet,
}

impl fmt::Display for LanguageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageFamily::CLike => write!(f, "c-like"),
            LanguageFamily::ScriptLike => write!(f, "script-like"),
            LanguageFamily::Markup => write!(f, "markup"),
            LanguageFamily::StyleSheet => write!(f, "style-sheet"),
        }
    }
}

impl FromStr for LanguageFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "c-like" | "c" => Ok(LanguageFamily::CLike),
            "script-like" | "script" => Ok(LanguageFamily::ScriptLike),
            "markup" | "html" => Ok(LanguageFamily::Markup),
            "style-sheet" | "style" | "css" => Ok(LanguageFamily::StyleSheet),
            other => Err(format!("unknown language family: {other}")),
        }
    }
}

/// Line tallies accumulated over one commit.
///
/// Counters only grow. Lines enter through [`Counters::record_line`] and
/// tallies are combined with `+=`, both of which keep `ai_lines <= total_lines`.
///
/// # Examples
///
/// ```
/// use aimark_core::Counters;
///
/// let mut counters = Counters::default();
/// counters.record_file();
/// counters.record_line(true);
/// counters.record_line(false);
/// assert_eq!(counters.total_lines, 2);
/// assert_eq!(counters.ai_lines, 1);
/// assert_eq!(counters.ai_percentage(), 50.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    /// Countable lines (non-blank, not a marker).
    pub total_lines: u64,
    /// Countable lines that were inside an AI-generated region.
    pub ai_lines: u64,
    /// Files seen by the walk.
    pub files_changed: u64,
}

impl Counters {
    /// Count one changed file.
    pub fn record_file(&mut self) {
        self.files_changed += 1;
    }

    /// Count one countable line, tagged by the region it was found in.
    pub fn record_line(&mut self, in_ai_region: bool) {
        self.total_lines += 1;
        if in_ai_region {
            self.ai_lines += 1;
        }
    }

    /// Share of AI lines in percent; `0.0` when nothing was counted.
    pub fn ai_percentage(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.ai_lines as f64 / self.total_lines as f64 * 100.0
        }
    }
}

/// Folds a per-file tally into a running total.
impl AddAssign for Counters {
    fn add_assign(&mut self, other: Self) {
        self.total_lines += other.total_lines;
        self.ai_lines += other.ai_lines;
        self.files_changed += other.files_changed;
    }
}

/// Commit metadata as exposed by the repository collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMeta {
    /// Full hex commit hash.
    pub hash: String,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Commit message with surrounding whitespace trimmed.
    pub message: String,
    /// Commit time.
    pub committed_at: DateTime<Utc>,
    /// Number of parent commits (0 for a root commit).
    pub parent_count: usize,
}

impl CommitMeta {
    /// First eight characters of the hash.
    ///
    /// # Examples
    ///
    /// ```
    /// use aimark_core::CommitMeta;
    /// use chrono::DateTime;
    ///
    /// let meta = CommitMeta {
    ///     hash: "3f9a2c71d04be5a1".into(),
    ///     author_name: "alice".into(),
    ///     author_email: "alice@example.com".into(),
    ///     message: "feat: login form".into(),
    ///     committed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    ///     parent_count: 1,
    /// };
    /// assert_eq!(meta.short_hash(), "3f9a2c71");
    /// ```
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(8)]
    }
}

/// Which line source produced a report's counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Added lines of the unified diff against the first parent.
    Diff,
    /// Full contents of every file in the commit tree.
    Tree,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Diff => write!(f, "diff"),
            AnalysisMode::Tree => write!(f, "tree"),
        }
    }
}

/// Per-commit result: metadata, counters and the derived AI percentage.
///
/// Built once by the report builder and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    /// Commit the counts belong to.
    pub commit: CommitMeta,
    /// Accumulated line tallies.
    pub counters: Counters,
    /// `100 * ai_lines / total_lines`, or `0.0` for an empty commit.
    pub ai_percentage: f64,
    /// Source of the counts.
    pub mode: AnalysisMode,
}

/// One blob of a commit tree, with its content or the reason it is unreadable.
#[derive(Debug)]
pub struct TreeFile {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// Decoded file content.
    pub content: Result<String, AimarkError>,
}

/// Output format for reports printed to stdout.
///
/// # Examples
///
/// ```
/// use aimark_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_from_str_accepts_aliases() {
        assert_eq!("c-like".parse::<LanguageFamily>().unwrap(), LanguageFamily::CLike);
        assert_eq!("Script".parse::<LanguageFamily>().unwrap(), LanguageFamily::ScriptLike);
        assert_eq!("html".parse::<LanguageFamily>().unwrap(), LanguageFamily::Markup);
        assert_eq!("css".parse::<LanguageFamily>().unwrap(), LanguageFamily::StyleSheet);
        assert!("fortran".parse::<LanguageFamily>().is_err());
    }

    #[test]
    fn family_display_round_trips_through_from_str() {
        for family in [
            LanguageFamily::CLike,
            LanguageFamily::ScriptLike,
            LanguageFamily::Markup,
            LanguageFamily::StyleSheet,
        ] {
            assert_eq!(family.to_string().parse::<LanguageFamily>().unwrap(), family);
        }
    }

    #[test]
    fn percentage_is_zero_without_lines() {
        let counters = Counters {
            total_lines: 0,
            ai_lines: 0,
            files_changed: 3,
        };
        assert_eq!(counters.ai_percentage(), 0.0);
    }

    #[test]
    fn percentage_of_one_third() {
        let counters = Counters {
            total_lines: 3,
            ai_lines: 1,
            files_changed: 1,
        };
        assert!((counters.ai_percentage() - 33.333_333).abs() < 1e-4);
    }

    #[test]
    fn counters_add_assign_field_by_field() {
        let mut a = Counters {
            total_lines: 4,
            ai_lines: 1,
            files_changed: 1,
        };
        a += Counters {
            total_lines: 2,
            ai_lines: 2,
            files_changed: 1,
        };
        assert_eq!(
            a,
            Counters {
                total_lines: 6,
                ai_lines: 3,
                files_changed: 2
            }
        );
    }

    #[test]
    fn short_hash_handles_short_input() {
        let meta = CommitMeta {
            hash: "abc".into(),
            author_name: String::new(),
            author_email: String::new(),
            message: String::new(),
            committed_at: DateTime::from_timestamp(0, 0).unwrap(),
            parent_count: 0,
        };
        assert_eq!(meta.short_hash(), "abc");
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = CommitReport {
            commit: CommitMeta {
                hash: "abc".into(),
                author_name: "alice".into(),
                author_email: "a@example.com".into(),
                message: "msg".into(),
                committed_at: DateTime::from_timestamp(0, 0).unwrap(),
                parent_count: 1,
            },
            counters: Counters::default(),
            ai_percentage: 0.0,
            mode: AnalysisMode::Diff,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"aiPercentage\""));
        assert!(json.contains("\"totalLines\""));
        assert!(json.contains("\"mode\":\"diff\""));
    }
}
