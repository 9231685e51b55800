//! Commit report construction and rendering.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use aimark_core::{AimarkError, AnalysisMode, CommitMeta, CommitReport, Counters, OutputFormat};
use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

const RULE_WIDTH: usize = 50;
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Combine counters and commit metadata into a report.
///
/// # Examples
///
/// ```
/// use aimark_core::{AnalysisMode, CommitMeta, Counters};
/// use aimark_report::report::build;
/// use chrono::DateTime;
///
/// let meta = CommitMeta {
///     hash: "0123456789abcdef".into(),
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
///     message: "add parser".into(),
///     committed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
///     parent_count: 1,
/// };
/// let counters = Counters { total_lines: 4, ai_lines: 1, files_changed: 1 };
/// let report = build(counters, meta, AnalysisMode::Diff);
/// assert_eq!(report.ai_percentage, 25.0);
/// ```
pub fn build(counters: Counters, meta: CommitMeta, mode: AnalysisMode) -> CommitReport {
    CommitReport {
        commit: meta,
        ai_percentage: counters.ai_percentage(),
        counters,
        mode,
    }
}

/// Render `report` in the requested output format.
///
/// # Errors
///
/// Returns [`AimarkError::Serialization`] if JSON encoding fails.
pub fn render(report: &CommitReport, format: OutputFormat) -> Result<String, AimarkError> {
    match format {
        OutputFormat::Text => Ok(format_text(report)),
        OutputFormat::Markdown => Ok(format_markdown(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// Plain-text report, the form printed to the terminal and appended to the
/// report file. The commit date is shown in local time.
pub fn format_text(report: &CommitReport) -> String {
    format_text_in(report, &Local)
}

fn format_text_in<Tz>(report: &CommitReport, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let commit = &report.commit;
    let counters = &report.counters;
    let rule = "=".repeat(RULE_WIDTH);

    let mut out = String::new();
    out.push_str("AI Code Analysis Report\n");
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!(
        "Author:      {} <{}>\n",
        commit.author_name, commit.author_email
    ));
    out.push_str(&format!("Commit:      {}\n", commit.short_hash()));
    out.push_str(&format!(
        "Date:        {}\n",
        commit.committed_at.with_timezone(tz).format(DATE_FORMAT)
    ));
    out.push_str(&format!("Files:       {}\n", counters.files_changed));
    out.push_str(&format!(
        "Code lines:  {} (excluding blank lines and markers)\n",
        counters.total_lines
    ));
    out.push_str(&format!("AI lines:    {}\n", counters.ai_lines));
    out.push_str(&format!("AI percent:  {:.2}%\n", report.ai_percentage));
    out.push_str(&format!("{rule}\n"));
    out.push_str("Commit message:\n");
    out.push_str(&commit.message);
    out.push('\n');
    out
}

/// Markdown report for pasting into pull requests or issues.
pub fn format_markdown(report: &CommitReport) -> String {
    let commit = &report.commit;
    let counters = &report.counters;

    let mut out = String::new();
    out.push_str("# AI Code Analysis Report\n\n");
    out.push_str("| Field | Value |\n");
    out.push_str("|-------|-------|\n");
    out.push_str(&format!(
        "| Author | {} <{}> |\n",
        commit.author_name, commit.author_email
    ));
    out.push_str(&format!("| Commit | `{}` |\n", commit.short_hash()));
    out.push_str(&format!(
        "| Date | {} |\n",
        commit.committed_at.with_timezone(&Local).format(DATE_FORMAT)
    ));
    out.push_str(&format!("| Mode | {} |\n", report.mode));
    out.push_str(&format!("| Files | {} |\n", counters.files_changed));
    out.push_str(&format!("| Code lines | {} |\n", counters.total_lines));
    out.push_str(&format!("| AI lines | {} |\n", counters.ai_lines));
    out.push_str(&format!("| AI percent | {:.2}% |\n", report.ai_percentage));
    out.push_str("\n## Commit message\n\n");
    for line in commit.message.lines() {
        out.push_str("> ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// One-line machine-greppable summary appended after each report.
///
/// # Examples
///
/// ```
/// use aimark_core::{AnalysisMode, CommitMeta, Counters};
/// use aimark_report::report::{build, metrics_footer};
/// use chrono::{DateTime, Local, TimeZone};
///
/// let meta = CommitMeta {
///     hash: "0123456789abcdef".into(),
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
///     message: "add parser".into(),
///     committed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
///     parent_count: 1,
/// };
/// let counters = Counters { total_lines: 3, ai_lines: 1, files_changed: 2 };
/// let report = build(counters, meta, AnalysisMode::Diff);
/// let now = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
/// assert_eq!(
///     metrics_footer(&report, now),
///     "[metrics] date=2026-01-02 03:04:05 author=alice files=2 lines=3 ai_lines=1 ai_percent=33.33"
/// );
/// ```
pub fn metrics_footer<Tz>(report: &CommitReport, now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "[metrics] date={} author={} files={} lines={} ai_lines={} ai_percent={:.2}",
        now.format(DATE_FORMAT),
        report.commit.author_name,
        report.counters.files_changed,
        report.counters.total_lines,
        report.counters.ai_lines,
        report.ai_percentage,
    )
}

/// Append the text report and its metrics footer to `path`, creating the
/// file if it does not exist.
///
/// # Errors
///
/// Returns [`AimarkError::Io`] if the file cannot be opened or written.
pub fn append_to_file<Tz>(path: &Path, report: &CommitReport, now: DateTime<Tz>) -> Result<(), AimarkError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let entry = format!(
        "\n{}\n{}\n",
        format_text(report),
        metrics_footer(report, now)
    );
    file.write_all(entry.as_bytes())?;
    debug!(path = %path.display(), "appended report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn sample(total: u64, ai: u64) -> CommitReport {
        let meta = CommitMeta {
            hash: "9c1e4b7d2a0f55e3b6c8".into(),
            author_name: "Grace Hopper".into(),
            author_email: "grace@example.com".into(),
            message: "feat: add retry loop\n\nCovers flaky uploads.".into(),
            committed_at: DateTime::from_timestamp(1_760_000_000, 0).unwrap(),
            parent_count: 1,
        };
        let counters = Counters {
            total_lines: total,
            ai_lines: ai,
            files_changed: 2,
        };
        build(counters, meta, AnalysisMode::Diff)
    }

    #[test]
    fn build_keeps_unrounded_percentage() {
        let report = sample(3, 2);
        assert!((report.ai_percentage - 66.666_666).abs() < 1e-3);
        assert_eq!(report.counters.files_changed, 2);
    }

    #[test]
    fn build_with_no_lines_is_zero_percent() {
        assert_eq!(sample(0, 0).ai_percentage, 0.0);
    }

    #[test]
    fn text_layout() {
        let report = sample(3, 2);
        let text = format_text_in(&report, &Utc);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "AI Code Analysis Report");
        assert_eq!(lines[1], "=".repeat(50));
        assert_eq!(lines[2], "Author:      Grace Hopper <grace@example.com>");
        assert_eq!(lines[3], "Commit:      9c1e4b7d");
        assert_eq!(lines[4], "Date:        2025-10-09 08:53:20");
        assert_eq!(lines[5], "Files:       2");
        assert_eq!(lines[6], "Code lines:  3 (excluding blank lines and markers)");
        assert_eq!(lines[7], "AI lines:    2");
        assert_eq!(lines[8], "AI percent:  66.67%");
        assert_eq!(lines[9], "=".repeat(50));
        assert_eq!(lines[10], "Commit message:");
        assert_eq!(lines[11], "feat: add retry loop");
        assert_eq!(lines[13], "Covers flaky uploads.");
    }

    #[test]
    fn text_ends_with_message_and_one_newline() {
        let text = format_text_in(&sample(1, 1), &Utc);
        assert!(text.ends_with("Covers flaky uploads.\n"));
        assert!(!text.ends_with("\n\n"));
        assert_eq!(text.lines().count(), 14);
    }

    #[test]
    fn text_date_follows_time_zone() {
        let report = sample(1, 0);
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        assert!(format_text_in(&report, &plus_three).contains("Date:        2025-10-09 11:53:20"));
    }

    #[test]
    fn markdown_quotes_message() {
        let md = format_markdown(&sample(4, 1));
        assert!(md.starts_with("# AI Code Analysis Report"));
        assert!(md.contains("| Commit | `9c1e4b7d` |"));
        assert!(md.contains("| Mode | diff |"));
        assert!(md.contains("| AI percent | 25.00% |"));
        assert!(md.contains("> feat: add retry loop"));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = render(&sample(4, 1), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["aiPercentage"], 25.0);
        assert_eq!(value["counters"]["totalLines"], 4);
        assert_eq!(value["commit"]["authorName"], "Grace Hopper");
        assert_eq!(value["mode"], "diff");
    }

    #[test]
    fn footer_rounds_to_two_decimals() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        assert_eq!(
            metrics_footer(&sample(3, 2), now),
            "[metrics] date=2026-10-19 09:30:00 author=Grace Hopper files=2 lines=3 ai_lines=2 ai_percent=66.67"
        );
    }

    #[test]
    fn append_creates_then_extends_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ai_report.txt");
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();

        append_to_file(&path, &sample(3, 2), now).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first.matches("[metrics]").count(), 1);
        assert!(first.ends_with("ai_percent=66.67\n"));

        append_to_file(&path, &sample(4, 1), now).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert!(second.starts_with(&first));
        assert_eq!(second.matches("[metrics]").count(), 2);
        assert_eq!(second.matches("AI Code Analysis Report").count(), 2);
    }

    #[test]
    fn append_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/ai_report.txt");
        let now = Utc::now();
        let err = append_to_file(&path, &sample(1, 1), now).unwrap_err();
        assert!(matches!(err, AimarkError::Io(_)));
    }
}
