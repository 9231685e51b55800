use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aimark_core::{AimarkConfig, CommitReport, OutputFormat};
use aimark_difflens::markers::MarkerRegistry;
use aimark_gitpulse::repo::GitRepository;
use aimark_report::analyze::{analyze_commit, AnalyzeOptions};
use aimark_report::report;
use aimark_store::store::{format_recent_table, open_store, truncate, ReportStore, StoredReport};

const CONFIG_FILE: &str = ".aimark.toml";

#[derive(Parser)]
#[command(
    name = "aimark",
    version,
    about = "Measure the share of AI-generated code in a git commit",
    long_about = "aimark counts the lines of a commit that sit between AI-generated region markers\n\
                   (`// AI-generated start` ... `// AI-generated end` and the equivalent comment\n\
                   syntax for scripts, markup and style sheets).\n\n\
                   Examples:\n  \
                     aimark analyze . HEAD               Analyze the latest commit\n  \
                     aimark analyze ../svc 3f9a2c71      Analyze a commit in another repository\n  \
                     aimark history --limit 5            Show the last five stored reports\n  \
                     aimark init                         Create a .aimark.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .aimark.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable report (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one commit and record the result
    #[command(long_about = "Analyze one commit and record the result.\n\n\
        Counts the added lines of the commit's diff against its first parent, or every\n\
        line of the commit tree for a root commit. Prints the report, appends it to the\n\
        report file and stores a row in the report database.\n\n\
        Examples:\n  aimark analyze . HEAD\n  aimark analyze /srv/repo 3f9a2c71 --no-db --dump-diff commit_diff.txt")]
    Analyze {
        /// Path to the git repository
        repository: PathBuf,

        /// Commit to analyze (hash, branch or any revision expression)
        commit: String,

        /// Append the report here instead of the configured report file
        #[arg(long)]
        report_file: Option<PathBuf>,

        /// Write the raw commit diff to this file
        #[arg(long)]
        dump_diff: Option<PathBuf>,

        /// Do not store the report in the database
        #[arg(long)]
        no_db: bool,
    },
    /// List the most recent stored reports
    History {
        /// Maximum rows to show (default: report.recent_limit from config)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Create a default .aimark.toml configuration file
    #[command(long_about = "Create a default .aimark.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .aimark.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# aimark configuration

[database]
# enabled = true
# backend = "sqlite"  # or "postgres" to use host/port/user/password
# host = "localhost"
# port = 5432
# database = "ai_code_reports.db"  # file path for sqlite, database name for postgres
# user = "postgres"
# password = "..."    # or AIMARK_DB_PASSWORD

[report]
# file = "ai_report.txt"
# diff_dump = "commit_diff.txt"
# recent_limit = 10

# Extra extension -> marker family mappings.
# Families: "c-like", "script-like", "markup", "style-sheet"
[markers.extensions]
# tf = "script-like"
# vue = "markup"
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze {
            repository,
            commit,
            report_file,
            dump_diff,
            no_db,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let report_file = report_file.unwrap_or_else(|| config.report.file.clone());
            let options = AnalyzeOptions {
                diff_dump: dump_diff.or_else(|| config.report.diff_dump.clone()),
            };
            let registry = MarkerRegistry::with_overrides(config.markers.extensions.clone());

            let repo = GitRepository::open(&repository)?;
            let snapshot = repo.commit(&commit)?;
            let analysis = analyze_commit(&snapshot, &registry, &options);
            let report = analysis.report;

            print!("{}", report::render(&report, cli.format)?);
            if cli.format == OutputFormat::Json {
                println!();
            }

            report::append_to_file(&report_file, &report, Local::now())?;
            debug!(path = %report_file.display(), "report appended");

            if no_db || !config.database.enabled {
                debug!("database storage disabled");
            } else {
                store_report(&config, &report, cli.format);
            }
        }
        Command::History { limit } => {
            let config = load_config(cli.config.as_deref())?;
            let limit = limit.unwrap_or(config.report.recent_limit);
            let mut store = open_store(&config.database)?;
            let rows = store.recent(limit)?;
            print_history(&rows, cli.format)?;
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "aimark", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<AimarkConfig> {
    let config = match explicit {
        Some(path) => AimarkConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                AimarkConfig::from_file(default_path)?
            } else {
                AimarkConfig::default()
            }
        }
    }
    .with_env_overrides();

    debug!(
        db = %config.database.redacted(),
        report_file = %config.report.file.display(),
        extra_extensions = config.markers.extensions.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Insert the report and show the latest rows. Failures only warn: the report
/// has already been printed and appended by the time this runs.
fn store_report(config: &AimarkConfig, report: &CommitReport, format: OutputFormat) {
    let mut store = match open_store(&config.database) {
        Ok(store) => store,
        Err(error) => {
            warn!(%error, "report not stored");
            return;
        }
    };

    let id = match store.insert(report) {
        Ok(id) => id,
        Err(error) => {
            warn!(%error, "report not stored");
            return;
        }
    };

    if format != OutputFormat::Text {
        return;
    }

    println!("\nReport stored with id {id}");
    match store.recent(config.report.recent_limit) {
        Ok(rows) => {
            println!("\nRecent reports:");
            print!("{}", format_recent_table(&rows));
        }
        Err(error) => warn!(%error, "failed to list recent reports"),
    }
}

fn print_history(rows: &[StoredReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", format_recent_table(rows)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("| ID | Commit | Author | Total | AI | AI % | Date |");
            println!("|----|--------|--------|-------|----|------|------|");
            for row in rows {
                println!(
                    "| {} | `{}` | {} | {} | {} | {:.1} | {} |",
                    row.id,
                    truncate(&row.commit_hash, 12),
                    row.author_name,
                    row.total_lines,
                    row.ai_lines,
                    row.ai_percentage,
                    row.report_date,
                );
            }
        }
    }
    Ok(())
}
