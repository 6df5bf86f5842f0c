use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scmtrail_core::{Changeset, ComponentKey, OutputFormat, ScmTrailConfig};
use scmtrail_scm::{AnalysisClock, FixedClock, ScmInfoResolver, ScmSource, SystemClock};
use scmtrail_sources::diff::GitLineDiff;
use scmtrail_sources::report::ScanReport;
use scmtrail_sources::store::ScmStore;

#[derive(Parser)]
#[command(
    name = "scmtrail",
    version,
    about = "Per-line SCM metadata for code-quality analysis runs",
    long_about = "scmtrail resolves who changed each line of every analyzed file, and when.\n\n\
                   Changesets come from the scan report when the scanner emitted them, from the\n\
                   store of the previous analysis when the file is unchanged, and are generated\n\
                   at the analysis date for new or changed lines otherwise.\n\n\
                   Examples:\n  \
                     scmtrail init                              Create a .scmtrail.toml config file\n  \
                     scmtrail resolve --report scan.json        Resolve every file in a scan report\n  \
                     scmtrail resolve --persist --format json   Resolve, store, and print JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .scmtrail.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve per-line SCM information for every file of a scan report
    #[command(long_about = "Resolve per-line SCM information for every file of a scan report.\n\n\
        Files are resolved from the report's changesets, the persisted store, or a line\n\
        diff of the working tree against the baseline revision.\n\n\
        Examples:\n  scmtrail resolve\n  scmtrail resolve --report build/scan.json --baseline origin/main --persist")]
    Resolve {
        /// Scan report (default: [report] path from config)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Persisted SCM store (default: [store] path from config)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Baseline revision for the line diff (default: [analysis] baseline)
        #[arg(long)]
        baseline: Option<String>,

        /// Analysis date as RFC 3339 (default: [analysis] date, then now)
        #[arg(long)]
        date: Option<DateTime<Utc>>,

        /// Write resolved information back into the store
        #[arg(long)]
        persist: bool,
    },
    /// Create a default .scmtrail.toml in the current directory
    Init,
}

/// Resolution outcome of one file, as printed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileResult {
    key: ComponentKey,
    path: PathBuf,
    source: Option<ScmSource>,
    lines: usize,
    latest: Option<Changeset>,
}

const DEFAULT_CONFIG: &str = r#"# scmtrail configuration

[analysis]
# Git revision the working tree is compared against
baseline = "HEAD"
# Fixed analysis date (RFC 3339, quoted or bare); the current time when unset
# date = 2024-01-01T00:00:00Z

[store]
path = ".scmtrail/scm.db"

[report]
path = ".scmtrail/report.json"
"#;

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "scmtrail={level},scmtrail_scm={level},scmtrail_sources={level}"
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScmTrailConfig> {
    let config = match path {
        Some(path) => ScmTrailConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".scmtrail.toml");
            if default_path.exists() {
                ScmTrailConfig::from_file(default_path)?
            } else {
                ScmTrailConfig::default()
            }
        }
    };
    Ok(config)
}

#[allow(clippy::too_many_arguments)]
fn run_resolve(
    config: &ScmTrailConfig,
    format: OutputFormat,
    report_path: Option<PathBuf>,
    store_path: Option<PathBuf>,
    repo: &Path,
    baseline: Option<String>,
    date: Option<DateTime<Utc>>,
    persist: bool,
) -> Result<()> {
    let report_path = report_path.unwrap_or_else(|| config.report.path.clone());
    let store_path = store_path.unwrap_or_else(|| config.store.path.clone());
    let baseline = baseline.unwrap_or_else(|| config.analysis.baseline.clone());
    let analysis_date = date
        .or(config.analysis.date)
        .unwrap_or_else(|| SystemClock::new().now());

    let report = ScanReport::from_file(&report_path)?;
    let components = report.components().to_vec();
    let store = ScmStore::open(&store_path)?;

    if git2::Repository::discover(repo).is_err() {
        miette::bail!(miette::miette!(
            help = "Run scmtrail from inside a git repository, or specify --repo",
            "Not a git repository: {}",
            repo.display()
        ));
    }
    let diff = GitLineDiff::open(repo, &baseline)?;

    tracing::info!(
        "Resolving {} components from {} (baseline {baseline}, analysis date {analysis_date})",
        components.len(),
        report_path.display()
    );

    let mut resolver = ScmInfoResolver::new(report, store, diff, FixedClock(analysis_date));
    let mut results = Vec::new();
    let mut persisted = 0usize;

    for component in components.iter().filter(|c| c.is_file()) {
        let info = resolver.scm_info(component)?;
        if persist {
            match info.as_deref() {
                Some(info) if info.source() == ScmSource::Persisted => {}
                Some(info) => {
                    resolver.persisted_source().save(&component.key, info)?;
                    persisted += 1;
                }
                None => resolver.persisted_source().remove(&component.key)?,
            }
        }
        results.push(FileResult {
            key: component.key.clone(),
            path: component.path.clone(),
            source: info.as_ref().map(|i| i.source()),
            lines: info.as_ref().map_or(0, |i| i.all_changesets().len()),
            latest: info.as_ref().and_then(|i| i.latest_changeset().cloned()),
        });
    }

    if persist {
        tracing::info!("Stored SCM info of {persisted} files in {}", store_path.display());
    }

    print_results(&results, format)
}

fn print_results(results: &[FileResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(results).into_diagnostic()?;
            println!("{json}");
        }
        OutputFormat::Markdown => {
            println!("| File | Source | Lines | Latest change |");
            println!("|------|--------|-------|---------------|");
            for result in results {
                println!(
                    "| `{}` | {} | {} | {} |",
                    result.path.display(),
                    source_label(result.source),
                    result.lines,
                    latest_label(result.latest.as_ref()),
                );
            }
        }
        OutputFormat::Text => {
            for result in results {
                println!(
                    "{:<40} {:<10} {:>6} lines  {}",
                    result.path.display(),
                    source_label(result.source),
                    result.lines,
                    latest_label(result.latest.as_ref()),
                );
            }
            let without = results.iter().filter(|r| r.source.is_none()).count();
            println!(
                "\n{} files resolved, {} without SCM information",
                results.len(),
                without
            );
        }
    }
    Ok(())
}

fn source_label(source: Option<ScmSource>) -> String {
    source.map_or_else(|| "none".to_string(), |s| s.to_string())
}

fn latest_label(latest: Option<&Changeset>) -> String {
    let Some(changeset) = latest else {
        return "-".into();
    };
    format!(
        "{} by {} ({})",
        changeset.date.format("%Y-%m-%d %H:%M"),
        changeset.author.as_deref().unwrap_or("unknown"),
        changeset.revision.as_deref().unwrap_or("no revision"),
    )
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Resolve {
            report,
            store,
            ref repo,
            baseline,
            date,
            persist,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_resolve(
                &config, cli.format, report, store, repo, baseline, date, persist,
            )?;
        }
        Command::Init => {
            let path = Path::new(".scmtrail.toml");
            if path.exists() {
                miette::bail!(".scmtrail.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .scmtrail.toml with default configuration");
        }
    }

    Ok(())
}
