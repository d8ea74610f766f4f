//! validate-incremental - check that incremental ingestion matches a full rebuild
//!
//! Usage:
//!   validate-incremental --repo <path> --commits HEAD~5,HEAD~3,HEAD [--engine ./target/release/cg]
//!
//! Exit status is 0 only when every revision's snapshots matched.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use incremental_validator::config::{DEFAULT_DIFF_PREVIEW, DEFAULT_ENGINE};
use incremental_validator::{parse_revision_list, system_validator, RunOutcome, ValidatorConfig};

#[derive(Parser, Debug)]
#[command(name = "validate-incremental", version)]
#[command(about = "Validate incremental ingestion against full ingestion across git history")]
struct Cli {
    /// Path to the git repository to test
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Comma-separated revisions to test, in order (e.g. HEAD~5,HEAD~3,HEAD)
    #[arg(long)]
    commits: String,

    /// Path to the ingestion engine binary
    #[arg(long, alias = "cg-binary", default_value = DEFAULT_ENGINE)]
    engine: PathBuf,

    /// Directory for stores and snapshots (default: new temp dir)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Characters of each diff to print when a revision fails
    #[arg(long, default_value_t = DEFAULT_DIFF_PREVIEW)]
    diff_preview: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let revisions = parse_revision_list(&cli.commits)?;
    let config = ValidatorConfig {
        workspace: cli.workspace,
        diff_preview: cli.diff_preview,
        ..ValidatorConfig::new(cli.repo, revisions, cli.engine)
    };

    if let Err(e) = config.check_engine() {
        eprintln!("Error: {}", e);
        eprintln!("Build it with: cargo build --release");
        return Ok(ExitCode::from(1));
    }

    let validator = system_validator(&config)?;
    tracing::info!(
        workspace = %validator.workspace().root().display(),
        repo = %config.repo.display(),
        engine = %config.engine.display(),
        revisions = ?config.revisions,
        "configuration"
    );

    let outcome = validator.run(&config.revisions)?;
    let summary = outcome.summary();

    if let RunOutcome::Refused { .. } = outcome {
        eprintln!("Refusing to run: commit or stash uncommitted changes first.");
    } else {
        summary.write_json(&validator.workspace().report_path())?;
        if matches!(outcome, RunOutcome::Halted(_)) {
            println!(
                "Artifacts preserved in: {}",
                validator.workspace().snapshots_root().display()
            );
        }
    }
    println!("{}", summary);

    Ok(ExitCode::from(summary.exit_code() as u8))
}
