//! oxide-schemadiff CLI
//!
//! Reads two schema snapshots, prints the reversible migration between them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{Level, debug, error, warn};
use tracing_subscriber::FmtSubscriber;

use oxide_schemadiff::prelude::*;
use oxide_schemadiff::schema;

/// Generate up/down SQL migrations from schema JSON diffs.
#[derive(Parser)]
#[command(name = "oxide-schemadiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the current (source) schema JSON.
    #[arg(long, env = "SCHEMADIFF_FROM")]
    from_file: PathBuf,

    /// Path to the target schema JSON.
    #[arg(long, env = "SCHEMADIFF_TO")]
    to_file: PathBuf,

    /// SQL dialect.
    #[arg(long, env = "SCHEMADIFF_DIALECT", value_enum)]
    dialect: Dialect,

    /// Output path (defaults to stdout).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Show the operation summary only; do not generate migration SQL.
    #[arg(long)]
    dry_run: bool,

    /// Dry-run output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Allow destructive operations such as drops and narrowing changes.
    #[arg(long)]
    allow_destructive: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            exit_code(&err)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let old = schema::load(&cli.from_file)?;
    let new = schema::load(&cli.to_file)?;
    debug!(
        from = old.len(),
        to = new.len(),
        "loaded schema snapshots"
    );

    let output = if cli.dry_run {
        let summary = dry_run(&old, &new);
        match cli.format {
            Format::Text => summary.to_string(),
            Format::Json => summary.to_json()? + "\n",
        }
    } else {
        let document = assemble(&old, &new, cli.dialect, cli.allow_destructive)
            .map_err(MigrateError::from)?;
        for warning in &document.warnings {
            warn!("{warning}");
        }
        document.to_string()
    };

    write_output(cli.out.as_deref(), &output)
}

fn write_output(out: Option<&Path>, output: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, output)?;
            debug!(path = %path.display(), "wrote output");
        }
        None => print!("{output}"),
    }
    Ok(())
}

/// 2 when the safety gate refused, 1 for every other failure.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<MigrateError>() {
        Some(MigrateError::Safety(_)) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
