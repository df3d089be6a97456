//! # easyarchive CLI
//!
//! Archive a directory to a bucket whenever its contents change.
//!
//! ## Usage
//! ```bash
//! # Choose the directory to watch (generates a bucket name)
//! easyarchive init --archive-path /home/jack/mybackupfolder
//!
//! # Archive and upload if anything changed since the last run
//! easyarchive run --progress
//!
//! # Show what changed without archiving
//! easyarchive status
//!
//! # Print the current fingerprint as JSON
//! easyarchive snapshot
//! ```

use clap::{Parser, Subcommand};
use colored::*;
use easyarchive::{
    format_bytes, generate_bucket_name, ArchiveError, ArchiveState, FingerprintCollector,
    LocalUploader, Orchestrator, Result, RunOutcome, StagingArchiver, StateStore,
};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// easyarchive - archive a directory whenever its contents change
#[derive(Parser)]
#[command(name = "easyarchive")]
#[command(version)]
#[command(about = "Fingerprint a directory and archive it to a bucket when it changes")]
#[command(long_about = None)]
struct Cli {
    /// State file (defaults to ./config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of hashing workers (defaults to CPU count)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Include subdirectories, keyed by relative path
    #[arg(short, long, global = true)]
    recursive: bool,

    /// Directory bundles are written to
    #[arg(long, global = true, default_value = ".")]
    output: PathBuf,

    /// Directory standing in for remote storage
    #[arg(long, global = true, default_value = "easyarchive-remote")]
    remote: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the directory to archive
    Init {
        /// Directory whose contents are archived
        #[arg(short, long)]
        archive_path: PathBuf,

        /// Bucket name (generated when omitted)
        #[arg(short, long)]
        bucket: Option<String>,

        /// Replace an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Archive and upload if the directory changed
    Run {
        /// Show progress
        #[arg(long)]
        progress: bool,
    },

    /// Show changes since the last archive
    #[command(alias = "st")]
    Status,

    /// Print the current fingerprint as JSON
    Snapshot,
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let state_path = cli.config.unwrap_or_else(|| PathBuf::from(easyarchive::state::DEFAULT_STATE_FILE));

    let mut collector = FingerprintCollector::new().with_recursive(cli.recursive);
    if let Some(workers) = cli.workers {
        collector = collector.with_parallel_workers(workers);
    }

    let orchestrator = Orchestrator::new(
        StateStore::new(state_path),
        collector,
        Box::new(StagingArchiver::new(cli.output)),
        Box::new(LocalUploader::new(cli.remote)),
    );

    match cli.command {
        Commands::Init { archive_path, bucket, force } => {
            cmd_init(&orchestrator, archive_path, bucket, force)
        }
        Commands::Run { progress } => cmd_run(&orchestrator, progress),
        Commands::Status => cmd_status(&orchestrator),
        Commands::Snapshot => cmd_snapshot(&orchestrator),
    }
}

/// Record the archive location and bucket
///
/// The stored fingerprint is cleared, so the next `run` archives everything.
fn cmd_init(
    orchestrator: &Orchestrator,
    archive_path: PathBuf,
    bucket: Option<String>,
    force: bool,
) -> Result<()> {
    if let ArchiveState::Ready(existing) = orchestrator.state()? {
        if !force {
            return Err(ArchiveError::InvalidConfiguration(format!(
                "already archiving {:?}. Use --force to replace it.",
                existing.archive_location
            )));
        }
    }

    if !archive_path.is_dir() {
        return Err(ArchiveError::InvalidConfiguration(format!(
            "{:?} is not a directory",
            archive_path
        )));
    }

    let bucket = match bucket {
        Some(bucket) => bucket,
        None => {
            let generated = generate_bucket_name();
            println!("No bucket given, using {}", generated.yellow());
            generated
        }
    };

    let state = match orchestrator.configure(&archive_path, &bucket)? {
        ArchiveState::Ready(state) => state,
        ArchiveState::Unconfigured => return Err(ArchiveError::NotConfigured),
    };

    println!("{} Archive path set", "✓".green().bold());
    println!("  Path: {}", state.archive_location.display().to_string().cyan());
    println!("  Bucket: {}", state.bucket_name.cyan());
    println!("  State: {}", orchestrator.store().path().display().to_string().cyan());
    println!(
        "\nPlace files into the archive path; they are archived on the next {}.",
        "easyarchive run".yellow()
    );

    Ok(())
}

/// Run one archive cycle
fn cmd_run(orchestrator: &Orchestrator, show_progress: bool) -> Result<()> {
    let start = Instant::now();

    let outcome = if show_progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Hashing files...");

        let outcome = orchestrator.run_with_progress(|info| {
            if let Some(total) = info.total {
                pb.set_length(total as u64);
            }
            pb.set_position(info.processed as u64);
            pb.set_message(format_bytes(info.bytes_processed));
        });
        pb.finish_and_clear();
        outcome?
    } else {
        orchestrator.run()?
    };

    let duration = start.elapsed();

    match outcome {
        RunOutcome::Unconfigured => {
            println!("{}", "The archive file path is not set.".yellow());
            println!(
                "  Set one with: {}",
                "easyarchive init --archive-path <DIR>".yellow()
            );
        }
        RunOutcome::Unchanged { file_count } => {
            println!("{} No changes detected", "✓".green().bold());
            println!("  Files: {}", file_count.to_string().cyan());
        }
        RunOutcome::Archived { archive, files } => {
            println!("{} Change detected, archived and uploaded", "✓".green().bold());
            println!("  Files: {}", files.len().to_string().cyan());
            println!("  Bundle: {}", archive.display().to_string().cyan());
        }
    }
    println!("  Time: {}", format_duration(duration).to_string().cyan());

    Ok(())
}

/// Show what changed since the last archive
fn cmd_status(orchestrator: &Orchestrator) -> Result<()> {
    let report = orchestrator.status()?;

    println!("{}", "easyarchive status:".blue().bold());
    println!("  Path: {}", report.state.archive_location.display());
    println!("  Bucket: {}", report.state.bucket_name);
    println!("  Files: {}", report.current.len());
    println!();

    if !report.has_changes() {
        println!("{}", "No changes since the last archive".green());
        return Ok(());
    }

    for name in &report.diff.added {
        println!("  {} {}", "+".green().bold(), name);
    }
    for name in &report.diff.modified {
        println!("  {} {}", "~".yellow().bold(), name);
    }
    for name in &report.diff.removed {
        println!("  {} {}", "-".red().bold(), name);
    }
    println!(
        "\n{} changes; the next run archives all {} files",
        report.diff.len().to_string().yellow(),
        report.current.len()
    );

    Ok(())
}

/// Print the current fingerprint
fn cmd_snapshot(orchestrator: &Orchestrator) -> Result<()> {
    let report = orchestrator.status()?;
    println!("{}", serde_json::to_string_pretty(&report.current)?);
    Ok(())
}
