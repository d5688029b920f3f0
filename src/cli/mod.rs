//! # CLI Module
//!
//! Command-line interface for the photo organiser.
//!
//! ## Usage
//! ```bash
//! # Move every JPEG under ~/Inbox into ~/Inbox/YYYY/MM/...
//! photo-organise ~/Inbox
//!
//! # Copy into a separate library, keeping the originals
//! photo-organise ~/Inbox --storage-dir ~/Photos --copy
//!
//! # See what would happen
//! photo-organise ~/Inbox --dry-run
//!
//! # JSON output
//! photo-organise ~/Inbox --dry-run --output json
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_organiser::core::metadata::DateFallback;
use photo_organiser::core::pipeline::{Organiser, OrganiserConfig, RunReport};
use photo_organiser::core::relocate::OperationMode;
use photo_organiser::core::scanner::DEFAULT_FILENAME_FILTER;
use photo_organiser::error::Result;
use photo_organiser::events::{
    DiscoveryEvent, Event, EventChannel, PipelineEvent, RecordEvent, Stage,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

/// Photo Organiser - file photos by the date they were taken
#[derive(Parser, Debug)]
#[command(name = "photo-organise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to organise
    base_dir: PathBuf,

    /// Root of the organised tree (defaults to the base directory)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Regex matched against file names
    #[arg(short, long, default_value = DEFAULT_FILENAME_FILTER)]
    filter: String,

    /// Copy files instead of moving them
    #[arg(long)]
    copy: bool,

    /// Show the planned relocations without touching any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Number of worker threads
    #[arg(short, long, default_value = "3")]
    workers: usize,

    /// Use the file modification time when no embedded date is found
    #[arg(long)]
    mtime_fallback: bool,

    /// Include hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// Follow symbolic links while scanning
    #[arg(long)]
    follow_symlinks: bool,

    /// Keep source directories emptied by a move
    #[arg(long)]
    no_prune: bool,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (one "source -> destination" per line)
    Minimal,
}

impl Cli {
    fn config(&self) -> OrganiserConfig {
        OrganiserConfig {
            base_dir: self.base_dir.clone(),
            storage_dir: self.storage_dir.clone(),
            filename_filter: self.filter.clone(),
            operation: if self.copy {
                OperationMode::Copy
            } else {
                OperationMode::Move
            },
            dry_run: self.dry_run,
            workers: self.workers,
            date_fallback: if self.mtime_fallback {
                DateFallback::FileModified
            } else {
                DateFallback::None
            },
            prune_empty_dirs: !self.no_prune,
            include_hidden: self.include_hidden,
            follow_symlinks: self.follow_symlinks,
            ..OrganiserConfig::default()
        }
    }
}

/// Run the CLI
///
/// Exits with 0 when every file was handled, 1 when some files failed.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    photo_organiser::init_tracing_with_default(if cli.verbose { "debug" } else { "warn" });

    let term = Term::stderr();
    let output = cli.output;

    // Print header
    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}{}",
            style("Photo Organiser").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim(),
            if cli.dry_run {
                style(" (dry run)").yellow().to_string()
            } else {
                String::new()
            }
        ))
        .ok();
        term.write_line("").ok();
    }

    let organiser = Organiser::builder().config(cli.config()).build()?;

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("█▓░"));
        }
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = cli.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            // Drain so the pipeline never waits on us
            for _ in receiver.iter() {}
            return;
        };

        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Discovery(DiscoveryEvent::FileFound { .. }) => pb.inc_length(1),
                Event::Record(RecordEvent::Planned { source, .. })
                | Event::Record(RecordEvent::Relocated { source, .. })
                | Event::Record(RecordEvent::AlreadyInPlace { path: source }) => {
                    pb.inc(1);
                    if verbose {
                        pb.set_message(
                            source
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Record(RecordEvent::Failed { stage, .. }) if stage != Stage::Cleaning => {
                    pb.inc(1);
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = organiser.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let report = result?;

    // Output results
    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, cli.dry_run, verbose),
        OutputFormat::Json => print_json_results(&report, cli.dry_run)?,
        OutputFormat::Minimal => print_minimal_results(&report),
    }

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_pretty_results(term: &Term, report: &RunReport, dry_run: bool, verbose: bool) {
    let summary = report.summary();

    term.write_line(&format!(
        "{} {}",
        style("✓").green().bold(),
        if report.cancelled {
            "Run Cancelled"
        } else if dry_run {
            "Plan Complete"
        } else {
            "Run Complete"
        }
    ))
    .ok();
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} files found in {:.1}s",
        style(summary.discovered).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    if dry_run {
        term.write_line(&format!(
            "  {} files would be relocated",
            style(summary.planned).cyan()
        ))
        .ok();
    } else {
        term.write_line(&format!("  {} files relocated", style(summary.relocated).cyan()))
            .ok();
    }
    if summary.already_in_place > 0 {
        term.write_line(&format!(
            "  {} already in place",
            style(summary.already_in_place).dim()
        ))
        .ok();
    }
    if summary.directories_pruned > 0 {
        term.write_line(&format!(
            "  {} empty directories removed",
            style(summary.directories_pruned).dim()
        ))
        .ok();
    }
    if summary.duplicate_groups > 0 {
        term.write_line(&format!(
            "  {} groups of identical files",
            style(summary.duplicate_groups).yellow()
        ))
        .ok();
    }
    term.write_line(&format!(
        "  {} failed",
        if summary.failed > 0 {
            style(summary.failed).red()
        } else {
            style(summary.failed).green()
        }
    ))
    .ok();
    term.write_line("").ok();

    let entries = if dry_run { &report.planned } else { &report.relocated };
    if !entries.is_empty() {
        let heading = if dry_run { "Planned:" } else { "Relocated:" };
        term.write_line(&format!("{}", style(heading).bold().underlined()))
            .ok();
        for entry in entries {
            term.write_line(&format!(
                "  {} {} {}",
                entry.source.display(),
                style("→").dim(),
                style(entry.destination.display()).green()
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    if !report.failed.is_empty() {
        term.write_line(&format!("{}", style("Failed:").bold().underlined()))
            .ok();
        for failure in &report.failed {
            term.write_line(&format!(
                "  {} {} {}",
                style("✗").red(),
                style(format!("[{}]", failure.stage)).dim(),
                failure.failed
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    for failure in &report.cleanup_failures {
        term.write_line(&format!(
            "  {} {}",
            style("!").yellow(),
            failure.cause
        ))
        .ok();
    }

    if verbose {
        for (i, group) in report.duplicate_groups.iter().enumerate() {
            term.write_line(&format!(
                "  {} {}",
                style(format!("Identical group {}:", i + 1)).bold(),
                style(&group.digest[..12.min(group.digest.len())]).dim()
            ))
            .ok();
            for path in &group.paths {
                term.write_line(&format!("    {} {}", style("○").dim(), path.display()))
                    .ok();
            }
        }
    }
}

fn print_json_results(report: &RunReport, dry_run: bool) -> Result<()> {
    let entries = |list: &[photo_organiser::core::pipeline::Relocation]| {
        list.iter()
            .map(|entry| {
                serde_json::json!({
                    "source": entry.source,
                    "destination": entry.destination,
                })
            })
            .collect::<Vec<_>>()
    };

    let output = serde_json::json!({
        "dry_run": dry_run,
        "cancelled": report.cancelled,
        "summary": report.summary(),
        "relocated": entries(&report.relocated),
        "planned": entries(&report.planned),
        "already_in_place": report.already_in_place,
        "failed": report.failed.iter().map(|f| {
            serde_json::json!({
                "path": f.failed.source_path(),
                "stage": f.stage,
                "kind": f.failed.cause.kind(),
                "reason": f.failed.cause.to_string(),
            })
        }).collect::<Vec<_>>(),
        "cleanup_failures": report.cleanup_failures.iter().map(|f| {
            serde_json::json!({
                "path": f.source,
                "reason": f.cause.to_string(),
            })
        }).collect::<Vec<_>>(),
        "duplicate_groups": report.duplicate_groups.iter().map(|g| {
            serde_json::json!({
                "digest": g.digest,
                "paths": g.paths,
            })
        }).collect::<Vec<_>>(),
        "pruned_directories": report.pruned_directories,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_minimal_results(report: &RunReport) {
    for entry in report.relocated.iter().chain(&report.planned) {
        println!("{} -> {}", entry.source.display(), entry.destination.display());
    }
    for failure in &report.failed {
        eprintln!("{}", failure.failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "photo-organise",
            "/photos/inbox",
            "--storage-dir",
            "/photos/library",
            "--copy",
            "--dry-run",
            "--workers",
            "8",
            "--mtime-fallback",
            "--no-prune",
            "--follow-symlinks",
        ]);

        let config = cli.config();

        assert_eq!(config.base_dir, PathBuf::from("/photos/inbox"));
        assert_eq!(config.storage_dir, Some(PathBuf::from("/photos/library")));
        assert_eq!(config.operation, OperationMode::Copy);
        assert!(config.dry_run);
        assert_eq!(config.workers, 8);
        assert_eq!(config.date_fallback, DateFallback::FileModified);
        assert!(!config.prune_empty_dirs);
        assert!(config.follow_symlinks);
        assert_eq!(config.filename_filter, DEFAULT_FILENAME_FILTER);
    }

    #[test]
    fn defaults_move_in_place() {
        let config = Cli::parse_from(["photo-organise", "inbox"]).config();

        assert_eq!(config.operation, OperationMode::Move);
        assert_eq!(config.storage_root(), PathBuf::from("inbox").as_path());
        assert!(config.prune_empty_dirs);
        assert!(!config.dry_run);
        assert!(!config.follow_symlinks);
    }
}
