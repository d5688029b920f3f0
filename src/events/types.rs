//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organiser pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Discovery events
    Discovery(DiscoveryEvent),
    /// Per-record events
    Record(RecordEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiscoveryEvent {
    /// Discovery has started
    Started { base_dir: PathBuf },
    /// A candidate file was found and queued
    FileFound { path: PathBuf },
    /// Discovery completed
    Completed { total_files: usize },
}

/// Stages at which a record can fail.
///
/// Metadata enrichment is not listed: an unreadable tag block only leaves
/// the record undated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loading,
    Resolving,
    Relocating,
    Cleaning,
}

/// Events about a single record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecordEvent {
    /// Dry run: the record would be relocated here
    Planned { source: PathBuf, destination: PathBuf },
    /// The record was copied or moved
    Relocated { source: PathBuf, destination: PathBuf },
    /// The record was already where it belongs
    AlreadyInPlace { path: PathBuf },
    /// The record failed and left the pipeline
    Failed {
        path: PathBuf,
        stage: Stage,
        message: String,
    },
    /// An emptied source directory was removed
    DirectoryPruned { path: PathBuf },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started { dry_run: bool },
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed
    Completed { summary: RunSummary },
    /// Pipeline was cancelled; in-flight records were drained
    Cancelled,
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Discovering,
    Processing,
    Reporting,
}

/// Summary of run results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Files discovered
    pub discovered: usize,
    /// Files copied or moved
    pub relocated: usize,
    /// Files already in their canonical place
    pub already_in_place: usize,
    /// Dry run: files that would be relocated
    pub planned: usize,
    /// Files that failed
    pub failed: usize,
    /// Groups of byte-identical files
    pub duplicate_groups: usize,
    /// Empty source directories removed
    pub directories_pruned: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Discovering => write!(f, "Discovering"),
            PipelinePhase::Processing => write!(f, "Processing"),
            PipelinePhase::Reporting => write!(f, "Reporting"),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Resolving => "resolving",
            Stage::Relocating => "relocating",
            Stage::Cleaning => "cleaning",
        };
        f.write_str(name)
    }
}
