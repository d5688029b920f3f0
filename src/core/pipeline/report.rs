//! Run results.

use crate::core::record::FailedRecord;
use crate::error::RecordError;
use crate::events::{RunSummary, Stage};
use std::path::PathBuf;

/// A source file and where it went (or would go, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A record that left the pipeline, and the stage it failed in.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub failed: FailedRecord,
}

impl StageFailure {
    pub fn new(stage: Stage, failed: FailedRecord) -> Self {
        Self { stage, failed }
    }
}

/// Pruning failed after the file itself was relocated.
///
/// The record stays completed; only the leftover directory is reported.
#[derive(Debug)]
pub struct CleanupFailure {
    pub source: PathBuf,
    pub cause: RecordError,
}

/// Byte-identical files seen during the run.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Hex-encoded content digest shared by every member
    pub digest: String,
    pub paths: Vec<PathBuf>,
}

/// Everything a run did.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files handed to the workers
    pub discovered: usize,
    /// Files copied or moved
    pub relocated: Vec<Relocation>,
    /// Dry run: intended relocations
    pub planned: Vec<Relocation>,
    /// Files already at their destination
    pub already_in_place: Vec<PathBuf>,
    pub failed: Vec<StageFailure>,
    pub cleanup_failures: Vec<CleanupFailure>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Source directories removed after moves
    pub pruned_directories: Vec<PathBuf>,
    /// The run was stopped before discovery finished
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            discovered: self.discovered,
            relocated: self.relocated.len(),
            already_in_place: self.already_in_place.len(),
            planned: self.planned.len(),
            failed: self.failed.len(),
            duplicate_groups: self.duplicate_groups.len(),
            directories_pruned: self.pruned_directories.len(),
            duration_ms: self.duration_ms,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
