//! # Relocate Module
//!
//! Commits a resolved record to the filesystem.
//!
//! For each record the engine:
//! 1. completes immediately if source and destination are the same file
//! 2. creates the destination directory and claims a collision-free name
//!    (`foo.jpg`, `foo(1).jpg`, `foo(2).jpg`, ...)
//! 3. copies or moves the file
//!
//! An existing file is never overwritten. On failure the source is left
//! where it was and nothing is left at the destination.

mod claims;

pub use claims::{next_candidate, DestinationClaims};

use crate::core::record::{FailedRecord, FileRecord};
use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Operation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Copy files to destination (keep originals)
    Copy,
    /// Move files to destination
    #[default]
    Move,
}

/// What the relocation engine did with a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelocationAction {
    Moved,
    Copied,
    /// Source and destination were already the same file.
    AlreadyInPlace,
}

/// Copies or moves records into place.
#[derive(Debug, Default)]
pub struct Relocator {
    operation: OperationMode,
    claims: DestinationClaims,
}

impl Relocator {
    pub fn new(operation: OperationMode) -> Self {
        Self {
            operation,
            claims: DestinationClaims::new(),
        }
    }

    pub fn operation(&self) -> OperationMode {
        self.operation
    }

    pub fn claims(&self) -> &DestinationClaims {
        &self.claims
    }

    /// Relocate one record to its `destination_path`.
    ///
    /// The returned record carries the final destination, which differs from
    /// the resolved one when a collision was avoided.
    pub fn relocate(
        &self,
        mut record: FileRecord,
    ) -> Result<(FileRecord, RelocationAction), FailedRecord> {
        if !record.has_destination() {
            let path = record.source_path().to_path_buf();
            return Err(record.fail(RecordError::TargetResolution {
                path,
                reason: "record has no destination".to_string(),
            }));
        }

        if same_file(record.source_path(), &record.destination_path) {
            tracing::debug!(path = %record.source_path().display(), "already in place");
            record.completed = true;
            return Ok((record, RelocationAction::AlreadyInPlace));
        }

        let destination = match self.claims.claim(&record.destination_path) {
            Ok(destination) => destination,
            Err(cause) => return Err(record.fail(cause)),
        };
        if destination != record.destination_path {
            tracing::info!(
                wanted = %record.destination_path.display(),
                chosen = %destination.display(),
                "destination exists, renamed to avoid overwrite"
            );
        }
        record.destination_path = destination;

        let result = match self.operation {
            OperationMode::Copy => copy_file(record.source_path(), &record.destination_path)
                .map(|_| RelocationAction::Copied),
            OperationMode::Move => move_file(record.source_path(), &record.destination_path)
                .map(|_| RelocationAction::Moved),
        };

        match result {
            Ok(action) => {
                record.completed = true;
                Ok((record, action))
            }
            Err(source) => {
                self.claims.release(&record.destination_path);
                let cause = RecordError::Relocation {
                    from: record.source_path().to_path_buf(),
                    to: record.destination_path.clone(),
                    source,
                };
                Err(record.fail(cause))
            }
        }
    }

    /// Prune directories emptied by moving `record` out, never going above
    /// `boundary`.
    pub fn prune_source_dirs(
        &self,
        record: &FileRecord,
        boundary: Option<&Path>,
    ) -> Result<Vec<PathBuf>, RecordError> {
        match record.source_path().parent() {
            Some(dir) => self.claims.prune_empty_ancestors(dir, boundary),
            None => Ok(Vec::new()),
        }
    }
}

/// Rename, falling back to copy + verify + delete across filesystems.
///
/// Any other rename error is returned as is. If the fallback fails at any
/// point the copy is removed, so the file only ever exists at one of the two
/// paths.
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if crosses_devices(&e) => {
            tracing::debug!(path = %source.display(), "rename crosses devices, copying instead");
            copy_file(source, destination)?;
            discard_on_error(destination, fs::remove_file(source))
        }
        Err(e) => Err(e),
    }
}

/// Copy and verify the size, removing the destination if either step fails.
fn copy_file(source: &Path, destination: &Path) -> io::Result<()> {
    let copied = fs::metadata(source).and_then(|metadata| {
        let source_size = metadata.len();
        fs::copy(source, destination)?;

        let dest_size = fs::metadata(destination)?.len();
        if dest_size != source_size {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "copy verification failed: source {} bytes, destination {} bytes",
                    source_size, dest_size
                ),
            ));
        }
        Ok(())
    });
    discard_on_error(destination, copied)
}

fn crosses_devices(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::CrossesDevices
}

/// Remove whatever was written at `destination` when `result` is an error.
fn discard_on_error<T>(destination: &Path, result: io::Result<T>) -> io::Result<T> {
    if result.is_err() && destination.exists() {
        if let Err(e) = fs::remove_file(destination) {
            tracing::warn!(path = %destination.display(), error = %e, "could not remove partial copy");
        }
    }
    result
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
