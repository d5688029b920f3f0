//! # Error Module
//!
//! Error types for the photo organiser.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - every error names the path it concerns
//! - **Per-record isolation** - [`RecordError`] never aborts a run, it is
//!   attached to a [`FailedRecord`](crate::core::record::FailedRecord)
//! - **Fatal only at the edges** - discovery and configuration failures are
//!   the only errors that stop the whole run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganiserError {
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while discovering candidate files.
///
/// These are fatal for the run: no records exist yet, so there is nothing
/// to isolate the failure to.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Reported by the filter; a run logs it and discovers nothing.
    #[error("Invalid filename filter {pattern:?}: {reason}")]
    InvalidFilter { pattern: String, reason: String },
}

/// Failure of a single record in one pipeline stage.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata from {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("No capture date available for {path}")]
    MissingDate { path: PathBuf },

    #[error("Cannot derive a collision-free name from {path}: {reason}")]
    TargetResolution { path: PathBuf, reason: String },

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to relocate {from} to {to}: {source}")]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove empty directory {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RecordError {
    /// Short, stable name of the failure class, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::Read { .. } => "read",
            RecordError::Metadata { .. } => "metadata",
            RecordError::MissingDate { .. } => "missing-date",
            RecordError::TargetResolution { .. } => "target-resolution",
            RecordError::DirectoryCreation { .. } => "directory-creation",
            RecordError::Relocation { .. } => "relocation",
            RecordError::Cleanup { .. } => "cleanup",
        }
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganiserError>;
