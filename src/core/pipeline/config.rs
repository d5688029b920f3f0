//! Run configuration.

use crate::core::metadata::DateFallback;
use crate::core::relocate::OperationMode;
use crate::core::scanner::{FileFilter, DEFAULT_FILENAME_FILTER};
use crate::error::{OrganiserError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 3;

/// Default capacity of the bounded work queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Configuration for one organiser run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganiserConfig {
    /// Directory to discover files under
    pub base_dir: PathBuf,
    /// Root of the organised tree (defaults to `base_dir`)
    pub storage_dir: Option<PathBuf>,
    /// Regex matched against file names
    pub filename_filter: String,
    /// Copy or move
    pub operation: OperationMode,
    /// Plan only, touch nothing
    pub dry_run: bool,
    /// Worker threads
    pub workers: usize,
    /// Records buffered between discovery and the workers
    pub queue_capacity: usize,
    /// Behaviour when a file carries no usable date
    pub date_fallback: DateFallback,
    /// Remove source directories emptied by a move
    pub prune_empty_dirs: bool,
    /// Descend into hidden directories and accept hidden files
    pub include_hidden: bool,
    /// Walk into symlinked directories and pick up symlinked files
    pub follow_symlinks: bool,
}

impl Default for OrganiserConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            storage_dir: None,
            filename_filter: DEFAULT_FILENAME_FILTER.to_string(),
            operation: OperationMode::default(),
            dry_run: false,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            date_fallback: DateFallback::default(),
            prune_empty_dirs: true,
            include_hidden: false,
            follow_symlinks: false,
        }
    }
}

impl OrganiserConfig {
    /// Root under which destinations are resolved.
    pub fn storage_root(&self) -> &Path {
        self.storage_dir.as_deref().unwrap_or(&self.base_dir)
    }

    /// Check the configuration and compile the file filter.
    ///
    /// A filter that is not a valid regex is not an error: it is logged and
    /// discovery finds nothing.
    pub fn validate(&self) -> Result<FileFilter> {
        if self.workers == 0 {
            return Err(OrganiserError::Config(
                "at least one worker is required".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(OrganiserError::Config(
                "queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(FileFilter::new_or_empty(&self.filename_filter).with_hidden(self.include_hidden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = OrganiserConfig::default();
        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.operation, OperationMode::Move);
        assert_eq!(config.date_fallback, DateFallback::None);
        assert!(config.prune_empty_dirs);
        assert!(!config.dry_run);
        assert!(!config.follow_symlinks);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn storage_root_defaults_to_base_dir() {
        let mut config = OrganiserConfig {
            base_dir: PathBuf::from("/photos/inbox"),
            ..Default::default()
        };
        assert_eq!(config.storage_root(), Path::new("/photos/inbox"));

        config.storage_dir = Some(PathBuf::from("/photos/library"));
        assert_eq!(config.storage_root(), Path::new("/photos/library"));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = OrganiserConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(OrganiserError::Config(_))));
    }

    #[test]
    fn invalid_filter_matches_nothing() {
        let config = OrganiserConfig {
            filename_filter: "(unclosed".to_string(),
            ..Default::default()
        };
        let filter = config.validate().unwrap();
        assert!(!filter.should_include(Path::new("IMG_4228.JPG")));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: OrganiserConfig =
            serde_json::from_str(r#"{"base_dir": "/photos", "dry_run": true}"#).unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/photos"));
        assert!(config.dry_run);
        assert_eq!(config.workers, DEFAULT_WORKERS);
    }
}
