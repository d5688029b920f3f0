//! # Scanner Module
//!
//! Discovers candidate files beneath a base directory.
//!
//! Discovery is lazy: [`WalkDirDiscovery::files`] returns an iterator that
//! walks the tree as it is consumed. Only the base directory check can fail;
//! unreadable entries met during the walk are logged and skipped, and a
//! filter that does not compile is logged and matches nothing.
//!
//! ## Example
//! ```rust,ignore
//! use photo_organiser::core::scanner::{FileFilter, WalkDirDiscovery};
//!
//! let filter = FileFilter::new(r"(?i)\.jpe?g$")?;
//! let discovery = WalkDirDiscovery::new("/photos/inbox", filter);
//! for record in discovery.files()? {
//!     println!("{}", record.source_path().display());
//! }
//! ```

mod filter;
mod walker;

pub use filter::{FileFilter, DEFAULT_FILENAME_FILTER};
pub use walker::WalkDirDiscovery;

use crate::core::record::FileRecord;
use crate::error::DiscoveryError;

/// A source of candidate files.
///
/// Implement this trait to feed the pipeline from somewhere other than a
/// directory walk (e.g., a fixed list in tests).
pub trait FileSource: Send + Sync {
    /// Start discovery. The returned iterator is finite and not restartable.
    fn files(&self) -> Result<Box<dyn Iterator<Item = FileRecord> + Send + '_>, DiscoveryError>;
}

/// A fixed list of paths, yielded in order.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    paths: Vec<std::path::PathBuf>,
}

impl StaticSource {
    pub fn new(paths: Vec<std::path::PathBuf>) -> Self {
        Self { paths }
    }
}

impl FileSource for StaticSource {
    fn files(&self) -> Result<Box<dyn Iterator<Item = FileRecord> + Send + '_>, DiscoveryError> {
        Ok(Box::new(self.paths.iter().cloned().map(FileRecord::new)))
    }
}
