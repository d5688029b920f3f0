//! # Core Module
//!
//! The UI-agnostic organising engine.
//!
//! ## Modules
//! - `record` - The unit of work and its failure wrapper
//! - `scanner` - Discovers candidate files
//! - `loader` - Reads file bytes
//! - `fingerprint` - Content digests
//! - `metadata` - Extracts tags and reconciles the capture date
//! - `destination` - Maps a record to its place in the organised tree
//! - `relocate` - Collision-safe copy and move
//! - `cleanup` - Prunes emptied directories
//! - `pipeline` - Orchestrates the full workflow

pub mod cleanup;
pub mod destination;
pub mod fingerprint;
pub mod loader;
pub mod metadata;
pub mod pipeline;
pub mod record;
pub mod relocate;
pub mod scanner;

// Re-export commonly used types
pub use metadata::{DateFallback, ExifProvider, MetadataProvider, StaticTags};
pub use pipeline::{CancellationToken, Organiser, OrganiserConfig, RunReport};
pub use record::{FailedRecord, FileRecord, RecordOutcome};
pub use relocate::{OperationMode, RelocationAction};
pub use scanner::{FileSource, StaticSource, WalkDirDiscovery};
