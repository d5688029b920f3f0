//! # Pipeline Module
//!
//! Orchestrates a full organiser run.
//!
//! ## Pipeline Stages
//! 1. **Discover** - Walk the base directory lazily (orchestrator thread)
//! 2. **Load** - Read file bytes
//! 3. **Fingerprint** - SHA-256 digest of the bytes
//! 4. **Enrich** - Extract tags and reconcile a capture date
//! 5. **Resolve** - Compute the date-based destination
//! 6. **Relocate** - Copy or move without overwriting (skipped in dry run)
//! 7. **Clean up** - Prune source directories emptied by a move
//!
//! ## Parallelism
//! Discovery feeds a bounded channel drained by a fixed rayon pool; results
//! come back over a second channel to the orchestrator thread, which is the
//! only writer of the [`RunReport`].

mod config;
mod executor;
mod report;

pub use config::{OrganiserConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
pub use executor::{CancellationToken, Organiser, OrganiserBuilder};
pub use report::{CleanupFailure, DuplicateGroup, Relocation, RunReport, StageFailure};
