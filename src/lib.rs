//! # Photo Organiser
//!
//! Files photos into a `YYYY/MM/` tree by the date they were taken.
//!
//! ## Core Philosophy
//! - **Never overwrite** - a colliding name gets a `(N)` suffix instead
//! - **Isolate failures** - one unreadable or undated file never stops the run
//! - **Plan first** - a dry run reports every relocation without touching disk
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Discovery, the per-file stages and the orchestrator
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganiserError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG`
/// overrides the default `warn` level.
pub fn init_tracing() {
    init_tracing_with_default("warn");
}

/// Initialize tracing, using `default_level` when `RUST_LOG` is unset.
///
/// Logs go to stderr so that machine-readable output on stdout stays clean.
/// Calling this more than once is harmless.
pub fn init_tracing_with_default(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
