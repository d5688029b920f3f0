//! # photo-organise CLI
//!
//! Command-line interface for the photo organiser.
//!
//! ## Usage
//! ```bash
//! photo-organise ~/Inbox --storage-dir ~/Photos --dry-run
//! photo-organise ~/Inbox --copy --verbose --output json
//! ```

mod cli;

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::from(2)
        }
    }
}
