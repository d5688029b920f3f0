//! # Events Module
//!
//! Progress reporting decoupled from presentation.
//!
//! The pipeline emits [`Event`]s through a channel; any front end can
//! subscribe and render them. Sending never blocks the pipeline on a
//! missing listener.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Record(RecordEvent::Relocated { source, destination }) = event {
//!             println!("{} -> {}", source.display(), destination.display());
//!         }
//!     }
//! });
//!
//! organiser.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
