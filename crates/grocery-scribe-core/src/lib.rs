//! Grocery-scribe Core Library
//!
//! Turns a spoken kitchen conversation into a grocery list: continuous
//! streaming speech recognition feeds a transcript accumulator, and the
//! finished transcript is handed to a hosted language model that extracts
//! the items mentioned as needed.
//!
//! # Example
//!
//! ```no_run
//! use grocery_scribe_core::{
//!     extraction::{DirectConfig, DirectTransport, ItemExtractor},
//!     lifecycle::LifecycleController,
//!     recognize::{RealtimeBackend, RealtimeConfig, SpeechBackend},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let recognizer = RealtimeConfig::new("sk-...".into());
//! let extractor = ItemExtractor::new(Box::new(DirectTransport::new(
//!     DirectConfig::new("sk-...".into()),
//! )?));
//!
//! let mut controller = LifecycleController::new(
//!     Box::new(move || {
//!         Box::new(RealtimeBackend::new(recognizer.clone())) as Box<dyn SpeechBackend>
//!     }),
//!     extractor,
//! );
//!
//! controller.start(Some("+919876543210")).await;
//! // ... session events pumped by the caller ...
//! controller.stop().await;
//! # Ok(())
//! # }
//! ```

mod audio;
mod error;
pub mod extraction;
pub mod lifecycle;
pub mod recognize;
mod transcript;

pub use {
    error::{CaptureError, CaptureResult, ExtractError, ExtractResult},
    transcript::TranscriptBuffer,
};

#[cfg(test)]
mod tests;
