//! Batch pipeline: per-item processing, sequential orchestration and fan-out uploads
//!
//! - [`processor`] - fetch references, generate, resize, upload, delete-local for one item
//! - [`orchestrator`] - sequential driver over a batch with admission control and reporting
//! - [`fanout`] - concurrent all-settle upload of already produced files
//! - [`validation`] - submission checks run before any processing starts

pub mod fanout;
pub mod orchestrator;
pub mod processor;
pub mod validation;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use fanout::FanOutUploader;
pub use orchestrator::{BatchOrchestrator, ERROR_MARKER};
pub use processor::{ItemProcessor, ProcessItem};
pub use validation::validate_items;
