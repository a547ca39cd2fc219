//! # genbatch
//!
//! Batch driver for generative-image jobs.
//!
//! A batch is a list of work items, each carrying reference image URLs and one
//! or more prompts. Items run strictly one after another: references are
//! fetched, every prompt is sent to the image generator, each returned image is
//! resized to the canonical dimensions, uploaded to object storage and removed
//! locally. The resulting URLs (or an error row) go to a report sink at the
//! item's row.
//!
//! - **Single admission** - one batch per orchestrator; a second submission is
//!   rejected with a snapshot of the running one
//! - **Retry everywhere it matters** - uploads and sink writes share one retry
//!   executor with exponential or linear policies
//! - **Event-driven** - consumers subscribe to lifecycle events instead of polling
//! - **Pluggable collaborators** - generator, resizer and storage are traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use genbatch::{BatchOrchestrator, Config, Services, WorkItem};
//!
//! # async fn example(services: Services) -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = BatchOrchestrator::from_config(&Config::default(), services)?;
//!
//! let mut events = orchestrator.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let items = vec![
//!     WorkItem::new(vec!["https://example.com/ref.jpg".into()], "studio shot").with_row(2),
//! ];
//! let report = orchestrator.run(items).await?;
//! println!("{} of {} items succeeded", report.summary.successful, report.summary.total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Batch processing pipeline
pub mod pipeline;
/// Batch progress tracking
pub mod progress;
/// Retry logic with exponential and linear backoff
pub mod retry;
/// External collaborators and their HTTP implementations
pub mod services;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Backoff, Config, OutputConfig, RetryPolicy};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use pipeline::{
    BatchOrchestrator, ERROR_MARKER, FanOutUploader, ItemProcessor, ProcessItem, validate_items,
};
pub use progress::ProgressTracker;
pub use retry::{retry_with_backoff, retry_with_notify};
pub use services::{
    Dimensions, ImageGenerator, ImageResizer, ObjectStorage, ReferenceFetcher, ReportSink,
    Services,
};
pub use types::{
    BatchAccepted, BatchReport, BatchSummary, Event, FanOutReport, LocalFile, ProgressSnapshot,
    UploadResult, WorkItem,
};

/// Serve the REST API until a termination signal arrives.
///
/// On SIGTERM/SIGINT (Ctrl+C elsewhere) the server stops accepting connections
/// and drains in-flight requests. A batch already running in the background
/// is not awaited.
///
/// # Example
///
/// ```no_run
/// use genbatch::{BatchOrchestrator, Config, Services, serve_with_shutdown};
/// use std::sync::Arc;
///
/// # async fn example(services: Services) -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let orchestrator = Arc::new(BatchOrchestrator::from_config(&config, services)?);
///
/// serve_with_shutdown(orchestrator, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve_with_shutdown(
    orchestrator: std::sync::Arc<BatchOrchestrator>,
    config: std::sync::Arc<Config>,
) -> Result<()> {
    let running = orchestrator.clone();
    api::start_api_server_with_shutdown(orchestrator, config, async move {
        wait_for_signal().await;
        if running.is_running() {
            let progress = running.progress().await;
            tracing::warn!(
                processed = progress.processed,
                failed = progress.failed,
                remaining = progress.remaining,
                "shutting down with a batch still running"
            );
        }
    })
    .await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in restricted environments
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
