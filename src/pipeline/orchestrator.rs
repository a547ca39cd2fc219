//! Sequential batch driver.
//!
//! A [`BatchOrchestrator`] owns its progress tracker and an admission lock. Only
//! one batch runs per orchestrator at a time; a second submission gets
//! [`Error::BatchInProgress`] with a snapshot of the running batch.
//!
//! Items are processed strictly in submission order, one at a time, so sink
//! writes always arrive in the order the items were submitted.

use super::processor::{ItemProcessor, ProcessItem};
use super::validation::validate_items;
use crate::config::{Config, RetryPolicy};
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::retry::{RetryAttempt, retry_with_notify};
use crate::services::{ReportSink, Services};
use crate::types::{
    BatchAccepted, BatchReport, BatchSummary, Event, ProgressSnapshot, WorkItem,
};
use crate::utils;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, broadcast};

/// First value of the row written to the sink when an item fails
pub const ERROR_MARKER: &str = "ERROR";

/// Drives batches of work items through the pipeline (cheap to clone, shared state is Arc-wrapped)
#[derive(Clone)]
pub struct BatchOrchestrator {
    processor: Arc<dyn ProcessItem>,
    sink: Arc<dyn ReportSink>,
    report_policy: RetryPolicy,
    progress: Arc<RwLock<ProgressTracker>>,
    admission: Arc<Mutex<()>>,
    running: Arc<AtomicBool>,
    event_tx: broadcast::Sender<Event>,
}

impl BatchOrchestrator {
    /// Create an orchestrator around an item processor and a sink
    pub fn new(
        processor: Arc<dyn ProcessItem>,
        sink: Arc<dyn ReportSink>,
        report_policy: RetryPolicy,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            processor,
            sink,
            report_policy,
            progress: Arc::new(RwLock::new(ProgressTracker::new())),
            admission: Arc::new(Mutex::new(())),
            running: Arc::new(AtomicBool::new(false)),
            event_tx,
        }
    }

    /// Build the production pipeline from config and collaborators
    pub fn from_config(config: &Config, services: Services) -> Result<Self> {
        config.validate()?;
        let processor = ItemProcessor::new(config.output.clone(), &services);
        Ok(Self::new(
            Arc::new(processor),
            services.sink,
            config.retry.report.clone(),
        ))
    }

    /// Subscribe to batch lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Sender side of the event channel, for components that publish alongside the orchestrator
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    /// Current progress counters
    pub async fn progress(&self) -> ProgressSnapshot {
        self.progress.read().await.snapshot()
    }

    /// Whether a batch is currently admitted
    ///
    /// Reads a flag maintained by the admission guard, so polling never
    /// contends with a submission for the lock.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run a batch to completion and return its report
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<BatchReport> {
        let _guard = self.admit(&items).await?;
        Ok(self.drive(&items).await)
    }

    /// Admit a batch and process it in the background
    ///
    /// Returns as soon as the batch is admitted. A panic in the driver is
    /// contained here: the tracker is finalized and a `BatchAborted` event is
    /// emitted, nothing reaches the caller.
    pub async fn submit(&self, items: Vec<WorkItem>) -> Result<BatchAccepted> {
        let guard = self.admit(&items).await?;
        let accepted = BatchAccepted::new(items.len());

        tracing::info!(items = items.len(), "batch accepted");

        let this = self.clone();
        tokio::spawn(async move {
            let progress = this.progress.clone();
            let event_tx = this.event_tx.clone();

            let driver = tokio::spawn(async move { this.drive(&items).await });
            if let Err(e) = driver.await {
                tracing::error!(error = %e, "batch driver aborted");
                progress.write().await.finalize();
                event_tx
                    .send(Event::BatchAborted {
                        error: e.to_string(),
                    })
                    .ok();
            }

            drop(guard);
        });

        Ok(accepted)
    }

    /// Take the admission lock, validate and reset the tracker
    async fn admit(&self, items: &[WorkItem]) -> Result<Admission> {
        let guard = match self.admission.clone().try_lock_owned() {
            Ok(guard) => Admission::new(guard, self.running.clone()),
            Err(_) => {
                let snapshot = self.progress().await;
                tracing::warn!(
                    processed = snapshot.processed,
                    failed = snapshot.failed,
                    total = snapshot.total,
                    "batch rejected, another batch is running"
                );
                return Err(Error::BatchInProgress(Box::new(snapshot)));
            }
        };

        validate_items(items)?;

        self.progress.write().await.reset(items.len());
        self.event_tx
            .send(Event::BatchStarted { total: items.len() })
            .ok();
        tracing::info!(total = items.len(), "batch started");

        Ok(guard)
    }

    /// Walk the items in order; the caller holds the admission guard
    async fn drive(&self, items: &[WorkItem]) -> BatchReport {
        let total = items.len();
        let mut deleted = 0;
        let mut unreported = 0;

        for (i, item) in items.iter().enumerate() {
            let index = i + 1;
            self.progress.write().await.begin_item(index);
            self.event_tx
                .send(Event::ItemStarted { index, total })
                .ok();

            tracing::info!(
                item = index,
                total,
                prompts = item.prompts.len(),
                images = item.image_urls.len(),
                prompt = %item.prompts.first().map(|p| utils::preview(p, 50)).unwrap_or_default(),
                "processing item"
            );

            match self.processor.process(item, index).await {
                Err(e) => {
                    tracing::error!(item = index, error = %e, "item failed");

                    if let Some(row) = item.row {
                        let payload = failure_payload(&e);
                        if !self.report(row, &payload).await {
                            unreported += 1;
                        }
                    }

                    self.progress.write().await.record_failure();
                    self.event_tx
                        .send(Event::ItemFailed {
                            index,
                            error: e.to_string(),
                        })
                        .ok();
                }
                Ok(outcome) => {
                    deleted += outcome.deleted();
                    let urls = outcome.urls();

                    if urls.is_empty() {
                        tracing::warn!(
                            item = index,
                            generated = outcome.generated,
                            "item produced no uploaded images"
                        );
                        self.progress.write().await.record_failure();
                        self.event_tx
                            .send(Event::ItemFailed {
                                index,
                                error: "no images produced".to_string(),
                            })
                            .ok();
                        continue;
                    }

                    if let Some(row) = item.row
                        && !self.report(row, &urls).await
                    {
                        unreported += 1;
                    }

                    self.progress.write().await.record_success();
                    self.event_tx
                        .send(Event::ItemCompleted { index, urls })
                        .ok();
                }
            }

            let snapshot = self.progress().await;
            tracing::info!(
                processed = snapshot.processed,
                failed = snapshot.failed,
                remaining = snapshot.remaining,
                "progress"
            );
        }

        let (snapshot, elapsed) = {
            let mut progress = self.progress.write().await;
            progress.finalize();
            (progress.snapshot(), progress.elapsed())
        };

        let report = BatchReport {
            summary: BatchSummary {
                total: snapshot.total,
                successful: snapshot.processed,
                failed: snapshot.failed,
                deleted,
            },
            unreported,
            elapsed_ms: elapsed.as_millis() as u64,
        };

        tracing::info!(
            total = report.summary.total,
            successful = report.summary.successful,
            failed = report.summary.failed,
            deleted = report.summary.deleted,
            unreported = report.unreported,
            elapsed_secs = elapsed.as_secs_f64(),
            "batch finished"
        );
        self.event_tx.send(Event::BatchCompleted { report }).ok();

        report
    }

    /// Write one row with the report policy; `false` once retries are exhausted
    async fn report(&self, row: u32, values: &[String]) -> bool {
        let result = retry_with_notify(
            &self.report_policy,
            move || self.sink.write_row(row, values),
            |retry: RetryAttempt<'_, Error>| {
                tracing::warn!(
                    row,
                    attempt = retry.attempt,
                    max_attempts = retry.max_attempts,
                    delay_ms = retry.delay.as_millis() as u64,
                    error = %retry.error,
                    "sink write failed, retrying"
                );
            },
        )
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    row,
                    attempts = self.report_policy.max_retries,
                    error = %e,
                    "sink write failed after all attempts"
                );
                self.event_tx
                    .send(Event::ReportFailed {
                        row,
                        error: e.to_string(),
                    })
                    .ok();
                false
            }
        }
    }
}

/// Row written for a failed item: marker, timestamp, message
fn failure_payload(error: &Error) -> Vec<String> {
    vec![
        ERROR_MARKER.to_string(),
        chrono::Utc::now().to_rfc3339(),
        error.to_string(),
    ]
}

/// Admission lock held for the lifetime of a batch; clears the running flag on drop
struct Admission {
    _guard: OwnedMutexGuard<()>,
    running: Arc<AtomicBool>,
}

impl Admission {
    fn new(guard: OwnedMutexGuard<()>, running: Arc<AtomicBool>) -> Self {
        running.store(true, Ordering::SeqCst);
        Self {
            _guard: guard,
            running,
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
