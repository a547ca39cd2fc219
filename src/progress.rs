//! Progress counters for one in-flight batch
//!
//! [`ProgressTracker`] is a plain value with no internal locking. The
//! orchestrator that owns it is responsible for admitting one batch at a time;
//! readers only ever see [`ProgressSnapshot`] copies.

use crate::types::ProgressSnapshot;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Counters describing the current (or last) batch
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    is_processing: bool,
    total: usize,
    processed: usize,
    remaining: usize,
    failed: usize,
    current_item: Option<usize>,
    started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
}

impl ProgressTracker {
    /// Create an idle tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new batch of `total` items
    pub fn reset(&mut self, total: usize) {
        self.is_processing = true;
        self.total = total;
        self.processed = 0;
        self.remaining = total;
        self.failed = 0;
        self.current_item = None;
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
    }

    /// Mark the item at 1-based `index` as the one being processed
    pub fn begin_item(&mut self, index: usize) {
        self.current_item = Some(index);
    }

    /// Count the current item as processed
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Count the current item as failed
    pub fn record_failure(&mut self) {
        self.failed += 1;
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// End the batch; counters stay as the last summary
    pub fn finalize(&mut self) {
        self.is_processing = false;
        self.current_item = None;
    }

    /// Whether a batch is running
    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Time since the last `reset`
    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> ProgressSnapshot {
        let handled = self.processed + self.failed;
        let percentage = if self.total == 0 {
            0
        } else {
            ((handled as f64 / self.total as f64) * 100.0).round() as u8
        };

        ProgressSnapshot {
            is_processing: self.is_processing,
            total: self.total,
            processed: self.processed,
            remaining: self.remaining,
            failed: self.failed,
            current_item: self.current_item,
            started_at: self.started_at,
            percentage,
        }
    }
}
