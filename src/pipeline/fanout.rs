//! Concurrent upload of already produced files.
//!
//! Every file gets its own retry loop; all uploads start together and the call
//! returns only after each one has either succeeded or exhausted its retries.
//! One file failing never cancels its siblings.

use crate::config::{Config, OutputConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::retry::{RetryAttempt, retry_with_notify};
use crate::services::ObjectStorage;
use crate::types::{BatchSummary, Event, FanOutReport, LocalFile, UploadResult};
use crate::utils;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Uploads a set of local files in parallel with per-file retry
pub struct FanOutUploader {
    storage: Arc<dyn ObjectStorage>,
    policy: RetryPolicy,
    output: OutputConfig,
    auto_delete: bool,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl FanOutUploader {
    /// Create an uploader; local copies are deleted after successful uploads by default
    pub fn new(storage: Arc<dyn ObjectStorage>, policy: RetryPolicy, output: OutputConfig) -> Self {
        Self {
            storage,
            policy,
            output,
            auto_delete: true,
            event_tx: None,
        }
    }

    /// Uploader with the configured upload policy and key layout
    pub fn from_config(config: &Config, storage: Arc<dyn ObjectStorage>) -> Self {
        Self::new(storage, config.retry.upload.clone(), config.output.clone())
    }

    /// Whether to delete each file's local copy after it uploads
    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    /// Publish `UploadRetrying` events on this channel
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Upload every file and wait for all of them to settle
    pub async fn upload_all(&self, files: &[LocalFile]) -> FanOutReport {
        let total = files.len();
        tracing::info!(files = total, "starting fan-out upload");

        let uploads = files
            .iter()
            .enumerate()
            .map(|(i, file)| self.upload_one(i + 1, total, file));
        let results = join_all(uploads).await;

        let summary = BatchSummary {
            total,
            successful: results.iter().filter(|r| r.success).count(),
            failed: results.iter().filter(|r| !r.success).count(),
            deleted: results.iter().filter(|r| r.deleted).count(),
        };

        tracing::info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            deleted = summary.deleted,
            "fan-out upload finished"
        );

        FanOutReport { summary, results }
    }

    async fn upload_one(&self, position: usize, total: usize, file: &LocalFile) -> UploadResult {
        tracing::info!(file = %file.file_name, position, total, "uploading file");

        let key = self.output.storage_key(&file.file_name);
        let key = key.as_str();
        let content_type = utils::content_type_for(&file.file_path);

        let result = retry_with_notify(
            &self.policy,
            move || self.attempt(file, key, content_type),
            |retry: RetryAttempt<'_, Error>| {
                tracing::warn!(
                    file = %file.file_name,
                    attempt = retry.attempt,
                    max_attempts = retry.max_attempts,
                    delay_ms = retry.delay.as_millis() as u64,
                    error = %retry.error,
                    "upload attempt failed, retrying"
                );
                if let Some(tx) = &self.event_tx {
                    tx.send(Event::UploadRetrying {
                        file_name: file.file_name.clone(),
                        attempt: retry.attempt,
                        max_attempts: retry.max_attempts,
                        delay_ms: retry.delay.as_millis() as u64,
                        error: retry.error.to_string(),
                    })
                    .ok();
                }
            },
        )
        .await;

        match result {
            Ok(url) => {
                tracing::info!(file = %file.file_name, url = %url, "file uploaded");
                let deleted = if self.auto_delete {
                    utils::delete_file(&file.file_path).await
                } else {
                    false
                };
                UploadResult::uploaded(file, url, deleted)
            }
            Err(e) => {
                tracing::error!(
                    file = %file.file_name,
                    attempts = self.policy.max_retries,
                    error = %e,
                    "file upload failed after all attempts"
                );
                UploadResult::failed(file, e.to_string())
            }
        }
    }

    async fn attempt(&self, file: &LocalFile, key: &str, content_type: &str) -> Result<String> {
        let data = tokio::fs::read(&file.file_path).await?;
        self.storage.upload(data, content_type, key).await
    }
}
