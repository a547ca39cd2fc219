//! Core types and events for genbatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// One unit of batch work: reference images, prompt(s) and an optional sink row
///
/// On the wire the prompt field is `prompt` and accepts either a single string
/// or an array of strings:
///
/// ```json
/// { "imageUrls": ["https://cdn.example.com/a.jpg"], "prompt": "studio shot", "row": 12 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkItem {
    /// Reference image URLs, in the order they are passed to the generator
    #[serde(rename = "imageUrls", alias = "image_urls", default)]
    pub image_urls: Vec<String>,

    /// Prompts to run against the reference images (one generation call each)
    #[serde(
        rename = "prompt",
        alias = "prompts",
        default,
        deserialize_with = "one_or_many"
    )]
    #[schema(value_type = Vec<String>)]
    pub prompts: Vec<String>,

    /// Row in the reporting sink that receives this item's results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
}

impl WorkItem {
    /// Create a work item with a single prompt and no sink row
    pub fn new(image_urls: Vec<String>, prompt: impl Into<String>) -> Self {
        Self {
            image_urls,
            prompts: vec![prompt.into()],
            row: None,
        }
    }

    /// Attach a sink row to this item
    pub fn with_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(prompt)) => vec![prompt],
        Some(OneOrMany::Many(prompts)) => prompts,
        None => Vec::new(),
    })
}

/// Point-in-time view of the progress tracker
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProgressSnapshot {
    /// Whether a batch is currently running
    pub is_processing: bool,
    /// Number of items in the current (or last) batch
    pub total: usize,
    /// Items that produced at least one URL
    pub processed: usize,
    /// Items not yet handled
    pub remaining: usize,
    /// Items that errored or produced nothing
    pub failed: usize,
    /// 1-based index of the item being processed
    pub current_item: Option<usize>,
    /// When the batch started
    pub started_at: Option<DateTime<Utc>>,
    /// Share of handled items (processed + failed), 0-100
    pub percentage: u8,
}

/// Outcome of uploading one local file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadResult {
    /// Whether the upload succeeded
    pub success: bool,
    /// File name, also the last segment of the storage key
    pub file_name: String,
    /// Local path of the file
    #[schema(value_type = String)]
    pub file_path: PathBuf,
    /// Public URL returned by storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Final error message if the upload failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the local copy was removed
    pub deleted: bool,
}

impl UploadResult {
    /// Result for a successful upload
    pub fn uploaded(file: &LocalFile, url: String, deleted: bool) -> Self {
        Self {
            success: true,
            file_name: file.file_name.clone(),
            file_path: file.file_path.clone(),
            url: Some(url),
            error: None,
            deleted,
        }
    }

    /// Result for a failed upload; the local file is left in place
    pub fn failed(file: &LocalFile, error: impl Into<String>) -> Self {
        Self {
            success: false,
            file_name: file.file_name.clone(),
            file_path: file.file_path.clone(),
            url: None,
            error: Some(error.into()),
            deleted: false,
        }
    }
}

/// A file on local disk waiting to be shipped to storage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocalFile {
    /// File name used for the storage key
    pub file_name: String,
    /// Path to read the payload from
    #[schema(value_type = String)]
    pub file_path: PathBuf,
}

impl LocalFile {
    /// Build from a path, using its final component as the file name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let file_path = path.into();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            file_path,
        }
    }
}

/// Aggregate counters for a batch or a fan-out upload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    /// Number of units submitted
    pub total: usize,
    /// Units that succeeded
    pub successful: usize,
    /// Units that failed
    pub failed: usize,
    /// Local files removed after upload
    ///
    /// In a [`BatchReport`] only items that completed are counted. An item
    /// that fails after some of its images were uploaded has already removed
    /// those files, but they do not appear here.
    pub deleted: usize,
}

/// Final result of an orchestrated batch
///
/// `summary.deleted` covers completed items only, see [`BatchSummary::deleted`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchReport {
    /// Item counters
    pub summary: BatchSummary,
    /// Sink writes that exhausted their retries
    pub unreported: usize,
    /// Wall-clock duration of the batch in milliseconds
    pub elapsed_ms: u64,
}

/// Result of a fan-out upload
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FanOutReport {
    /// Aggregate counters
    pub summary: BatchSummary,
    /// Per-file results, in input order
    pub results: Vec<UploadResult>,
}

/// What one work item produced
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Number of prompts run
    pub prompts: usize,
    /// Images returned by the generator across all prompts
    pub generated: usize,
    /// Upload result for every generated image
    pub uploads: Vec<UploadResult>,
    /// Text parts returned alongside images
    pub text: Vec<String>,
}

impl ItemOutcome {
    /// URLs of successful uploads, in generation order
    pub fn urls(&self) -> Vec<String> {
        self.uploads.iter().filter_map(|u| u.url.clone()).collect()
    }

    /// Number of local files deleted after upload
    pub fn deleted(&self) -> usize {
        self.uploads.iter().filter(|u| u.deleted).count()
    }
}

/// Acknowledgement returned when a batch is accepted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchAccepted {
    /// Always "started"
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Number of items queued
    pub items_count: usize,
}

impl BatchAccepted {
    pub(crate) fn new(items_count: usize) -> Self {
        Self {
            status: "started".to_string(),
            message: "Processing started".to_string(),
            items_count,
        }
    }
}

/// Event emitted during the batch lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Batch admitted and started
    BatchStarted {
        /// Number of items in the batch
        total: usize,
    },

    /// Item processing started
    ItemStarted {
        /// 1-based item index
        index: usize,
        /// Number of items in the batch
        total: usize,
    },

    /// Item produced at least one URL
    ItemCompleted {
        /// 1-based item index
        index: usize,
        /// Uploaded URLs
        urls: Vec<String>,
    },

    /// Item errored or produced nothing
    ItemFailed {
        /// 1-based item index
        index: usize,
        /// Error message
        error: String,
    },

    /// A sink write exhausted its retries
    ReportFailed {
        /// Sink row
        row: u32,
        /// Final error message
        error: String,
    },

    /// A fan-out upload attempt failed and will be retried
    UploadRetrying {
        /// File being uploaded
        file_name: String,
        /// Attempt that failed (1-based)
        attempt: u32,
        /// Maximum attempts
        max_attempts: u32,
        /// Delay before the next attempt in milliseconds
        delay_ms: u64,
        /// Error message
        error: String,
    },

    /// Batch finished
    BatchCompleted {
        /// Final report
        report: BatchReport,
    },

    /// Batch driver failed unexpectedly
    BatchAborted {
        /// Error message
        error: String,
    },
}

impl Event {
    /// Stable name used for SSE event types
    pub fn name(&self) -> &'static str {
        match self {
            Event::BatchStarted { .. } => "batch_started",
            Event::ItemStarted { .. } => "item_started",
            Event::ItemCompleted { .. } => "item_completed",
            Event::ItemFailed { .. } => "item_failed",
            Event::ReportFailed { .. } => "report_failed",
            Event::UploadRetrying { .. } => "upload_retrying",
            Event::BatchCompleted { .. } => "batch_completed",
            Event::BatchAborted { .. } => "batch_aborted",
        }
    }
}
