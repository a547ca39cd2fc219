//! Submission validation

use crate::error::{Error, Result};
use crate::types::WorkItem;

/// Reject malformed submissions before anything is admitted
///
/// The batch must be non-empty, and every item needs at least one parseable
/// reference URL and at least one prompt, none of them blank. Item indexes in
/// errors are 1-based.
pub fn validate_items(items: &[WorkItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::Validation {
            item: None,
            message: "items must not be empty".into(),
        });
    }

    for (i, item) in items.iter().enumerate() {
        let index = i + 1;

        if item.image_urls.is_empty() {
            return Err(Error::invalid_item(index, "imageUrls is missing or empty"));
        }
        for raw in &item.image_urls {
            url::Url::parse(raw).map_err(|e| {
                Error::invalid_item(index, format!("invalid image URL '{}': {}", raw, e))
            })?;
        }

        if item.prompts.is_empty() {
            return Err(Error::invalid_item(index, "prompt is missing"));
        }
        if let Some(k) = item.prompts.iter().position(|p| p.trim().is_empty()) {
            return Err(Error::invalid_item(
                index,
                format!("prompt {} is empty", k + 1),
            ));
        }
    }

    Ok(())
}
