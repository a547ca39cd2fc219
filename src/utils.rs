//! Utility functions for local file handling and log formatting

use std::path::Path;

/// Remove a local file, returning whether it was actually deleted
///
/// A missing file or a failed removal is logged and reported as `false`;
/// neither is an error for the caller.
pub async fn delete_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "local file deleted");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "file not found for deletion");
            false
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to delete file");
            false
        }
    }
}

/// MIME type for an image file, based on its extension (default: image/png)
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "image/png",
    }
}

/// First `max_chars` characters of a prompt, with an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
