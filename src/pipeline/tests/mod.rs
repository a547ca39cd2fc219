use super::test_helpers::*;
use super::*;
use crate::services::Dimensions;
use crate::types::{Event, LocalFile, WorkItem};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;


fn item(prompt: &str) -> WorkItem {
    WorkItem::new(vec!["https://example.com/ref-1.jpg".into()], prompt)
}
