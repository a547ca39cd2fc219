//! Route handlers for the REST API
//!
//! - [`batch`] - Batch submission and progress
//! - [`system`] - Health, events, OpenAPI

use crate::types::WorkItem;
use serde::{Deserialize, Serialize};

mod batch;
mod system;

pub use batch::*;
pub use system::*;

/// Request body for POST /process
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ProcessRequest {
    /// Work items, processed in this order
    #[serde(default)]
    pub items: Vec<WorkItem>,
}
