//! Application state for the API server

use crate::BatchOrchestrator;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// Orchestrator that owns admission and progress for this server
    pub orchestrator: Arc<BatchOrchestrator>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(orchestrator: Arc<BatchOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
