//! Batch submission and progress handlers.

use super::ProcessRequest;
use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /process - Submit a batch
///
/// The batch is validated and admitted synchronously, then processed in the
/// background. Poll `GET /status` or subscribe to `GET /events` for progress.
#[utoipa::path(
    post,
    path = "/process",
    tag = "batch",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Batch admitted and started", body = crate::types::BatchAccepted),
        (status = 400, description = "Malformed submission", body = crate::error::ApiError),
        (status = 409, description = "Another batch is running; details carry its progress", body = crate::error::ApiError)
    )
)]
pub async fn process_batch(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected malformed batch body");
            return Error::Validation {
                item: None,
                message: rejection.body_text(),
            }
            .into_response();
        }
    };

    match state.orchestrator.submit(request.items).await {
        Ok(accepted) => (StatusCode::OK, Json(accepted)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Batch submission rejected");
            e.into_response()
        }
    }
}

/// GET /status - Current progress
#[utoipa::path(
    get,
    path = "/status",
    tag = "batch",
    responses(
        (status = 200, description = "Progress of the current or last batch", body = crate::types::ProgressSnapshot)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.orchestrator.progress().await)
}
