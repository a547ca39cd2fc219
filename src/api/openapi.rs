//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the batch REST API
///
/// Served at `/openapi.json`, and at `/api-docs/openapi.json` for Swagger UI
/// when it is enabled.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "genbatch REST API",
        version = "0.1.0",
        description = "Submit generative-image batches and follow their progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        crate::api::routes::process_batch,
        crate::api::routes::get_status,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::WorkItem,
        crate::types::BatchAccepted,
        crate::types::ProgressSnapshot,
        crate::types::BatchSummary,
        crate::types::BatchReport,
        crate::types::Event,
        crate::api::routes::ProcessRequest,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "batch", description = "Batch submission and progress"),
        (name = "system", description = "Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
