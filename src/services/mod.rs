//! External collaborators consumed by the pipeline
//!
//! The batch engine never talks to a vendor SDK directly. Each external call
//! sits behind a trait so hosts can plug in their own generation, resizing and
//! storage backends:
//!
//! - [`ReferenceFetcher`]: download reference images ([`HttpReferenceFetcher`])
//! - [`ImageGenerator`]: the generative-image service
//! - [`ImageResizer`]: dimension probing and fit-to-box scaling
//! - [`ObjectStorage`]: durable object storage returning public URLs
//! - [`ReportSink`]: the spreadsheet sink ([`HttpReportSink`])

mod http;
mod traits;

pub use http::{HttpReferenceFetcher, HttpReportSink};
pub use traits::{
    Dimensions, GenerationRequest, GenerationResponse, ImageGenerator, ImageResizer,
    ObjectStorage, ReferenceFetcher, ReferenceImage, ReportSink,
};

use std::sync::Arc;

/// The full set of collaborators an [`ItemProcessor`](crate::pipeline::ItemProcessor)
/// and [`BatchOrchestrator`](crate::pipeline::BatchOrchestrator) need
#[derive(Clone)]
pub struct Services {
    /// Reference image downloader
    pub fetcher: Arc<dyn ReferenceFetcher>,
    /// Generative-image service
    pub generator: Arc<dyn ImageGenerator>,
    /// Image resizer
    pub resizer: Arc<dyn ImageResizer>,
    /// Object storage
    pub storage: Arc<dyn ObjectStorage>,
    /// Reporting sink
    pub sink: Arc<dyn ReportSink>,
}
