//! Traits and types for external collaborators

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// A reference image ready to be sent to the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// MIME type reported by the origin (e.g. "image/jpeg")
    pub mime_type: String,
}

/// One generation call: a prompt plus its ordered reference images
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    /// Prompt text
    pub prompt: &'a str,
    /// Reference images, in submission order
    pub references: &'a [ReferenceImage],
}

/// What the generator returned
#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    /// Image payloads (PNG), possibly empty
    pub images: Vec<Vec<u8>>,
    /// Accompanying text parts
    pub text: Vec<String>,
}

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimension pair
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Downloads reference images
#[async_trait]
pub trait ReferenceFetcher: Send + Sync {
    /// Fetch one image by URL
    async fn fetch(&self, url: &str) -> Result<ReferenceImage>;
}

/// The generative-image service
///
/// An `Err` means the call itself failed. A successful response with no
/// images is a valid (degenerate) result and must not be turned into an error.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Run one prompt against the reference images
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<GenerationResponse>;
}

/// Image dimension probing and fit-to-box scaling
#[async_trait]
pub trait ImageResizer: Send + Sync {
    /// Current dimensions of the image at `path`
    async fn dimensions(&self, path: &Path) -> Result<Dimensions>;

    /// Scale the image at `path` in place to `target`, returning the dimensions produced
    async fn resize(&self, path: &Path, target: Dimensions) -> Result<Dimensions>;
}

/// Durable object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `key` and return its public URL
    async fn upload(&self, data: Vec<u8>, content_type: &str, key: &str) -> Result<String>;
}

/// The external reporting sink (one row per work item)
///
/// Writes carry no idempotency guarantee: a retried write may duplicate data.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Write `values` into `row`
    async fn write_row(&self, row: u32, values: &[String]) -> Result<()>;
}
