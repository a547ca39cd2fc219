//! HTTP implementations of the reference fetcher and reporting sink

use super::traits::{ReferenceFetcher, ReferenceImage, ReportSink};
use crate::config::SinkConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Fetches reference images over plain HTTP(S)
#[derive(Clone, Debug, Default)]
pub struct HttpReferenceFetcher {
    client: reqwest::Client,
}

impl HttpReferenceFetcher {
    /// Create a fetcher with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher reusing an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReferenceFetcher for HttpReferenceFetcher {
    async fn fetch(&self, url: &str) -> Result<ReferenceImage> {
        let fetch_error = |reason: String| Error::ReferenceFetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("server returned {}", status)));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .to_vec();

        tracing::debug!(url, bytes = data.len(), mime_type = %mime_type, "fetched reference image");

        Ok(ReferenceImage { data, mime_type })
    }
}

/// Writes rows to a spreadsheet web-app endpoint
///
/// Each write is a single POST of `[{"row": <row>, "data": [..values]}]`.
#[derive(Clone, Debug)]
pub struct HttpReportSink {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpReportSink {
    /// Create a sink posting to `url`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    /// Build from config; fails when no sink URL is configured
    pub fn from_config(config: &SinkConfig) -> Result<Self> {
        let url = config.url.clone().ok_or_else(|| Error::Config {
            message: "sink URL is not configured".into(),
            key: Some("sink.url".into()),
        })?;
        Ok(Self::new(url, config.timeout))
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn write_row(&self, row: u32, values: &[String]) -> Result<()> {
        let payload = serde_json::json!([{ "row": row, "data": values }]);

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Report {
                row,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::Report {
                row,
                reason: format!(
                    "sink returned status {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        tracing::info!(row, values = values.len(), "row written to sink");
        Ok(())
    }
}
