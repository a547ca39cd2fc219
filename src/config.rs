//! Configuration types for genbatch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for the batch pipeline
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Where generated images land and how they are shaped and keyed
    #[serde(default)]
    pub output: OutputConfig,

    /// Retry policies for uploads and sink writes
    #[serde(default)]
    pub retry: RetrySettings,

    /// Reporting sink endpoint
    #[serde(default)]
    pub sink: SinkConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Check values that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.output.target_width == 0 || self.output.target_height == 0 {
            return Err(Error::Config {
                message: "target dimensions must be non-zero".into(),
                key: Some("output.target_width".into()),
            });
        }
        if self.output.key_prefix.trim_matches('/').is_empty() {
            return Err(Error::Config {
                message: "storage key prefix must not be empty".into(),
                key: Some("output.key_prefix".into()),
            });
        }
        if self.output.max_reference_images == 0 {
            return Err(Error::Config {
                message: "at least one reference image must be allowed".into(),
                key: Some("output.max_reference_images".into()),
            });
        }
        for (key, policy) in [
            ("retry.upload.max_retries", &self.retry.upload),
            ("retry.report.max_retries", &self.retry.report),
        ] {
            if policy.max_retries == 0 {
                return Err(Error::Config {
                    message: "max_retries must be at least 1".into(),
                    key: Some(key.into()),
                });
            }
        }
        Ok(())
    }
}

/// Output location, canonical image size and storage key layout
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OutputConfig {
    /// Directory for generated images before upload (default: "generated_images")
    #[serde(default = "default_output_dir")]
    #[schema(value_type = String)]
    pub output_dir: PathBuf,

    /// Canonical width in pixels (default: 2304)
    #[serde(default = "default_target_width")]
    pub target_width: u32,

    /// Canonical height in pixels (default: 3080)
    #[serde(default = "default_target_height")]
    pub target_height: u32,

    /// Storage key prefix (default: "photos")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Reference images passed to the generator per item (default: 3)
    #[serde(default = "default_max_reference_images")]
    pub max_reference_images: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            target_width: default_target_width(),
            target_height: default_target_height(),
            key_prefix: default_key_prefix(),
            max_reference_images: default_max_reference_images(),
        }
    }
}

impl OutputConfig {
    /// Storage key for a generated file
    pub fn storage_key(&self, file_name: &str) -> String {
        format!("{}/{}", self.key_prefix.trim_end_matches('/'), file_name)
    }
}

/// Delay growth between attempts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// `base_delay * 2^(attempt-1)`
    #[default]
    Exponential,
    /// `attempt * base_delay`
    Linear,
}

/// Retry attempt limit and delay growth for one kind of external call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RetryPolicy {
    /// Total attempts including the first one (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Exponential base or linear increment, in milliseconds (default: 1000)
    #[serde(default = "default_base_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub base_delay: Duration,

    /// Upper bound for a single delay, in milliseconds (default: 10000)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Delay growth (default: exponential)
    #[serde(default)]
    pub backoff: Backoff,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(
            default_max_retries(),
            default_base_delay(),
            default_max_delay(),
        )
    }
}

impl RetryPolicy {
    /// Exponential policy without jitter
    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            backoff: Backoff::Exponential,
            jitter: false,
        }
    }

    /// Linear policy without jitter; `increment` grows by one step per attempt
    pub fn linear(max_retries: u32, increment: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay: increment,
            max_delay,
            backoff: Backoff::Linear,
            jitter: false,
        }
    }
}

/// Retry policies by call site
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetrySettings {
    /// Fan-out storage uploads (default: 3 attempts, exponential, 1s base, 10s cap)
    #[serde(default)]
    pub upload: RetryPolicy,

    /// Sink writes (default: 3 attempts, linear 2s increment)
    #[serde(default = "default_report_policy")]
    pub report: RetryPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            upload: RetryPolicy::default(),
            report: default_report_policy(),
        }
    }
}

/// Reporting sink endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SinkConfig {
    /// URL receiving `[{"row": .., "data": [..]}]` POSTs
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request timeout in milliseconds (default: 10000)
    #[serde(default = "default_sink_timeout", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_sink_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated_images")
}

fn default_target_width() -> u32 {
    2304
}

fn default_target_height() -> u32 {
    3080
}

fn default_key_prefix() -> String {
    "photos".to_string()
}

fn default_max_reference_images() -> usize {
    3
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_report_policy() -> RetryPolicy {
    RetryPolicy::linear(3, Duration::from_secs(2), Duration::from_secs(10))
}

fn default_sink_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration <-> integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
