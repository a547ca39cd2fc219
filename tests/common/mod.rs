//! Common test utilities for genbatch integration tests
//!
//! In-memory generator, resizer and storage built only on the public traits,
//! plus helpers to point the HTTP collaborators at a wiremock server.

#![allow(dead_code)]

use async_trait::async_trait;
use genbatch::services::{
    Dimensions, GenerationRequest, GenerationResponse, HttpReferenceFetcher, HttpReportSink,
    ImageGenerator, ImageResizer, ObjectStorage,
};
use genbatch::{Config, Error, OutputConfig, Result, RetryPolicy, Services};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One image per prompt, containing the prompt bytes and the reference count
#[derive(Default)]
pub struct EchoGenerator {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageGenerator for EchoGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<GenerationResponse> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());

        if request.prompt.contains("refuse") {
            return Err(Error::Generation("prompt blocked by safety filter".into()));
        }

        let mut image = request.prompt.as_bytes().to_vec();
        image.push(request.references.len() as u8);
        Ok(GenerationResponse {
            images: vec![image],
            text: Vec::new(),
        })
    }
}

/// Pretends every image is 1024x1024 until resized
#[derive(Default)]
pub struct CountingResizer {
    pub resized: AtomicUsize,
}

#[async_trait]
impl ImageResizer for CountingResizer {
    async fn dimensions(&self, _path: &Path) -> Result<Dimensions> {
        Ok(Dimensions::new(1024, 1024))
    }

    async fn resize(&self, _path: &Path, target: Dimensions) -> Result<Dimensions> {
        self.resized.fetch_add(1, Ordering::SeqCst);
        Ok(target)
    }
}

/// Keeps uploaded objects in memory; keys containing a `reject` fragment fail
#[derive(Default)]
pub struct MemoryStorage {
    pub reject: Vec<String>,
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub attempts: AtomicUsize,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, data: Vec<u8>, _content_type: &str, key: &str) -> Result<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject.iter().any(|r| key.contains(r.as_str())) {
            return Err(Error::Storage(format!("403 forbidden: {}", key)));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(format!("https://storage.test/bucket/{}", key))
    }
}

/// Collaborators wired to a wiremock server for references and the sink
pub struct Harness {
    pub server: MockServer,
    pub generator: Arc<EchoGenerator>,
    pub resizer: Arc<CountingResizer>,
    pub storage: Arc<MemoryStorage>,
    pub config: Config,
    pub dir: tempfile::TempDir,
}

impl Harness {
    /// Start a mock server serving `/refs/*` images; the sink is mounted by the caller
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::path_regex(r"^/refs/.+"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output = OutputConfig {
            output_dir: dir.path().join("out"),
            ..OutputConfig::default()
        };
        config.retry.report = fast_linear(3);
        config.retry.upload = fast_exponential(3);
        config.sink.url = Some(format!("{}/sink", server.uri()));
        config.sink.timeout = Duration::from_secs(2);

        Self {
            server,
            generator: Arc::new(EchoGenerator::default()),
            resizer: Arc::new(CountingResizer::default()),
            storage: Arc::new(MemoryStorage::default()),
            config,
            dir,
        }
    }

    pub fn ref_url(&self, name: &str) -> String {
        format!("{}/refs/{}", self.server.uri(), name)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.output.output_dir.clone()
    }

    pub fn services(&self) -> Services {
        Services {
            fetcher: Arc::new(HttpReferenceFetcher::new()),
            generator: self.generator.clone(),
            resizer: self.resizer.clone(),
            storage: self.storage.clone(),
            sink: Arc::new(HttpReportSink::from_config(&self.config.sink).unwrap()),
        }
    }

    /// Bodies POSTed to `/sink`, in arrival order
    pub async fn sink_writes(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == "/sink")
            .map(|r| r.body_json::<serde_json::Value>().unwrap())
            .collect()
    }
}

/// Mount a sink that always answers 200
pub async fn mount_ok_sink(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sink"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

pub fn fast_linear(max_retries: u32) -> RetryPolicy {
    RetryPolicy::linear(max_retries, Duration::from_millis(5), Duration::from_millis(20))
}

pub fn fast_exponential(max_retries: u32) -> RetryPolicy {
    RetryPolicy::exponential(max_retries, Duration::from_millis(5), Duration::from_millis(20))
}
