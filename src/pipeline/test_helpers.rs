//! In-memory collaborators for pipeline tests.

use crate::config::{OutputConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::services::{
    Dimensions, GenerationRequest, GenerationResponse, ImageGenerator, ImageResizer,
    ObjectStorage, ReferenceFetcher, ReferenceImage, ReportSink, Services,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Retry policy with millisecond delays so tests stay fast
pub(crate) fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::exponential(
        max_retries,
        Duration::from_millis(2),
        Duration::from_millis(10),
    )
}

/// Linear policy matching the production report shape, with tiny delays
pub(crate) fn fast_report_policy() -> RetryPolicy {
    RetryPolicy::linear(3, Duration::from_millis(2), Duration::from_millis(10))
}

/// Output config rooted in a scratch directory
pub(crate) fn output_in(dir: &Path) -> OutputConfig {
    OutputConfig {
        output_dir: dir.join("generated"),
        ..OutputConfig::default()
    }
}

/// Returns the URL bytes as image data; fails for URLs in `failing`
#[derive(Default)]
pub(crate) struct MockFetcher {
    pub(crate) failing: HashSet<String>,
    pub(crate) calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ReferenceFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<ReferenceImage> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(Error::ReferenceFetch {
                url: url.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(ReferenceImage {
            data: url.as_bytes().to_vec(),
            mime_type: "image/jpeg".into(),
        })
    }
}

/// What the mock generator does for a given prompt
#[derive(Clone, Debug)]
pub(crate) enum Generation {
    /// Return this many images
    Images(usize),
    /// Fail with this message
    Fail(String),
}

/// Generator scripted per prompt; unknown prompts yield one image
#[derive(Default)]
pub(crate) struct MockGenerator {
    pub(crate) script: HashMap<String, Generation>,
    pub(crate) delays: HashMap<String, Duration>,
    pub(crate) text: Vec<String>,
    pub(crate) calls: Mutex<Vec<(String, usize)>>,
}

impl MockGenerator {
    pub(crate) fn scripted(entries: &[(&str, Generation)]) -> Self {
        Self {
            script: entries
                .iter()
                .map(|(p, g)| (p.to_string(), g.clone()))
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<GenerationResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((request.prompt.to_string(), request.references.len()));

        if let Some(delay) = self.delays.get(request.prompt) {
            tokio::time::sleep(*delay).await;
        }

        match self.script.get(request.prompt) {
            Some(Generation::Fail(message)) => Err(Error::Generation(message.clone())),
            Some(Generation::Images(n)) => Ok(GenerationResponse {
                images: (0..*n).map(|i| vec![i as u8; 16]).collect(),
                text: self.text.clone(),
            }),
            None => Ok(GenerationResponse {
                images: vec![vec![7u8; 16]],
                text: self.text.clone(),
            }),
        }
    }
}

/// Reports fixed dimensions and records resize calls
pub(crate) struct MockResizer {
    pub(crate) current: Dimensions,
    pub(crate) fail: bool,
    pub(crate) resized: Mutex<Vec<(PathBuf, Dimensions)>>,
}

impl MockResizer {
    pub(crate) fn reporting(current: Dimensions) -> Self {
        Self {
            current,
            fail: false,
            resized: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MockResizer {
    fn default() -> Self {
        Self::reporting(Dimensions::new(1024, 1024))
    }
}

#[async_trait]
impl ImageResizer for MockResizer {
    async fn dimensions(&self, _path: &Path) -> Result<Dimensions> {
        Ok(self.current)
    }

    async fn resize(&self, path: &Path, target: Dimensions) -> Result<Dimensions> {
        if self.fail {
            return Err(Error::Resize {
                path: path.to_path_buf(),
                reason: "unsupported format".into(),
            });
        }
        self.resized
            .lock()
            .unwrap()
            .push((path.to_path_buf(), target));
        Ok(target)
    }
}

/// Stores nothing; returns `https://cdn.test/<key>`
///
/// Keys containing any `always_fail` fragment fail every attempt; keys in
/// `flaky` fail that many times before succeeding. Every attempt takes
/// `delay`, and `peak` records how many attempts were in flight at once.
#[derive(Default)]
pub(crate) struct MockStorage {
    pub(crate) always_fail: Vec<String>,
    pub(crate) flaky: Mutex<HashMap<String, u32>>,
    pub(crate) calls: Mutex<Vec<(String, String)>>,
    pub(crate) delay: Option<Duration>,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) peak: AtomicUsize,
}

impl MockStorage {
    pub(crate) fn attempts_for(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .count()
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn upload(&self, _data: Vec<u8>, content_type: &str, key: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.always_fail.iter().any(|f| key.contains(f.as_str())) {
            return Err(Error::Storage(format!("access denied for {}", key)));
        }

        let mut flaky = self.flaky.lock().unwrap();
        if let Some(remaining) = flaky.get_mut(key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(Error::Storage("503 slow down".into()));
        }

        Ok(format!("https://cdn.test/{}", key))
    }
}

/// Records every write in arrival order; fails the first `fail_first` writes
#[derive(Default)]
pub(crate) struct MockSink {
    pub(crate) fail_first: Mutex<u32>,
    pub(crate) always_fail: bool,
    pub(crate) attempts: Mutex<u32>,
    pub(crate) writes: Mutex<Vec<(u32, Vec<String>)>>,
}

impl MockSink {
    pub(crate) fn rows(&self) -> Vec<u32> {
        self.writes.lock().unwrap().iter().map(|(r, _)| *r).collect()
    }
}

#[async_trait]
impl ReportSink for MockSink {
    async fn write_row(&self, row: u32, values: &[String]) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;

        if self.always_fail {
            return Err(Error::Report {
                row,
                reason: "sheet unavailable".into(),
            });
        }
        {
            let mut fail_first = self.fail_first.lock().unwrap();
            if *fail_first > 0 {
                *fail_first -= 1;
                return Err(Error::Report {
                    row,
                    reason: "timeout".into(),
                });
            }
        }

        self.writes.lock().unwrap().push((row, values.to_vec()));
        Ok(())
    }
}

/// Handles to the mocks behind a [`Services`] bundle
pub(crate) struct Mocks {
    pub(crate) fetcher: Arc<MockFetcher>,
    pub(crate) generator: Arc<MockGenerator>,
    pub(crate) resizer: Arc<MockResizer>,
    pub(crate) storage: Arc<MockStorage>,
    pub(crate) sink: Arc<MockSink>,
}

impl Mocks {
    pub(crate) fn new(generator: MockGenerator) -> Self {
        Self {
            fetcher: Arc::new(MockFetcher::default()),
            generator: Arc::new(generator),
            resizer: Arc::new(MockResizer::default()),
            storage: Arc::new(MockStorage::default()),
            sink: Arc::new(MockSink::default()),
        }
    }

    pub(crate) fn services(&self) -> Services {
        Services {
            fetcher: self.fetcher.clone(),
            generator: self.generator.clone(),
            resizer: self.resizer.clone(),
            storage: self.storage.clone(),
            sink: self.sink.clone(),
        }
    }
}
