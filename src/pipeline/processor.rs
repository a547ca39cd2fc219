//! Per-item pipeline: fetch references, generate, resize, upload, delete-local.

use crate::config::OutputConfig;
use crate::error::Result;
use crate::services::{
    Dimensions, GenerationRequest, ImageGenerator, ImageResizer, ObjectStorage,
    ReferenceFetcher, ReferenceImage, Services,
};
use crate::types::{ItemOutcome, LocalFile, UploadResult, WorkItem};
use crate::utils;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Anything that can turn one work item into uploaded URLs
///
/// [`ItemProcessor`] is the production implementation; the orchestrator only
/// depends on this trait.
#[async_trait]
pub trait ProcessItem: Send + Sync {
    /// Process one item. `index` is its 1-based position in the batch.
    ///
    /// An `Err` means the item failed outright (reference fetch, generation or
    /// resize error). Individual upload failures are recorded in the outcome.
    async fn process(&self, item: &WorkItem, index: usize) -> Result<ItemOutcome>;
}

/// Runs the generate → resize → upload → delete-local pipeline for one item
pub struct ItemProcessor {
    output: OutputConfig,
    fetcher: Arc<dyn ReferenceFetcher>,
    generator: Arc<dyn ImageGenerator>,
    resizer: Arc<dyn ImageResizer>,
    storage: Arc<dyn ObjectStorage>,
}

impl ItemProcessor {
    /// Create a processor writing into `output.output_dir`
    pub fn new(output: OutputConfig, services: &Services) -> Self {
        Self {
            output,
            fetcher: services.fetcher.clone(),
            generator: services.generator.clone(),
            resizer: services.resizer.clone(),
            storage: services.storage.clone(),
        }
    }

    fn target(&self) -> Dimensions {
        Dimensions::new(self.output.target_width, self.output.target_height)
    }

    async fn fetch_references(&self, item: &WorkItem) -> Result<Vec<ReferenceImage>> {
        let fetches = item
            .image_urls
            .iter()
            .take(self.output.max_reference_images)
            .map(|url| self.fetcher.fetch(url));

        futures::future::try_join_all(fetches).await
    }

    async fn save_image(&self, data: &[u8], file_name: &str) -> Result<LocalFile> {
        let file_path = self.output.output_dir.join(file_name);
        tokio::fs::write(&file_path, data).await?;
        tracing::debug!(path = %file_path.display(), bytes = data.len(), "generated image saved");
        Ok(LocalFile {
            file_name: file_name.to_string(),
            file_path,
        })
    }

    /// Resize to the canonical dimensions unless they already match exactly
    async fn conform(&self, path: &Path) -> Result<()> {
        let target = self.target();
        let current = self.resizer.dimensions(path).await?;

        if current == target {
            tracing::debug!(path = %path.display(), dimensions = %current, "already canonical size");
            return Ok(());
        }

        let produced = self.resizer.resize(path, target).await?;
        tracing::info!(
            path = %path.display(),
            from = %current,
            to = %produced,
            "image resized"
        );
        Ok(())
    }

    /// Single upload attempt; the local file is deleted only on success
    async fn upload(&self, file: &LocalFile) -> UploadResult {
        let key = self.output.storage_key(&file.file_name);
        let content_type = utils::content_type_for(&file.file_path);

        let uploaded = match tokio::fs::read(&file.file_path).await {
            Ok(data) => self.storage.upload(data, content_type, &key).await,
            Err(e) => Err(e.into()),
        };

        match uploaded {
            Ok(url) => {
                tracing::info!(file = %file.file_name, url = %url, "image uploaded");
                let deleted = utils::delete_file(&file.file_path).await;
                UploadResult::uploaded(file, url, deleted)
            }
            Err(e) => {
                tracing::error!(file = %file.file_name, key = %key, error = %e, "image upload failed");
                UploadResult::failed(file, e.to_string())
            }
        }
    }
}

#[async_trait]
impl ProcessItem for ItemProcessor {
    async fn process(&self, item: &WorkItem, index: usize) -> Result<ItemOutcome> {
        tokio::fs::create_dir_all(&self.output.output_dir).await?;

        let references = self.fetch_references(item).await?;
        tracing::info!(item = index, references = references.len(), "reference images loaded");

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut counter = 0usize;
        let mut outcome = ItemOutcome {
            prompts: item.prompts.len(),
            ..ItemOutcome::default()
        };

        for (p, prompt) in item.prompts.iter().enumerate() {
            tracing::info!(
                item = index,
                prompt = p + 1,
                prompts = item.prompts.len(),
                text = %utils::preview(prompt, 100),
                "running prompt"
            );

            let response = self
                .generator
                .generate(GenerationRequest {
                    prompt,
                    references: &references,
                })
                .await?;

            for text in response.text {
                tracing::info!(item = index, prompt = p + 1, text = %text, "generator text response");
                outcome.text.push(text);
            }

            if response.images.is_empty() {
                tracing::warn!(item = index, prompt = p + 1, "generator returned no images");
            }

            for image in response.images {
                counter += 1;
                outcome.generated += 1;

                let file_name = format!("gen-{}-{}.png", timestamp, counter);
                let file = self.save_image(&image, &file_name).await?;
                self.conform(&file.file_path).await?;
                outcome.uploads.push(self.upload(&file).await);
            }
        }

        tracing::info!(
            item = index,
            prompts = outcome.prompts,
            generated = outcome.generated,
            uploaded = outcome.uploads.iter().filter(|u| u.success).count(),
            "item pipeline finished"
        );

        Ok(outcome)
    }
}
