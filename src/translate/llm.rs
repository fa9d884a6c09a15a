use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Map;
use tracing::{debug, info, warn};

use crate::config::TranslateConfig;
use crate::error::{Result, L10nError};
use crate::locale::{flatten, unflatten, FlatLocale, LocaleTree};
use super::common::{build_batch_prompt, extract_json_object, CompletionClient, TranslationCache};
use super::{TranslationOutcome, Translator};

/// Translates a flattened locale in batches through a chat completion endpoint
pub struct LlmTranslator {
    client: Box<dyn CompletionClient>,
    config: TranslateConfig,
    source_language: String,
    cache: Option<TranslationCache>,
    show_progress: bool,
}

impl LlmTranslator {
    pub fn new(
        client: Box<dyn CompletionClient>,
        config: TranslateConfig,
        source_language: String,
        cache: Option<TranslationCache>,
    ) -> Self {
        Self {
            client,
            config,
            source_language,
            cache,
            show_progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// One attempt at a batch: prompt, complete, parse
    async fn request_batch(&self, batch: &FlatLocale, target_language: &str) -> Result<FlatLocale> {
        let prompt = build_batch_prompt(batch, &self.source_language, target_language, &self.config.protected_terms)?;
        let reply = self.client.complete(&prompt).await?;
        debug!("Raw completion: {}", reply);

        extract_json_object(&reply)
            .ok_or_else(|| L10nError::Translation("no JSON object in completion".to_string()))
    }

    /// Translate a batch with retries; `None` when every attempt failed
    async fn translate_batch(&self, batch: &FlatLocale, target_language: &str) -> Option<FlatLocale> {
        let model = self.client.model();
        let cache_key = TranslationCache::key(&model, target_language, batch);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.load(&cache_key).await {
                return Some(cached);
            }
        }

        let attempts = self.config.max_retries + 1;
        for attempt in 1..=attempts {
            match self.request_batch(batch, target_language).await {
                Ok(translated) => {
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.store(&cache_key, &model, target_language, batch, &translated).await {
                            warn!("Failed to save translation batch to cache: {}", e);
                        }
                    }
                    return Some(translated);
                }
                Err(e) => warn!("Attempt {}/{} failed: {}", attempt, attempts, e),
            }
        }

        None
    }

    fn progress_bar(&self, batches: usize, target_language: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(batches as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(format!("batches -> {}", target_language));
        pb
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate_tree(
        &mut self,
        source: &LocaleTree,
        target_language: &str,
        _existing: &LocaleTree,
    ) -> Result<TranslationOutcome> {
        let flat = flatten(source, ".");
        let entries: Vec<(&String, &serde_json::Value)> = flat.iter().collect();
        let batch_size = self.config.batch_size.max(1);
        let batch_count = entries.len().div_ceil(batch_size);

        info!(
            "Translating {} strings to {} in {} batches",
            entries.len(),
            target_language,
            batch_count
        );

        let pb = self.progress_bar(batch_count, target_language);
        let mut translated_flat = Map::new();
        let mut failed_batches = 0;

        for (idx, chunk) in entries.chunks(batch_size).enumerate() {
            let batch: FlatLocale = chunk.iter().map(|(k, v)| ((*k).clone(), (*v).clone())).collect();

            match self.translate_batch(&batch, target_language).await {
                Some(mut translated) => {
                    // keep the batch's keys; anything missing from the reply keeps the source value
                    for (key, value) in batch {
                        let value = translated.remove(&key).unwrap_or(value);
                        translated_flat.insert(key, value);
                    }
                    debug!("Translated batch {}/{}", idx + 1, batch_count);
                }
                None => {
                    failed_batches += 1;
                    warn!("Batch {}/{} failed, keeping source text", idx + 1, batch_count);
                    translated_flat.extend(batch);
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message(format!("{} done", target_language));
        if failed_batches > 0 {
            warn!("{} of {} batches fell back to source text", failed_batches, batch_count);
        }

        let tree = unflatten(&translated_flat, ".");
        Ok(TranslationOutcome::new(source, tree, &self.config.todo_marker))
    }
}
