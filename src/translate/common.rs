use std::path::{Path, PathBuf};
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TranslateConfig;
use crate::error::{Result, L10nError};
use crate::locale::FlatLocale;

/// Default location of cached LLM batches
pub const CACHE_DIR: &str = ".mib2-l10n/cache/translations";

/// Anything that turns a prompt into a completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model name, part of the cache key
    fn model(&self) -> String;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    result: ChatResult,
}

#[derive(Debug, Deserialize)]
struct ChatResult {
    data: ChatData,
}

#[derive(Debug, Deserialize)]
struct ChatData {
    #[serde(default)]
    content: String,
}

/// Chat completion over HTTP (`{"messages": [...], "model": ...}` in,
/// `{"result": {"data": {"content": ...}}}` out)
pub struct ChatClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            model: self.model.clone(),
        };

        debug!("Sending completion request to: {}", self.endpoint);

        let response = self.client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| L10nError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(L10nError::Translation(format!("API error {}: {}", status, error_text)));
        }

        let chat: ChatResponse = response.json().await
            .map_err(|e| L10nError::Translation(format!("Failed to parse response: {}", e)))?;

        Ok(chat.result.data.content)
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}

/// Full language name for clearer prompts
pub fn language_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "es" => "Spanish".to_string(),
        "en" => "English".to_string(),
        "de" => "German".to_string(),
        "fr" => "French".to_string(),
        "it" => "Italian".to_string(),
        "pt" => "Portuguese".to_string(),
        "nl" => "Dutch".to_string(),
        "pl" => "Polish".to_string(),
        "cs" => "Czech".to_string(),
        "ru" => "Russian".to_string(),
        _ => code.to_string(),
    }
}

/// Prompt for one batch of flattened `key: text` pairs
pub fn build_batch_prompt(
    batch: &FlatLocale,
    source_language: &str,
    target_language: &str,
    protected_terms: &[String],
) -> Result<String> {
    let input = serde_json::to_string_pretty(batch)?;
    let target = language_name(target_language);

    Ok(format!(
        "Translate the following JSON key-value pairs from {} to {}.\n\
         Keep the keys unchanged, only translate the values.\n\
         Maintain technical terms like {}, etc.\n\
         Return ONLY valid JSON with the same structure.\n\
         \n\
         Input JSON:\n\
         {}\n\
         \n\
         Output JSON ({} values):",
        language_name(source_language),
        target,
        protected_terms.join(", "),
        input,
        target
    ))
}

/// Parse the JSON object spanning the first `{` to the last `}` of a reply
pub fn extract_json_object(reply: &str) -> Option<FlatLocale> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationCacheEntry {
    pub target_language: String,
    pub model: String,
    pub source: FlatLocale,
    pub translation: FlatLocale,
    pub cached_at: u64,
}

/// Translated batches stored as `<hash>.json` files
#[derive(Debug, Clone)]
pub struct TranslationCache {
    dir: PathBuf,
}

impl TranslationCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a batch
    pub fn key(model: &str, target_language: &str, batch: &FlatLocale) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        model.hash(&mut hasher);
        target_language.hash(&mut hasher);
        for (key, value) in batch {
            key.hash(&mut hasher);
            value.to_string().hash(&mut hasher);
        }

        format!("{:016x}", hasher.finish())
    }

    pub async fn load(&self, key: &str) -> Option<FlatLocale> {
        let cache_file = self.dir.join(format!("{}.json", key));
        let content = tokio::fs::read_to_string(&cache_file).await.ok()?;

        match serde_json::from_str::<TranslationCacheEntry>(&content) {
            Ok(entry) => {
                debug!(
                    "Translation cache hit: {} (cached {} ago)",
                    key,
                    format_duration(now_secs().saturating_sub(entry.cached_at))
                );
                Some(entry.translation)
            }
            Err(e) => {
                warn!("Failed to parse translation cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn store(
        &self,
        key: &str,
        model: &str,
        target_language: &str,
        source: &FlatLocale,
        translation: &FlatLocale,
    ) -> Result<()> {
        let entry = TranslationCacheEntry {
            target_language: target_language.to_string(),
            model: model.to_string(),
            source: source.clone(),
            translation: translation.clone(),
            cached_at: now_secs(),
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        let cache_file = self.dir.join(format!("{}.json", key));
        let content = serde_json::to_string_pretty(&entry)?;

        if let Err(e) = tokio::fs::write(&cache_file, content).await {
            warn!("Failed to write translation cache: {}", e);
        } else {
            debug!("Saved translation batch to cache: {}", key);
        }

        Ok(())
    }

    /// Remove every cache entry; returns how many were removed
    pub async fn clear(&self) -> Result<u64> {
        let mut count = 0;
        if let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().extension().is_some_and(|ext| ext == "json")
                    && tokio::fs::remove_file(entry.path()).await.is_ok()
                {
                    count += 1;
                }
            }
        }
        info!("Cleared {} translation cache entries", count);
        Ok(count)
    }

    /// Cache entries, newest first
    pub async fn list(&self) -> Result<Vec<TranslationCacheEntry>> {
        let mut entries = Vec::new();

        if let Ok(mut dir_entries) = tokio::fs::read_dir(&self.dir).await {
            while let Ok(Some(entry)) = dir_entries.next_entry().await {
                if !entry.path().extension().is_some_and(|ext| ext == "json") {
                    continue;
                }
                if let Ok(content) = tokio::fs::read_to_string(entry.path()).await {
                    if let Ok(cache_entry) = serde_json::from_str::<TranslationCacheEntry>(&content) {
                        entries.push(cache_entry);
                    }
                }
            }
        }

        entries.sort_by(|a, b| b.cached_at.cmp(&a.cached_at));
        Ok(entries)
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Format a duration in seconds as a short human-readable string
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / (24 * 60 * 60);
    let hours = (seconds % (24 * 60 * 60)) / (60 * 60);
    let minutes = (seconds % (60 * 60)) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn flat(value: Value) -> FlatLocale {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn extract_json_object_handles_chatter_and_fences() {
        let reply = "Sure! Here you go:\n```json\n{\n  \"usb.connect\": \"Connect\"\n}\n```";
        assert_eq!(extract_json_object(reply), Some(flat(json!({ "usb.connect": "Connect" }))));
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object("{ not json }"), None);
    }

    #[test]
    fn prompt_names_languages_and_terms() {
        let batch = flat(json!({ "home.title": "Inicio" }));
        let prompt = build_batch_prompt(&batch, "es", "de", &["VID".into(), "PID".into()]).unwrap();

        assert!(prompt.starts_with("Translate the following JSON key-value pairs from Spanish to German."));
        assert!(prompt.contains("technical terms like VID, PID, etc."));
        assert!(prompt.contains("\"home.title\": \"Inicio\""));
        assert!(prompt.ends_with("Output JSON (German values):"));
    }

    #[test]
    fn cache_key_depends_on_model_language_and_batch() {
        let a = flat(json!({ "k": "uno" }));
        let b = flat(json!({ "k": "dos" }));

        let base = TranslationCache::key("gpt-4o-mini", "en", &a);
        assert_eq!(base, TranslationCache::key("gpt-4o-mini", "en", &a));
        assert_ne!(base, TranslationCache::key("gpt-4o-mini", "de", &a));
        assert_ne!(base, TranslationCache::key("other", "en", &a));
        assert_ne!(base, TranslationCache::key("gpt-4o-mini", "en", &b));
    }

    #[tokio::test]
    async fn cache_store_list_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranslationCache::new(dir.path().join("translations"));
        let source = flat(json!({ "k": "Hola" }));
        let translation = flat(json!({ "k": "Hello" }));

        assert!(cache.load("missing").await.is_none());

        let key = TranslationCache::key("m", "en", &source);
        cache.store(&key, "m", "en", &source, &translation).await.unwrap();

        assert_eq!(cache.load(&key).await, Some(translation));
        assert_eq!(cache.list().await.unwrap().len(), 1);
        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(cache.list().await.unwrap().is_empty());
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7300), "2h 1m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }
}
