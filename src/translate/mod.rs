// Locale translation
//
// Every mode implements the same `Translator` trait and is picked by the factory:
// - glossary-exact / glossary-fuzzy / glossary-fill: lookups in a glossary file
// - llm: batched translation through a chat completion endpoint

pub mod common;
pub mod glossary;
pub mod llm;

use async_trait::async_trait;
use serde::Serialize;

pub use common::*;
pub use glossary::Glossary;
use crate::config::{TranslateConfig, TranslationMode};
use crate::error::Result;
use crate::locale::{count_pending, count_strings, count_translated, LocaleTree};

/// Translation progress of a target locale against its source
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TranslationStats {
    pub total: usize,
    pub translated: usize,
    pub pending: usize,
}

impl TranslationStats {
    pub fn compute(source: &LocaleTree, target: &LocaleTree, todo_marker: &str) -> Self {
        Self {
            total: count_strings(source),
            translated: count_translated(source, target),
            pending: count_pending(target, todo_marker),
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.translated as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub tree: LocaleTree,
    pub stats: TranslationStats,
}

impl TranslationOutcome {
    pub fn new(source: &LocaleTree, tree: LocaleTree, todo_marker: &str) -> Self {
        let stats = TranslationStats::compute(source, &tree, todo_marker);
        Self { tree, stats }
    }
}

/// Main trait for translation operations
#[async_trait]
pub trait Translator: Send + Sync {
    /// Produce the target locale for `source`; `existing` is the current target file (possibly empty)
    async fn translate_tree(
        &mut self,
        source: &LocaleTree,
        target_language: &str,
        existing: &LocaleTree,
    ) -> Result<TranslationOutcome>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a translator based on the translation mode
    pub fn create_translator(
        config: TranslateConfig,
        glossary: Glossary,
        source_language: &str,
    ) -> Result<Box<dyn Translator>> {
        let marker = config.todo_marker.clone();
        let translator: Box<dyn Translator> = match config.mode {
            TranslationMode::GlossaryExact => Box::new(glossary::ExactTranslator::new(glossary, marker)),
            TranslationMode::GlossaryFuzzy => Box::new(glossary::FuzzyTranslator::new(
                glossary,
                config.protected_terms.clone(),
                marker,
            )),
            TranslationMode::GlossaryFill => Box::new(glossary::FillTranslator::new(glossary, marker)),
            TranslationMode::Llm => {
                let client = ChatClient::new(&config)?;
                let cache = config.use_cache.then(|| TranslationCache::new(CACHE_DIR));
                Box::new(llm::LlmTranslator::new(
                    Box::new(client),
                    config,
                    source_language.to_string(),
                    cache,
                ))
            }
        };
        Ok(translator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_report_percentage_and_pending() {
        let source = json!({ "a": "Uno", "b": "Dos", "c": { "d": "Tres", "e": "Cuatro" } });
        let target = json!({ "a": "One", "b": "Dos", "c": { "d": "[TODO: Tres]" } });

        let stats = TranslationStats::compute(
            source.as_object().unwrap(),
            target.as_object().unwrap(),
            "[TODO:",
        );

        assert_eq!(stats, TranslationStats { total: 4, translated: 2, pending: 1 });
        assert_eq!(stats.percentage(), 50.0);
        assert_eq!(TranslationStats::default().percentage(), 0.0);
    }

    #[test]
    fn factory_builds_every_mode() {
        for mode in [
            TranslationMode::GlossaryExact,
            TranslationMode::GlossaryFuzzy,
            TranslationMode::GlossaryFill,
            TranslationMode::Llm,
        ] {
            let config = TranslateConfig { mode, use_cache: false, ..TranslateConfig::default() };
            assert!(TranslatorFactory::create_translator(config, Glossary::default(), "es").is_ok());
        }
    }
}
