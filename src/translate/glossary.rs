use std::collections::BTreeMap;
use std::path::Path;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, L10nError};
use crate::locale::{map_strings, LocaleTree};
use super::{TranslationOutcome, Translator};

/// Source texts with their translations, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glossary {
    /// Texts containing one of these terms are never rewritten by fuzzy translation
    pub terms: Vec<String>,
    pub entries: Vec<(String, BTreeMap<String, String>)>,
}

impl Glossary {
    /// Read a glossary; `.toml` files are parsed as TOML, everything else as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(L10nError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let value: Value = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        let glossary = Self::from_value(value)?;
        info!("Loaded glossary with {} entries from {}", glossary.entries.len(), path.display());
        Ok(glossary)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(L10nError::Translation("glossary must be an object".to_string()));
        };

        let terms = match root.remove("terms") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(term) => Ok(term),
                    other => Err(L10nError::Translation(format!("glossary term must be a string, got {}", other))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(L10nError::Translation("glossary 'terms' must be a list".to_string())),
        };

        let mut entries = Vec::new();
        match root.remove("entries") {
            None => {}
            Some(Value::Object(map)) => {
                for (source, translations) in map {
                    let Value::Object(translations) = translations else {
                        return Err(L10nError::Translation(format!("glossary entry '{}' must be an object", source)));
                    };
                    let translations = translations
                        .into_iter()
                        .filter_map(|(lang, text)| match text {
                            Value::String(text) => Some((lang, text)),
                            _ => None,
                        })
                        .collect();
                    entries.push((source, translations));
                }
            }
            Some(_) => return Err(L10nError::Translation("glossary 'entries' must be an object".to_string())),
        }

        Ok(Self { terms, entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Translation of exactly `text`
    pub fn exact(&self, text: &str, lang: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(source, _)| source == text)
            .and_then(|(_, translations)| translations.get(lang))
            .map(String::as_str)
    }

    /// First entry whose source text is contained in `text`, with its
    /// translation or the source text itself when `lang` is missing
    pub fn first_contained(&self, text: &str, lang: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .find(|(source, _)| text.contains(source.as_str()))
            .map(|(source, translations)| {
                let translated = translations.get(lang).unwrap_or(source);
                (source.as_str(), translated.as_str())
            })
    }

    /// First entry contained in `text` ignoring case
    pub fn first_contained_ignore_case(&self, text: &str, lang: &str) -> Option<(&str, &str)> {
        let lower = text.to_lowercase();
        self.entries.iter().find_map(|(source, translations)| {
            if lower.contains(&source.to_lowercase()) {
                translations.get(lang).map(|t| (source.as_str(), t.as_str()))
            } else {
                None
            }
        })
    }
}

/// Exact lookups only; anything unknown keeps the source text
pub struct ExactTranslator {
    glossary: Glossary,
    todo_marker: String,
}

impl ExactTranslator {
    pub fn new(glossary: Glossary, todo_marker: String) -> Self {
        Self { glossary, todo_marker }
    }

    fn translate_value(&self, text: &str, lang: &str) -> String {
        // `alerts.*` values are key references, not text
        if text.starts_with("alerts.") {
            return text.to_string();
        }
        self.glossary.exact(text, lang).unwrap_or(text).to_string()
    }
}

#[async_trait]
impl Translator for ExactTranslator {
    async fn translate_tree(
        &mut self,
        source: &LocaleTree,
        target_language: &str,
        _existing: &LocaleTree,
    ) -> Result<TranslationOutcome> {
        let tree = map_strings(source, &mut |text: &str| self.translate_value(text, target_language));
        Ok(TranslationOutcome::new(source, tree, &self.todo_marker))
    }
}

/// Exact and substring lookups; unknown texts are marked for review
pub struct FuzzyTranslator {
    glossary: Glossary,
    protected_terms: Vec<String>,
    todo_marker: String,
}

impl FuzzyTranslator {
    pub fn new(glossary: Glossary, protected_terms: Vec<String>, todo_marker: String) -> Self {
        let mut terms = protected_terms;
        for term in &glossary.terms {
            if !terms.contains(term) {
                terms.push(term.clone());
            }
        }
        Self {
            glossary,
            protected_terms: terms,
            todo_marker,
        }
    }

    fn translate_value(&self, text: &str, lang: &str) -> String {
        if self.protected_terms.iter().any(|term| text.contains(term.as_str())) {
            return text.to_string();
        }

        if let Some(translated) = self.glossary.exact(text, lang) {
            return translated.to_string();
        }

        if let Some((source, translated)) = self.glossary.first_contained_ignore_case(text, lang) {
            return text.replace(source, translated);
        }

        format!("{} {}]", self.todo_marker, text)
    }
}

#[async_trait]
impl Translator for FuzzyTranslator {
    async fn translate_tree(
        &mut self,
        source: &LocaleTree,
        target_language: &str,
        _existing: &LocaleTree,
    ) -> Result<TranslationOutcome> {
        let tree = map_strings(source, &mut |text: &str| self.translate_value(text, target_language));
        let outcome = TranslationOutcome::new(source, tree, &self.todo_marker);
        info!("{}: {} values marked for review", target_language, outcome.stats.pending);
        Ok(outcome)
    }
}

/// Revisits an existing translation, rewriting only values still equal to the
/// source text or carrying the review marker
pub struct FillTranslator {
    glossary: Glossary,
    todo_marker: String,
}

impl FillTranslator {
    pub fn new(glossary: Glossary, todo_marker: String) -> Self {
        Self { glossary, todo_marker }
    }

    fn fill(&self, target: &mut LocaleTree, source: Option<&LocaleTree>, lang: &str) -> usize {
        let mut rewritten = 0;

        for (key, value) in target.iter_mut() {
            let source_value = source.and_then(|s| s.get(key));
            match value {
                Value::Object(child) => {
                    let source_child = source_value.and_then(Value::as_object);
                    rewritten += self.fill(child, source_child, lang);
                }
                Value::String(text) => {
                    let untranslated = source_value.and_then(Value::as_str) == Some(text.as_str())
                        || text.starts_with(&self.todo_marker);
                    if !untranslated {
                        continue;
                    }
                    if let Some((source_text, translated)) = self.glossary.first_contained(text, lang) {
                        if source_text == translated {
                            continue;
                        }
                        debug!("{}: '{}' -> '{}'", key, source_text, translated);
                        *text = text.replace(source_text, translated);
                        rewritten += 1;
                    }
                }
                _ => {}
            }
        }

        rewritten
    }
}

#[async_trait]
impl Translator for FillTranslator {
    async fn translate_tree(
        &mut self,
        source: &LocaleTree,
        target_language: &str,
        existing: &LocaleTree,
    ) -> Result<TranslationOutcome> {
        let mut tree = existing.clone();
        let rewritten = self.fill(&mut tree, Some(source), target_language);
        info!("{}: rewrote {} values", target_language, rewritten);
        Ok(TranslationOutcome::new(source, tree, &self.todo_marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn glossary() -> Glossary {
        Glossary::from_value(json!({
            "terms": ["Toolbox"],
            "entries": {
                "Conectar": { "en": "Connect", "de": "Verbinden" },
                "Dispositivo": { "en": "Device", "de": "Gerät" },
                "Conectar dispositivo": { "en": "Connect device" }
            }
        }))
        .unwrap()
    }

    fn tree(value: serde_json::Value) -> LocaleTree {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn glossary_rejects_bad_shapes() {
        assert!(Glossary::from_value(json!(["x"])).is_err());
        assert!(Glossary::from_value(json!({ "entries": { "a": "b" } })).is_err());
        assert!(Glossary::from_value(json!({ "terms": [1] })).is_err());
        assert!(Glossary::from_value(json!({})).unwrap().is_empty());
    }

    #[test]
    fn exact_keeps_unknown_text_and_alert_references() {
        let mut translator = ExactTranslator::new(glossary(), "[TODO:".into());
        let source = tree(json!({
            "usb": { "connect": "Conectar", "other": "Otro" },
            "alert": "alerts.error",
            "count": 3
        }));

        let outcome = tokio_test::block_on(translator.translate_tree(&source, "de", &LocaleTree::new())).unwrap();

        assert_eq!(
            Value::Object(outcome.tree),
            json!({ "usb": { "connect": "Verbinden", "other": "Otro" }, "alert": "alerts.error", "count": 3 })
        );
        assert_eq!(outcome.stats.total, 3);
        assert_eq!(outcome.stats.translated, 1);
    }

    #[test]
    fn fuzzy_protects_terms_and_marks_unknown_text() {
        let translator = FuzzyTranslator::new(glossary(), vec!["USB".into()], "[TODO:".into());

        assert_eq!(translator.translate_value("Puerto USB", "en"), "Puerto USB");
        assert_eq!(translator.translate_value("Abrir Toolbox", "en"), "Abrir Toolbox");
        assert_eq!(translator.translate_value("Conectar dispositivo", "en"), "Connect device");
        assert_eq!(translator.translate_value("Dispositivo nuevo", "de"), "Gerät nuevo");
        // matched ignoring case, but the replacement itself is case sensitive
        assert_eq!(translator.translate_value("sin dispositivo", "en"), "sin dispositivo");
        assert_eq!(translator.translate_value("Reiniciar", "en"), "[TODO: Reiniciar]");
    }

    #[test]
    fn fill_only_touches_untranslated_values() {
        let mut translator = FillTranslator::new(glossary(), "[TODO:".into());
        let source = tree(json!({ "a": "Conectar ahora", "b": "Dispositivo", "c": "Conectar" }));
        let existing = tree(json!({ "a": "Conectar ahora", "b": "[TODO: Dispositivo]", "c": "Link up" }));

        let outcome = tokio_test::block_on(translator.translate_tree(&source, "en", &existing)).unwrap();

        assert_eq!(
            Value::Object(outcome.tree),
            json!({ "a": "Connect ahora", "b": "[TODO: Device]", "c": "Link up" })
        );
        assert_eq!(outcome.stats.pending, 1);
    }

    #[test]
    fn fill_stops_at_the_first_contained_entry() {
        let glossary = Glossary::from_value(json!({
            "entries": {
                "Conectar dispositivo": { "en": "Connect device" },
                "Dispositivo": { "en": "Device", "de": "Gerät" }
            }
        }))
        .unwrap();
        let mut translator = FillTranslator::new(glossary, "[TODO:".into());
        let source = tree(json!({ "a": "Conectar dispositivo", "b": "Dispositivo" }));
        let existing = source.clone();

        let outcome = tokio_test::block_on(translator.translate_tree(&source, "de", &existing)).unwrap();

        // no German for the first match, so the text stays as it was
        assert_eq!(
            Value::Object(outcome.tree),
            json!({ "a": "Conectar dispositivo", "b": "Gerät" })
        );
    }
}
