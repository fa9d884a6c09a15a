//! Translation patches.
//!
//! A patch is a hand-written dictionary of new or corrected strings for one
//! or more languages, stored as JSON or TOML. Three layouts are accepted:
//!
//! - `language`: `{ "es": { ...tree... }, "en": { ... } }`
//! - `section`: `{ "alerts": { "es": { ...tree... }, "en": { ... } } }`
//! - `key`: `{ "alerts": { "error": { "es": "Error", "en": "Error" } } }`

use std::path::{Path, PathBuf};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{Result, L10nError};
use crate::locale::{LocaleStore, LocaleTree, MergeStats, MergeStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchLayout {
    #[default]
    Language,
    Section,
    Key,
}

/// One dictionary to merge into one language, optionally scoped to a section
#[derive(Debug, Clone, PartialEq)]
pub struct PatchUnit {
    pub language: String,
    pub section: Option<String>,
    pub tree: LocaleTree,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub units: Vec<PatchUnit>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub strategy: MergeStrategy,
    /// Restrict the languages touched; `None` applies every language in the patch
    pub languages: Option<Vec<String>>,
    /// Create locale files that do not exist yet
    pub create_missing: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageReport {
    pub language: String,
    pub path: PathBuf,
    pub stats: MergeStats,
    pub written: bool,
}

impl Patch {
    /// Read a patch file; `.toml` files are parsed as TOML, everything else as JSON
    pub fn from_file<P: AsRef<Path>>(path: P, layout: PatchLayout) -> Result<Self> {
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

        Self::from_value(value, layout)
    }

    pub fn from_value(value: Value, layout: PatchLayout) -> Result<Self> {
        let root = expect_object(value, "patch")?;
        let mut units = Vec::new();

        match layout {
            PatchLayout::Language => {
                for (language, tree) in root {
                    let tree = expect_object(tree, &language)?;
                    units.push(PatchUnit { language, section: None, tree });
                }
            }
            PatchLayout::Section => {
                for (section, languages) in root {
                    for (language, tree) in expect_object(languages, &section)? {
                        let tree = expect_object(tree, &format!("{}.{}", section, language))?;
                        units.push(PatchUnit {
                            language,
                            section: Some(section.clone()),
                            tree,
                        });
                    }
                }
            }
            PatchLayout::Key => {
                for (section, keys) in root {
                    let mut per_language: Vec<(String, LocaleTree)> = Vec::new();
                    for (key, texts) in expect_object(keys, &section)? {
                        for (language, text) in expect_object(texts, &format!("{}.{}", section, key))? {
                            let idx = match per_language.iter().position(|(l, _)| *l == language) {
                                Some(idx) => idx,
                                None => {
                                    per_language.push((language, Map::new()));
                                    per_language.len() - 1
                                }
                            };
                            per_language[idx].1.insert(key.clone(), text);
                        }
                    }
                    units.extend(per_language.into_iter().map(|(language, tree)| PatchUnit {
                        language,
                        section: Some(section.clone()),
                        tree,
                    }));
                }
            }
        }

        Ok(Self { units })
    }

    /// Languages mentioned by the patch, in first-seen order
    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = Vec::new();
        for unit in &self.units {
            if !langs.contains(&unit.language) {
                langs.push(unit.language.clone());
            }
        }
        langs
    }

    /// Merge every unit for `language` into `tree`
    pub fn merge_into(&self, language: &str, tree: &mut LocaleTree, strategy: MergeStrategy) -> Result<MergeStats> {
        let mut stats = MergeStats::default();

        for unit in self.units.iter().filter(|u| u.language == language) {
            let target = match &unit.section {
                None => &mut *tree,
                Some(section) => {
                    let slot = tree
                        .entry(section.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    slot.as_object_mut().ok_or_else(|| {
                        L10nError::Patch(format!(
                            "section '{}' in {} locale is not an object",
                            section, language
                        ))
                    })?
                }
            };
            stats.absorb(strategy.merge(target, &unit.tree));
        }

        Ok(stats)
    }

    /// Apply the patch to the locale files of `store`
    pub fn apply(&self, store: &LocaleStore, options: &ApplyOptions) -> Result<Vec<LanguageReport>> {
        let languages: Vec<String> = self
            .languages()
            .into_iter()
            .filter(|lang| options.languages.as_ref().is_none_or(|selected| selected.contains(lang)))
            .collect();

        if !options.create_missing {
            if let Some(missing) = languages.iter().find(|lang| !store.exists(lang)) {
                return Err(L10nError::FileNotFound(store.path_for(missing).display().to_string()));
            }
        }

        // load and merge everything first so a bad file aborts before any write
        let mut merged = Vec::with_capacity(languages.len());
        for language in languages {
            let mut tree = if store.exists(&language) {
                store.load(&language)?
            } else {
                warn!("Creating new locale file for {}", language);
                Map::new()
            };
            let stats = self.merge_into(&language, &mut tree, options.strategy)?;
            merged.push((language, tree, stats));
        }

        let mut reports = Vec::new();
        for (language, tree, stats) in merged {
            let path = store.path_for(&language);

            let written = !options.dry_run && (!stats.is_noop() || !path.exists());
            if written {
                store.save(&language, &tree)?;
            }

            info!(
                "{}: {} added, {} changed, {} unchanged{}",
                language,
                stats.added,
                stats.changed,
                stats.unchanged,
                if options.dry_run { " (dry run)" } else { "" }
            );

            reports.push(LanguageReport { language, path, stats, written });
        }

        Ok(reports)
    }
}

fn expect_object(value: Value, context: &str) -> Result<LocaleTree> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(L10nError::Patch(format!("'{}' must be an object", context))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_layout_groups_by_language_and_section() {
        let patch = Patch::from_value(
            json!({
                "usb": {
                    "manufacturer": { "es": "Fabricante", "en": "Manufacturer", "de": "Hersteller" },
                    "product": { "es": "Producto", "en": "Product" }
                }
            }),
            PatchLayout::Key,
        )
        .unwrap();

        assert_eq!(patch.languages(), vec!["es", "en", "de"]);
        let de = patch.units.iter().find(|u| u.language == "de").unwrap();
        assert_eq!(de.section.as_deref(), Some("usb"));
        assert_eq!(Value::Object(de.tree.clone()), json!({ "manufacturer": "Hersteller" }));
    }

    #[test]
    fn section_layout_merges_under_section() {
        let patch = Patch::from_value(
            json!({ "tabs": { "en": { "home": "Home" }, "de": { "home": "Start" } } }),
            PatchLayout::Section,
        )
        .unwrap();

        let mut en = Map::new();
        en.insert("tabs".into(), json!({ "settings": "Settings" }));
        let stats = patch.merge_into("en", &mut en, MergeStrategy::Deep).unwrap();

        assert_eq!(stats.added, 1);
        assert_eq!(Value::Object(en), json!({ "tabs": { "settings": "Settings", "home": "Home" } }));
    }

    #[test]
    fn shallow_section_merge_replaces_nested_values() {
        let patch = Patch::from_value(
            json!({ "profiles": { "es": { "notes": { "a": "nuevo" } } } }),
            PatchLayout::Section,
        )
        .unwrap();

        let mut es = Map::new();
        es.insert("profiles".into(), json!({ "notes": { "a": "viejo", "b": "otro" }, "unknown": "Desconocido" }));
        patch.merge_into("es", &mut es, MergeStrategy::Shallow).unwrap();

        assert_eq!(
            Value::Object(es),
            json!({ "profiles": { "notes": { "a": "nuevo" }, "unknown": "Desconocido" } })
        );
    }

    #[test]
    fn section_that_is_not_an_object_is_rejected() {
        let patch = Patch::from_value(json!({ "alerts": { "es": { "x": "y" } } }), PatchLayout::Section).unwrap();
        let mut es = Map::new();
        es.insert("alerts".into(), json!("flat"));

        let err = patch.merge_into("es", &mut es, MergeStrategy::Deep).unwrap_err();
        assert!(matches!(err, L10nError::Patch(_)));
    }

    #[test]
    fn language_layout_requires_objects() {
        let err = Patch::from_value(json!({ "es": "nope" }), PatchLayout::Language).unwrap_err();
        assert!(err.to_string().contains("'es' must be an object"));
    }

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, LocaleStore) {
        let dir = tempfile::tempdir().unwrap();
        for (lang, content) in files {
            std::fs::write(dir.path().join(format!("{}.json", lang)), content).unwrap();
        }
        let store = LocaleStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn invalid_locale_aborts_before_any_file_is_written() {
        let (dir, store) = store_with(&[("es", r#"{"a":"viejo"}"#), ("en", r#"{"a": "#)]);
        let patch = Patch::from_value(json!({ "es": { "a": "nuevo" }, "en": { "a": "new" } }), PatchLayout::Language)
            .unwrap();

        assert!(patch.apply(&store, &ApplyOptions::default()).is_err());
        assert_eq!(std::fs::read_to_string(dir.path().join("es.json")).unwrap(), r#"{"a":"viejo"}"#);
    }

    #[test]
    fn bad_section_in_a_later_language_leaves_earlier_files_alone() {
        let (dir, store) = store_with(&[("es", r#"{"tabs":{}}"#), ("en", r#"{"tabs":"flat"}"#)]);
        let patch = Patch::from_value(
            json!({ "tabs": { "es": { "home": "Inicio" }, "en": { "home": "Home" } } }),
            PatchLayout::Section,
        )
        .unwrap();

        let err = patch.apply(&store, &ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, L10nError::Patch(_)));
        assert_eq!(std::fs::read_to_string(dir.path().join("es.json")).unwrap(), r#"{"tabs":{}}"#);
    }

    #[test]
    fn language_filter_skips_unselected_languages() {
        let (dir, store) = store_with(&[("es", r#"{"a":"viejo"}"#), ("en", r#"{"a":"old"}"#)]);
        let patch = Patch::from_value(json!({ "es": { "a": "nuevo" }, "en": { "a": "new" }, "de": { "a": "neu" } }), PatchLayout::Language)
            .unwrap();
        let options = ApplyOptions {
            languages: Some(vec!["en".to_string()]),
            ..Default::default()
        };

        // de.json is missing but not selected, so no error
        let reports = patch.apply(&store, &options).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].language, "en");
        assert_eq!(reports[0].stats.changed, 1);
        assert_eq!(store.load("en").unwrap()["a"], json!("new"));
        assert_eq!(std::fs::read_to_string(dir.path().join("es.json")).unwrap(), r#"{"a":"viejo"}"#);
        assert!(!dir.path().join("de.json").exists());
    }
}
