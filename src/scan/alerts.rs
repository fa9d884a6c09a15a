use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Result, L10nError};
use crate::keys::text_to_key;
use crate::locale::LocaleTree;
use crate::translate::Glossary;
use super::hardcoded::write_json;
use super::SourceWalker;

const QUOTED_ALERT: &str = r#"Alert\.alert\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]\s*\)"#;
const TEMPLATE_ALERT: &str = r#"Alert\.alert\(\s*['"]([^'"]+)['"]\s*,\s*`([^`]+)`\s*\)"#;

/// Import added to files whose alerts were migrated
pub const SHOW_ALERT_IMPORT: &str = "import { showAlert } from '@/lib/translated-alert';";
const SHOW_ALERT_MODULE: &str = "@/lib/translated-alert";

/// Locale section holding alert texts
pub const ALERTS_SECTION: &str = "alerts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCall {
    pub file: String,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsAnalysis {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub unique_titles: Vec<String>,
    pub unique_messages: Vec<String>,
    pub by_title: BTreeMap<String, Vec<String>>,
    pub all_alerts: Vec<AlertCall>,
}

/// Translations generated from an analysis
#[derive(Debug, Clone, Default)]
pub struct AlertTranslations {
    /// language -> `{ "alerts": { key: text } }`
    pub trees: Vec<(String, LocaleTree)>,
    /// original text -> `alerts.<key>`
    pub mapping: BTreeMap<String, String>,
}

/// Result of rewriting one file
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub content: String,
    pub replacements: usize,
}

/// Two-argument `Alert.alert` calls with literal arguments
pub struct AlertScanner {
    quoted: Regex,
    template: Regex,
}

impl AlertScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            quoted: Regex::new(QUOTED_ALERT)?,
            template: Regex::new(TEMPLATE_ALERT)?,
        })
    }

    pub fn extract(&self, file: &str, content: &str) -> Vec<AlertCall> {
        self.quoted
            .captures_iter(content)
            .chain(self.template.captures_iter(content))
            .map(|caps| AlertCall {
                file: file.to_string(),
                title: caps[1].to_string(),
                message: caps[2].to_string(),
            })
            .collect()
    }

    pub fn analyze(&self, walker: &SourceWalker) -> AlertsAnalysis {
        let mut all_alerts = Vec::new();
        for (file, content) in walker.read_all() {
            all_alerts.extend(self.extract(&file.relative, &content));
        }
        AlertsAnalysis::from_calls(all_alerts)
    }

    /// Replace mapped alerts with `showAlert` calls and add the import when needed
    pub fn migrate_source(&self, content: &str, mapping: &BTreeMap<String, String>) -> Migration {
        let mut replacements = 0;

        let rewritten = self.quoted.replace_all(content, |caps: &Captures| {
            let title = &caps[1];
            let message = &caps[2];

            match (mapping.get(title), mapping.get(message)) {
                (Some(title_key), Some(message_key)) => {
                    replacements += 1;
                    format!("showAlert('{}', '{}')", title_key, message_key)
                }
                (Some(title_key), None) => {
                    replacements += 1;
                    format!("showAlert('{}', '{}')", title_key, message)
                }
                _ => caps[0].to_string(),
            }
        });

        let mut content = rewritten.into_owned();
        if replacements > 0 && !has_show_alert_import(&content) {
            content = insert_import(&content, SHOW_ALERT_IMPORT);
        }

        Migration { content, replacements }
    }

    /// Migrate every file of the walker; returns `(relative path, replacements)` of changed files
    pub fn migrate(
        &self,
        walker: &SourceWalker,
        mapping: &BTreeMap<String, String>,
        dry_run: bool,
    ) -> Result<Vec<(String, usize)>> {
        let mut changed = Vec::new();

        for (file, content) in walker.read_all() {
            let migration = self.migrate_source(&content, mapping);
            if migration.content == content {
                continue;
            }

            if !dry_run {
                std::fs::write(&file.path, &migration.content)?;
            }
            info!("{}: {} replacements", file.relative, migration.replacements);
            changed.push((file.relative, migration.replacements));
        }

        Ok(changed)
    }
}

fn has_show_alert_import(content: &str) -> bool {
    content.contains(&format!("from '{}'", SHOW_ALERT_MODULE))
        || content.contains(&format!("from \"{}\"", SHOW_ALERT_MODULE))
}

/// Insert `import_line` after the leading import statements.
///
/// Multi-line `import { ... } from '...'` statements are kept intact.
pub fn insert_import(content: &str, import_line: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut insert_at = 0;
    let mut idx = 0;

    while idx < lines.len() {
        let trimmed = lines[idx].trim();
        if trimmed.is_empty() {
            idx += 1;
            continue;
        }
        if !trimmed.starts_with("import ") && !trimmed.starts_with("import{") {
            break;
        }

        // walk to the line that closes this import statement
        let mut end = idx;
        while end < lines.len() && !closes_import(lines[end].trim(), end == idx) {
            end += 1;
        }
        if end == lines.len() {
            break;
        }
        idx = end + 1;
        insert_at = idx;
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    out.extend_from_slice(&lines[..insert_at]);
    out.push(import_line);
    out.extend_from_slice(&lines[insert_at..]);
    out.join("\n")
}

fn closes_import(line: &str, first_line: bool) -> bool {
    let side_effect = first_line && (line.starts_with("import '") || line.starts_with("import \""));
    side_effect || line.contains(" from ") || line.starts_with("from ") || line.starts_with("} from")
}

impl AlertsAnalysis {
    pub fn from_calls(all_alerts: Vec<AlertCall>) -> Self {
        let mut titles = BTreeSet::new();
        let mut messages = BTreeSet::new();
        let mut by_title: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for alert in &all_alerts {
            titles.insert(alert.title.clone());
            messages.insert(alert.message.clone());
            by_title
                .entry(alert.title.clone())
                .or_default()
                .insert(alert.message.clone());
        }

        Self {
            generated_at: Utc::now(),
            total: all_alerts.len(),
            unique_titles: titles.into_iter().collect(),
            unique_messages: messages.into_iter().collect(),
            by_title: by_title
                .into_iter()
                .map(|(title, messages)| (title, messages.into_iter().collect()))
                .collect(),
            all_alerts,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(path.as_ref(), self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(L10nError::FileNotFound(path.display().to_string()));
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Build `alerts.*` entries for every language.
    ///
    /// The source language keeps the original text; other languages use the
    /// glossary and fall back to the source text.
    pub fn generate_translations(
        &self,
        source_language: &str,
        languages: &[String],
        glossary: &Glossary,
    ) -> AlertTranslations {
        let texts: Vec<&String> = self.unique_titles.iter().chain(self.unique_messages.iter()).collect();
        let mut result = AlertTranslations::default();

        for lang in languages {
            let mut section = Map::new();
            for text in &texts {
                let key = text_to_key(text);
                let translated = if lang == source_language {
                    text.to_string()
                } else {
                    glossary.exact(text, lang).unwrap_or(text.as_str()).to_string()
                };
                section.insert(key, Value::String(translated));
            }
            debug!("{}: {} alert keys", lang, section.len());

            let mut tree = Map::new();
            tree.insert(ALERTS_SECTION.to_string(), Value::Object(section));
            result.trees.push((lang.clone(), tree));
        }

        for text in texts {
            result
                .mapping
                .insert(text.clone(), format!("{}.{}", ALERTS_SECTION, text_to_key(text)));
        }

        result
    }
}

/// Load a `text -> key` mapping file written by `alerts generate`
pub fn load_mapping<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(L10nError::FileNotFound(path.display().to_string()));
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

pub fn save_mapping<P: AsRef<Path>>(path: P, mapping: &BTreeMap<String, String>) -> Result<()> {
    write_json(path.as_ref(), mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn extract_handles_quotes_and_templates() {
        let scanner = AlertScanner::new().unwrap();
        let source = r#"
Alert.alert('Error', "No hay dispositivo USB conectado");
Alert.alert(
  'Sin Resultados',
  `Se encontraron ${count} dispositivos`
);
Alert.alert('Solo título');
"#;
        let calls = scanner.extract("app/(tabs)/usb.tsx", source);

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].title, "Error");
        assert_eq!(calls[0].message, "No hay dispositivo USB conectado");
        assert_eq!(calls[1].title, "Sin Resultados");
        assert_eq!(calls[1].message, "Se encontraron ${count} dispositivos");
    }

    #[test]
    fn analysis_dedupes_and_sorts() {
        let call = |title: &str, message: &str| AlertCall {
            file: "app/x.tsx".into(),
            title: title.into(),
            message: message.into(),
        };
        let analysis = AlertsAnalysis::from_calls(vec![
            call("Éxito", "Guardado"),
            call("Error", "Falló B"),
            call("Error", "Falló A"),
            call("Error", "Falló B"),
        ]);

        assert_eq!(analysis.total, 4);
        assert_eq!(analysis.unique_titles, vec!["Error", "Éxito"]);
        assert_eq!(analysis.by_title["Error"], vec!["Falló A", "Falló B"]);
    }

    #[test]
    fn migrate_rewrites_mapped_alerts_and_adds_import() {
        let scanner = AlertScanner::new().unwrap();
        let source = "import React from 'react';\nimport {\n  Alert,\n  View,\n} from 'react-native';\n\nexport function save() {\n  Alert.alert('Error', 'Los PINs no coinciden');\n  Alert.alert('Éxito', 'Sin clave');\n  Alert.alert('Otro', 'Nada');\n}\n";
        let map = mapping(&[
            ("Error", "alerts.error"),
            ("Los PINs no coinciden", "alerts.los_pins_no_coinciden"),
            ("Éxito", "alerts.éxito"),
        ]);

        let migration = scanner.migrate_source(source, &map);

        assert_eq!(migration.replacements, 2);
        assert_eq!(
            migration.content,
            "import React from 'react';\nimport {\n  Alert,\n  View,\n} from 'react-native';\nimport { showAlert } from '@/lib/translated-alert';\n\nexport function save() {\n  showAlert('alerts.error', 'alerts.los_pins_no_coinciden');\n  showAlert('alerts.éxito', 'Sin clave');\n  Alert.alert('Otro', 'Nada');\n}\n"
        );

        // a second pass finds nothing left to do
        let again = scanner.migrate_source(&migration.content, &map);
        assert_eq!(again.replacements, 0);
        assert_eq!(again.content, migration.content);
    }

    #[test]
    fn insert_import_without_existing_imports_goes_first() {
        assert_eq!(insert_import("const a = 1;", SHOW_ALERT_IMPORT), format!("{}\nconst a = 1;", SHOW_ALERT_IMPORT));
    }

    #[test]
    fn generate_translations_uses_glossary_with_fallback() {
        let analysis = AlertsAnalysis::from_calls(vec![AlertCall {
            file: "app/x.tsx".into(),
            title: "❌ Error".into(),
            message: "PIN Incorrecto".into(),
        }]);
        let glossary = Glossary::from_value(serde_json::json!({
            "entries": { "❌ Error": { "en": "Error", "de": "Fehler" } }
        }))
        .unwrap();

        let langs = vec!["es".to_string(), "en".to_string(), "de".to_string()];
        let generated = analysis.generate_translations("es", &langs, &glossary);

        let de = &generated.trees[2].1;
        assert_eq!(de["alerts"]["error"], "Fehler");
        assert_eq!(de["alerts"]["pin_incorrecto"], "PIN Incorrecto");
        assert_eq!(generated.trees[0].1["alerts"]["error"], "❌ Error");
        assert_eq!(generated.mapping["PIN Incorrecto"], "alerts.pin_incorrecto");
    }
}
