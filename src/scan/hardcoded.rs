use std::collections::BTreeMap;
use std::path::Path;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{Result, L10nError};
use crate::keys::{categorize_by_file, is_common_text, normalize_key, KeyAllocator};
use crate::locale::LocaleTree;
use super::{line_of, SourceWalker};

/// Short Spanish words that betray untranslated UI text
const SPANISH_WORDS: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "de", "del", "al",
    "con", "sin", "por", "para", "en", "es", "está", "son",
    "configuración", "conexión", "dispositivo", "error", "éxito",
    "conectar", "desconectar", "escanear", "guardar", "cancelar",
    "aceptar", "continuar", "sí", "no", "advertencia", "información",
];

const SPANISH_CHARS: &str = "áéíóúñ¿¡";

/// Where in the markup a hardcoded string was found
const PATTERNS: &[(&str, &str)] = &[
    ("jsx-text", r"<Text[^>]*>([^<{]+)</Text>"),
    ("prop", r#"(?:text|title|label|placeholder|description)=["']([ \w\dáéíóúñÁÉÍÓÚÑ¡¿!?,.:;()\-]+)["']"#),
    ("object-field", r#"(?:text|title|label|message|description):\s*["']([^"']+)["']"#),
    ("alert", r#"Alert\.alert\(["']([^"']+)["']"#),
    ("show-alert", r#"showAlert\(["']([^"']+)["']"#),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardcodedString {
    pub text: String,
    pub line: usize,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardcodedReport {
    pub generated_at: DateTime<Utc>,
    /// Project-relative file path -> strings found in it
    pub files: BTreeMap<String, Vec<HardcodedString>>,
}

/// Detects hardcoded Spanish UI text in TSX/TS sources
pub struct HardcodedExtractor {
    patterns: Vec<(&'static str, Regex)>,
}

impl HardcodedExtractor {
    pub fn new() -> Result<Self> {
        let patterns = PATTERNS
            .iter()
            .map(|(label, pattern)| Ok((*label, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// All Spanish-looking strings of one source file
    pub fn extract(&self, content: &str) -> Vec<HardcodedString> {
        let mut found = Vec::new();

        for (label, regex) in &self.patterns {
            for caps in regex.captures_iter(content) {
                let Some(group) = caps.get(1) else { continue };
                let text = group.as_str().trim();
                if is_spanish_text(text) {
                    found.push(HardcodedString {
                        text: text.to_string(),
                        line: line_of(content, caps.get(0).map_or(group.start(), |m| m.start())),
                        pattern: label.to_string(),
                    });
                }
            }
        }

        found
    }

    pub fn scan(&self, walker: &SourceWalker) -> HardcodedReport {
        let mut files = BTreeMap::new();

        for (file, content) in walker.read_all() {
            let strings = self.extract(&content);
            if !strings.is_empty() {
                files.insert(file.relative, strings);
            }
        }

        let report = HardcodedReport {
            generated_at: Utc::now(),
            files,
        };
        info!(
            "Found {} hardcoded strings in {} files",
            report.total_strings(),
            report.files.len()
        );
        report
    }
}

/// Heuristic: at least three characters and either a Spanish-only character or a common Spanish word
pub fn is_spanish_text(text: &str) -> bool {
    let text = text.trim();
    if text.chars().count() < 3 {
        return false;
    }

    let lower = text.to_lowercase();
    if lower.chars().any(|c| SPANISH_CHARS.contains(c)) {
        return true;
    }

    lower.split_whitespace().any(|word| SPANISH_WORDS.contains(&word))
}

impl HardcodedReport {
    pub fn total_strings(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Files with the most strings, largest first
    pub fn top_files(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .files
            .iter()
            .map(|(path, strings)| (path.as_str(), strings.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(limit);
        counts
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(path.as_ref(), self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(L10nError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Group strings into `category -> key -> text` sections.
    ///
    /// The category comes from the file name unless the text is a shared UI
    /// word, in which case it lands in `common`.
    pub fn generate_keys(&self) -> LocaleTree {
        let mut allocator = KeyAllocator::new();
        let mut sections = Map::new();

        for (file, strings) in &self.files {
            let file_category = categorize_by_file(file);
            for item in strings {
                let category = if is_common_text(&item.text) { "common" } else { file_category };
                let key = allocator.allocate(category, &normalize_key(&item.text));

                let section = sections
                    .entry(category.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(section) = section {
                    section.insert(key, Value::String(item.text.clone()));
                }
            }
        }

        sections
    }
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    info!("Results saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: &str = r#"import { Text, View } from 'react-native';

export default function UsbStatus() {
  return (
    <View>
      <Text style={styles.title}>Estado del dispositivo</Text>
      <Text>OK</Text>
      <IosButton title="Conectar adaptador" />
      <Field label="VID" />
    </View>
  );
}

const steps = [{ description: 'Desconecta el cable USB' }];
Alert.alert('Éxito', 'Listo');
"#;

    #[test]
    fn spanish_detection() {
        assert!(is_spanish_text("Configuración guardada"));
        assert!(is_spanish_text("Sin resultados"));
        assert!(is_spanish_text("¿Continuar?"));
        assert!(!is_spanish_text("OK"));
        assert!(!is_spanish_text("Scan complete"));
        assert!(!is_spanish_text("  ñ "));
    }

    #[test]
    fn extract_finds_each_pattern_with_line_numbers() {
        let extractor = HardcodedExtractor::new().unwrap();
        let found = extractor.extract(SCREEN);

        let summary: Vec<(&str, usize, &str)> = found
            .iter()
            .map(|s| (s.text.as_str(), s.line, s.pattern.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Estado del dispositivo", 6, "jsx-text"),
                ("Conectar adaptador", 8, "prop"),
                ("Desconecta el cable USB", 14, "object-field"),
                ("Éxito", 15, "alert"),
            ]
        );
    }

    #[test]
    fn generate_keys_groups_by_category_and_dedupes() {
        let mut files = BTreeMap::new();
        files.insert(
            "app/(tabs)/fec.tsx".to_string(),
            vec![
                HardcodedString { text: "Código FEC inválido".into(), line: 3, pattern: "prop".into() },
                HardcodedString { text: "Código FEC inválido".into(), line: 9, pattern: "prop".into() },
                HardcodedString { text: "Guardar códigos".into(), line: 12, pattern: "prop".into() },
            ],
        );
        let report = HardcodedReport { generated_at: Utc::now(), files };

        let sections = report.generate_keys();

        assert_eq!(
            Value::Object(sections),
            serde_json::json!({
                "fec": {
                    "codigo_fec_invalido": "Código FEC inválido",
                    "codigo_fec_invalido_1": "Código FEC inválido"
                },
                "common": { "guardar_codigos": "Guardar códigos" }
            })
        );
    }

    #[test]
    fn top_files_orders_by_count() {
        let item = || HardcodedString { text: "Hola mundo".into(), line: 1, pattern: "prop".into() };
        let mut files = BTreeMap::new();
        files.insert("a.tsx".to_string(), vec![item()]);
        files.insert("b.tsx".to_string(), vec![item(), item(), item()]);
        files.insert("c.tsx".to_string(), vec![item(), item()]);
        let report = HardcodedReport { generated_at: Utc::now(), files };

        assert_eq!(report.total_strings(), 6);
        assert_eq!(report.top_files(2), vec![("b.tsx", 3), ("c.tsx", 2)]);
    }
}
