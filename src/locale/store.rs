use std::io::Write;
use std::path::{Path, PathBuf};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Result, L10nError};
use super::LocaleTree;

/// Directory of `<lang>.json` locale files
#[derive(Debug, Clone)]
pub struct LocaleStore {
    dir: PathBuf,
}

impl LocaleStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, lang: &str) -> PathBuf {
        self.dir.join(format!("{}.json", lang))
    }

    pub fn exists(&self, lang: &str) -> bool {
        self.path_for(lang).is_file()
    }

    /// Load a locale document. The top level must be a JSON object.
    pub fn load(&self, lang: &str) -> Result<LocaleTree> {
        let path = self.path_for(lang);
        if !path.is_file() {
            return Err(L10nError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        parse_locale(&content)
            .map_err(|e| L10nError::Locale(format!("{}: {}", path.display(), e)))
    }

    /// Load a locale document, treating a missing file as empty
    pub fn load_or_empty(&self, lang: &str) -> Result<LocaleTree> {
        if self.exists(lang) {
            self.load(lang)
        } else {
            debug!("No locale file for {}, starting empty", lang);
            Ok(Map::new())
        }
    }

    /// Write a locale document as two-space indented UTF-8 JSON.
    ///
    /// The document is written to a temporary file next to the target and
    /// then renamed over it, so a failed run never leaves a truncated locale.
    pub fn save(&self, lang: &str, tree: &LocaleTree) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(lang);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(render_locale(tree)?.as_bytes())?;
        tmp.flush()?;
        // temp files are created 0600, keep the mode of the file being replaced
        if path.exists() {
            tmp.as_file().set_permissions(std::fs::metadata(&path)?.permissions())?;
        }
        tmp.persist(&path)
            .map_err(|e| L10nError::Io(e.error))?;

        info!("Updated {}", path.display());
        Ok(path)
    }

    /// Language codes with a locale file present, sorted
    pub fn languages(&self) -> Result<Vec<String>> {
        let mut langs = Vec::new();
        if !self.dir.is_dir() {
            return Ok(langs);
        }

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    langs.push(stem.to_string());
                }
            }
        }

        langs.sort();
        Ok(langs)
    }
}

/// Parse a locale document from text
pub fn parse_locale(content: &str) -> Result<LocaleTree> {
    match serde_json::from_str::<Value>(content)? {
        Value::Object(map) => Ok(map),
        other => Err(L10nError::Locale(format!(
            "top level must be an object, found {}",
            json_kind(&other)
        ))),
    }
}

/// Render a locale document the way the app's locale files are formatted
pub fn render_locale(tree: &LocaleTree) -> Result<String> {
    let mut content = serde_json::to_string_pretty(tree)?;
    content.push('\n');
    Ok(content)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_writes_unescaped_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocaleStore::new(dir.path());

        let mut tree = Map::new();
        tree.insert("alerts".into(), json!({ "multiples_dispositivos": "Mehrere Geräte" }));
        store.save("de", &tree).unwrap();

        let written = std::fs::read_to_string(store.path_for("de")).unwrap();
        assert_eq!(
            written,
            "{\n  \"alerts\": {\n    \"multiples_dispositivos\": \"Mehrere Geräte\"\n  }\n}\n"
        );
        assert_eq!(store.load("de").unwrap(), tree);
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_the_mode_of_an_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = LocaleStore::new(dir.path());
        let path = store.path_for("en");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut tree = Map::new();
        tree.insert("title".into(), json!("Settings"));
        store.save("en", &tree).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert_eq!(store.load("en").unwrap(), tree);
    }

    #[test]
    fn load_rejects_non_object_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en.json"), "[1, 2]").unwrap();

        let store = LocaleStore::new(dir.path());
        let err = store.load("en").unwrap_err();
        assert!(matches!(err, L10nError::Locale(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn missing_locale_is_reported_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocaleStore::new(dir.path());

        assert!(matches!(store.load("fr"), Err(L10nError::FileNotFound(_))));
        assert!(store.load_or_empty("fr").unwrap().is_empty());
    }

    #[test]
    fn languages_lists_json_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["es.json", "de.json", "notes.txt", "en.json"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }

        let store = LocaleStore::new(dir.path());
        assert_eq!(store.languages().unwrap(), vec!["de", "en", "es"]);
    }
}
