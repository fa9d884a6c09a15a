use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, L10nError};
use crate::locale::{contains_key, flatten, LocaleTree};
use super::hardcoded::write_json;
use super::SourceWalker;

const T_CALL_PATTERNS: &[&str] = &[
    r#"\bt\(['"]([^'"]+)['"]\)"#,
    r"\bt\(`([^`]+)`\)",
];

/// Statically referenced translation keys
pub struct UsageScanner {
    patterns: Vec<Regex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageUsage {
    pub defined_keys: usize,
    pub missing: Vec<String>,
    pub unused: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub generated_at: DateTime<Utc>,
    pub total_used_keys: usize,
    pub used_keys: Vec<String>,
    pub languages: BTreeMap<String, LanguageUsage>,
}

impl UsageScanner {
    pub fn new() -> Result<Self> {
        let patterns = T_CALL_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Keys of `t('...')` calls; interpolated keys are skipped
    pub fn extract(&self, content: &str) -> BTreeSet<String> {
        self.patterns
            .iter()
            .flat_map(|re| re.captures_iter(content))
            .map(|caps| caps[1].to_string())
            .filter(|key| !key.contains('{'))
            .collect()
    }

    pub fn scan(&self, walker: &SourceWalker) -> BTreeSet<String> {
        walker
            .read_all()
            .iter()
            .flat_map(|(_, content)| self.extract(content))
            .collect()
    }
}

impl UsageReport {
    /// Compare used keys with each `(language, locale)` pair
    pub fn build(used: BTreeSet<String>, locales: &[(String, LocaleTree)]) -> Self {
        let mut languages = BTreeMap::new();

        for (lang, tree) in locales {
            let defined = flatten(tree, ".");
            let missing = used
                .iter()
                .filter(|key| !contains_key(tree, key))
                .cloned()
                .collect();
            let unused = defined
                .keys()
                .filter(|key| !used.contains(*key))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            languages.insert(
                lang.clone(),
                LanguageUsage {
                    defined_keys: defined.len(),
                    missing,
                    unused,
                },
            );
        }

        Self {
            generated_at: Utc::now(),
            total_used_keys: used.len(),
            used_keys: used.into_iter().collect(),
            languages,
        }
    }

    pub fn has_missing(&self) -> bool {
        self.languages.values().any(|usage| !usage.missing.is_empty())
    }

    /// `Locale` error naming each language with missing keys
    pub fn ensure_complete(&self) -> Result<()> {
        let incomplete: Vec<String> = self
            .languages
            .iter()
            .filter(|(_, usage)| !usage.missing.is_empty())
            .map(|(lang, usage)| format!("{} ({})", lang, usage.missing.len()))
            .collect();

        if incomplete.is_empty() {
            Ok(())
        } else {
            Err(L10nError::Locale(format!("translation keys are missing: {}", incomplete.join(", "))))
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(path.as_ref(), self)
    }
}
