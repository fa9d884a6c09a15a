use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::assets::{self, AssetReport};
use crate::config::Config;
use crate::error::{Result, L10nError};
use crate::locale::{shallow_merge, LocaleStore, MergeStats, MergeStrategy};
use crate::media::{MediaProcessor, MediaProcessorFactory};
use crate::patch::{ApplyOptions, LanguageReport, Patch, PatchLayout, PatchUnit};
use crate::promo::{PromoReport, PromoVideo};
use crate::scan::alerts::{self, AlertScanner, AlertTranslations, AlertsAnalysis};
use crate::scan::console;
use crate::scan::hardcoded::{write_json, HardcodedExtractor, HardcodedReport};
use crate::scan::usage::{UsageReport, UsageScanner};
use crate::scan::SourceWalker;
use crate::translate::{Glossary, TranslationCache, TranslationCacheEntry, TranslationStats, TranslatorFactory, CACHE_DIR};

pub const HARDCODED_REPORT: &str = "hardcoded_strings.json";
pub const USAGE_REPORT: &str = "translation-check-results.json";
pub const ALERTS_REPORT: &str = "alerts_analysis.json";
pub const ALERTS_MAPPING: &str = "text_to_key_mapping.json";

/// Keys produced from a hardcoded strings report
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeygenReport {
    pub path: PathBuf,
    /// category -> number of generated keys
    pub categories: BTreeMap<String, usize>,
    pub stats: MergeStats,
    pub written: bool,
}

/// Translation result of one target language
#[derive(Debug, Clone, Serialize)]
pub struct LanguageTranslation {
    pub language: String,
    pub path: PathBuf,
    pub stats: TranslationStats,
    pub written: bool,
}

/// Binds the configuration to the maintenance operations
pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessor>,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        Self { config, media }
    }

    pub fn with_media(config: Config, media: Box<dyn MediaProcessor>) -> Self {
        Self { config, media }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn store(&self) -> LocaleStore {
        LocaleStore::new(self.config.project.locales_path())
    }

    fn walker(&self) -> SourceWalker {
        SourceWalker::from_project(&self.config.project)
    }

    fn report_path(&self, explicit: Option<&Path>, default_name: &str) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.project.report_path(default_name))
    }

    fn assets_path(&self, file: &str) -> PathBuf {
        self.config.project.root.join(&self.config.assets.dir).join(file)
    }

    /// Languages selected on the command line, or every configured one
    fn selected_languages(&self, languages: &[String]) -> Vec<String> {
        if languages.is_empty() {
            self.config.project.all_languages()
        } else {
            languages.to_vec()
        }
    }

    fn target_languages(&self, languages: &[String]) -> Vec<String> {
        let source = &self.config.project.source_language;
        self.selected_languages(languages)
            .into_iter()
            .filter(|lang| lang != source)
            .collect()
    }

    fn load_glossary(&self, path: Option<&Path>) -> Result<Glossary> {
        match path {
            Some(path) => Glossary::from_file(path),
            None => Ok(Glossary::default()),
        }
    }

    /// Merge a translation patch into the locale files
    pub fn merge_patch(&self, patch_file: &Path, layout: PatchLayout, options: &ApplyOptions) -> Result<Vec<LanguageReport>> {
        info!("Applying patch {}", patch_file.display());
        let patch = Patch::from_file(patch_file, layout)?;
        patch.apply(&self.store(), options)
    }

    /// Compare `t('...')` references against the locale files
    pub fn check_usage(&self, languages: &[String], output: Option<&Path>) -> Result<UsageReport> {
        let used = UsageScanner::new()?.scan(&self.walker());
        info!("Found {} unique translation keys in use", used.len());

        let store = self.store();
        let mut locales = Vec::new();
        for lang in self.selected_languages(languages) {
            match store.load(&lang) {
                Ok(tree) => locales.push((lang, tree)),
                Err(L10nError::FileNotFound(path)) => warn!("Locale file not found: {}", path),
                Err(e) => return Err(e),
            }
        }

        let report = UsageReport::build(used, &locales);
        for (lang, usage) in &report.languages {
            if usage.missing.is_empty() {
                info!("{}: all keys present", lang);
            } else {
                warn!("{}: {} missing keys", lang, usage.missing.len());
            }
        }

        report.save(self.report_path(output, USAGE_REPORT))?;
        Ok(report)
    }

    /// Scan the sources for hardcoded UI text
    pub fn extract_hardcoded(&self, output: Option<&Path>) -> Result<HardcodedReport> {
        let report = HardcodedExtractor::new()?.scan(&self.walker());
        for (file, count) in report.top_files(10) {
            info!("  {}: {} strings", file, count);
        }

        report.save(self.report_path(output, HARDCODED_REPORT))?;
        Ok(report)
    }

    /// Turn a hardcoded strings report into keys of the source locale.
    ///
    /// Each category section is merged key by key; other sections stay as they are.
    pub fn generate_keys(&self, input: Option<&Path>, dry_run: bool) -> Result<KeygenReport> {
        let report = HardcodedReport::load(self.report_path(input, HARDCODED_REPORT))?;
        let sections = report.generate_keys();

        let store = self.store();
        let lang = &self.config.project.source_language;
        let mut tree = store.load_or_empty(lang)?;
        let mut result = KeygenReport {
            path: store.path_for(lang),
            ..Default::default()
        };

        for (category, keys) in sections {
            let Value::Object(keys) = keys else { continue };
            result.categories.insert(category.clone(), keys.len());

            let entry = tree.entry(category).or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(section) = entry {
                result.stats.absorb(shallow_merge(section, &keys));
            }
        }

        for (category, count) in &result.categories {
            info!("{}: {} keys", category, count);
        }

        if !dry_run && !result.stats.is_noop() {
            store.save(lang, &tree)?;
            result.written = true;
        }
        Ok(result)
    }

    pub fn analyze_alerts(&self, output: Option<&Path>) -> Result<AlertsAnalysis> {
        let analysis = AlertScanner::new()?.analyze(&self.walker());
        info!(
            "Found {} alerts ({} unique titles, {} unique messages)",
            analysis.total,
            analysis.unique_titles.len(),
            analysis.unique_messages.len()
        );

        analysis.save(self.report_path(output, ALERTS_REPORT))?;
        Ok(analysis)
    }

    /// Build `alerts.*` translations from an analysis.
    ///
    /// Writes `alerts_translations_<lang>.json` and the text to key mapping
    /// into `output_dir`, and merges the sections into the locale files when
    /// `merge` is set.
    pub fn generate_alert_translations(
        &self,
        analysis: Option<&Path>,
        glossary: Option<&Path>,
        output_dir: Option<&Path>,
        merge: bool,
    ) -> Result<AlertTranslations> {
        let analysis = AlertsAnalysis::load(self.report_path(analysis, ALERTS_REPORT))?;
        let glossary = self.load_glossary(glossary)?;
        let languages = self.config.project.all_languages();

        let translations = analysis.generate_translations(&self.config.project.source_language, &languages, &glossary);

        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.project.root.join(&self.config.project.reports_dir));
        for (lang, tree) in &translations.trees {
            write_json(&output_dir.join(format!("alerts_translations_{}.json", lang)), tree)?;
        }
        alerts::save_mapping(output_dir.join(ALERTS_MAPPING), &translations.mapping)?;

        if merge {
            let patch = Patch {
                units: translations
                    .trees
                    .iter()
                    .map(|(language, tree)| PatchUnit {
                        language: language.clone(),
                        section: None,
                        tree: tree.clone(),
                    })
                    .collect(),
            };
            let options = ApplyOptions {
                create_missing: true,
                ..Default::default()
            };
            patch.apply(&self.store(), &options)?;
        }

        Ok(translations)
    }

    /// Rewrite mapped `Alert.alert` calls to `showAlert`
    pub fn migrate_alerts(&self, mapping: Option<&Path>, dry_run: bool) -> Result<Vec<(String, usize)>> {
        let mapping_path = match mapping {
            Some(path) => path.to_path_buf(),
            None => self.config.project.report_path(ALERTS_MAPPING),
        };
        let mapping = alerts::load_mapping(&mapping_path)?;
        info!("Loaded {} alert mappings from {}", mapping.len(), mapping_path.display());

        let changed = AlertScanner::new()?.migrate(&self.walker(), &mapping, dry_run)?;
        let total: usize = changed.iter().map(|(_, count)| count).sum();
        info!("Migrated {} alerts in {} files", total, changed.len());
        Ok(changed)
    }

    /// Translate the source locale into every selected target language
    pub async fn translate_locales(
        &self,
        languages: &[String],
        glossary: Option<&Path>,
        dry_run: bool,
    ) -> Result<Vec<LanguageTranslation>> {
        let store = self.store();
        let source_language = &self.config.project.source_language;
        let source = store.load(source_language)?;

        let glossary = self.load_glossary(glossary)?;
        let mut translator =
            TranslatorFactory::create_translator(self.config.translate.clone(), glossary, source_language)?;

        let mut results = Vec::new();
        for lang in self.target_languages(languages) {
            info!("Translating {} -> {}", source_language, lang);
            let existing = store.load_or_empty(&lang)?;
            let outcome = translator.translate_tree(&source, &lang, &existing).await?;

            info!(
                "{}: {}/{} translated ({:.1}%), {} pending",
                lang,
                outcome.stats.translated,
                outcome.stats.total,
                outcome.stats.percentage(),
                outcome.stats.pending
            );

            let path = store.path_for(&lang);
            let written = !dry_run;
            if written {
                store.save(&lang, &outcome.tree)?;
            }
            results.push(LanguageTranslation {
                language: lang,
                path,
                stats: outcome.stats,
                written,
            });
        }

        Ok(results)
    }

    pub fn strip_console_logs(&self, dry_run: bool) -> Result<Vec<(String, usize)>> {
        let changed = console::strip_files(&self.walker(), dry_run)?;
        let total: usize = changed.iter().map(|(_, count)| count).sum();
        info!("Removed {} console.log calls from {} files", total, changed.len());
        Ok(changed)
    }

    /// Translation progress of every target language
    pub fn stats(&self, languages: &[String]) -> Result<Vec<(String, TranslationStats)>> {
        let store = self.store();
        let source = store.load(&self.config.project.source_language)?;

        self.target_languages(languages)
            .into_iter()
            .map(|lang| {
                let target = store.load_or_empty(&lang)?;
                let stats = TranslationStats::compute(&source, &target, &self.config.translate.todo_marker);
                Ok((lang, stats))
            })
            .collect()
    }

    /// Resize the store icon (or `input`) to the configured icon size
    pub async fn resize_assets(
        &self,
        input: Option<&Path>,
        output: Option<&Path>,
        size: Option<(u32, u32)>,
    ) -> Result<AssetReport> {
        let input = input
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.assets_path(&self.config.assets.icon_file));
        let size = size.unwrap_or(self.config.assets.icon_size);
        assets::resize_exact(self.media.as_ref(), &input, output, size).await
    }

    pub async fn feature_graphic(&self, input: &Path, output: Option<&Path>) -> Result<AssetReport> {
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.assets_path(&self.config.assets.feature_file));
        assets::feature_graphic(self.media.as_ref(), input, &output, self.config.assets.feature_size).await
    }

    pub async fn convert_screenshots(&self, dir: Option<&Path>) -> Result<Vec<AssetReport>> {
        let dir = dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.project.root.join(&self.config.assets.dir));
        assets::convert_screenshots(
            self.media.as_ref(),
            &dir,
            &self.config.assets.screenshot_prefix,
            &self.config.assets.screenshot_background,
        )
        .await
    }

    pub async fn create_promo(&self) -> Result<PromoReport> {
        PromoVideo::new(self.config.promo.clone(), &self.config.project.root)?
            .create(self.media.as_ref())
            .await
    }

    pub async fn list_translation_cache(&self) -> Result<Vec<TranslationCacheEntry>> {
        TranslationCache::new(CACHE_DIR).list().await
    }

    pub async fn clear_translation_cache(&self) -> Result<u64> {
        TranslationCache::new(CACHE_DIR).clear().await
    }
}

/// Default strategy for locale merges driven by the CLI
pub fn parse_strategy(value: &str) -> Result<MergeStrategy> {
    match value.to_lowercase().as_str() {
        "deep" => Ok(MergeStrategy::Deep),
        "shallow" => Ok(MergeStrategy::Shallow),
        _ => Err(L10nError::Config(format!(
            "Invalid merge strategy '{}'. Valid strategies: deep, shallow",
            value
        ))),
    }
}

pub fn parse_layout(value: &str) -> Result<PatchLayout> {
    match value.to_lowercase().as_str() {
        "language" => Ok(PatchLayout::Language),
        "section" => Ok(PatchLayout::Section),
        "key" => Ok(PatchLayout::Key),
        _ => Err(L10nError::Config(format!(
            "Invalid patch layout '{}'. Valid layouts: language, section, key",
            value
        ))),
    }
}
