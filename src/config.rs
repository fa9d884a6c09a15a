use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, L10nError};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "mib2-l10n.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub translate: TranslateConfig,
    pub media: MediaConfig,
    pub assets: AssetsConfig,
    pub promo: PromoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Root of the app project being maintained
    pub root: PathBuf,
    /// Directories (relative to root) scanned for source files
    pub scan_dirs: Vec<String>,
    /// Source file extensions considered by scans
    pub extensions: Vec<String>,
    /// Directory holding `<lang>.json` locale files (relative to root)
    pub locales_dir: PathBuf,
    /// Language the UI is authored in
    pub source_language: String,
    /// Languages maintained next to the source language
    pub languages: Vec<String>,
    /// Directory where JSON reports are written (relative to root)
    pub reports_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Chat completion endpoint URL
    pub endpoint: String,
    /// Model requested from the endpoint
    pub model: String,
    /// Translation strategy
    pub mode: TranslationMode,
    /// Number of flattened keys sent per LLM request
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for a failed batch
    pub max_retries: u32,
    /// Persist successful LLM batches on disk
    pub use_cache: bool,
    /// Prefix marking values that still need a human translation
    pub todo_marker: String,
    /// Terms that must never be translated
    pub protected_terms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationMode {
    /// Exact glossary lookup, untranslated values keep the source text
    GlossaryExact,
    /// Protected terms, exact and substring lookup, `[TODO: ...]` otherwise
    GlossaryFuzzy,
    /// Only rewrite target values that still equal the source or carry a TODO marker
    GlossaryFill,
    /// Batched translation through a chat completion endpoint
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
    /// Additional options appended to video encodes
    pub encode_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory with store listing assets (relative to root)
    pub dir: PathBuf,
    pub icon_file: String,
    pub icon_size: (u32, u32),
    pub feature_file: String,
    pub feature_size: (u32, u32),
    /// File name prefix of screenshots re-encoded by `assets screenshots`
    pub screenshot_prefix: String,
    /// Colour transparent screenshot pixels are flattened onto
    pub screenshot_background: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Seconds each frame (intro, slides, outro) stays on screen
    pub slide_seconds: f64,
    /// Directory holding slide screenshots (relative to root)
    pub slides_dir: PathBuf,
    /// Output video path (relative to root)
    pub output: PathBuf,
    pub icon: Option<PathBuf>,
    pub bold_font: PathBuf,
    pub regular_font: PathBuf,
    pub background: String,
    pub accent: String,
    pub text_color: String,
    pub muted: String,
    pub footer_color: String,
    pub app_name: String,
    pub tagline: String,
    pub call_to_action: String,
    pub features: Vec<String>,
    pub footer: String,
    pub slides: Vec<SlideConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideConfig {
    pub image: String,
    pub title: String,
    pub subtitle: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            scan_dirs: vec!["app".to_string(), "components".to_string(), "lib".to_string()],
            extensions: vec!["tsx".to_string(), "ts".to_string()],
            locales_dir: PathBuf::from("locales"),
            source_language: "es".to_string(),
            languages: vec!["en".to_string(), "de".to_string()],
            reports_dir: PathBuf::from("scripts"),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/trpc/ai.chat".to_string(),
            model: "gpt-4o-mini".to_string(),
            mode: TranslationMode::GlossaryExact,
            batch_size: 50,
            timeout_secs: 60,
            max_retries: 1,
            use_cache: true,
            todo_marker: "[TODO:".to_string(),
            protected_terms: ["VID", "PID", "EEPROM", "USB", "Telnet", "MIB2", "FEC", "QNX", "STD2", "Toolbox", "Auto-Spoof"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_path: "ffprobe".to_string(),
            encode_options: vec![],
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("play-store-assets"),
            icon_file: "icon-512.png".to_string(),
            icon_size: (512, 512),
            feature_file: "feature-graphic.png".to_string(),
            feature_size: (1024, 500),
            screenshot_prefix: "screenshot-".to_string(),
            screenshot_background: "white".to_string(),
        }
    }
}

impl Default for PromoConfig {
    fn default() -> Self {
        let slide = |image: &str, title: &str, subtitle: &str| SlideConfig {
            image: image.to_string(),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
        };

        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            slide_seconds: 3.0,
            slides_dir: PathBuf::from("promo-video"),
            output: PathBuf::from("promo-video/MIB2_Controller_Promo.mp4"),
            icon: Some(PathBuf::from("assets/images/icon.png")),
            bold_font: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
            regular_font: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            background: "#0a0a0a".to_string(),
            accent: "#0a7ea4".to_string(),
            text_color: "#ffffff".to_string(),
            muted: "#9BA1A6".to_string(),
            footer_color: "#687076".to_string(),
            app_name: "MIB2 Controller".to_string(),
            tagline: "Remote Control for MIB2 Units".to_string(),
            call_to_action: "Download Now".to_string(),
            features: ["✓ USB Spoofing", "✓ Telnet Terminal", "✓ FEC Codes", "✓ Offline Guides"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            footer: "For MIB2 STD2 Technisat/Preh units".to_string(),
            slides: vec![
                slide("01_home_screen.png", "Connect USB Adapters", "Manage MIB2 units remotely"),
                slide("02_auto_spoof.png", "Automatic USB Spoofing", "One-tap compatibility fix"),
                slide("03_telnet_terminal.png", "Telnet Terminal", "Execute commands directly"),
                slide("07_fec_codes.png", "Unlock Premium Features", "CarPlay & Android Auto"),
                slide("05_eeprom_backups.png", "Secure Backups", "Protect your EEPROM data"),
                slide("06_offline_guides.png", "Offline Documentation", "Guides available anytime"),
            ],
        }
    }
}

impl ProjectConfig {
    pub fn locales_path(&self) -> PathBuf {
        self.root.join(&self.locales_dir)
    }

    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.root.join(&self.reports_dir).join(file_name)
    }

    /// Source language followed by the maintained languages, without duplicates
    pub fn all_languages(&self) -> Vec<String> {
        let mut langs = vec![self.source_language.clone()];
        for lang in &self.languages {
            if !langs.contains(lang) {
                langs.push(lang.clone());
            }
        }
        langs
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| L10nError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| L10nError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| L10nError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| L10nError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
[project]
root = "/srv/app"
languages = ["en"]

[translate]
mode = "llm"
batch_size = 20
"#,
        )
        .unwrap();

        assert_eq!(config.project.root, PathBuf::from("/srv/app"));
        assert_eq!(config.project.source_language, "es");
        assert_eq!(config.translate.mode, TranslationMode::Llm);
        assert_eq!(config.translate.batch_size, 20);
        assert_eq!(config.media.binary_path, "ffmpeg");
        assert_eq!(config.promo.slides.len(), 6);
    }

    #[test]
    fn all_languages_starts_with_source() {
        let mut project = ProjectConfig::default();
        project.languages = vec!["en".into(), "es".into(), "de".into()];
        assert_eq!(project.all_languages(), vec!["es", "en", "de"]);
    }

    #[test]
    fn save_and_reload_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mib2-l10n.toml");

        let mut config = Config::default();
        config.translate.model = "llama3.2:3b".to_string();
        config.assets.feature_size = (1024, 500);
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.translate.model, "llama3.2:3b");
        assert_eq!(reloaded.assets.feature_size, (1024, 500));
        assert_eq!(reloaded.promo.slides, config.promo.slides);
    }
}
