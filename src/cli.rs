use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Project root, overrides the configuration
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Locales directory relative to the project root, overrides the configuration
    #[arg(long, global = true)]
    pub locales_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge a translation patch into the locale files
    Merge {
        /// Patch file (JSON or TOML)
        #[arg(short, long)]
        patch: PathBuf,

        /// Patch layout: language, section or key
        #[arg(long, default_value = "language")]
        layout: String,

        /// Merge strategy: deep or shallow
        #[arg(long, default_value = "deep")]
        strategy: String,

        /// Only apply these languages (comma-separated)
        #[arg(short, long)]
        languages: Option<String>,

        /// Create locale files that do not exist yet
        #[arg(long)]
        create: bool,

        /// Report changes without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every t('key') used in the sources exists in the locales
    Check {
        /// Languages to check (comma-separated), defaults to all configured
        #[arg(short, long)]
        languages: Option<String>,

        /// Report file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit with an error when keys are missing
        #[arg(long)]
        strict: bool,
    },

    /// Show translation progress per language
    Stats {
        /// Languages (comma-separated), defaults to all configured
        #[arg(short, long)]
        languages: Option<String>,
    },

    /// Find hardcoded Spanish UI text in the sources
    Extract {
        /// Report file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate source locale keys from a hardcoded strings report
    Keygen {
        /// Hardcoded strings report
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Report keys without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Alert.alert analysis and migration
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },

    /// Translate the source locale into the target languages
    Translate {
        /// Target languages (comma-separated), defaults to all configured
        #[arg(short, long)]
        languages: Option<String>,

        /// Translation mode: glossary-exact, glossary-fuzzy, glossary-fill, llm
        #[arg(short, long)]
        mode: Option<String>,

        /// Glossary file (JSON or TOML)
        #[arg(short, long)]
        glossary: Option<PathBuf>,

        /// Compute translations without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove console.log calls from the sources
    StripConsole {
        /// Report removals without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Store listing images
    Assets {
        #[command(subcommand)]
        action: AssetsAction,
    },

    /// Render the promotional video
    Promo {
        /// Output video, overrides the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum AlertsAction {
    /// Collect Alert.alert calls into an analysis report
    Analyze {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate alerts.* translations and the text to key mapping
    Generate {
        /// Analysis report
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Glossary file (JSON or TOML)
        #[arg(short, long)]
        glossary: Option<PathBuf>,

        /// Directory for the generated files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also merge the translations into the locale files
        #[arg(long)]
        merge: bool,
    },

    /// Rewrite mapped Alert.alert calls to showAlert
    Migrate {
        /// Text to key mapping file
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Report replacements without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum AssetsAction {
    /// Resize an image to an exact size (the store icon by default)
    Resize {
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file, defaults to rewriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target size as WIDTHxHEIGHT
        #[arg(short, long)]
        size: Option<String>,
    },

    /// Cover-resize and centre-crop an image into the feature graphic
    Feature {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Flatten screenshot transparency onto an opaque background
    Screenshots {
        /// Directory holding the screenshots
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached translation batches
    List,

    /// Clear all cached translation batches
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Destination file
        #[arg(short, long, default_value = "mib2-l10n.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_arguments_parse() {
        let args = Args::parse_from([
            "mib2-l10n", "-v", "merge", "--patch", "fix.json", "--layout", "key", "--languages", "en,de", "--dry-run",
        ]);

        assert!(args.verbose);
        match args.command {
            Commands::Merge { patch, layout, strategy, languages, create, dry_run } => {
                assert_eq!(patch, PathBuf::from("fix.json"));
                assert_eq!(layout, "key");
                assert_eq!(strategy, "deep");
                assert_eq!(languages.as_deref(), Some("en,de"));
                assert!(!create);
                assert!(dry_run);
            }
            _ => panic!("expected merge"),
        }
    }

    #[test]
    fn nested_subcommands_parse() {
        let args = Args::parse_from(["mib2-l10n", "alerts", "migrate", "--dry-run", "--root", "/srv/app"]);
        assert_eq!(args.root, Some(PathBuf::from("/srv/app")));
        assert!(matches!(args.command, Commands::Alerts { action: AlertsAction::Migrate { dry_run: true, .. } }));

        let args = Args::parse_from(["mib2-l10n", "assets", "resize", "--size", "512x512"]);
        assert!(matches!(args.command, Commands::Assets { action: AssetsAction::Resize { .. } }));
    }
}
