//! mib2-l10n - locale maintenance and store asset tooling
//!
//! Entry point of the command line tool: parses arguments, loads the
//! configuration and dispatches to the workflow.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use mib2_l10n::cli::{AlertsAction, Args, AssetsAction, CacheAction, Commands, ConfigAction};
use mib2_l10n::config::{Config, TranslationMode, DEFAULT_CONFIG_FILE};
use mib2_l10n::error::L10nError;
use mib2_l10n::patch::ApplyOptions;
use mib2_l10n::translate::format_duration;
use mib2_l10n::workflow::{parse_layout, parse_strategy, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    if let Some(root) = &args.root {
        config.project.root = root.clone();
    }
    if let Some(locales_dir) = &args.locales_dir {
        config.project.locales_dir = locales_dir.clone();
    }

    match args.command {
        Commands::Merge { patch, layout, strategy, languages, create, dry_run } => {
            let options = ApplyOptions {
                strategy: parse_strategy(&strategy)?,
                languages: languages.as_deref().map(parse_languages),
                create_missing: create,
                dry_run,
            };

            let workflow = Workflow::new(config);
            let reports = workflow.merge_patch(&patch, parse_layout(&layout)?, &options)?;

            println!("\n{:<10} {:<8} {:<8} {:<10} {:<8}", "Language", "Added", "Changed", "Unchanged", "Written");
            println!("{}", "-".repeat(50));
            for report in reports {
                println!(
                    "{:<10} {:<8} {:<8} {:<10} {:<8}",
                    report.language, report.stats.added, report.stats.changed, report.stats.unchanged, report.written
                );
            }
        }
        Commands::Check { languages, output, strict } => {
            let workflow = Workflow::new(config);
            let languages = languages.as_deref().map(parse_languages).unwrap_or_default();
            let report = workflow.check_usage(&languages, output.as_deref())?;

            println!("\nTranslation keys used: {}", report.total_used_keys);
            for (lang, usage) in &report.languages {
                println!(
                    "{}: {} defined, {} missing, {} unused",
                    lang,
                    usage.defined_keys,
                    usage.missing.len(),
                    usage.unused.len()
                );
                for key in usage.missing.iter().take(20) {
                    println!("  - {}", key);
                }
                if usage.missing.len() > 20 {
                    println!("  ... and {} more", usage.missing.len() - 20);
                }
            }

            if strict {
                report.ensure_complete()?;
            }
        }
        Commands::Stats { languages } => {
            let workflow = Workflow::new(config);
            let languages = languages.as_deref().map(parse_languages).unwrap_or_default();

            println!("\n{:<10} {:<8} {:<12} {:<8} {:<8}", "Language", "Total", "Translated", "Percent", "Pending");
            println!("{}", "-".repeat(50));
            for (lang, stats) in workflow.stats(&languages)? {
                println!(
                    "{:<10} {:<8} {:<12} {:<8} {:<8}",
                    lang,
                    stats.total,
                    stats.translated,
                    format!("{:.1}%", stats.percentage()),
                    stats.pending
                );
            }
        }
        Commands::Extract { output } => {
            let workflow = Workflow::new(config);
            let report = workflow.extract_hardcoded(output.as_deref())?;

            println!("\nFiles with hardcoded text: {}", report.files.len());
            println!("Hardcoded strings: {}", report.total_strings());
            for (file, count) in report.top_files(10) {
                println!("  {:<60} {}", file, count);
            }
        }
        Commands::Keygen { input, dry_run } => {
            let workflow = Workflow::new(config);
            let report = workflow.generate_keys(input.as_deref(), dry_run)?;

            for (category, count) in &report.categories {
                println!("{:<12} {} keys", category, count);
            }
            println!(
                "{}: {} added, {} changed{}",
                report.path.display(),
                report.stats.added,
                report.stats.changed,
                if report.written { "" } else { " (not written)" }
            );
        }
        Commands::Alerts { action } => {
            let workflow = Workflow::new(config);
            match action {
                AlertsAction::Analyze { output } => {
                    let analysis = workflow.analyze_alerts(output.as_deref())?;
                    println!("\nAlerts found: {}", analysis.total);
                    println!("Unique titles: {}", analysis.unique_titles.len());
                    println!("Unique messages: {}", analysis.unique_messages.len());
                }
                AlertsAction::Generate { input, glossary, output_dir, merge } => {
                    let translations = workflow.generate_alert_translations(
                        input.as_deref(),
                        glossary.as_deref(),
                        output_dir.as_deref(),
                        merge,
                    )?;
                    println!(
                        "Generated {} alert keys for {} languages",
                        translations.mapping.len(),
                        translations.trees.len()
                    );
                }
                AlertsAction::Migrate { mapping, dry_run } => {
                    let changed = workflow.migrate_alerts(mapping.as_deref(), dry_run)?;
                    for (file, count) in &changed {
                        println!("  {:<60} {}", file, count);
                    }
                    println!(
                        "{} files {}",
                        changed.len(),
                        if dry_run { "would change" } else { "changed" }
                    );
                }
            }
        }
        Commands::Translate { languages, mode, glossary, dry_run } => {
            if let Some(mode) = mode {
                config.translate.mode = parse_translation_mode(&mode)?;
            }
            let workflow = Workflow::new(config);
            let languages = languages.as_deref().map(parse_languages).unwrap_or_default();
            let results = workflow.translate_locales(&languages, glossary.as_deref(), dry_run).await?;

            for result in results {
                println!(
                    "{}: {}/{} translated ({:.1}%), {} pending{}",
                    result.language,
                    result.stats.translated,
                    result.stats.total,
                    result.stats.percentage(),
                    result.stats.pending,
                    if result.written { "" } else { " (dry run)" }
                );
            }
        }
        Commands::StripConsole { dry_run } => {
            let workflow = Workflow::new(config);
            let changed = workflow.strip_console_logs(dry_run)?;
            for (file, count) in &changed {
                println!("  {:<60} {}", file, count);
            }
            println!("{} console.log calls removed", changed.iter().map(|(_, n)| n).sum::<usize>());
        }
        Commands::Assets { action } => {
            let workflow = Workflow::new(config);
            let reports = match action {
                AssetsAction::Resize { input, output, size } => {
                    let size = size.as_deref().map(parse_size).transpose()?;
                    vec![workflow.resize_assets(input.as_deref(), output.as_deref(), size).await?]
                }
                AssetsAction::Feature { input, output } => {
                    vec![workflow.feature_graphic(&input, output.as_deref()).await?]
                }
                AssetsAction::Screenshots { dir } => workflow.convert_screenshots(dir.as_deref()).await?,
            };

            for report in reports {
                println!(
                    "{}: {}x{} -> {}x{}",
                    report.path.display(),
                    report.original_size.0,
                    report.original_size.1,
                    report.final_size.0,
                    report.final_size.1
                );
            }
        }
        Commands::Promo { output } => {
            if let Some(output) = output {
                config.promo.output = output;
            }
            let workflow = Workflow::new(config);
            let report = workflow.create_promo().await?;

            if !report.skipped.is_empty() {
                warn!("Skipped slides: {}", report.skipped.join(", "));
            }
            println!("Video created: {}", report.output.display());
            println!("Frames: {} ({:.0}s)", report.frames, report.duration_secs);
            println!("{}", report.summary);
        }
        Commands::Cache { action } => {
            let workflow = Workflow::new(config);
            match action {
                CacheAction::List => {
                    let entries = workflow.list_translation_cache().await?;
                    if entries.is_empty() {
                        println!("No cached translations found.");
                    } else {
                        println!("\n{:<20} {:<10} {:<8} {:<15}", "Model", "Language", "Keys", "Cached");
                        println!("{}", "-".repeat(55));
                        let now = std::time::SystemTime::now()
                            .duration_since(std::time::UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_secs();
                        for entry in entries {
                            println!(
                                "{:<20} {:<10} {:<8} {:<15}",
                                entry.model,
                                entry.target_language,
                                entry.translation.len(),
                                format!("{} ago", format_duration(now.saturating_sub(entry.cached_at)))
                            );
                        }
                    }
                }
                CacheAction::Clear => {
                    let count = workflow.clear_translation_cache().await?;
                    println!("Cleared {} cached translations", count);
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { output, force } => {
                if output.exists() && !force {
                    return Err(L10nError::Config(format!(
                        "{} already exists, use --force to overwrite",
                        output.display()
                    ))
                    .into());
                }
                Config::default().save_to_file(&output)?;
                println!("Wrote default configuration to {}", output.display());
            }
        },
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".mib2-l10n").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "mib2-l10n.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // the writer must outlive main
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("mib2-l10n.log").display());

    Ok(())
}

fn parse_languages(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `WIDTHxHEIGHT`
fn parse_size(value: &str) -> Result<(u32, u32)> {
    let parsed = value
        .split_once(['x', 'X'])
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));

    parsed.ok_or_else(|| L10nError::Config(format!("Invalid size '{}', expected WIDTHxHEIGHT", value)).into())
}

/// Parse translation mode from string
fn parse_translation_mode(mode: &str) -> Result<TranslationMode> {
    match mode.to_lowercase().as_str() {
        "glossary-exact" | "exact" => Ok(TranslationMode::GlossaryExact),
        "glossary-fuzzy" | "fuzzy" => Ok(TranslationMode::GlossaryFuzzy),
        "glossary-fill" | "fill" => Ok(TranslationMode::GlossaryFill),
        "llm" => Ok(TranslationMode::Llm),
        _ => Err(L10nError::Config(format!(
            "Invalid translation mode '{}'. Valid modes: glossary-exact, glossary-fuzzy, glossary-fill, llm",
            mode
        ))
        .into()),
    }
}
