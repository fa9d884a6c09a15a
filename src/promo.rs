//! Promotional video for the store listing.
//!
//! Each slide (intro, screenshots, outro) is rendered once as a PNG by ffmpeg
//! and the stills are joined with the concat demuxer, each held for the
//! configured slide duration.

use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{PromoConfig, SlideConfig};
use crate::error::{Result, L10nError};
use crate::media::{escape_filter_value, MediaProcessor};

const INTRO_ICON_SIZE: u32 = 300;
const INTRO_ICON_Y: u32 = 600;
const INTRO_TITLE_Y: u32 = 950;
const INTRO_TAGLINE_Y: u32 = 1050;

const SLIDE_HEADER_Y: u32 = 60;
const SLIDE_SHOT_Y: u32 = 180;
const SLIDE_WIDTH_SHARE: f64 = 0.9;
const SLIDE_HEIGHT_SHARE: f64 = 0.7;
const SLIDE_TITLE_GAP: u32 = 80;
const SLIDE_SUBTITLE_GAP: u32 = 70;
const SHADOW_MARGIN: u32 = 20;
const SHADOW_BLUR: u32 = 15;

const OUTRO_ICON_SIZE: u32 = 200;
const OUTRO_ICON_Y: u32 = 650;
const OUTRO_CTA_Y: u32 = 920;
const OUTRO_FEATURES_Y: u32 = 1050;
const OUTRO_FEATURE_STEP: u32 = 60;
const OUTRO_FOOTER_Y: u32 = 1400;

#[derive(Debug, Clone, Serialize)]
pub struct PromoReport {
    pub output: PathBuf,
    pub frames: usize,
    pub skipped: Vec<String>,
    pub duration_secs: f64,
    /// ffprobe `duration=` / `size=` lines
    pub summary: String,
}

/// Uniform scale of `src` so it fits inside `bounds`
pub fn fit_geometry(src: (u32, u32), bounds: (f64, f64)) -> (u32, u32) {
    let (src_w, src_h) = (src.0.max(1) as f64, src.1.max(1) as f64);
    let scale = (bounds.0 / src_w).min(bounds.1 / src_h);
    ((src_w * scale) as u32, (src_h * scale) as u32)
}

#[derive(Debug, Clone, Copy)]
struct Text<'a> {
    text: &'a str,
    size: u32,
    color: &'a str,
    y: u32,
    bold: bool,
}

fn configured_font(path: &Path, field: &str) -> Result<Option<PathBuf>> {
    if path.as_os_str().is_empty() {
        info!("No {} configured, drawtext uses ffmpeg's default font", field);
        Ok(None)
    } else if path.is_file() {
        Ok(Some(path.to_path_buf()))
    } else {
        Err(L10nError::Config(format!(
            "Font {} not found, fix [promo] {} or set it to \"\" for ffmpeg's default font",
            path.display(),
            field
        )))
    }
}

/// Builds the filter graphs of the promo frames and drives the encode
pub struct PromoVideo {
    config: PromoConfig,
    root: PathBuf,
    bold_font: Option<PathBuf>,
    regular_font: Option<PathBuf>,
}

impl PromoVideo {
    /// An empty font path selects ffmpeg's default font; a configured font
    /// that does not exist is an error.
    pub fn new<P: AsRef<Path>>(config: PromoConfig, root: P) -> Result<Self> {
        let bold_font = configured_font(&config.bold_font, "bold_font")?;
        let regular_font = configured_font(&config.regular_font, "regular_font")?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            config,
            bold_font,
            regular_font,
        })
    }

    fn icon(&self) -> Option<PathBuf> {
        let icon = self.root.join(self.config.icon.as_ref()?);
        if icon.is_file() {
            Some(icon)
        } else {
            warn!("Icon {} not found, frames are rendered without it", icon.display());
            None
        }
    }

    fn drawtext(&self, text: Text<'_>) -> String {
        let font = if text.bold { &self.bold_font } else { &self.regular_font };
        let font = font
            .as_ref()
            .map(|path| format!("fontfile={}:", escape_filter_value(&path.to_string_lossy())))
            .unwrap_or_default();

        format!(
            "drawtext={}text={}:fontsize={}:fontcolor={}:x=(w-text_w)/2:y={}:expansion=none",
            font,
            escape_filter_value(text.text),
            text.size,
            text.color,
            text.y
        )
    }

    /// `[input]drawtext=...,drawtext=...[out]`
    fn text_chain(&self, input: &str, texts: &[Text<'_>]) -> String {
        let filters: Vec<String> = texts.iter().map(|t| self.drawtext(*t)).collect();
        format!("[{}]{}[out]", input, filters.join(","))
    }

    fn icon_overlay(&self, size: u32, y: u32) -> String {
        format!(
            "[1:v]scale={size}:{size}:flags=lanczos[icon];[0:v][icon]overlay=x={x}:y={y}[bg];",
            size = size,
            x = self.config.width.saturating_sub(size) / 2,
            y = y
        )
    }

    pub fn intro_graph(&self, with_icon: bool) -> String {
        let c = &self.config;
        let texts = [
            Text { text: &c.app_name, size: 72, color: &c.accent, y: INTRO_TITLE_Y, bold: true },
            Text { text: &c.tagline, size: 36, color: &c.muted, y: INTRO_TAGLINE_Y, bold: false },
        ];

        if with_icon {
            format!("{}{}", self.icon_overlay(INTRO_ICON_SIZE, INTRO_ICON_Y), self.text_chain("bg", &texts))
        } else {
            self.text_chain("0:v", &texts)
        }
    }

    /// Graph for one screenshot slide; the screenshot is input 1
    pub fn slide_graph(&self, slide: &SlideConfig, shot_size: (u32, u32)) -> String {
        let c = &self.config;
        let bounds = (c.width as f64 * SLIDE_WIDTH_SHARE, c.height as f64 * SLIDE_HEIGHT_SHARE);
        let (w, h) = fit_geometry(shot_size, bounds);
        let x = c.width.saturating_sub(w) / 2;
        let y = SLIDE_SHOT_Y;
        let title_y = y + h + SLIDE_TITLE_GAP;

        let shadow = format!(
            "color=c=black@0.0:s={sw}x{sh},format=rgba,drawbox=x={m}:y={m}:w={w}:h={h}:color=black@0.39:t=fill,gblur=sigma={blur}[shadow];",
            sw = w + 2 * SHADOW_MARGIN,
            sh = h + 2 * SHADOW_MARGIN,
            m = SHADOW_MARGIN,
            w = w,
            h = h,
            blur = SHADOW_BLUR
        );
        let layers = format!(
            "[1:v]scale={w}:{h}:flags=lanczos[shot];[0:v][shadow]overlay=x={sx}:y={sy}[bg0];[bg0][shot]overlay=x={x}:y={y}[bg];",
            w = w,
            h = h,
            sx = x as i64 - SHADOW_MARGIN as i64,
            sy = y as i64 - SHADOW_MARGIN as i64,
            x = x,
            y = y
        );
        let texts = [
            Text { text: &c.app_name, size: 42, color: &c.accent, y: SLIDE_HEADER_Y, bold: true },
            Text { text: &slide.title, size: 56, color: &c.text_color, y: title_y, bold: true },
            Text { text: &slide.subtitle, size: 36, color: &c.muted, y: title_y + SLIDE_SUBTITLE_GAP, bold: false },
        ];

        format!("{}{}{}", shadow, layers, self.text_chain("bg", &texts))
    }

    pub fn outro_graph(&self, with_icon: bool) -> String {
        let c = &self.config;
        let mut texts = vec![Text { text: &c.call_to_action, size: 64, color: &c.accent, y: OUTRO_CTA_Y, bold: true }];
        for (idx, feature) in c.features.iter().enumerate() {
            texts.push(Text {
                text: feature,
                size: 42,
                color: &c.text_color,
                y: OUTRO_FEATURES_Y + idx as u32 * OUTRO_FEATURE_STEP,
                bold: false,
            });
        }
        texts.push(Text { text: &c.footer, size: 28, color: &c.footer_color, y: OUTRO_FOOTER_Y, bold: false });

        if with_icon {
            format!("{}{}", self.icon_overlay(OUTRO_ICON_SIZE, OUTRO_ICON_Y), self.text_chain("bg", &texts))
        } else {
            self.text_chain("0:v", &texts)
        }
    }

    /// Concat demuxer script holding each frame for `seconds`
    pub fn concat_list(frames: &[PathBuf], seconds: f64) -> String {
        let quote = |path: &Path| path.to_string_lossy().replace('\'', "'\\''");
        let mut list = String::from("ffconcat version 1.0\n");
        for frame in frames {
            list.push_str(&format!("file '{}'\nduration {}\n", quote(frame), seconds));
        }
        // the last entry is repeated so its duration is honoured
        if let Some(last) = frames.last() {
            list.push_str(&format!("file '{}'\n", quote(last)));
        }
        list
    }

    async fn render(
        &self,
        media: &dyn MediaProcessor,
        images: &[&Path],
        graph: &str,
        output: &Path,
    ) -> Result<()> {
        let command = media.commands().render_frame(
            (self.config.width, self.config.height),
            &self.config.background,
            images,
            graph,
            output,
        );
        media.execute(command).await
    }

    /// Render every frame, encode the video and probe the result
    pub async fn create(&self, media: &dyn MediaProcessor) -> Result<PromoReport> {
        media.check_availability().await?;

        let scratch = tempfile::Builder::new().prefix("mib2-promo-frames").tempdir()?;
        let frame_path = |idx: usize| scratch.path().join(format!("frame_{:03}.png", idx));
        let icon = self.icon();
        let icon_inputs: Vec<&Path> = icon.as_deref().into_iter().collect();

        let pb = ProgressBar::new(self.config.slides.len() as u64 + 2);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut frames = Vec::new();
        let mut skipped = Vec::new();

        pb.set_message("intro");
        let intro = frame_path(frames.len());
        self.render(media, &icon_inputs, &self.intro_graph(icon.is_some()), &intro).await?;
        frames.push(intro);
        pb.inc(1);

        for (idx, slide) in self.config.slides.iter().enumerate() {
            pb.set_message(slide.title.clone());
            let image = self.root.join(&self.config.slides_dir).join(&slide.image);
            if !image.is_file() {
                warn!("Image not found: {}", image.display());
                skipped.push(slide.image.clone());
                pb.inc(1);
                continue;
            }

            info!("Processing slide {}/{}: {}", idx + 1, self.config.slides.len(), slide.title);
            let size = media.dimensions(&image).await?;
            let frame = frame_path(frames.len());
            self.render(media, &[image.as_path()], &self.slide_graph(slide, size), &frame).await?;
            frames.push(frame);
            pb.inc(1);
        }

        pb.set_message("outro");
        let outro = frame_path(frames.len());
        self.render(media, &icon_inputs, &self.outro_graph(icon.is_some()), &outro).await?;
        frames.push(outro);
        pb.finish_with_message(format!("{} frames", frames.len()));

        let list_file = scratch.path().join("frames.txt");
        std::fs::write(&list_file, Self::concat_list(&frames, self.config.slide_seconds))?;

        let output = self.root.join(&self.config.output);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Encoding video...");
        let command = media
            .commands()
            .encode_slideshow(&list_file, &output, self.config.fps, &media.encode_options());
        media.execute(command).await?;

        if !output.exists() {
            return Err(L10nError::Media(format!("encoder produced no file at {}", output.display())));
        }

        let summary = media.probe_summary(&output).await?;
        info!("Video created: {}", output.display());
        info!("Video info:\n{}", summary);

        Ok(PromoReport {
            duration_secs: frames.len() as f64 * self.config.slide_seconds,
            frames: frames.len(),
            output,
            skipped,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaCommandBuilder, MockMediaProcessor};

    fn config() -> PromoConfig {
        PromoConfig {
            icon: None,
            bold_font: PathBuf::new(),
            regular_font: PathBuf::new(),
            output: PathBuf::from("out/promo.mp4"),
            ..PromoConfig::default()
        }
    }

    #[test]
    fn fit_geometry_keeps_aspect_ratio() {
        assert_eq!(fit_geometry((1080, 2400), (972.0, 1344.0)), (604, 1344));
        assert_eq!(fit_geometry((2000, 1000), (972.0, 1344.0)), (972, 486));
    }

    #[test]
    fn slide_graph_places_shadow_screenshot_and_captions() {
        let video = PromoVideo::new(config(), "/tmp").unwrap();
        let slide = &video.config.slides[3];
        let graph = video.slide_graph(slide, (1080, 2400));

        assert!(graph.starts_with("color=c=black@0.0:s=644x1384,format=rgba,drawbox=x=20:y=20:w=604:h=1344"));
        assert!(graph.contains("[0:v][shadow]overlay=x=218:y=160[bg0];[bg0][shot]overlay=x=238:y=180[bg];"));
        // title sits 80px below the screenshot, subtitle 70px further
        assert!(graph.contains("text=Unlock Premium Features:fontsize=56:fontcolor=#ffffff:x=(w-text_w)/2:y=1604"));
        assert!(graph.contains("text=CarPlay & Android Auto:fontsize=36:fontcolor=#9BA1A6:x=(w-text_w)/2:y=1674"));
        assert!(!graph.contains("fontfile="));
        assert!(graph.ends_with("[out]"));
    }

    #[test]
    fn missing_font_is_a_config_error() {
        let config = PromoConfig {
            bold_font: PathBuf::from("/nonexistent/Bold.ttf"),
            ..config()
        };
        let err = PromoVideo::new(config, "/tmp").err().unwrap();
        assert!(matches!(err, L10nError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/Bold.ttf"));
    }

    #[test]
    fn existing_font_is_passed_to_drawtext() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("Bold.ttf");
        std::fs::write(&font, b"ttf").unwrap();
        let config = PromoConfig { bold_font: font, ..config() };

        let video = PromoVideo::new(config, "/tmp").unwrap();
        let outro = video.outro_graph(false);
        assert!(outro.starts_with("[0:v]drawtext=fontfile="));
        assert!(outro.contains("Bold.ttf:text=Download Now"));
    }

    #[test]
    fn intro_and_outro_layouts() {
        let video = PromoVideo::new(config(), "/tmp").unwrap();

        let intro = video.intro_graph(true);
        assert!(intro.starts_with("[1:v]scale=300:300:flags=lanczos[icon];[0:v][icon]overlay=x=390:y=600[bg];[bg]drawtext="));
        assert!(intro.contains("text=MIB2 Controller:fontsize=72:fontcolor=#0a7ea4"));

        let outro = video.outro_graph(false);
        assert!(outro.starts_with("[0:v]drawtext=text=Download Now:fontsize=64"));
        assert!(outro.contains("text=✓ Offline Guides:fontsize=42:fontcolor=#ffffff:x=(w-text_w)/2:y=1230"));
        assert!(outro.contains("text=For MIB2 STD2 Technisat/Preh units:fontsize=28:fontcolor=#687076:x=(w-text_w)/2:y=1400"));
    }

    #[test]
    fn concat_list_repeats_the_last_frame() {
        let frames = vec![PathBuf::from("/s/frame_000.png"), PathBuf::from("/s/it's.png")];
        assert_eq!(
            PromoVideo::concat_list(&frames, 3.0),
            "ffconcat version 1.0\nfile '/s/frame_000.png'\nduration 3\nfile '/s/it'\\''s.png'\nduration 3\nfile '/s/it'\\''s.png'\n"
        );
    }

    #[tokio::test]
    async fn create_skips_missing_slides() {
        let root = tempfile::tempdir().unwrap();
        let slides = root.path().join("promo-video");
        std::fs::create_dir_all(&slides).unwrap();
        std::fs::write(slides.join("01_home_screen.png"), b"png").unwrap();
        std::fs::write(slides.join("07_fec_codes.png"), b"png").unwrap();
        let output = root.path().join("out/promo.mp4");

        let mut media = MockMediaProcessor::new();
        media.expect_check_availability().returning(|| Ok(()));
        media.expect_commands().returning(|| MediaCommandBuilder::new("ffmpeg", "ffprobe"));
        media.expect_encode_options().returning(Vec::new);
        media.expect_dimensions().times(2).returning(|_| Ok((1080, 2400)));
        media
            .expect_execute()
            .withf(|cmd| cmd.description == "Render frame")
            .times(4)
            .returning(|_| Ok(()));
        let encoded = output.clone();
        media
            .expect_execute()
            .withf(|cmd| cmd.description == "Slideshow encoding")
            .times(1)
            .returning(move |_| {
                std::fs::write(&encoded, b"mp4").unwrap();
                Ok(())
            });
        media
            .expect_probe_summary()
            .returning(|_| Ok("duration=12.000000\nsize=123456".to_string()));

        let report = PromoVideo::new(config(), root.path()).unwrap().create(&media).await.unwrap();

        assert_eq!(report.frames, 4);
        assert_eq!(report.duration_secs, 12.0);
        assert_eq!(report.skipped.len(), 4);
        assert_eq!(report.output, output);
        assert!(report.summary.contains("size=123456"));
    }
}
