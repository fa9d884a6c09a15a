//! Store listing assets: icon, feature graphic and screenshots.
//!
//! Every operation writes to a temporary PNG next to the target and renames
//! it into place, so images can be rewritten in place.

use std::path::{Path, PathBuf};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Result, L10nError};
use crate::media::{CoverGeometry, MediaProcessor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReport {
    pub path: PathBuf,
    pub original_size: (u32, u32),
    pub final_size: (u32, u32),
}

/// Scale `src` so it covers `target`, then centre the crop window.
///
/// Sources wider than the target ratio are fitted to the target height,
/// everything else to the target width. Scaled sizes are truncated.
pub fn cover_geometry(src: (u32, u32), target: (u32, u32)) -> CoverGeometry {
    let (src_w, src_h) = (src.0.max(1) as f64, src.1.max(1) as f64);
    let (target_w, target_h) = (target.0 as f64, target.1 as f64);

    let (scaled_width, scaled_height) = if src_w / src_h > target_w / target_h {
        ((src_w * (target_h / src_h)) as u32, target.1)
    } else {
        (target.0, (src_h * (target_w / src_w)) as u32)
    };

    CoverGeometry {
        scaled_width,
        scaled_height,
        crop_x: scaled_width.saturating_sub(target.0) / 2,
        crop_y: scaled_height.saturating_sub(target.1) / 2,
        width: target.0,
        height: target.1,
    }
}

fn temp_png_next_to(target: &Path) -> Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(tempfile::Builder::new()
        .prefix(".mib2-l10n-")
        .suffix(".png")
        .tempfile_in(dir)?)
}

fn persist(temp: NamedTempFile, target: &Path) -> Result<()> {
    // temp files are created 0600, keep the mode of the file being replaced
    if target.exists() {
        temp.as_file().set_permissions(std::fs::metadata(target)?.permissions())?;
    }
    temp.persist(target).map_err(|e| L10nError::Io(e.error))?;
    Ok(())
}

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(L10nError::FileNotFound(path.display().to_string()))
    }
}

/// Resize an image to exactly `size`, in place when `output` is `None`
pub async fn resize_exact(
    media: &dyn MediaProcessor,
    input: &Path,
    output: Option<&Path>,
    size: (u32, u32),
) -> Result<AssetReport> {
    ensure_file(input)?;
    let target = output.unwrap_or(input);
    let original_size = media.dimensions(input).await?;

    let temp = temp_png_next_to(target)?;
    let command = media.commands().scale_exact(input, temp.path(), size.0, size.1);
    media.execute(command).await?;
    persist(temp, target)?;

    info!(
        "{}: {}x{} -> {}x{}",
        target.display(),
        original_size.0,
        original_size.1,
        size.0,
        size.1
    );

    Ok(AssetReport {
        path: target.to_path_buf(),
        original_size,
        final_size: size,
    })
}

/// Cover-resize and centre-crop an image to `size`
pub async fn feature_graphic(
    media: &dyn MediaProcessor,
    input: &Path,
    output: &Path,
    size: (u32, u32),
) -> Result<AssetReport> {
    ensure_file(input)?;
    let original_size = media.dimensions(input).await?;
    let geometry = cover_geometry(original_size, size);

    let temp = temp_png_next_to(output)?;
    let command = media.commands().scale_cover_crop(input, temp.path(), &geometry);
    media.execute(command).await?;
    persist(temp, output)?;

    info!("Original size: {}x{}", original_size.0, original_size.1);
    info!("Saved to: {} ({}x{})", output.display(), size.0, size.1);

    Ok(AssetReport {
        path: output.to_path_buf(),
        original_size,
        final_size: size,
    })
}

/// PNG files in `dir` whose name starts with `prefix`, sorted
pub fn find_screenshots(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(L10nError::FileNotFound(dir.display().to_string()));
    }

    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| ext == "png")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(prefix))
        })
        .collect();
    found.sort();
    Ok(found)
}

/// Re-encode screenshots as opaque RGB PNGs, flattening transparency onto `background`
pub async fn convert_screenshots(
    media: &dyn MediaProcessor,
    dir: &Path,
    prefix: &str,
    background: &str,
) -> Result<Vec<AssetReport>> {
    let screenshots = find_screenshots(dir, prefix)?;
    info!("Found {} screenshots to process", screenshots.len());

    let mut reports = Vec::with_capacity(screenshots.len());
    for path in screenshots {
        let size = media.dimensions(&path).await?;

        let temp = temp_png_next_to(&path)?;
        let command = media.commands().flatten_alpha(&path, temp.path(), size, background);
        media.execute(command).await?;
        persist(temp, &path)?;

        info!("Converted {}: {}x{}", path.display(), size.0, size.1);
        reports.push(AssetReport {
            path,
            original_size: size,
            final_size: size,
        });
    }

    Ok(reports)
}
