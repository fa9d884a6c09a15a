// Source scanning for the app's TSX/TS code
//
// - hardcoded: UI text that was never moved into the locale files
// - alerts: `Alert.alert(...)` analysis, key generation and migration
// - usage: `t('key')` references checked against the locale files
// - console: `console.log` statement removal

pub mod alerts;
pub mod console;
pub mod hardcoded;
pub mod usage;

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ProjectConfig;

/// A source file found by [`SourceWalker`]
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the project root, `/` separated
    pub relative: String,
}

/// Walks the configured source directories of a project
#[derive(Debug, Clone)]
pub struct SourceWalker {
    root: PathBuf,
    dirs: Vec<String>,
    extensions: Vec<String>,
}

impl SourceWalker {
    pub fn new<P: AsRef<Path>>(root: P, dirs: Vec<String>, extensions: Vec<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            dirs,
            extensions,
        }
    }

    pub fn from_project(project: &ProjectConfig) -> Self {
        Self::new(&project.root, project.scan_dirs.clone(), project.extensions.clone())
    }

    /// Same walker restricted to other extensions
    pub fn with_extensions(&self, extensions: &[&str]) -> Self {
        Self {
            root: self.root.clone(),
            dirs: self.dirs.clone(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Matching files, sorted by path within each scan directory
    pub fn files(&self) -> Vec<SourceFile> {
        let mut files = Vec::new();

        for dir in &self.dirs {
            let dir_path = self.root.join(dir);
            if !dir_path.is_dir() {
                debug!("Skipping missing scan directory {}", dir_path.display());
                continue;
            }

            let walker = WalkDir::new(&dir_path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_excluded(e));

            for entry in walker.filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() || !self.matches_extension(entry.path()) {
                    continue;
                }
                files.push(SourceFile {
                    relative: self.relative(entry.path()),
                    path: entry.into_path(),
                });
            }
        }

        files
    }

    /// Matching files with their content; unreadable files are skipped
    pub fn read_all(&self) -> Vec<(SourceFile, String)> {
        self.files()
            .into_iter()
            .filter_map(|file| match std::fs::read_to_string(&file.path) {
                Ok(content) => Some((file, content)),
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", file.path.display(), e);
                    None
                }
            })
            .collect()
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
    }

    fn relative(&self, path: &Path) -> String {
        let relative = pathdiff::diff_paths(path, &self.root).unwrap_or_else(|| path.to_path_buf());
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name == "node_modules" || name.starts_with('.'))
}

/// 1-based line number of a byte offset
pub fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}
