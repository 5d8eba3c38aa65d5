//! Command-line inputs to an ordered frame list.
//!
//! Each input is a file (kept as given), a directory (its image files,
//! sorted by name) or a glob pattern (matches sorted). Missing files are
//! kept: they fail at load time and show up as skipped frames.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Extensions the decoder is built with
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "tif", "tiff", "tga", "gif", "bmp", "webp",
];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Expand all inputs, preserving input order.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<String>> {
    let mut frames = Vec::new();
    for input in inputs {
        let before = frames.len();
        let path = Path::new(input);
        if !input.starts_with("file://") && is_pattern(input) {
            frames.extend(expand_glob(input)?);
        } else if path.is_dir() {
            frames.extend(list_dir(path)?);
        } else {
            frames.push(input.clone());
        }
        if frames.len() == before {
            warn!("No images matched '{}'", input);
        } else {
            debug!("'{}' -> {} frame(s)", input, frames.len() - before);
        }
    }
    Ok(frames)
}

fn expand_glob(pattern: &str) -> Result<Vec<String>> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid glob pattern: {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    paths.sort();
    Ok(paths.into_iter().map(path_string).collect())
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();
        if path.is_file() && is_image_file(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths.into_iter().map(path_string).collect())
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}
