//! Directory scans for input images and dataset files.

use crate::error::TrainingResult;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Image extensions the labelling step picks up.
pub const LABEL_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Files directly inside `dir` whose extension (case-insensitive) is in `allowed`, sorted by name.
pub fn files_with_extensions(dir: &Path, allowed: &[&str]) -> TrainingResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), allowed) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

pub fn list_label_images(dir: &Path) -> TrainingResult<Vec<PathBuf>> {
    files_with_extensions(dir, LABEL_IMAGE_EXTENSIONS)
}

pub fn list_jsonl_files(dir: &Path) -> TrainingResult<Vec<PathBuf>> {
    files_with_extensions(dir, &["jsonl"])
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    allowed.iter().any(|a| *a == ext)
}
