//! Glob-based discovery of the documents to render

use crate::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::Discovery(format!("invalid pattern `{}`: {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Discovery(format!("failed to compile patterns: {}", e)))
}

/// Find every file under `base_dir` whose relative path matches one of
/// `patterns`. Paths are returned relative to `base_dir`, sorted by name.
pub fn discover_files(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    if !base_dir.is_dir() {
        return Err(Error::Discovery(format!(
            "{} is not a directory",
            base_dir.display()
        )));
    }

    let set = build_globset(patterns)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(base_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Discovery(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(base_dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if set.is_match(relative) {
            files.push(relative.to_path_buf());
        }
    }

    log::debug!("discovered {} file(s) under {}", files.len(), base_dir.display());
    Ok(files)
}
