//! Module discovery.
//!
//! Resolves an optimize target to the list of source modules it covers.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{MinifyError, Result};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Names a module path must not carry (earlier outputs of a run).
#[derive(Debug, Clone)]
pub struct ArtifactMarkers<'a> {
    pub optimized_suffix: &'a str,
    pub backup_suffix: &'a str,
}

fn is_candidate(path: &Path, markers: &ArtifactMarkers) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return false;
    }
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    if name.ends_with(markers.backup_suffix) {
        return false;
    }
    let stem = &name[..name.len() - ext.len() - 1];
    !stem.ends_with(markers.optimized_suffix)
}

/// A file target is one module; a directory is walked for source modules.
/// The result is sorted so runs are deterministic.
pub fn locate_modules(target: &Path, markers: &ArtifactMarkers) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(target).map_err(|e| MinifyError::io(target, e))?;
    if meta.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(target)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != "node_modules");
    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_file() && is_candidate(path, markers) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(MinifyError::NoModules(target.to_path_buf()));
    }
    tracing::debug!(count = files.len(), target = %target.display(), "located modules");
    Ok(files)
}
