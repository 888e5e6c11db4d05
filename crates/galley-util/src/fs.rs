use std::path::{Path, PathBuf};

use crate::errors::{GalleyError, GalleyResult};

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Read a UTF-8 file, tagging failures with the path that was read.
pub fn read_to_string(path: &Path) -> GalleyResult<String> {
    std::fs::read_to_string(path).map_err(|e| GalleyError::Config {
        message: format!("Failed to read {}: {e}", path.display()),
    })
}

/// List the names of the immediate subdirectories of `dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_subdirs(dir: &Path) -> GalleyResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        } else {
            tracing::debug!("Skipping non-directory {}", entry.path().display());
        }
    }
    names.sort();
    Ok(names)
}
