use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Expand a file, directory or glob argument into the ordered list of documents to process.
///
/// - an existing file is processed as-is
/// - an existing directory contributes its `*.pdf` files (not recursive), sorted
/// - anything else is a glob pattern, matched files in glob order
///
/// Nothing matching is not an error; the caller decides what an empty batch means.
pub fn discover(input: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(input);

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if path.is_dir() {
        return pdfs_in_dir(path);
    }

    let entries = glob::glob(input).map_err(|e| {
        PipelineError::config(format!("invalid input pattern '{input}': {e}"))
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            PipelineError::storage(&path, "failed to read matched path", e.into_error())
        })?;
        if entry.is_file() {
            found.push(entry);
        }
    }
    Ok(found)
}

fn pdfs_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = fs::read_dir(dir)
        .map_err(|e| PipelineError::storage(dir, "failed to list directory", e))?;

    let mut found = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| PipelineError::storage(dir, "failed to list directory", e))?;
        let path = entry.path();
        if path.is_file() && has_pdf_extension(&path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
