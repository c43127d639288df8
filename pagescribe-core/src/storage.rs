use crate::error::{PipelineError, Result};
use crate::types::{AnalysisResult, DocumentKey};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Storage abstraction for cached analysis results
pub trait AnalysisStorage: Send + Sync {
    /// `Ok(None)` is a cache miss; an entry that exists but cannot be read is an error.
    fn get_analysis(&self, key: &DocumentKey) -> Result<Option<AnalysisResult>>;

    fn store_analysis(&self, key: &DocumentKey, result: &AnalysisResult) -> Result<()>;

    /// Storage identifier for logging
    fn name(&self) -> &str;
}

/// Sibling-file storage: `X.pdf` is cached at `X.json`.
///
/// Entries are never expired or rewritten here; delete `X.json` after
/// changing `X.pdf` to force a fresh analysis.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStorage;

impl FileStorage {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisStorage for FileStorage {
    fn get_analysis(&self, key: &DocumentKey) -> Result<Option<AnalysisResult>> {
        let path = key.cache_path();
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .map_err(|e| PipelineError::storage(&path, "failed to read cached analysis", e))?;
        let result: AnalysisResult = serde_json::from_slice(&bytes).map_err(|e| {
            PipelineError::storage(&path, "failed to deserialize cached analysis", e)
        })?;

        tracing::info!("Read in textract output json from {}", path.display());
        Ok(Some(result))
    }

    fn store_analysis(&self, key: &DocumentKey, result: &AnalysisResult) -> Result<()> {
        let path = key.cache_path();
        let json = serde_json::to_vec(result)
            .map_err(|e| PipelineError::storage(&path, "failed to serialize analysis", e))?;
        write_atomic(&path, &json)?;

        tracing::info!("Wrote out textract output json to {}", path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// No-op storage implementation that disables all caching
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpStorage;

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisStorage for NoOpStorage {
    fn get_analysis(&self, _key: &DocumentKey) -> Result<Option<AnalysisResult>> {
        Ok(None) // Always cache miss
    }

    fn store_analysis(&self, _key: &DocumentKey, _result: &AnalysisResult) -> Result<()> {
        Ok(()) // No-op
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Write `contents` to a temp file beside `path`, then rename it into place.
///
/// Readers see either the old file, no file, or the complete new file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = temp_file_beside(dir, path)
        .map_err(|e| PipelineError::storage(path, "failed to create temporary file", e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.flush())
        .map_err(|e| PipelineError::storage(path, "failed to write temporary file", e))?;
    tmp.persist(path)
        .map_err(|e| PipelineError::storage(path, "failed to move file into place", e.error))?;

    Ok(())
}

/// Temp file that ends up with the mode a plain create would give `path`:
/// the destination's current mode when it exists, otherwise 0666 minus umask.
#[cfg_attr(not(unix), allow(unused_mut, unused_variables))]
fn temp_file_beside(dir: &Path, path: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    let tmp = builder.tempfile_in(dir)?;

    #[cfg(unix)]
    {
        if let Ok(existing) = fs::metadata(path) {
            tmp.as_file().set_permissions(existing.permissions())?;
        }
    }

    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Block;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            blocks: vec![Block::new("PAGE", "page-1")],
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().join("doc.pdf")).unwrap();
        let storage = FileStorage::new();

        assert_eq!(storage.get_analysis(&key).unwrap(), None);

        storage.store_analysis(&key, &sample_result()).unwrap();
        assert!(key.cache_path().exists());
        assert_eq!(storage.get_analysis(&key).unwrap(), Some(sample_result()));
    }

    #[test]
    fn test_corrupt_cache_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().join("doc.pdf")).unwrap();
        fs::write(key.cache_path(), b"{\"Blocks\": [").unwrap();

        let err = FileStorage::new().get_analysis(&key).unwrap_err();
        assert_eq!(err.kind(), "StorageFailure");
    }

    #[test]
    fn test_noop_storage_never_hits_or_writes() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().join("doc.pdf")).unwrap();
        let storage = NoOpStorage::new();

        storage.store_analysis(&key, &sample_result()).unwrap();
        assert!(!key.cache_path().exists());
        assert_eq!(storage.get_analysis(&key).unwrap(), None);
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_new_file_gets_plain_create_mode() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let atomic = dir.path().join("atomic.txt");

        fs::write(&plain, b"data").unwrap();
        write_atomic(&atomic, b"data").unwrap();

        assert_eq!(mode(&atomic), mode(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.txt");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(mode(&path), 0o640);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_atomic_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let err = write_atomic(&path, b"data").unwrap_err();
        assert_eq!(err.kind(), "StorageFailure");
    }
}
