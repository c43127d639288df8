use crate::backends::Analyzer;
use crate::error::{PipelineError, Result};
use crate::storage::AnalysisStorage;
use crate::types::{AnalysisResult, Capability, DocumentKey, DEFAULT_CAPABILITIES};

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub result: AnalysisResult,
    pub cache_hit: bool,
}

/// Resolve-or-produce for analysis results.
///
/// A hit is purely "the cache entry exists": there is no TTL and no check
/// against the source document, so an edited PDF keeps its old result until
/// its cache file is deleted.
pub struct CacheStore {
    storage: Box<dyn AnalysisStorage>,
    analyzer: Box<dyn Analyzer>,
    capabilities: Vec<Capability>,
}

impl CacheStore {
    pub fn new(storage: Box<dyn AnalysisStorage>, analyzer: Box<dyn Analyzer>) -> Self {
        Self {
            storage,
            analyzer,
            capabilities: DEFAULT_CAPABILITIES.to_vec(),
        }
    }

    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    pub fn storage_name(&self) -> &str {
        self.storage.name()
    }

    pub fn resolve(&self, key: &DocumentKey) -> Result<Resolved> {
        if let Some(result) = self.storage.get_analysis(key)? {
            return Ok(Resolved {
                result,
                cache_hit: true,
            });
        }

        tracing::warn!(
            "Did not find textract JSON output at {}, generating output might take a while...",
            key.cache_path().display()
        );

        tracing::debug!("Reading file {} as bytes", key);
        let document = std::fs::read(key.path())
            .map_err(|e| PipelineError::storage(key.path(), "failed to read document", e))?;

        let result = self
            .analyzer
            .analyze(&document, &self.capabilities)
            .map_err(|e| PipelineError::analysis(key.path(), e))?;

        self.storage.store_analysis(key, &result)?;

        Ok(Resolved {
            result,
            cache_hit: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockAnalyzer;
    use crate::storage::{FileStorage, NoOpStorage};
    use crate::types::Block;

    fn one_page() -> AnalysisResult {
        AnalysisResult {
            blocks: vec![Block::new("PAGE", "p1")],
            ..AnalysisResult::default()
        }
    }

    fn document(dir: &tempfile::TempDir) -> DocumentKey {
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7 fake").unwrap();
        DocumentKey::new(path).unwrap()
    }

    #[test]
    fn test_second_resolve_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let key = document(&dir);
        let analyzer = MockAnalyzer::new(one_page());
        let cache = CacheStore::new(Box::new(FileStorage::new()), Box::new(analyzer.clone()));

        let first = cache.resolve(&key).unwrap();
        let second = cache.resolve(&key).unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.result, second.result);
        assert_eq!(analyzer.calls(), 1);
    }

    #[test]
    fn test_requests_layout_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let key = document(&dir);
        let analyzer = MockAnalyzer::new(one_page());
        let cache = CacheStore::new(Box::new(FileStorage::new()), Box::new(analyzer.clone()));

        cache.resolve(&key).unwrap();
        assert_eq!(
            analyzer.last_capabilities(),
            vec![Capability::Layout, Capability::Tables]
        );
    }

    #[test]
    fn test_missing_document_is_storage_failure_without_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().join("absent.pdf")).unwrap();
        let analyzer = MockAnalyzer::new(one_page());
        let cache = CacheStore::new(Box::new(FileStorage::new()), Box::new(analyzer.clone()));

        let err = cache.resolve(&key).unwrap_err();
        assert_eq!(err.kind(), "StorageFailure");
        assert_eq!(analyzer.calls(), 0);
    }

    #[test]
    fn test_analysis_failure_leaves_no_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let key = document(&dir);
        let cache = CacheStore::new(
            Box::new(FileStorage::new()),
            Box::new(MockAnalyzer::failing("AccessDeniedException")),
        );

        let err = cache.resolve(&key).unwrap_err();
        assert_eq!(err.kind(), "AnalysisFailure");
        assert!(!key.cache_path().exists());
    }

    #[test]
    fn test_noop_storage_calls_analyzer_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let key = document(&dir);
        let analyzer = MockAnalyzer::new(one_page());
        let cache = CacheStore::new(Box::new(NoOpStorage::new()), Box::new(analyzer.clone()));

        cache.resolve(&key).unwrap();
        cache.resolve(&key).unwrap();
        assert_eq!(analyzer.calls(), 2);
        assert!(!key.cache_path().exists());
    }
}
