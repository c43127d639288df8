use super::Analyzer;
use crate::types::{AnalysisResult, Capability};
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An analyzer that returns a canned result (or a canned failure) and counts calls.
///
/// Clones share the call counter, so a test can keep one handle and move the
/// other into a `CacheStore`.
#[derive(Clone)]
pub struct MockAnalyzer {
    response: std::result::Result<AnalysisResult, String>,
    calls: Arc<AtomicUsize>,
    last_capabilities: Arc<Mutex<Vec<Capability>>>,
}

impl MockAnalyzer {
    pub fn new(result: AnalysisResult) -> Self {
        Self {
            response: Ok(result),
            calls: Arc::new(AtomicUsize::new(0)),
            last_capabilities: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
            last_capabilities: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_capabilities(&self) -> Vec<Capability> {
        self.last_capabilities
            .lock()
            .map(|caps| caps.clone())
            .unwrap_or_default()
    }
}

impl Analyzer for MockAnalyzer {
    fn analyze(&self, _document: &[u8], capabilities: &[Capability]) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_capabilities.lock() {
            *last = capabilities.to_vec();
        }

        match &self.response {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(anyhow!("{}", message)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
