//! Analyzer trait and backends
//!
//! An analyzer turns raw document bytes into an `AnalysisResult`. The cache
//! layer calls it only on a miss, so every call is assumed to cost real time
//! and money.
//!
//! ## Available Backends
//!
//! - `TextractAnalyzer` - AWS Textract `AnalyzeDocument` (feature `textract-backend`)
//! - `MockAnalyzer` - canned results for tests and offline runs

use crate::types::{AnalysisResult, Capability};
use anyhow::Result;

pub mod mock;

#[cfg(feature = "textract-backend")]
pub mod textract;

pub use mock::MockAnalyzer;

#[cfg(feature = "textract-backend")]
pub use textract::TextractAnalyzer;

/// Backend trait for document analysis
///
/// Implementations call the provider synchronously (request/response, no
/// job polling) and return the provider's result unmodified.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, document: &[u8], capabilities: &[Capability]) -> Result<AnalysisResult>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;
}
