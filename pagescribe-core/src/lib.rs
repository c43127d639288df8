// Pagescribe Core Library
//
// Cached document analysis with pluggable analyzer backends, and page-ordered
// transcripts rendered from the cached layout.
// Main interface for turning PDFs into text files.

pub mod backends;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod processor;
pub mod render;
pub mod report;
pub mod storage;
pub mod transcript;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use backends::{Analyzer, MockAnalyzer};
pub use cache::{CacheStore, Resolved};
pub use config::{AnalyzerConfig, ConfigSource, FailurePolicy, PipelineConfig};
pub use discovery::discover;
pub use error::{PipelineError, Result};
pub use processor::{DocumentFailure, DocumentProcessor, StepProfiler};
pub use render::{LayoutRenderer, RenderOptions, TextractLayoutRenderer};
pub use report::{BatchReport, DocumentOutcome, DocumentReport, DocumentStatus, Stage};
pub use storage::{AnalysisStorage, FileStorage, NoOpStorage};
pub use transcript::TranscriptBuilder;

// Re-export backends for direct use
#[cfg(feature = "textract-backend")]
pub use backends::TextractAnalyzer;
