//! Error taxonomy for the cache-and-transcript pipeline.
//!
//! Every failure aborts the document it happened on and nothing else. The
//! variants line up with the place the pipeline broke:
//!
//! - `Storage` - a cache, transcript or source file could not be read, written or parsed
//! - `Analysis` - the remote analysis call failed (network, auth, quota, bad input)
//! - `Render` - the analysis result does not have the page structure the renderer needs
//! - `Config` - the configuration file or a CLI override is invalid

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using `PipelineError`.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("storage failure at {}: {message}", path.display())]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("analysis failed for {}: {message}", path.display())]
    Analysis {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("render failure: {message}")]
    Render { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl PipelineError {
    pub fn storage(path: &Path, message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn storage_msg(path: &Path, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            message: message.into(),
            source: None,
        }
    }

    pub fn analysis(path: &Path, source: anyhow::Error) -> Self {
        Self::Analysis {
            path: path.to_path_buf(),
            message: format!("{source:#}"),
            source: Some(source.into()),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Short taxonomy name used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage { .. } => "StorageFailure",
            Self::Analysis { .. } => "AnalysisFailure",
            Self::Render { .. } => "RenderFailure",
            Self::Config { .. } => "ConfigFailure",
        }
    }
}
