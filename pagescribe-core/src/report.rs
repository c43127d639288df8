use crate::config::FailurePolicy;
use crate::error::{PipelineError, Result};
use crate::storage::write_atomic;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where in the per-document pipeline a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Cache lookup, source read or remote analysis
    Resolve,
    /// Analysis result → page texts
    Render,
    /// Transcript file write
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolve => "resolve",
            Stage::Render => "render",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// Successful run over one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutcome {
    pub input: PathBuf,
    pub cache_hit: bool,
    pub pages: usize,
    pub transcript: PathBuf,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Succeeded {
        cache_hit: bool,
        pages: usize,
        transcript: PathBuf,
        elapsed_ms: u64,
    },
    Failed {
        stage: Stage,
        kind: String,
        error: String,
    },
    /// Not attempted because an earlier document aborted the batch
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub input: PathBuf,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

impl DocumentReport {
    pub fn succeeded(outcome: DocumentOutcome) -> Self {
        Self {
            input: outcome.input,
            status: DocumentStatus::Succeeded {
                cache_hit: outcome.cache_hit,
                pages: outcome.pages,
                transcript: outcome.transcript,
                elapsed_ms: outcome.elapsed_ms,
            },
        }
    }

    pub fn failed(input: &Path, stage: Stage, error: &PipelineError) -> Self {
        Self {
            input: input.to_path_buf(),
            status: DocumentStatus::Failed {
                stage,
                kind: error.kind().to_string(),
                error: error.to_string(),
            },
        }
    }

    pub fn skipped(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            status: DocumentStatus::Skipped,
        }
    }
}

/// Summary of a sequential batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub policy: FailurePolicy,
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Succeeded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Skipped))
    }

    pub fn cache_hits(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Succeeded { cache_hit: true, .. }))
    }

    /// True when nothing failed or was skipped
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| PipelineError::storage(path, "failed to serialize batch report", e))?;
        write_atomic(path, &json)
    }

    fn count(&self, predicate: impl Fn(&DocumentStatus) -> bool) -> usize {
        self.documents.iter().filter(|d| predicate(&d.status)).count()
    }
}
