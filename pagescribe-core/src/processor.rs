use crate::backends::Analyzer;
use crate::cache::CacheStore;
use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::PipelineError;
use crate::render::TextractLayoutRenderer;
use crate::report::{BatchReport, DocumentOutcome, DocumentReport, Stage};
use crate::storage::{AnalysisStorage, FileStorage, NoOpStorage};
use crate::transcript::TranscriptBuilder;
use crate::types::DocumentKey;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Collects wall-clock timings per pipeline step across a batch
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(&'static str, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        tracing::debug!("{}: {}ms", step_name, elapsed.as_millis());
        self.timings.push((step_name, elapsed));

        result
    }

    /// Per-step totals in first-seen order, with call counts
    pub fn totals(&self) -> Vec<(&'static str, usize, Duration)> {
        let mut totals: Vec<(&'static str, usize, Duration)> = Vec::new();
        for (step, duration) in &self.timings {
            match totals.iter_mut().find(|(name, _, _)| name == step) {
                Some((_, count, total)) => {
                    *count += 1;
                    *total += *duration;
                }
                None => totals.push((step, 1, *duration)),
            }
        }
        totals
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let totals = self.totals();
        let total: Duration = totals.iter().map(|(_, _, d)| *d).sum();

        for (step, count, duration) in &totals {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms over {} call(s) ({:.1}%)",
                step,
                duration.as_millis(),
                count,
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Failure of one document, tagged with the stage it broke in
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed for {}: {source}", input.display())]
pub struct DocumentFailure {
    pub input: PathBuf,
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

pub struct DocumentProcessor {
    cache: CacheStore,
    transcripts: TranscriptBuilder,
    policy: FailurePolicy,
    profiler: StepProfiler,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(cache: CacheStore, transcripts: TranscriptBuilder) -> Self {
        tracing::debug!(
            "Processor using {} analyzer with {} storage",
            cache.analyzer_name(),
            cache.storage_name()
        );
        Self {
            cache,
            transcripts,
            policy: FailurePolicy::default(),
            profiler: StepProfiler::new(false),
        }
    }

    /// Convenience constructor for CLI usage with the Textract backend
    #[cfg(feature = "textract-backend")]
    pub fn from_config(config: &PipelineConfig) -> anyhow::Result<Self> {
        let analyzer = crate::backends::TextractAnalyzer::new(&config.analyzer)?;
        Ok(Self::from_config_with_analyzer(config, Box::new(analyzer)))
    }

    /// Wire storage, renderer options and failure policy from config around any analyzer
    pub fn from_config_with_analyzer(config: &PipelineConfig, analyzer: Box<dyn Analyzer>) -> Self {
        let storage: Box<dyn AnalysisStorage> = if config.skip_cache {
            Box::new(NoOpStorage::new())
        } else {
            Box::new(FileStorage::new())
        };

        let cache = CacheStore::new(storage, analyzer);
        let transcripts = TranscriptBuilder::new(Box::new(TextractLayoutRenderer::new()), config.render);

        Self::new_with_dependencies(cache, transcripts).with_failure_policy(config.on_error)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiler = StepProfiler::new(enabled);
        self
    }

    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    /// Resolve the analysis, render the transcript and write it.
    ///
    /// The transcript is only written after both earlier stages succeed.
    pub fn process_document(&mut self, input: &Path) -> Result<DocumentOutcome, DocumentFailure> {
        let start_time = Instant::now();
        let fail = |stage: Stage| {
            move |source: PipelineError| DocumentFailure {
                input: input.to_path_buf(),
                stage,
                source,
            }
        };

        let key = DocumentKey::new(input).map_err(fail(Stage::Resolve))?;

        let resolved = self
            .profiler
            .time_step("Cache resolve", || self.cache.resolve(&key))
            .map_err(fail(Stage::Resolve))?;

        let transcript = self
            .profiler
            .time_step("Render transcript", || self.transcripts.build(&resolved.result))
            .map_err(fail(Stage::Render))?;
        tracing::debug!("Transcript for {}:\n{}", key, transcript.body());

        let transcript_path = self
            .profiler
            .time_step("Write transcript", || self.transcripts.write(&key, &transcript))
            .map_err(fail(Stage::Write))?;

        Ok(DocumentOutcome {
            input: input.to_path_buf(),
            cache_hit: resolved.cache_hit,
            pages: transcript.page_count(),
            transcript: transcript_path,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Process documents one at a time, in the given order.
    pub fn process_batch(&mut self, inputs: &[PathBuf]) -> BatchReport {
        let started_at = Utc::now();
        let mut documents = Vec::with_capacity(inputs.len());
        let mut aborted = false;

        for input in inputs {
            if aborted {
                documents.push(DocumentReport::skipped(input));
                continue;
            }

            tracing::info!("Processing {}", input.display());
            match self.process_document(input) {
                Ok(outcome) => {
                    tracing::info!(
                        "Finished {} ({} page(s), {}, {}ms)",
                        input.display(),
                        outcome.pages,
                        if outcome.cache_hit { "cached" } else { "analyzed" },
                        outcome.elapsed_ms
                    );
                    documents.push(DocumentReport::succeeded(outcome));
                }
                Err(failure) => {
                    tracing::error!(
                        "{} failed in {} stage ({}): {}",
                        input.display(),
                        failure.stage,
                        failure.source.kind(),
                        failure.source
                    );
                    documents.push(DocumentReport::failed(input, failure.stage, &failure.source));
                    if self.policy == FailurePolicy::Abort {
                        tracing::warn!("Aborting batch after failure of {}", input.display());
                        aborted = true;
                    }
                }
            }
        }

        BatchReport {
            started_at,
            finished_at: Utc::now(),
            policy: self.policy,
            documents,
        }
    }
}
