use crate::error::{PipelineError, Result};
use crate::render::RenderOptions;
use serde::{Deserialize, Serialize};

/// Environment variable consulted for the AWS region
pub const REGION_ENV_VAR: &str = "AWS_REGION";

/// Region used when neither the config nor the environment names one
pub const DEFAULT_REGION: &str = "ap-south-1";

/// Input used when the CLI is given none
pub const DEFAULT_INPUT: &str = "./data/*.pdf";

// Default value functions for serde
fn default_input() -> String {
    DEFAULT_INPUT.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// File, directory or glob pattern to process
    #[serde(default = "default_input")]
    pub input: String,
    /// Remote analysis client settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Flags passed to the layout renderer
    #[serde(default)]
    pub render: RenderOptions,
    /// What a failed document does to the rest of the batch
    #[serde(default)]
    pub on_error: FailurePolicy,
    /// Neither read nor write cached analysis results
    #[serde(default)]
    pub skip_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// AWS region; falls back to `AWS_REGION`, then `ap-south-1`
    #[serde(default)]
    pub region: Option<String>,
    /// Total attempts per call, including the first (standard retry mode with backoff)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Upper bound on one AnalyzeDocument operation, retries included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            region: None,
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AnalyzerConfig {
    /// Region from config, then `AWS_REGION`, then the fixed default
    pub fn resolve_region(&self) -> String {
        self.resolve_region_from(std::env::var(REGION_ENV_VAR).ok())
    }

    pub fn resolve_region_from(&self, env_region: Option<String>) -> String {
        let non_blank = |r: &String| !r.trim().is_empty();
        self.region
            .clone()
            .filter(non_blank)
            .or(env_region.filter(non_blank))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No config file was given
    Defaults,
    File(String),
    /// A config file was given but could not be used
    Fallback { path: String, reason: String },
}

/// Batch behavior after a document fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next document
    #[default]
    Continue,
    /// Stop the batch; remaining documents are reported as skipped
    Abort,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            analyzer: AnalyzerConfig::default(),
            render: RenderOptions::default(),
            on_error: FailurePolicy::default(),
            skip_cache: false,
        }
    }
}

impl PipelineConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("failed to read config file {path}: {e}"))
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&content).map_err(|e| {
            PipelineError::config(format!("failed to parse config file {path}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default, reporting which one was used
    pub fn load_with_fallback(path: Option<&str>) -> (Self, ConfigSource) {
        let Some(p) = path else {
            return (Self::default(), ConfigSource::Defaults);
        };

        match Self::load_from_file(p) {
            Ok(config) => (config, ConfigSource::File(p.to_string())),
            Err(e) => {
                tracing::warn!("{e}; using defaults");
                let source = ConfigSource::Fallback {
                    path: p.to_string(),
                    reason: e.to_string(),
                };
                (Self::default(), source)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(PipelineError::config("input must not be empty"));
        }
        if self.analyzer.max_attempts == 0 {
            return Err(PipelineError::config("analyzer.max_attempts must be at least 1"));
        }
        if self.analyzer.timeout_secs == 0 {
            return Err(PipelineError::config("analyzer.timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.input, "./data/*.pdf");
        assert!(!config.render.generate_markdown);
        assert!(!config.render.exclude_figure_text);
        assert_eq!(config.on_error, FailurePolicy::Continue);
        assert!(!config.skip_cache);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "input: scans/\non_error: abort\nanalyzer:\n  region: eu-west-1\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.input, "scans/");
        assert_eq!(config.on_error, FailurePolicy::Abort);
        assert_eq!(config.analyzer.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.analyzer.max_attempts, 3);
        assert_eq!(config.analyzer.timeout_secs, 120);
    }

    #[test]
    fn test_region_precedence() {
        let mut analyzer = AnalyzerConfig::default();
        assert_eq!(analyzer.resolve_region_from(None), "ap-south-1");
        assert_eq!(
            analyzer.resolve_region_from(Some("us-east-2".to_string())),
            "us-east-2"
        );

        analyzer.region = Some("eu-central-1".to_string());
        assert_eq!(
            analyzer.resolve_region_from(Some("us-east-2".to_string())),
            "eu-central-1"
        );
    }

    #[test]
    fn test_blank_region_falls_back_to_default() {
        let analyzer = AnalyzerConfig::default();
        assert_eq!(analyzer.resolve_region_from(Some("  ".to_string())), "ap-south-1");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        config.analyzer.max_attempts = 0;
        assert_eq!(config.validate().unwrap_err().kind(), "ConfigFailure");
    }

    #[test]
    fn test_load_with_fallback_on_missing_file() {
        let (config, source) =
            PipelineConfig::load_with_fallback(Some("/nonexistent/pagescribe.yaml"));
        assert_eq!(config, PipelineConfig::default());
        match source {
            ConfigSource::Fallback { path, reason } => {
                assert_eq!(path, "/nonexistent/pagescribe.yaml");
                assert!(reason.contains("failed to read config file"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_load_with_fallback_on_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagescribe.yaml");
        std::fs::write(&path, "analyzer:\n  max_attempts: 0\n").unwrap();
        let path = path.to_str().unwrap();

        let (config, source) = PipelineConfig::load_with_fallback(Some(path));
        assert_eq!(config, PipelineConfig::default());
        assert!(matches!(source, ConfigSource::Fallback { .. }));
    }

    #[test]
    fn test_load_with_fallback_reports_sources() {
        let (_, source) = PipelineConfig::load_with_fallback(None);
        assert_eq!(source, ConfigSource::Defaults);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagescribe.yaml");
        std::fs::write(&path, "skip_cache: true\n").unwrap();
        let path = path.to_str().unwrap();

        let (config, source) = PipelineConfig::load_with_fallback(Some(path));
        assert!(config.skip_cache);
        assert_eq!(source, ConfigSource::File(path.to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagescribe.yaml");
        std::fs::write(&path, "skip_cache: true\nrender:\n  generate_markdown: true\n").unwrap();

        let config = PipelineConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert!(config.skip_cache);
        assert!(config.render.generate_markdown);
        assert!(!config.render.exclude_figure_text);
    }
}
