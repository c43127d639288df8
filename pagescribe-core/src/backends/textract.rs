//! AWS Textract backend
//!
//! Calls `AnalyzeDocument`, the synchronous Textract API, and converts the
//! SDK response into the serde `AnalysisResult` model so it can be cached as
//! Textract-shaped JSON.
//!
//! # Credentials
//! Uses the default AWS provider chain (environment, shared config/credentials
//! files, instance or container roles). Only the region is configured here.
//!
//! # Runtime
//! The SDK is async. The backend owns a current-thread tokio runtime and
//! blocks on each call, so callers stay synchronous and documents are
//! analyzed one at a time.
//!
//! # Retries
//! Standard retry mode: throttling and transient errors are retried with
//! exponential backoff and jitter up to `max_attempts` total attempts.

use super::Analyzer;
use crate::config::AnalyzerConfig;
use crate::types::{
    AnalysisResult, Block, BoundingBox, Capability, DocumentMetadata, Geometry, Point,
    Relationship,
};
use anyhow::{anyhow, Context, Result};
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_textract::error::DisplayErrorContext;
use aws_sdk_textract::operation::analyze_document::AnalyzeDocumentOutput;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{self as sdk, FeatureType};
use aws_sdk_textract::Client;
use serde_json::Map;
use std::time::Duration;
use tokio::runtime::Runtime;

pub struct TextractAnalyzer {
    client: Client,
    runtime: Runtime,
    region: String,
}

impl TextractAnalyzer {
    /// Build the client once; it is reused read-only for every document.
    pub fn new(settings: &AnalyzerConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start tokio runtime for the Textract client")?;

        let region = settings.resolve_region();
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(settings.timeout_secs))
            .build();

        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.clone()))
                .retry_config(RetryConfig::standard().with_max_attempts(settings.max_attempts))
                .timeout_config(timeouts)
                .load(),
        );

        tracing::debug!(
            "Textract client ready (region {}, max attempts {}, timeout {}s)",
            region,
            settings.max_attempts,
            settings.timeout_secs
        );

        Ok(Self {
            client: Client::new(&sdk_config),
            runtime,
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

impl Analyzer for TextractAnalyzer {
    fn analyze(&self, document: &[u8], capabilities: &[Capability]) -> Result<AnalysisResult> {
        let mut request = self.client.analyze_document().document(
            sdk::Document::builder()
                .bytes(Blob::new(document.to_vec()))
                .build(),
        );
        for capability in capabilities {
            request = request.feature_types(feature_type(*capability));
        }

        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))
            .with_context(|| format!("Textract AnalyzeDocument failed in {}", self.region))?;

        Ok(convert_output(&output))
    }

    fn name(&self) -> &str {
        "textract"
    }
}

fn feature_type(capability: Capability) -> FeatureType {
    match capability {
        Capability::Layout => FeatureType::Layout,
        Capability::Tables => FeatureType::Tables,
    }
}

fn convert_output(output: &AnalyzeDocumentOutput) -> AnalysisResult {
    AnalysisResult {
        document_metadata: output.document_metadata().map(|m| DocumentMetadata {
            pages: m.pages().and_then(to_u32).unwrap_or(0),
            extra: Map::new(),
        }),
        blocks: output.blocks().iter().map(convert_block).collect(),
        analyze_document_model_version: output
            .analyze_document_model_version()
            .map(str::to_string),
        extra: Map::new(),
    }
}

fn convert_block(block: &sdk::Block) -> Block {
    Block {
        block_type: block
            .block_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        id: block.id().unwrap_or_default().to_string(),
        confidence: block.confidence(),
        text: block.text().map(str::to_string),
        text_type: block.text_type().map(|t| t.as_str().to_string()),
        row_index: block.row_index().and_then(to_u32),
        column_index: block.column_index().and_then(to_u32),
        row_span: block.row_span().and_then(to_u32),
        column_span: block.column_span().and_then(to_u32),
        geometry: block.geometry().map(convert_geometry),
        relationships: block
            .relationships()
            .iter()
            .map(|r| Relationship {
                kind: r.r#type().map(|t| t.as_str().to_string()).unwrap_or_default(),
                ids: r.ids().to_vec(),
            })
            .collect(),
        entity_types: block
            .entity_types()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect(),
        selection_status: block.selection_status().map(|s| s.as_str().to_string()),
        page: block.page().and_then(to_u32),
        extra: Map::new(),
    }
}

fn convert_geometry(geometry: &sdk::Geometry) -> Geometry {
    Geometry {
        bounding_box: geometry.bounding_box().map(|b| BoundingBox {
            width: b.width(),
            height: b.height(),
            left: b.left(),
            top: b.top(),
        }),
        polygon: geometry
            .polygon()
            .iter()
            .map(|p| Point { x: p.x(), y: p.y() })
            .collect(),
        extra: Map::new(),
    }
}

fn to_u32(value: i32) -> Option<u32> {
    u32::try_from(value).ok()
}
