//! Layout renderers
//!
//! A renderer turns an `AnalysisResult` into a `PageMap`: one plain-text
//! string per page, keyed by page number.
//!
//! ```text
//! AnalysisResult (Textract blocks)
//!     ↓
//! [LayoutRenderer]  (reading order, tables, figures)
//!     ↓
//! PageMap
//!     ↓
//! [TranscriptBuilder]  (join with "\n---\n")
//!     ↓
//! Transcript
//! ```

pub mod layout;
pub mod table;

use crate::error::Result;
use crate::types::{AnalysisResult, PageMap};
use serde::{Deserialize, Serialize};

pub use layout::TextractLayoutRenderer;

/// Flags for the renderer. Both default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Emit markdown headings, list markers and pipe tables
    #[serde(default)]
    pub generate_markdown: bool,
    /// Leave out text found inside figures
    #[serde(default)]
    pub exclude_figure_text: bool,
}

pub trait LayoutRenderer: Send + Sync {
    /// Fails with `PipelineError::Render` when the page structure is missing or broken.
    fn render(&self, result: &AnalysisResult, options: RenderOptions) -> Result<PageMap>;

    /// Renderer name for logging
    fn name(&self) -> &str;
}
