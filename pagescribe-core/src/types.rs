use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator placed between consecutive pages of a transcript.
pub const PAGE_SEPARATOR: &str = "\n---\n";

/// Extension of the cached analysis result written next to the input.
pub const CACHE_EXTENSION: &str = "json";

/// Extension of the transcript written next to the input.
pub const TRANSCRIPT_EXTENSION: &str = "txt";

/// Page number (1-indexed) to rendered page text, in page order.
pub type PageMap = BTreeMap<u32, String>;

// ===== DOCUMENT IDENTITY =====

/// Identity of one input document: its filesystem path.
///
/// The cache entry and the transcript live beside the input with the same
/// stem, so `reports/q3.pdf` maps to `reports/q3.json` and `reports/q3.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    path: PathBuf,
}

impl DocumentKey {
    /// Fails when the input itself would be overwritten by a derived file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        if matches!(
            extension.as_deref(),
            Some(CACHE_EXTENSION) | Some(TRANSCRIPT_EXTENSION)
        ) {
            return Err(PipelineError::storage_msg(
                &path,
                "input path collides with a derived cache or transcript path",
            ));
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache_path(&self) -> PathBuf {
        self.path.with_extension(CACHE_EXTENSION)
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.path.with_extension(TRANSCRIPT_EXTENSION)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

// ===== ANALYSIS REQUEST =====

/// Feature types requested from the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Capability {
    Layout,
    Tables,
}

/// What every document is analyzed with.
pub const DEFAULT_CAPABILITIES: [Capability; 2] = [Capability::Layout, Capability::Tables];

// ===== ANALYSIS RESULT =====
// Mirrors the Textract AnalyzeDocument response. Keys the model does not name
// are kept in `extra` so cache files written by other tooling survive a load
// and re-save unchanged.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_document_model_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    pub fn page_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.kind() == BlockKind::Page)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub pages: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub block_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_status: Option<String>,
    /// Absent on single-page synchronous responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn new(block_type: &str, id: &str) -> Self {
        Self {
            block_type: block_type.to_string(),
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn kind(&self) -> BlockKind {
        BlockKind::from_block_type(&self.block_type)
    }

    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Ids of `CHILD` relationships, in service order.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|r| r.kind == "CHILD")
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.geometry.as_ref().and_then(|g| g.bounding_box.as_ref())
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Block types the renderer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Page,
    Line,
    Word,
    Table,
    Cell,
    MergedCell,
    SelectionElement,
    LayoutTitle,
    LayoutHeader,
    LayoutFooter,
    LayoutSectionHeader,
    LayoutPageNumber,
    LayoutList,
    LayoutFigure,
    LayoutTable,
    LayoutKeyValue,
    LayoutText,
    Other,
}

impl BlockKind {
    pub fn from_block_type(block_type: &str) -> Self {
        match block_type {
            "PAGE" => BlockKind::Page,
            "LINE" => BlockKind::Line,
            "WORD" => BlockKind::Word,
            "TABLE" => BlockKind::Table,
            "CELL" => BlockKind::Cell,
            "MERGED_CELL" => BlockKind::MergedCell,
            "SELECTION_ELEMENT" => BlockKind::SelectionElement,
            "LAYOUT_TITLE" => BlockKind::LayoutTitle,
            "LAYOUT_HEADER" => BlockKind::LayoutHeader,
            "LAYOUT_FOOTER" => BlockKind::LayoutFooter,
            "LAYOUT_SECTION_HEADER" => BlockKind::LayoutSectionHeader,
            "LAYOUT_PAGE_NUMBER" => BlockKind::LayoutPageNumber,
            "LAYOUT_LIST" => BlockKind::LayoutList,
            "LAYOUT_FIGURE" => BlockKind::LayoutFigure,
            "LAYOUT_TABLE" => BlockKind::LayoutTable,
            "LAYOUT_KEY_VALUE" => BlockKind::LayoutKeyValue,
            "LAYOUT_TEXT" => BlockKind::LayoutText,
            _ => BlockKind::Other,
        }
    }

    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            BlockKind::LayoutTitle
                | BlockKind::LayoutHeader
                | BlockKind::LayoutFooter
                | BlockKind::LayoutSectionHeader
                | BlockKind::LayoutPageNumber
                | BlockKind::LayoutList
                | BlockKind::LayoutFigure
                | BlockKind::LayoutTable
                | BlockKind::LayoutKeyValue
                | BlockKind::LayoutText
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Ids", default)]
    pub ids: Vec<String>,
}

impl Relationship {
    pub fn children<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: "CHILD".to_string(),
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<Point>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Bounding box in page-relative coordinates (0.0 - 1.0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
    pub left: f32,
    pub top: f32,
}

impl BoundingBox {
    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

// ===== TRANSCRIPT =====

/// Flattened, page-ordered text of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    body: String,
    page_count: usize,
}

impl Transcript {
    /// Join page texts with `PAGE_SEPARATOR`, never after the last page.
    pub fn from_pages(pages: &PageMap) -> Self {
        let body = pages
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);

        Self {
            body,
            page_count: pages.len(),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> PageMap {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u32 + 1, t.to_string()))
            .collect()
    }

    #[test]
    fn test_derived_paths_share_stem_and_directory() {
        let key = DocumentKey::new("data/textract-test-document.pdf").unwrap();
        assert_eq!(key.cache_path(), PathBuf::from("data/textract-test-document.json"));
        assert_eq!(key.transcript_path(), PathBuf::from("data/textract-test-document.txt"));
    }

    #[test]
    fn test_derived_paths_keep_inner_dots() {
        let key = DocumentKey::new("scans/2024.03.invoice.PDF").unwrap();
        assert_eq!(key.cache_path(), PathBuf::from("scans/2024.03.invoice.json"));
        assert_eq!(key.transcript_path(), PathBuf::from("scans/2024.03.invoice.txt"));
    }

    #[test]
    fn test_key_rejects_paths_that_collide_with_outputs() {
        assert!(DocumentKey::new("doc.json").is_err());
        assert!(DocumentKey::new("doc.TXT").is_err());
        assert!(DocumentKey::new("doc").is_ok());
    }

    #[test]
    fn test_transcript_has_n_minus_one_separators() {
        let transcript = Transcript::from_pages(&pages(&["first", "second", "third"]));
        assert_eq!(transcript.body().matches(PAGE_SEPARATOR).count(), 2);
        let split: Vec<&str> = transcript.body().split(PAGE_SEPARATOR).collect();
        assert_eq!(split, vec!["first", "second", "third"]);
        assert_eq!(transcript.page_count(), 3);
    }

    #[test]
    fn test_transcript_of_zero_pages_is_empty() {
        let transcript = Transcript::from_pages(&PageMap::new());
        assert!(transcript.is_empty());
        assert_eq!(transcript.page_count(), 0);
    }

    #[test]
    fn test_empty_page_still_gets_separators() {
        let transcript = Transcript::from_pages(&pages(&["A", "", "C"]));
        assert_eq!(transcript.body(), "A\n---\n\n---\nC");
    }

    #[test]
    fn test_analysis_result_keeps_unknown_keys() {
        let json = r#"{
            "DocumentMetadata": {"Pages": 1},
            "Blocks": [{"BlockType": "PAGE", "Id": "p1", "Query": {"Text": "q"}}],
            "AnalyzeDocumentModelVersion": "1.0",
            "ResponseMetadata": {"HTTPStatusCode": 200}
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert!(result.extra.contains_key("ResponseMetadata"));
        assert!(result.blocks[0].extra.contains_key("Query"));

        let again: AnalysisResult =
            serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();
        assert_eq!(again, result);
    }

    #[test]
    fn test_non_ascii_text_is_not_escaped() {
        let mut block = Block::new("LINE", "l1");
        block.text = Some("Präsentation – 東京".to_string());
        let result = AnalysisResult {
            blocks: vec![block],
            ..AnalysisResult::default()
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("Präsentation – 東京"));
    }

    #[test]
    fn test_child_ids_ignore_other_relationship_types() {
        let mut block = Block::new("PAGE", "p1");
        block.relationships = vec![
            Relationship::children(["a", "b"]),
            Relationship {
                kind: "VALUE".to_string(),
                ids: vec!["v".to_string()],
            },
        ];
        assert_eq!(block.child_ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_bounding_box_contains_center() {
        let bbox = BoundingBox {
            width: 0.5,
            height: 0.2,
            left: 0.1,
            top: 0.3,
        };
        let (x, y) = bbox.center();
        assert!(bbox.contains(x, y));
        assert!(!bbox.contains(0.05, y));
    }
}
