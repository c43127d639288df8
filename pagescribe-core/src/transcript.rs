use crate::error::Result;
use crate::render::{LayoutRenderer, RenderOptions, TextractLayoutRenderer};
use crate::storage::write_atomic;
use crate::types::{AnalysisResult, DocumentKey, Transcript};
use std::path::PathBuf;

/// Flattens an analysis result into a page-ordered transcript and writes it
/// beside the input. Transcripts are rewritten on every run.
pub struct TranscriptBuilder {
    renderer: Box<dyn LayoutRenderer>,
    options: RenderOptions,
}

impl Default for TranscriptBuilder {
    fn default() -> Self {
        Self::new(Box::new(TextractLayoutRenderer::new()), RenderOptions::default())
    }
}

impl TranscriptBuilder {
    pub fn new(renderer: Box<dyn LayoutRenderer>, options: RenderOptions) -> Self {
        Self { renderer, options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    pub fn build(&self, result: &AnalysisResult) -> Result<Transcript> {
        let pages = self.renderer.render(result, self.options)?;
        tracing::debug!(
            "{} rendered {} page(s) (markdown: {}, exclude figures: {})",
            self.renderer.name(),
            pages.len(),
            self.options.generate_markdown,
            self.options.exclude_figure_text
        );
        Ok(Transcript::from_pages(&pages))
    }

    /// Write the transcript body exactly, with no trailing newline. A zero-page
    /// transcript still produces a zero-length file.
    pub fn write(&self, key: &DocumentKey, transcript: &Transcript) -> Result<PathBuf> {
        let path = key.transcript_path();
        write_atomic(&path, transcript.body().as_bytes())?;
        tracing::info!("Wrote out text contents to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::types::PageMap;

    /// Renderer that hands back a fixed page map
    struct FixedPages(PageMap);

    impl LayoutRenderer for FixedPages {
        fn render(&self, _result: &AnalysisResult, _options: RenderOptions) -> Result<PageMap> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    impl LayoutRenderer for Broken {
        fn render(&self, _result: &AnalysisResult, _options: RenderOptions) -> Result<PageMap> {
            Err(PipelineError::render("no pages"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn builder(pages: &[(u32, &str)]) -> TranscriptBuilder {
        let map = pages.iter().map(|(n, t)| (*n, t.to_string())).collect();
        TranscriptBuilder::new(Box::new(FixedPages(map)), RenderOptions::default())
    }

    #[test]
    fn test_build_joins_pages_in_order() {
        let transcript = builder(&[(2, "B"), (1, "A")])
            .build(&AnalysisResult::default())
            .unwrap();
        assert_eq!(transcript.body(), "A\n---\nB");
    }

    #[test]
    fn test_render_failure_propagates() {
        let builder = TranscriptBuilder::new(Box::new(Broken), RenderOptions::default());
        let err = builder.build(&AnalysisResult::default()).unwrap_err();
        assert_eq!(err.kind(), "RenderFailure");
    }

    #[test]
    fn test_write_overwrites_and_has_no_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().join("doc.pdf")).unwrap();
        std::fs::write(key.transcript_path(), "stale transcript").unwrap();

        let builder = builder(&[(1, "A"), (2, "B")]);
        let transcript = builder.build(&AnalysisResult::default()).unwrap();
        let path = builder.write(&key, &transcript).unwrap();

        assert_eq!(path, key.transcript_path());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "A\n---\nB");
    }

    #[test]
    fn test_zero_pages_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().join("blank.pdf")).unwrap();

        let builder = builder(&[]);
        let transcript = builder.build(&AnalysisResult::default()).unwrap();
        let path = builder.write(&key, &transcript).unwrap();

        assert_eq!(std::fs::metadata(path).unwrap().len(), 0);
    }
}
