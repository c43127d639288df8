//! Textract layout renderer
//!
//! Walks the block graph page by page. Each `PAGE` block lists its children
//! in reading order; the `LAYOUT_*` children become paragraphs separated by a
//! blank line. Pages analyzed without the layout feature fall back to their
//! `LINE` children.
//!
//! Tables are taken from the `TABLE` block whose center lies inside the
//! `LAYOUT_TABLE` box, so cells come out row by row instead of as loose lines.

use super::table::TableGrid;
use super::{LayoutRenderer, RenderOptions};
use crate::error::{PipelineError, Result};
use crate::types::{AnalysisResult, Block, BlockKind, PageMap};
use std::collections::{HashMap, HashSet};

const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct TextractLayoutRenderer;

impl TextractLayoutRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutRenderer for TextractLayoutRenderer {
    fn render(&self, result: &AnalysisResult, options: RenderOptions) -> Result<PageMap> {
        if result.blocks.is_empty() {
            return Ok(PageMap::new());
        }

        let index = BlockIndex::new(&result.blocks)?;
        let pages: Vec<&Block> = result
            .blocks
            .iter()
            .filter(|b| b.kind() == BlockKind::Page)
            .collect();
        if pages.is_empty() {
            return Err(PipelineError::render(format!(
                "analysis result has {} blocks but no PAGE block",
                result.blocks.len()
            )));
        }

        let mut page_map = PageMap::new();
        for page in pages {
            let number = page.page_number();
            let renderer = PageRenderer::new(&index, number, options);
            if page_map.insert(number, renderer.render(page)?).is_some() {
                return Err(PipelineError::render(format!(
                    "more than one PAGE block for page {number}"
                )));
            }
        }

        Ok(page_map)
    }

    fn name(&self) -> &str {
        "textract-layout"
    }
}

/// Id lookup over all blocks, with every `CHILD` reference checked up front.
struct BlockIndex<'a> {
    blocks: &'a [Block],
    by_id: HashMap<&'a str, &'a Block>,
}

impl<'a> BlockIndex<'a> {
    fn new(blocks: &'a [Block]) -> Result<Self> {
        let by_id: HashMap<&str, &Block> = blocks.iter().map(|b| (b.id.as_str(), b)).collect();

        for block in blocks {
            if let Some(missing) = block.child_ids().find(|id| !by_id.contains_key(id)) {
                return Err(PipelineError::render(format!(
                    "{} block {} references unknown child {}",
                    block.block_type, block.id, missing
                )));
            }
        }

        Ok(Self { blocks, by_id })
    }

    fn get(&self, id: &str) -> Option<&'a Block> {
        self.by_id.get(id).copied()
    }

    fn children(&self, block: &'a Block) -> Vec<&'a Block> {
        block.child_ids().filter_map(|id| self.get(id)).collect()
    }
}

struct PageRenderer<'i, 'a> {
    index: &'i BlockIndex<'a>,
    options: RenderOptions,
    tables: Vec<&'a Block>,
}

impl<'i, 'a> PageRenderer<'i, 'a> {
    fn new(index: &'i BlockIndex<'a>, page_number: u32, options: RenderOptions) -> Self {
        let tables = index
            .blocks
            .iter()
            .filter(|b| b.kind() == BlockKind::Table && b.page_number() == page_number)
            .collect();

        Self {
            index,
            options,
            tables,
        }
    }

    fn render(&self, page: &'a Block) -> Result<String> {
        let children = self.index.children(page);
        let layouts: Vec<&Block> = children
            .iter()
            .copied()
            .filter(|b| b.kind().is_layout())
            .collect();

        if layouts.is_empty() {
            return Ok(line_texts(&children).join("\n"));
        }

        // List items can show up both under the list and directly under the page
        let nested: HashSet<&str> = layouts
            .iter()
            .copied()
            .filter(|b| b.kind() == BlockKind::LayoutList)
            .flat_map(|b| b.child_ids())
            .collect();

        let mut used_tables = vec![false; self.tables.len()];
        let mut paragraphs = Vec::new();
        for layout in layouts.into_iter().filter(|b| !nested.contains(b.id.as_str())) {
            match self.render_layout(layout, &mut used_tables)? {
                Some(text) if !text.is_empty() => paragraphs.push(text),
                _ => {}
            }
        }
        Ok(paragraphs.join(PARAGRAPH_SEPARATOR))
    }

    fn render_layout(&self, layout: &'a Block, used_tables: &mut [bool]) -> Result<Option<String>> {
        let markdown = self.options.generate_markdown;
        let text = match layout.kind() {
            BlockKind::LayoutFigure if self.options.exclude_figure_text => return Ok(None),
            BlockKind::LayoutList => self.render_list(layout),
            BlockKind::LayoutTable => self.render_table(layout, used_tables)?,
            BlockKind::LayoutTitle if markdown => format!("# {}", self.lines(layout).join(" ")),
            BlockKind::LayoutSectionHeader if markdown => {
                format!("## {}", self.lines(layout).join(" "))
            }
            _ => self.lines(layout).join("\n"),
        };
        Ok(Some(text))
    }

    fn render_list(&self, list: &'a Block) -> String {
        let children = self.index.children(list);
        let items: Vec<String> = if children.iter().any(|b| b.kind().is_layout()) {
            children
                .iter()
                .copied()
                .filter(|b| b.kind().is_layout())
                .map(|item| self.lines(item).join(self.item_line_separator()))
                .collect()
        } else {
            line_texts(&children).into_iter().map(str::to_string).collect()
        };

        items
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(|item| {
                if self.options.generate_markdown {
                    format!("- {item}")
                } else {
                    item
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_table(&self, layout: &'a Block, used_tables: &mut [bool]) -> Result<String> {
        let matched = self.tables.iter().enumerate().position(|(i, table)| {
            !used_tables[i]
                && match (layout.bounding_box(), table.bounding_box()) {
                    (Some(area), Some(bbox)) => {
                        let (x, y) = bbox.center();
                        area.contains(x, y)
                    }
                    (None, _) => true,
                    (Some(_), None) => false,
                }
        });

        if let Some(i) = matched {
            used_tables[i] = true;
            let grid = TableGrid::from_table(self.tables[i], |id| self.index.get(id))?;
            if !grid.is_empty() {
                return Ok(if self.options.generate_markdown {
                    grid.to_markdown()
                } else {
                    grid.to_plain()
                });
            }
        }

        Ok(self.lines(layout).join("\n"))
    }

    fn lines(&self, layout: &'a Block) -> Vec<&'a str> {
        line_texts(&self.index.children(layout))
    }

    fn item_line_separator(&self) -> &'static str {
        if self.options.generate_markdown {
            " "
        } else {
            "\n"
        }
    }
}

fn line_texts<'a>(blocks: &[&'a Block]) -> Vec<&'a str> {
    blocks
        .iter()
        .filter(|b| b.kind() == BlockKind::Line)
        .map(|b| b.text_or_empty())
        .collect()
}
