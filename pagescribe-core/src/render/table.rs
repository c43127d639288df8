use crate::error::{PipelineError, Result};
use crate::types::{Block, BlockKind};

/// Upper bound on rows × columns for one table
const MAX_GRID_SLOTS: usize = 250_000;

/// Cell grid of one TABLE block, rows and columns in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGrid {
    rows: Vec<Vec<String>>,
}

impl TableGrid {
    /// Build the grid from the table's `CELL` children.
    ///
    /// `lookup` resolves a block id. Cells without indices are skipped; merged
    /// cells are ignored since their member cells carry the text. A row or
    /// column index beyond the number of cells, or a grid larger than
    /// `MAX_GRID_SLOTS`, is a render failure.
    pub fn from_table<'a, F>(table: &'a Block, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<&'a Block>,
    {
        let cells: Vec<&Block> = table
            .child_ids()
            .filter_map(&lookup)
            .filter(|b| b.kind() == BlockKind::Cell)
            .collect();

        let row_count = cells.iter().filter_map(|c| c.row_index).max().unwrap_or(0) as usize;
        let col_count = cells.iter().filter_map(|c| c.column_index).max().unwrap_or(0) as usize;
        let slots = row_count.saturating_mul(col_count);
        if row_count > cells.len() || col_count > cells.len() || slots > MAX_GRID_SLOTS {
            return Err(PipelineError::render(format!(
                "TABLE block {} has {} cells but claims {} rows and {} columns",
                table.id,
                cells.len(),
                row_count,
                col_count
            )));
        }

        let mut rows = vec![vec![String::new(); col_count]; row_count];
        for cell in cells {
            let (Some(row), Some(col)) = (cell.row_index, cell.column_index) else {
                continue;
            };
            if row == 0 || col == 0 {
                continue;
            }
            rows[row as usize - 1][col as usize - 1] = cell_text(cell, &lookup);
        }

        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One line per row, cells separated by tabs
    pub fn to_plain(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Pipe table; the first row is the header
    pub fn to_markdown(&self) -> String {
        let Some(width) = self.rows.first().map(Vec::len) else {
            return String::new();
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        for (i, row) in self.rows.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| escape_pipes(c)).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                lines.push(format!("|{}", " --- |".repeat(width)));
            }
        }
        lines.join("\n")
    }
}

fn cell_text<'a, F>(cell: &'a Block, lookup: &F) -> String
where
    F: Fn(&str) -> Option<&'a Block>,
{
    cell.child_ids()
        .filter_map(lookup)
        .filter_map(|child| match child.kind() {
            BlockKind::Word => child.text.clone(),
            BlockKind::SelectionElement => Some(
                if child.selection_status.as_deref() == Some("SELECTED") {
                    "[X]".to_string()
                } else {
                    "[ ]".to_string()
                },
            ),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}
