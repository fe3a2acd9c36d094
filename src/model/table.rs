//! Table types.

use super::{Paragraph, StructuralElement};
use serde::{Deserialize, Serialize};

/// A table: a `rows × columns` grid of cells sharing the parent segment's index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Number of rows
    pub rows: u32,

    /// Number of columns
    pub columns: u32,

    /// Rows in the table
    pub table_rows: Vec<TableRow>,
}

impl Table {
    /// Create a table of empty cells.
    pub fn new(rows: u32, columns: u32) -> Self {
        let table_rows = (0..rows)
            .map(|_| TableRow::new((0..columns).map(|_| TableCell::empty()).collect()))
            .collect();
        Self {
            rows,
            columns,
            table_rows,
        }
    }

    /// Create a table from cell texts, one inner vector per row.
    pub fn from_text<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        let table_rows: Vec<TableRow> = rows
            .iter()
            .map(|row| TableRow::new(row.iter().map(|t| TableCell::with_text(t.as_ref())).collect()))
            .collect();
        Self {
            rows: table_rows.len() as u32,
            columns: table_rows.first().map(|r| r.table_cells.len()).unwrap_or(0) as u32,
            table_rows,
        }
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.table_rows.len()
    }

    /// Get the number of columns (based on first row).
    pub fn column_count(&self) -> usize {
        self.table_rows.first().map(|r| r.table_cells.len()).unwrap_or(0)
    }

    /// Get a cell by coordinates.
    pub fn cell(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.table_rows.get(row)?.table_cells.get(column)
    }

    /// Get a mutable cell by coordinates.
    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut TableCell> {
        self.table_rows.get_mut(row)?.table_cells.get_mut(column)
    }

    /// Merge a rectangular region; only the head cell's spans change.
    pub fn merge(mut self, row: usize, column: usize, row_span: u32, column_span: u32) -> Self {
        if let Some(cell) = self.cell_mut(row, column) {
            cell.table_cell_style.row_span = row_span;
            cell.table_cell_style.column_span = column_span;
        }
        self
    }

    /// Check if the table has merged cells.
    pub fn has_merged_cells(&self) -> bool {
        self.table_rows
            .iter()
            .flat_map(|r| &r.table_cells)
            .any(|c| c.is_merge_head())
    }

    /// Length in UTF-16 code units, including the start and end markers.
    pub fn len_utf16(&self) -> u32 {
        2 + self
            .table_rows
            .iter()
            .map(|row| {
                1 + row
                    .table_cells
                    .iter()
                    .map(|cell| 1 + super::content_len(&cell.content))
                    .sum::<u32>()
            })
            .sum::<u32>()
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.table_rows
            .iter()
            .map(|row| {
                row.table_cells
                    .iter()
                    .map(|c| c.plain_text().trim_end_matches('\n').to_string())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// Start index (row marker)
    #[serde(default)]
    pub start_index: u32,

    /// End index (exclusive)
    #[serde(default)]
    pub end_index: u32,

    /// Cells in the row
    pub table_cells: Vec<TableCell>,
}

impl TableRow {
    /// Create a new row with cells.
    pub fn new(table_cells: Vec<TableCell>) -> Self {
        Self {
            start_index: 0,
            end_index: 0,
            table_cells,
        }
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    /// Start index (cell marker)
    #[serde(default)]
    pub start_index: u32,

    /// End index (exclusive)
    #[serde(default)]
    pub end_index: u32,

    /// Cell content; ends with a newline like a segment
    pub content: Vec<StructuralElement>,

    /// Merge metadata
    #[serde(default)]
    pub table_cell_style: TableCellStyle,
}

impl TableCell {
    /// Create a cell holding a single empty paragraph.
    pub fn empty() -> Self {
        Self::with_text("\n")
    }

    /// Create a cell with plain text.
    pub fn with_text(text: &str) -> Self {
        Self {
            start_index: 0,
            end_index: 0,
            content: vec![StructuralElement::paragraph(Paragraph::with_text(text))],
            table_cell_style: TableCellStyle::default(),
        }
    }

    /// Check whether this cell heads a merged region.
    pub fn is_merge_head(&self) -> bool {
        self.table_cell_style.row_span > 1 || self.table_cell_style.column_span > 1
    }

    /// Get plain text content of the cell.
    pub fn plain_text(&self) -> String {
        super::content_text(&self.content)
    }
}

/// Cell merge metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellStyle {
    /// Rows covered by this cell
    #[serde(default = "one")]
    pub row_span: u32,

    /// Columns covered by this cell
    #[serde(default = "one")]
    pub column_span: u32,
}

fn one() -> u32 {
    1
}

impl Default for TableCellStyle {
    fn default() -> Self {
        Self {
            row_span: 1,
            column_span: 1,
        }
    }
}
