//! Edits for a table present in both documents.
//!
//! Rows and columns are aligned by their text. Matched cells are diffed in
//! place, then columns and rows are inserted before anything is deleted so
//! the table never runs out of rows or columns. Fresh cells are filled last.

use super::diff::pair;
use super::realize::{cell_starts, diff_container, fill_cells, Edits, Scope};
use crate::error::Result;
use crate::model::{content_len, content_text, Block, StructuralElement, Table};
use crate::request::*;

/// A merged block: `(row, column, row_span, column_span)`.
type Head = (u32, u32, u32, u32);

fn heads(table: &Table) -> Vec<Head> {
    let mut out = Vec::new();
    for (r, row) in table.table_rows.iter().enumerate() {
        for (c, cell) in row.table_cells.iter().enumerate() {
            if cell.is_merge_head() {
                let style = cell.table_cell_style;
                out.push((r as u32, c as u32, style.row_span, style.column_span));
            }
        }
    }
    out
}

fn cell_location(table_start: u32, row: u32, column: u32) -> TableCellLocation {
    TableCellLocation {
        table_start_location: Location::new(table_start),
        row_index: row,
        column_index: column,
    }
}

fn unmerge(table_start: u32, head: Head) -> Request {
    Request::UnmergeTableCells(UnmergeTableCells {
        table_range: TableRange {
            table_cell_location: cell_location(table_start, head.0, head.1),
            row_span: head.2,
            column_span: head.3,
        },
    })
}

fn merge(table_start: u32, head: Head) -> Request {
    Request::MergeTableCells(MergeTableCells {
        table_range: TableRange {
            table_cell_location: cell_location(table_start, head.0, head.1),
            row_span: head.2,
            column_span: head.3,
        },
    })
}

/// Requests that bring the merges of `current` in line with `desired`,
/// whose grids already have the same shape.
fn merge_requests(table_start: u32, current: &Table, desired: &Table) -> Vec<Request> {
    let (have, want) = (heads(current), heads(desired));
    if have == want {
        return Vec::new();
    }
    have.into_iter()
        .map(|h| unmerge(table_start, h))
        .chain(want.into_iter().map(|h| merge(table_start, h)))
        .collect()
}

fn collect_tables<'a>(content: &'a [StructuralElement], out: &mut Vec<(u32, &'a Table)>) {
    for element in content {
        if let Block::Table(table) = &element.block {
            out.push((element.start_index, table));
            for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                collect_tables(&cell.content, out);
            }
        }
    }
}

/// Merge edits for every table of a container whose content already matches.
pub(super) fn merge_pass(current: &[StructuralElement], desired: &[StructuralElement]) -> Vec<Request> {
    let (mut have, mut want) = (Vec::new(), Vec::new());
    collect_tables(current, &mut have);
    collect_tables(desired, &mut want);
    have.iter()
        .zip(&want)
        .flat_map(|(&(start, a), &(_, b))| merge_requests(start, a, b))
        .collect()
}

fn row_signatures(table: &Table) -> Vec<String> {
    table
        .table_rows
        .iter()
        .map(|row| {
            row.table_cells
                .iter()
                .map(|cell| content_text(&cell.content))
                .collect::<Vec<_>>()
                .join("\u{1f}")
        })
        .collect()
}

fn column_signatures(table: &Table) -> Vec<String> {
    (0..table.column_count())
        .map(|c| {
            table
                .table_rows
                .iter()
                .filter_map(|row| row.table_cells.get(c))
                .map(|cell| content_text(&cell.content))
                .collect::<Vec<_>>()
                .join("\u{1e}")
        })
        .collect()
}

/// Slot list tracking which desired index each current row or column holds.
struct Slots(Vec<Option<usize>>);

impl Slots {
    fn new(len: usize, pairs: &[(usize, usize)]) -> Self {
        let mut slots = vec![None; len];
        for &(b, d) in pairs {
            slots[b] = Some(d);
        }
        Slots(slots)
    }

    /// Insert desired index `d`; returns `(reference slot, after)`.
    fn insert(&mut self, d: usize) -> (usize, bool) {
        let anchor = if d == 0 {
            None
        } else {
            self.0.iter().position(|s| *s == Some(d - 1))
        };
        match anchor {
            Some(p) => {
                self.0.insert(p + 1, Some(d));
                (p, true)
            }
            None => {
                self.0.insert(0, Some(d));
                (0, false)
            }
        }
    }

    /// Slots holding base-only entries, highest first.
    fn stale(&self) -> Vec<usize> {
        (0..self.0.len()).rev().filter(|&p| self.0[p].is_none()).collect()
    }
}

/// Emit the edits turning the base table at `table_start` into `desired`.
pub(super) fn diff_table(
    edits: &mut Edits,
    base: &Table,
    table_start: u32,
    desired: &Table,
    scope: Scope,
) -> Result<()> {
    let rows = pair(&row_signatures(base), &row_signatures(desired), |a, b| a == b);
    let columns = pair(&column_signatures(base), &column_signatures(desired), |a, b| a == b);
    let reshaped = rows.len() != base.row_count()
        || rows.len() != desired.row_count()
        || columns.len() != base.column_count()
        || columns.len() != desired.column_count();

    if reshaped {
        for head in heads(base) {
            edits.push(unmerge(table_start, head));
        }
    }

    let base_lens: Vec<Vec<u32>> = base
        .table_rows
        .iter()
        .map(|row| row.table_cells.iter().map(|c| content_len(&c.content)).collect())
        .collect();
    let starts = cell_starts(table_start, &base_lens);
    for &(br, dr) in rows.iter().rev() {
        for &(bc, dc) in columns.iter().rev() {
            if let (Some(b), Some(d)) = (base.cell(br, bc), desired.cell(dr, dc)) {
                diff_container(edits, &b.content, starts[br][bc] + 1, &d.content, scope.cell())?;
            }
        }
    }
    if !edits.unsupported.is_empty() {
        return Ok(());
    }

    let mut column_slots = Slots::new(base.column_count(), &columns);
    for dc in 0..desired.column_count() {
        if columns.iter().any(|&(_, d)| d == dc) {
            continue;
        }
        let (slot, insert_right) = column_slots.insert(dc);
        edits.push(Request::InsertTableColumn(InsertTableColumn {
            table_cell_location: cell_location(table_start, 0, slot as u32),
            insert_right,
        }));
    }
    let mut row_slots = Slots::new(base.row_count(), &rows);
    for dr in 0..desired.row_count() {
        if rows.iter().any(|&(_, d)| d == dr) {
            continue;
        }
        let (slot, insert_below) = row_slots.insert(dr);
        edits.push(Request::InsertTableRow(InsertTableRow {
            table_cell_location: cell_location(table_start, slot as u32, 0),
            insert_below,
        }));
    }
    for slot in column_slots.stale() {
        edits.push(Request::DeleteTableColumn(DeleteTableColumn {
            table_cell_location: cell_location(table_start, 0, slot as u32),
        }));
    }
    for slot in row_slots.stale() {
        edits.push(Request::DeleteTableRow(DeleteTableRow {
            table_cell_location: cell_location(table_start, slot as u32, 0),
        }));
    }

    let row_kept: Vec<bool> = (0..desired.row_count())
        .map(|d| rows.iter().any(|&(_, x)| x == d))
        .collect();
    let column_kept: Vec<bool> = (0..desired.column_count())
        .map(|d| columns.iter().any(|&(_, x)| x == d))
        .collect();
    let matched = |r: usize, c: usize| row_kept[r] && column_kept[c];
    let lens: Vec<Vec<u32>> = desired
        .table_rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.table_cells
                .iter()
                .enumerate()
                .map(|(c, cell)| if matched(r, c) { content_len(&cell.content) } else { 1 })
                .collect()
        })
        .collect();
    fill_cells(edits, table_start, desired, &lens, &|r, c| !matched(r, c), scope)
}
