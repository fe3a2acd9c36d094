//! Structural checks run after indices are assigned.

use crate::model::{Block, InlineContent, StructuralElement, Tab};
use crate::text::is_char_boundary;
use std::collections::BTreeSet;
use thiserror::Error;

/// Reasons a document cannot be given consistent indices.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Two tabs share an id.
    #[error("duplicate tab id {tab_id}")]
    DuplicateTab {
        /// Offending id
        tab_id: String,
    },

    /// Two segments of one tab share an id.
    #[error("segment id {segment_id} used twice in tab {tab_id}")]
    SegmentCollision {
        /// Tab holding the segments
        tab_id: String,
        /// Offending id
        segment_id: String,
    },

    /// A segment or table cell holds no content.
    #[error("{segment} of tab {tab_id} is empty at index {index}")]
    EmptySegment {
        /// Tab id
        tab_id: String,
        /// Segment description
        segment: String,
        /// Where the empty container starts
        index: u32,
    },

    /// A paragraph does not end with a newline.
    #[error("paragraph in {segment} of tab {tab_id} is missing its newline at index {index}")]
    MissingNewline {
        /// Tab id
        tab_id: String,
        /// Segment description
        segment: String,
        /// Where the newline was expected
        index: u32,
    },

    /// A newline sits inside a paragraph and splitting is disabled.
    #[error("embedded newline at index {index} in {segment} of tab {tab_id}")]
    EmbeddedNewline {
        /// Tab id
        tab_id: String,
        /// Segment description
        segment: String,
        /// Index of the newline
        index: u32,
    },

    /// A structural element is not preceded by a paragraph, or a container
    /// does not end with one.
    #[error("{kind} at index {index} in {segment} of tab {tab_id} must follow a paragraph")]
    OrphanStructure {
        /// Tab id
        tab_id: String,
        /// Segment description
        segment: String,
        /// Element start
        index: u32,
        /// Element kind
        kind: &'static str,
    },

    /// Table dimensions disagree with its rows and cells.
    #[error("table at index {index} in {segment} of tab {tab_id}: {detail}")]
    RaggedTable {
        /// Tab id
        tab_id: String,
        /// Segment description
        segment: String,
        /// Table start
        index: u32,
        /// What is wrong
        detail: String,
    },

    /// A footnote reference points to no footnote segment.
    #[error("footnote {footnote_id} referenced in tab {tab_id} does not exist")]
    MissingFootnote {
        /// Tab id
        tab_id: String,
        /// Referenced id
        footnote_id: String,
    },

    /// A bullet references an undefined list.
    #[error("list {list_id} referenced in tab {tab_id} is not defined")]
    UnknownList {
        /// Tab id
        tab_id: String,
        /// Referenced list
        list_id: String,
    },

    /// A named range lies outside its segment or refers to a missing one.
    #[error("named range {name} [{start}, {end}) in tab {tab_id} is out of bounds")]
    NamedRangeOutOfBounds {
        /// Tab id
        tab_id: String,
        /// Range name
        name: String,
        /// Range start
        start: u32,
        /// Range end
        end: u32,
    },

    /// A named range boundary splits a surrogate pair.
    #[error("named range {name} in tab {tab_id} splits a surrogate pair at index {index}")]
    SurrogateSplit {
        /// Tab id
        tab_id: String,
        /// Range name
        name: String,
        /// Offending boundary
        index: u32,
    },

    /// Stored indices differ from the canonical ones.
    #[error("stale index in {segment} of tab {tab_id}: expected {expected}, found {found}")]
    NonCanonical {
        /// Tab id
        tab_id: String,
        /// Segment description
        segment: String,
        /// Canonical value
        expected: u32,
        /// Stored value
        found: u32,
    },
}

/// Walks indexed content and checks structural rules.
pub(super) struct Checker<'a> {
    pub tab_id: &'a str,
    pub segment: String,
    pub footnote_refs: Vec<String>,
    pub list_refs: BTreeSet<String>,
}

impl<'a> Checker<'a> {
    pub fn new(tab_id: &'a str, segment: String) -> Self {
        Self {
            tab_id,
            segment,
            footnote_refs: Vec::new(),
            list_refs: BTreeSet::new(),
        }
    }

    /// Check one container (a segment or a table cell) starting at `start`.
    pub fn container(&mut self, content: &[StructuralElement], start: u32) -> Result<(), IndexError> {
        let Some(last) = content.last() else {
            return Err(IndexError::EmptySegment {
                tab_id: self.tab_id.to_string(),
                segment: self.segment.clone(),
                index: start,
            });
        };
        if !last.block.is_paragraph() {
            return Err(self.orphan(last));
        }

        for (i, element) in content.iter().enumerate() {
            match &element.block {
                Block::Paragraph(p) => {
                    if let Some(bullet) = &p.bullet {
                        self.list_refs.insert(bullet.list_id.clone());
                    }
                    for e in &p.elements {
                        if let InlineContent::FootnoteReference(r) = &e.content {
                            self.footnote_refs.push(r.footnote_id.clone());
                        }
                    }
                    continue;
                }
                _ if i == 0 || !content[i - 1].block.is_paragraph() => {
                    return Err(self.orphan(element));
                }
                Block::Table(table) => {
                    self.table(table, element.start_index)?;
                    for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                        self.container(&cell.content, cell.start_index + 1)?;
                    }
                }
                Block::TableOfContents(toc) => {
                    if !toc.content.is_empty() {
                        self.container(&toc.content, element.start_index + 1)?;
                    }
                }
                Block::SectionBreak(_) | Block::HorizontalRule(_) => {}
            }
        }
        Ok(())
    }

    fn table(&self, table: &crate::model::Table, index: u32) -> Result<(), IndexError> {
        let ragged = |detail: String| IndexError::RaggedTable {
            tab_id: self.tab_id.to_string(),
            segment: self.segment.clone(),
            index,
            detail,
        };
        if table.rows == 0 || table.columns == 0 {
            return Err(ragged("a table needs at least one row and one column".to_string()));
        }
        if table.table_rows.len() != table.rows as usize {
            return Err(ragged(format!(
                "declares {} rows but has {}",
                table.rows,
                table.table_rows.len()
            )));
        }
        for (r, row) in table.table_rows.iter().enumerate() {
            if row.table_cells.len() != table.columns as usize {
                return Err(ragged(format!(
                    "row {} has {} cells, expected {}",
                    r,
                    row.table_cells.len(),
                    table.columns
                )));
            }
            for (c, cell) in row.table_cells.iter().enumerate() {
                let style = cell.table_cell_style;
                if style.row_span == 0
                    || style.column_span == 0
                    || r + style.row_span as usize > table.rows as usize
                    || c + style.column_span as usize > table.columns as usize
                {
                    return Err(ragged(format!("cell ({}, {}) spans past the table", r, c)));
                }
            }
        }
        Ok(())
    }

    fn orphan(&self, element: &StructuralElement) -> IndexError {
        IndexError::OrphanStructure {
            tab_id: self.tab_id.to_string(),
            segment: self.segment.clone(),
            index: element.start_index,
            kind: element.block.kind_name(),
        }
    }
}

/// Check that every footnote reference and bullet in a tab resolves, and that
/// named ranges lie on character boundaries inside their segments.
pub(super) fn check_tab_references(
    tab: &Tab,
    footnote_refs: &[String],
    list_refs: &BTreeSet<String>,
) -> Result<(), IndexError> {
    let mut seen = BTreeSet::new();
    for id in tab
        .headers
        .values()
        .chain(tab.footers.values())
        .map(|h| h.id.as_str())
        .chain(tab.footnotes.keys().map(String::as_str))
    {
        if !seen.insert(id) {
            return Err(IndexError::SegmentCollision {
                tab_id: tab.tab_id.clone(),
                segment_id: id.to_string(),
            });
        }
    }

    if let Some(id) = footnote_refs.iter().find(|id| !tab.footnotes.contains_key(*id)) {
        return Err(IndexError::MissingFootnote {
            tab_id: tab.tab_id.clone(),
            footnote_id: id.clone(),
        });
    }
    if let Some(id) = list_refs.iter().find(|id| !tab.lists.contains_key(*id)) {
        return Err(IndexError::UnknownList {
            tab_id: tab.tab_id.clone(),
            list_id: id.clone(),
        });
    }

    for range in &tab.named_ranges {
        let out_of_bounds = || IndexError::NamedRangeOutOfBounds {
            tab_id: tab.tab_id.clone(),
            name: range.name.clone(),
            start: range.start_index,
            end: range.end_index,
        };
        let key = tab
            .segment_key(range.segment_id.as_deref())
            .ok_or_else(out_of_bounds)?;
        let segment = tab.segment(&key).ok_or_else(out_of_bounds)?;
        if range.start_index < 1
            || range.end_index <= range.start_index
            || range.end_index > segment.end_index()
        {
            return Err(out_of_bounds());
        }
        for index in [range.start_index, range.end_index] {
            if !on_char_boundary(&segment.content, index) {
                return Err(IndexError::SurrogateSplit {
                    tab_id: tab.tab_id.clone(),
                    name: range.name.clone(),
                    index,
                });
            }
        }
    }
    Ok(())
}

/// Check that `index` does not fall inside a surrogate pair.
fn on_char_boundary(content: &[StructuralElement], index: u32) -> bool {
    for element in content {
        if index < element.start_index || index >= element.end_index {
            continue;
        }
        return match &element.block {
            Block::Paragraph(p) => p.elements.iter().all(|e| match &e.content {
                InlineContent::TextRun(run) if e.start_index < index && index < e.end_index => {
                    is_char_boundary(&run.content, index - e.start_index)
                }
                _ => true,
            }),
            Block::Table(t) => t
                .table_rows
                .iter()
                .flat_map(|r| &r.table_cells)
                .all(|c| on_char_boundary(&c.content, index)),
            Block::TableOfContents(toc) => on_char_boundary(&toc.content, index),
            _ => true,
        };
    }
    true
}
