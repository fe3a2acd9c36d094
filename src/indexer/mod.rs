//! Canonical UTF-16 index assignment.
//!
//! The indexer takes a document whose `start_index`/`end_index` fields may be
//! stale or absent and recomputes them per segment, walking content depth
//! first with a running offset that starts at 1. Table cells share their
//! parent segment's index space. Text runs holding embedded newlines are split
//! into separate paragraphs, each copying the original paragraph's style.
//!
//! Indexing is idempotent: `index(index(d)) == index(d)`.

mod split;
mod validate;

pub use validate::IndexError;

use crate::model::{Block, Document, Segment, StructuralElement, Tab};
use rayon::prelude::*;
use std::collections::BTreeSet;
use split::Splitter;
use validate::Checker;

/// Options for indexing documents.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Split text runs at embedded newlines into separate paragraphs
    pub split_newlines: bool,

    /// Index tabs in parallel
    pub parallel: bool,

    /// Drop text runs with empty content
    pub drop_empty_runs: bool,
}

impl IndexOptions {
    /// Create new index options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable newline splitting.
    pub fn with_split_newlines(mut self, split: bool) -> Self {
        self.split_newlines = split;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Keep or drop empty text runs.
    pub fn with_drop_empty_runs(mut self, drop: bool) -> Self {
        self.drop_empty_runs = drop;
        self
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            split_newlines: true,
            parallel: true,
            drop_empty_runs: true,
        }
    }
}

/// Assigns canonical indices to documents.
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    options: IndexOptions,
}

impl Indexer {
    /// Create an indexer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an indexer with custom options.
    pub fn with_options(options: IndexOptions) -> Self {
        Self { options }
    }

    /// Get the options.
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Recompute every index in the document.
    pub fn index(&self, mut document: Document) -> Result<Document, IndexError> {
        let mut seen = BTreeSet::new();
        for tab in &document.tabs {
            if !seen.insert(tab.tab_id.as_str()) {
                return Err(IndexError::DuplicateTab {
                    tab_id: tab.tab_id.clone(),
                });
            }
        }

        let tabs = std::mem::take(&mut document.tabs);
        document.tabs = if self.options.parallel && tabs.len() > 1 {
            tabs.into_par_iter()
                .map(|tab| self.index_tab(tab))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            tabs.into_iter()
                .map(|tab| self.index_tab(tab))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(document)
    }

    /// Check that a document already carries canonical indices.
    pub fn validate(&self, document: &Document) -> Result<(), IndexError> {
        let canonical = self.index(document.clone())?;
        for (stored, fresh) in document.tabs.iter().zip(&canonical.tabs) {
            for ((key, a), (_, b)) in stored.segments().into_iter().zip(fresh.segments()) {
                if let Some((found, expected)) = first_mismatch(&a.content, &b.content) {
                    return Err(IndexError::NonCanonical {
                        tab_id: stored.tab_id.clone(),
                        segment: key.to_string(),
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(())
    }

    fn index_tab(&self, mut tab: Tab) -> Result<Tab, IndexError> {
        let mut footnote_refs = Vec::new();
        let mut list_refs = BTreeSet::new();

        let keys: Vec<_> = tab.segments().into_iter().map(|(key, _)| key).collect();
        for key in keys {
            let tab_id = tab.tab_id.clone();
            let Some(segment) = tab.segment_mut(&key) else {
                continue;
            };
            let splitter = Splitter {
                options: &self.options,
                tab_id: &tab_id,
                segment: key.to_string(),
            };
            let mut offset = 1;
            let content = std::mem::take(&mut segment.content);
            segment.content = splitter.content(content, &mut offset)?;
            assign_indices(&mut segment.content, 1);

            let mut checker = Checker::new(&tab_id, key.to_string());
            checker.container(&segment.content, 1)?;
            if key.is_body() {
                footnote_refs.extend(checker.footnote_refs);
            }
            list_refs.extend(checker.list_refs);
        }

        validate::check_tab_references(&tab, &footnote_refs, &list_refs)?;
        log::debug!(
            "indexed tab {} ({} units in body)",
            tab.tab_id,
            tab.body.len_utf16()
        );
        Ok(tab)
    }
}

/// Index a document with default options.
pub fn index(document: Document) -> Result<Document, IndexError> {
    Indexer::new().index(document)
}

/// Index a single segment in isolation.
pub fn index_segment(segment: Segment) -> Result<Segment, IndexError> {
    let options = IndexOptions::default();
    let splitter = Splitter {
        options: &options,
        tab_id: "",
        segment: "segment".to_string(),
    };
    let mut offset = 1;
    let mut content = splitter.content(segment.content, &mut offset)?;
    assign_indices(&mut content, 1);
    Checker::new("", "segment".to_string()).container(&content, 1)?;
    Ok(Segment { content })
}

/// Assign indices to a content sequence starting at `start`; returns the end.
pub fn assign_indices(content: &mut [StructuralElement], start: u32) -> u32 {
    let mut offset = start;
    for element in content {
        element.start_index = offset;
        match &mut element.block {
            Block::Paragraph(p) => {
                for e in &mut p.elements {
                    e.start_index = offset;
                    offset += e.content.len_utf16();
                    e.end_index = offset;
                }
            }
            Block::Table(table) => {
                offset += 1;
                for row in &mut table.table_rows {
                    row.start_index = offset;
                    offset += 1;
                    for cell in &mut row.table_cells {
                        cell.start_index = offset;
                        offset = assign_indices(&mut cell.content, offset + 1);
                        cell.end_index = offset;
                    }
                    row.end_index = offset;
                }
                offset += 1;
            }
            Block::TableOfContents(toc) => {
                offset = assign_indices(&mut toc.content, offset + 1) + 1;
            }
            Block::SectionBreak(_) | Block::HorizontalRule(_) => offset += 1,
        }
        element.end_index = offset;
    }
    offset
}

/// First `(stored, canonical)` start or end index that differs.
fn first_mismatch(a: &[StructuralElement], b: &[StructuralElement]) -> Option<(u32, u32)> {
    if a.len() != b.len() {
        let found = a.first().map(|e| e.start_index).unwrap_or(0);
        let expected = b.first().map(|e| e.start_index).unwrap_or(0);
        return Some((found, expected));
    }
    for (x, y) in a.iter().zip(b) {
        if x.start_index != y.start_index {
            return Some((x.start_index, y.start_index));
        }
        if x.end_index != y.end_index {
            return Some((x.end_index, y.end_index));
        }
        let nested = match (&x.block, &y.block) {
            (Block::Paragraph(p), Block::Paragraph(q)) => p
                .elements
                .iter()
                .zip(&q.elements)
                .find(|(e, f)| e.start_index != f.start_index || e.end_index != f.end_index)
                .map(|(e, f)| (e.start_index, f.start_index)),
            (Block::Table(s), Block::Table(t)) => s
                .table_rows
                .iter()
                .flat_map(|r| &r.table_cells)
                .zip(t.table_rows.iter().flat_map(|r| &r.table_cells))
                .find_map(|(c, d)| {
                    if c.start_index != d.start_index {
                        Some((c.start_index, d.start_index))
                    } else {
                        first_mismatch(&c.content, &d.content)
                    }
                }),
            (Block::TableOfContents(s), Block::TableOfContents(t)) => {
                first_mismatch(&s.content, &t.content)
            }
            _ => None,
        };
        if nested.is_some() {
            return nested;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, Table};

    #[test]
    fn test_index_options_builder() {
        let options = IndexOptions::new()
            .with_split_newlines(false)
            .sequential()
            .with_drop_empty_runs(false);
        assert!(!options.split_newlines);
        assert!(!options.parallel);
        assert!(!options.drop_empty_runs);
    }

    #[test]
    fn test_assign_indices_body() {
        let doc = Document::with_body("d", Segment::from_paragraphs(["Hello\n", "World\n"]));
        let doc = index(doc).unwrap();
        let body = &doc.tabs[0].body;
        assert_eq!(body.content[0].start_index, 1);
        assert_eq!(body.content[0].end_index, 7);
        assert_eq!(body.content[1].start_index, 7);
        assert_eq!(body.content[1].end_index, 13);
    }

    #[test]
    fn test_assign_indices_table() {
        let mut body = Segment::from_paragraphs(["A\n"]);
        body.add_table(Table::from_text(&[vec!["x\n", "y\n"]]));
        body.add_paragraph(Paragraph::with_text("\n"));
        let doc = index(Document::with_body("d", body)).unwrap();
        let body = &doc.tabs[0].body;

        let table = &body.content[1];
        assert_eq!(table.start_index, 3);
        match &table.block {
            Block::Table(t) => {
                let row = &t.table_rows[0];
                assert_eq!(row.start_index, 4);
                assert_eq!(row.table_cells[0].start_index, 5);
                assert_eq!(row.table_cells[0].content[0].start_index, 6);
                assert_eq!(row.table_cells[0].end_index, 8);
                assert_eq!(row.table_cells[1].start_index, 8);
                assert_eq!(row.end_index, 11);
            }
            other => panic!("expected table, got {:?}", other),
        }
        assert_eq!(table.end_index, 12);
        assert_eq!(body.content[2].start_index, 12);
    }

    #[test]
    fn test_orphan_table_rejected() {
        let mut body = Segment::default();
        body.add_table(Table::new(1, 1));
        body.add_paragraph(Paragraph::with_text("\n"));
        let err = index(Document::with_body("d", body)).unwrap_err();
        assert!(matches!(err, IndexError::OrphanStructure { kind: "table", .. }));
    }

    #[test]
    fn test_empty_segment_rejected() {
        let err = index(Document::with_body("d", Segment::default())).unwrap_err();
        assert!(matches!(err, IndexError::EmptySegment { index: 1, .. }));
    }

    #[test]
    fn test_validate_detects_stale_indices() {
        let doc = index(Document::with_body("d", Segment::from_paragraphs(["Hi\n"]))).unwrap();
        assert!(Indexer::new().validate(&doc).is_ok());

        let mut stale = doc.clone();
        stale.tabs[0].body.content[0].end_index = 99;
        let err = Indexer::new().validate(&stale).unwrap_err();
        assert!(matches!(
            err,
            IndexError::NonCanonical {
                found: 99,
                expected: 4,
                ..
            }
        ));
    }
}
