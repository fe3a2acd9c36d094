//! Deterministic server-side id assignment.

use crate::model::{Block, Document, InlineContent, StructuralElement};
use std::collections::{BTreeMap, BTreeSet};

pub(super) const HEADER: &str = "kix.hdr";
pub(super) const FOOTER: &str = "kix.ftr";
pub(super) const FOOTNOTE: &str = "kix.fn";
pub(super) const NAMED_RANGE: &str = "kix.nr";
pub(super) const IMAGE: &str = "kix.img";
pub(super) const LIST: &str = "kix.list";
pub(super) const TAB: &str = "t.";

/// Per-prefix counters. Ids already present in the document are skipped.
#[derive(Debug, Clone, Default)]
pub(super) struct IdGenerator {
    counters: BTreeMap<&'static str, u64>,
}

impl IdGenerator {
    pub fn next(&mut self, prefix: &'static str, document: &Document) -> String {
        let taken = taken_ids(document);
        let counter = self.counters.entry(prefix).or_insert(0);
        loop {
            *counter += 1;
            let id = format!("{}{}", prefix, counter);
            if !taken.contains(&id) {
                return id;
            }
        }
    }
}

fn taken_ids(document: &Document) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for tab in &document.tabs {
        ids.insert(tab.tab_id.clone());
        ids.extend(tab.headers.values().map(|h| h.id.clone()));
        ids.extend(tab.footers.values().map(|f| f.id.clone()));
        ids.extend(tab.footnotes.keys().cloned());
        ids.extend(tab.named_ranges.iter().map(|r| r.named_range_id.clone()));
        ids.extend(tab.lists.keys().cloned());
        for (_, segment) in tab.segments() {
            image_ids(&segment.content, &mut ids);
        }
    }
    ids
}

fn image_ids(content: &[StructuralElement], ids: &mut BTreeSet<String>) {
    for element in content {
        match &element.block {
            Block::Paragraph(p) => {
                for e in &p.elements {
                    if let InlineContent::InlineImage(image) = &e.content {
                        ids.extend(image.object_id.clone());
                    }
                }
            }
            Block::Table(t) => {
                for cell in t.table_rows.iter().flat_map(|r| &r.table_cells) {
                    image_ids(&cell.content, ids);
                }
            }
            Block::TableOfContents(toc) => image_ids(&toc.content, ids),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Segment, Tab};

    #[test]
    fn test_ids_are_sequential_and_skip_taken() {
        let mut doc = Document::new("d");
        doc.tabs[0].footnotes.insert("kix.fn1".to_string(), Segment::new());
        doc.tabs.push(Tab::new("t.1", "Second"));

        let mut ids = IdGenerator::default();
        assert_eq!(ids.next(FOOTNOTE, &doc), "kix.fn2");
        assert_eq!(ids.next(FOOTNOTE, &doc), "kix.fn3");
        assert_eq!(ids.next(HEADER, &doc), "kix.hdr1");
        assert_eq!(ids.next(TAB, &doc), "t.2");
    }
}
