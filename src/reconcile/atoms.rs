//! Atoms: the units the content diff aligns.
//!
//! A container is flattened into characters, paragraph terminators, inline
//! elements and whole structural blocks, each tagged with its UTF-16 start.

use super::UnsupportedKind;
use crate::model::{Block, InlineContent, StructuralElement, Table};
use crate::text::{char_units, is_stripped_char};

#[derive(Debug, Clone, Copy)]
pub(super) enum AtomKind<'a> {
    Char(char),
    Newline,
    Inline(&'a InlineContent),
    Table(&'a Table),
    Block(&'a Block),
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Atom<'a> {
    pub kind: AtomKind<'a>,
    pub start: u32,
}

impl<'a> Atom<'a> {
    /// Alignment equality. Tables always match so that they pair by ordinal.
    pub fn same(&self, other: &Atom<'_>) -> bool {
        match (self.kind, other.kind) {
            (AtomKind::Char(a), AtomKind::Char(b)) => a == b,
            (AtomKind::Newline, AtomKind::Newline) => true,
            (AtomKind::Inline(a), AtomKind::Inline(b)) => same_inline(a, b, true),
            (AtomKind::Table(_), AtomKind::Table(_)) => true,
            (AtomKind::Block(a), AtomKind::Block(b)) => same_block(a, b),
            _ => false,
        }
    }

    /// Equality that ignores server-assigned ids.
    fn similar(&self, other: &Atom<'_>) -> bool {
        match (self.kind, other.kind) {
            (AtomKind::Inline(a), AtomKind::Inline(b)) => same_inline(a, b, false),
            (AtomKind::Table(a), AtomKind::Table(b)) => same_table(a, b),
            _ => self.same(other),
        }
    }

    pub fn is_newline(&self) -> bool {
        matches!(self.kind, AtomKind::Newline)
    }

    /// Whether nothing may be inserted directly before this atom.
    pub fn is_block(&self) -> bool {
        matches!(self.kind, AtomKind::Table(_) | AtomKind::Block(_))
    }

    /// Whether the newline before this atom cannot be deleted on its own.
    pub fn guards_newline(&self) -> bool {
        match self.kind {
            AtomKind::Table(_) | AtomKind::Block(_) => true,
            AtomKind::Inline(InlineContent::Equation(_)) => true,
            _ => false,
        }
    }

    /// Whether this atom must directly follow an inserted newline.
    pub fn needs_newline(&self) -> bool {
        matches!(
            self.kind,
            AtomKind::Table(_) | AtomKind::Block(Block::SectionBreak(_))
        )
    }

    pub fn is_horizontal_rule(&self) -> bool {
        matches!(self.kind, AtomKind::Block(Block::HorizontalRule(_)))
    }

    /// Why this atom cannot be created through the remote API, if it cannot.
    pub fn creation_issue(&self) -> Option<UnsupportedKind> {
        match self.kind {
            AtomKind::Block(Block::HorizontalRule(_)) => {
                Some(UnsupportedKind::HorizontalRuleCreation)
            }
            AtomKind::Block(Block::TableOfContents(_)) => {
                Some(UnsupportedKind::TableOfContentsCreation)
            }
            AtomKind::Inline(InlineContent::Equation(_)) => Some(UnsupportedKind::EquationCreation),
            AtomKind::Inline(InlineContent::AutoText(_)) => Some(UnsupportedKind::AutoTextCreation),
            AtomKind::Inline(InlineContent::ColumnBreak(_)) => {
                Some(UnsupportedKind::ColumnBreakCreation)
            }
            AtomKind::Inline(InlineContent::InlineImage(image))
                if image.uri.as_deref().map_or(true, str::is_empty) =>
            {
                Some(UnsupportedKind::ImageWithoutUri)
            }
            AtomKind::Char(c) if is_stripped_char(c) => {
                Some(UnsupportedKind::StrippedCharacter(c))
            }
            _ => None,
        }
    }

    /// Element name for placement checks.
    pub fn element_name(&self) -> &'static str {
        match self.kind {
            AtomKind::Char(_) | AtomKind::Newline => "text",
            AtomKind::Inline(inline) => inline.kind_name(),
            AtomKind::Table(_) => "table",
            AtomKind::Block(block) => block.kind_name(),
        }
    }
}

fn same_inline(a: &InlineContent, b: &InlineContent, by_id: bool) -> bool {
    match (a, b) {
        (InlineContent::FootnoteReference(x), InlineContent::FootnoteReference(y)) => {
            !by_id || x.footnote_id == y.footnote_id
        }
        (InlineContent::InlineImage(x), InlineContent::InlineImage(y)) => {
            x.uri == y.uri && x.size == y.size
        }
        _ => a == b,
    }
}

fn same_block(a: &Block, b: &Block) -> bool {
    match (a, b) {
        (Block::SectionBreak(x), Block::SectionBreak(y)) => x == y,
        (Block::TableOfContents(_), Block::TableOfContents(_)) => true,
        (Block::HorizontalRule(_), Block::HorizontalRule(_)) => true,
        _ => false,
    }
}

fn same_table(a: &Table, b: &Table) -> bool {
    a.table_rows.len() == b.table_rows.len()
        && a.table_rows.iter().zip(&b.table_rows).all(|(r, s)| {
            r.table_cells.len() == s.table_cells.len()
                && r.table_cells
                    .iter()
                    .zip(&s.table_cells)
                    .all(|(c, d)| same_content(&c.content, &d.content))
        })
}

/// Flatten a container whose first index is `start`.
pub(super) fn atomize(content: &[StructuralElement], start: u32) -> Vec<Atom<'_>> {
    let mut atoms = Vec::new();
    let mut pos = start;
    for element in content {
        match &element.block {
            Block::Paragraph(p) => {
                for e in &p.elements {
                    match &e.content {
                        InlineContent::TextRun(run) => {
                            for c in run.content.chars() {
                                let kind = if c == '\n' {
                                    AtomKind::Newline
                                } else {
                                    AtomKind::Char(c)
                                };
                                atoms.push(Atom { kind, start: pos });
                                pos += char_units(c);
                            }
                        }
                        inline => {
                            atoms.push(Atom {
                                kind: AtomKind::Inline(inline),
                                start: pos,
                            });
                            pos += inline.len_utf16();
                        }
                    }
                }
            }
            Block::Table(table) => {
                atoms.push(Atom {
                    kind: AtomKind::Table(table),
                    start: pos,
                });
                pos += table.len_utf16();
            }
            block => {
                atoms.push(Atom {
                    kind: AtomKind::Block(block),
                    start: pos,
                });
                pos += block.len_utf16();
            }
        }
    }
    atoms
}

/// Whether two containers hold the same content, ignoring styles and
/// server-assigned ids.
pub(super) fn same_content(a: &[StructuralElement], b: &[StructuralElement]) -> bool {
    let x = atomize(a, 1);
    let y = atomize(b, 1);
    x.len() == y.len() && x.iter().zip(&y).all(|(p, q)| p.similar(q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FootnoteReference, Paragraph, Segment};

    #[test]
    fn test_atomize_positions() {
        let mut body = Segment::from_paragraphs(["a😀\n"]);
        body.add_table(Table::from_text(&[vec!["x\n"]]));
        body.add_paragraph(Paragraph::with_text("\n"));
        let atoms = atomize(&body.content, 1);

        assert_eq!(atoms.len(), 5);
        assert_eq!(atoms[1].start, 2);
        assert!(atoms[2].is_newline());
        assert_eq!(atoms[2].start, 4);
        assert!(atoms[3].is_block());
        assert_eq!(atoms[4].start, 5 + 6);
    }

    #[test]
    fn test_footnote_matching() {
        let mut p = Paragraph::with_text("a\n");
        p.add_inline(InlineContent::FootnoteReference(FootnoteReference {
            footnote_id: "kix.fn1".to_string(),
        }));
        let mut q = Paragraph::with_text("a\n");
        q.add_inline(InlineContent::FootnoteReference(FootnoteReference {
            footnote_id: "fn-local".to_string(),
        }));
        let a = vec![StructuralElement::paragraph(p)];
        let b = vec![StructuralElement::paragraph(q)];

        let x = atomize(&a, 1);
        let y = atomize(&b, 1);
        assert!(!x[1].same(&y[1]));
        assert!(same_content(&a, &b));
    }
}
