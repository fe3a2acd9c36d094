//! Flat item view of a content container and the engine's own index logic.
//!
//! A container (a segment's content or a table cell's content) is flattened
//! into a list of items, each occupying a known number of UTF-16 units. Edits
//! splice the item list; [`Flat::rebuild`] turns it back into paragraphs and
//! blocks, merging adjacent characters of equal style into one run.

use crate::model::{
    Block, Bullet, InlineContent, Paragraph, ParagraphElement, ParagraphStyle, StructuralElement,
    TextRun, TextStyle,
};
use crate::text::{char_units, is_char_boundary};

/// Paragraph-level data carried by a paragraph's newline.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParagraphMeta {
    pub style: ParagraphStyle,
    pub bullet: Option<Bullet>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Char(char, TextStyle),
    Inline(InlineContent),
    Newline(TextStyle, ParagraphMeta),
    Block(Block),
}

impl Item {
    pub fn len(&self) -> u32 {
        match self {
            Item::Char(c, _) => char_units(*c),
            Item::Inline(content) => content.len_utf16(),
            Item::Newline(..) => 1,
            Item::Block(block) => block.len_utf16(),
        }
    }

    pub fn is_newline(&self) -> bool {
        matches!(self, Item::Newline(..))
    }
}

/// Where an index falls within a flattened container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Right before item `i` (or at the end when `i == items.len()`)
    Boundary(usize),
    /// Strictly inside item `i`
    Inside(usize),
    /// Outside the container
    Outside,
}

#[derive(Debug, Clone)]
pub(crate) struct Flat {
    pub start: u32,
    pub items: Vec<Item>,
}

impl Flat {
    pub fn new(content: &[StructuralElement], start: u32) -> Self {
        let mut items = Vec::new();
        for element in content {
            match &element.block {
                Block::Paragraph(p) => flatten_paragraph(p, &mut items),
                other => items.push(Item::Block(other.clone())),
            }
        }
        Self { start, items }
    }

    pub fn end(&self) -> u32 {
        self.start + self.items.iter().map(Item::len).sum::<u32>()
    }

    /// Start index of item `i`.
    pub fn offset(&self, i: usize) -> u32 {
        self.start + self.items[..i].iter().map(Item::len).sum::<u32>()
    }

    pub fn slot(&self, index: u32) -> Slot {
        let mut pos = self.start;
        if index < pos {
            return Slot::Outside;
        }
        for (i, item) in self.items.iter().enumerate() {
            if index == pos {
                return Slot::Boundary(i);
            }
            let next = pos + item.len();
            if index < next {
                return Slot::Inside(i);
            }
            pos = next;
        }
        if index == pos {
            Slot::Boundary(self.items.len())
        } else {
            Slot::Outside
        }
    }

    /// Index of the first item of the paragraph that holds item `i`.
    pub fn paragraph_start(&self, i: usize) -> usize {
        self.items[..i]
            .iter()
            .rposition(|item| matches!(item, Item::Newline(..) | Item::Block(_)))
            .map(|p| p + 1)
            .unwrap_or(0)
    }

    /// Text style inherited by text inserted before item `i`: the nearest
    /// character before it in the same paragraph, else the character or
    /// newline at or after it.
    pub fn inherited_style(&self, i: usize) -> TextStyle {
        let start = self.paragraph_start(i);
        for item in self.items[start..i].iter().rev() {
            if let Item::Char(_, style) = item {
                return style.clone();
            }
        }
        for item in &self.items[i..] {
            match item {
                Item::Char(_, style) | Item::Newline(style, _) => return style.clone(),
                Item::Inline(_) => continue,
                Item::Block(_) => break,
            }
        }
        TextStyle::default()
    }

    /// Paragraph data of the paragraph an insertion before item `i` lands in.
    pub fn paragraph_meta(&self, i: usize) -> ParagraphMeta {
        self.items[i..]
            .iter()
            .find_map(|item| match item {
                Item::Newline(_, meta) => Some(meta.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn rebuild(self) -> Vec<StructuralElement> {
        let mut out = Vec::new();
        let mut current = Paragraph::new();
        for item in self.items {
            match item {
                Item::Char(c, style) => push_char(&mut current, c, style),
                Item::Inline(content) => current.elements.push(ParagraphElement::new(content)),
                Item::Newline(style, meta) => {
                    push_char(&mut current, '\n', style);
                    current.paragraph_style = meta.style;
                    current.bullet = meta.bullet;
                    out.push(StructuralElement::paragraph(std::mem::take(&mut current)));
                }
                Item::Block(block) => out.push(StructuralElement::new(block)),
            }
        }
        // An unterminated tail can only come from a malformed snapshot.
        if !current.elements.is_empty() {
            current.ensure_newline();
            out.push(StructuralElement::paragraph(current));
        }
        out
    }
}

fn flatten_paragraph(p: &Paragraph, items: &mut Vec<Item>) {
    let meta = ParagraphMeta {
        style: p.paragraph_style.clone(),
        bullet: p.bullet.clone(),
    };
    for element in &p.elements {
        match &element.content {
            InlineContent::TextRun(run) => {
                for c in run.content.chars() {
                    if c == '\n' {
                        items.push(Item::Newline(run.text_style.clone(), meta.clone()));
                    } else {
                        items.push(Item::Char(c, run.text_style.clone()));
                    }
                }
            }
            other => items.push(Item::Inline(other.clone())),
        }
    }
}

fn push_char(paragraph: &mut Paragraph, c: char, style: TextStyle) {
    if let Some(ParagraphElement {
        content: InlineContent::TextRun(run),
        ..
    }) = paragraph.elements.last_mut()
    {
        if run.text_style == style {
            run.content.push(c);
            return;
        }
    }
    paragraph.add_run(TextRun::styled(c.to_string(), style));
}

/// Whether `index` falls between the two halves of a surrogate pair.
pub(crate) fn splits_char(content: &[StructuralElement], index: u32) -> bool {
    content
        .iter()
        .filter(|e| e.start_index < index && index < e.end_index)
        .any(|e| match &e.block {
            Block::Paragraph(p) => p.elements.iter().any(|pe| match &pe.content {
                InlineContent::TextRun(run) => {
                    pe.start_index < index
                        && index < pe.end_index
                        && !is_char_boundary(&run.content, index - pe.start_index)
                }
                _ => false,
            }),
            Block::Table(t) => t
                .table_rows
                .iter()
                .flat_map(|r| &r.table_cells)
                .any(|c| splits_char(&c.content, index)),
            Block::TableOfContents(toc) => splits_char(&toc.content, index),
            _ => false,
        })
}

/// Recompute indices of a content sequence starting at `start`; returns the
/// end index.
pub(crate) fn renumber(content: &mut [StructuralElement], start: u32) -> u32 {
    let mut pos = start;
    for element in content.iter_mut() {
        element.start_index = pos;
        pos = match &mut element.block {
            Block::Paragraph(p) => p.elements.iter_mut().fold(pos, |at, e| {
                e.start_index = at;
                e.end_index = at + e.content.len_utf16();
                e.end_index
            }),
            Block::Table(table) => {
                let mut at = pos + 1;
                for row in table.table_rows.iter_mut() {
                    row.start_index = at;
                    at += 1;
                    for cell in row.table_cells.iter_mut() {
                        cell.start_index = at;
                        cell.end_index = renumber(&mut cell.content, at + 1);
                        at = cell.end_index;
                    }
                    row.end_index = at;
                }
                at + 1
            }
            Block::TableOfContents(toc) => renumber(&mut toc.content, pos + 1) + 1,
            other => pos + other.len_utf16(),
        };
        element.end_index = pos;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageBreak, Segment};

    fn flat(texts: &[&str]) -> Flat {
        Flat::new(&Segment::from_paragraphs(texts.iter().copied()).content, 1)
    }

    #[test]
    fn test_flat_positions() {
        let f = flat(&["a😀b\n"]);
        assert_eq!(f.items.len(), 4);
        assert_eq!(f.end(), 6);
        assert_eq!(f.slot(1), Slot::Boundary(0));
        assert_eq!(f.slot(3), Slot::Inside(1));
        assert_eq!(f.slot(4), Slot::Boundary(2));
        assert_eq!(f.slot(6), Slot::Boundary(4));
        assert_eq!(f.slot(7), Slot::Outside);
    }

    #[test]
    fn test_rebuild_merges_runs() {
        let mut f = flat(&["ab\n"]);
        f.items.insert(1, Item::Char('x', TextStyle::default()));
        let content = f.rebuild();
        match &content[0].block {
            Block::Paragraph(p) => {
                assert_eq!(p.elements.len(), 1);
                assert_eq!(p.plain_text(), "axb\n");
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_inherited_style_prefers_preceding_char() {
        let bold = TextStyle::new().with_bold(true);
        let mut p = Paragraph::from_runs(vec![TextRun::styled("A", bold.clone()), TextRun::new("B\n")]);
        p.add_inline(InlineContent::PageBreak(PageBreak {}));
        let f = Flat::new(&[StructuralElement::paragraph(p)], 1);
        // Items: A, B, page break, newline
        assert_eq!(f.inherited_style(1), bold);
        assert_eq!(f.inherited_style(0), bold);
        assert_eq!(f.inherited_style(3), TextStyle::default());
    }

    #[test]
    fn test_renumber() {
        let mut content = Segment::from_paragraphs(["Hi\n", "There\n"]).content;
        assert_eq!(renumber(&mut content, 1), 10);
        assert_eq!(content[1].start_index, 4);
    }
}
