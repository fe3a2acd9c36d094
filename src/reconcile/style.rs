//! Style and list passes.
//!
//! Both passes run after the content of a segment matches the desired
//! content, so the current and desired containers flatten to the same
//! sequence of characters and paragraphs at the same indices.

use super::UnsupportedKind;
use crate::model::{
    Block, Bullet, InlineContent, List, ParagraphStyle, StructuralElement, StyleFields, TextField,
    TextStyle,
};
use crate::request::*;
use crate::text::char_units;
use std::collections::{BTreeMap, BTreeSet};

struct Glyph<'a> {
    start: u32,
    len: u32,
    style: &'a TextStyle,
}

struct Para<'a> {
    start: u32,
    end: u32,
    style: &'a ParagraphStyle,
    bullet: Option<&'a Bullet>,
    /// Ordinal of the enclosing container; the segment is 0
    container: usize,
    leading_tab: bool,
}

#[derive(Default)]
struct Flat<'a> {
    glyphs: Vec<Glyph<'a>>,
    paras: Vec<Para<'a>>,
    containers: usize,
}

impl<'a> Flat<'a> {
    fn of(content: &'a [StructuralElement]) -> Self {
        let mut flat = Flat::default();
        flat.walk(content, 0);
        flat
    }

    fn walk(&mut self, content: &'a [StructuralElement], container: usize) {
        for element in content {
            match &element.block {
                Block::Paragraph(p) => {
                    let mut leading_tab = false;
                    for (k, e) in p.elements.iter().enumerate() {
                        let InlineContent::TextRun(run) = &e.content else {
                            continue;
                        };
                        if k == 0 {
                            leading_tab = run.content.starts_with('\t');
                        }
                        let mut pos = e.start_index;
                        for c in run.content.chars() {
                            let len = char_units(c);
                            if c != '\n' {
                                self.glyphs.push(Glyph {
                                    start: pos,
                                    len,
                                    style: &run.text_style,
                                });
                            }
                            pos += len;
                        }
                    }
                    self.paras.push(Para {
                        start: element.start_index,
                        end: element.end_index,
                        style: &p.paragraph_style,
                        bullet: p.bullet.as_ref(),
                        container,
                        leading_tab,
                    });
                }
                Block::Table(table) => {
                    for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                        self.containers += 1;
                        let id = self.containers;
                        self.walk(&cell.content, id);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Text and paragraph style updates turning `current` into `desired`.
pub(super) fn style_requests(
    current: &[StructuralElement],
    desired: &[StructuralElement],
) -> Vec<Request> {
    let (have, want) = (Flat::of(current), Flat::of(desired));
    let mut requests = Vec::new();

    let mut pending: Option<(u32, u32, BTreeSet<TextField>, TextStyle)> = None;
    for (h, w) in have.glyphs.iter().zip(&want.glyphs) {
        let mask = h.style.differing_fields(w.style);
        if mask.is_empty() {
            flush_text(&mut requests, pending.take());
            continue;
        }
        let value = w.style.restricted(&mask);
        match &mut pending {
            Some((_, end, m, v)) if *end == w.start && *m == mask && *v == value => {
                *end += w.len;
            }
            _ => {
                flush_text(&mut requests, pending.take());
                pending = Some((w.start, w.start + w.len, mask, value));
            }
        }
    }
    flush_text(&mut requests, pending.take());

    for (h, w) in have.paras.iter().zip(&want.paras) {
        let mask = h.style.differing_fields(w.style);
        if !mask.is_empty() {
            requests.push(Request::UpdateParagraphStyle(UpdateParagraphStyle::masked(
                Range::new(w.start, w.end),
                w.style,
                &mask,
            )));
        }
    }
    requests
}

fn flush_text(
    requests: &mut Vec<Request>,
    pending: Option<(u32, u32, BTreeSet<TextField>, TextStyle)>,
) {
    if let Some((start, end, mask, value)) = pending {
        requests.push(Request::UpdateTextStyle(UpdateTextStyle::masked(
            Range::new(start, end),
            &value,
            &mask,
        )));
    }
}

/// List edits turning `current` into `desired`.
///
/// Paragraphs that should not be list items lose their bullets. Runs of
/// paragraphs sharing a desired list are rebuilt whenever a bullet is
/// missing or sits at the wrong level: nesting is expressed with leading
/// tabs that `createParagraphBullets` consumes.
pub(super) fn bullet_requests(
    current: &[StructuralElement],
    desired: &[StructuralElement],
    lists: &BTreeMap<String, List>,
    unsupported: &mut Vec<UnsupportedKind>,
) -> Vec<Request> {
    let (have, want) = (Flat::of(current), Flat::of(desired));
    let mut requests = Vec::new();

    for (h, w) in have.paras.iter().zip(&want.paras) {
        if h.bullet.is_some() && w.bullet.is_none() {
            requests.push(Request::DeleteParagraphBullets(DeleteParagraphBullets {
                range: Range::new(w.start, w.end),
            }));
        }
    }

    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut k = 0;
    while k < want.paras.len() {
        let Some(list) = want.paras[k].bullet.map(|b| &b.list_id) else {
            k += 1;
            continue;
        };
        let first = k;
        while k < want.paras.len()
            && want.paras[k].container == want.paras[first].container
            && want.paras[k].bullet.map(|b| &b.list_id) == Some(list)
        {
            k += 1;
        }
        groups.push((first, k));
    }

    for (first, last) in groups.into_iter().rev() {
        let stale = (first..last).any(|i| {
            match (have.paras.get(i).and_then(|p| p.bullet), want.paras[i].bullet) {
                (Some(h), Some(w)) => h.nesting_level != w.nesting_level,
                _ => true,
            }
        });
        if !stale {
            continue;
        }
        if want.paras[first..last].iter().any(|p| p.leading_tab) {
            unsupported.push(UnsupportedKind::ListItemLeadingTab);
            continue;
        }

        let (start, end) = (want.paras[first].start, want.paras[last - 1].end);
        if (first..last).any(|i| have.paras.get(i).map_or(false, |p| p.bullet.is_some())) {
            requests.push(Request::DeleteParagraphBullets(DeleteParagraphBullets {
                range: Range::new(start, end),
            }));
        }
        let mut tabs = 0;
        for para in want.paras[first..last].iter().rev() {
            let level = para.bullet.map_or(0, |b| b.nesting_level);
            if level > 0 {
                requests.push(Request::InsertText(InsertText {
                    text: "\t".repeat(level as usize),
                    location: Location::new(para.start),
                }));
                tabs += level;
            }
        }
        let preset = want.paras[first]
            .bullet
            .and_then(|b| lists.get(&b.list_id))
            .map_or(List::DEFAULT_PRESET, |l| l.bullet_preset.as_str());
        requests.push(Request::CreateParagraphBullets(CreateParagraphBullets {
            range: Range::new(start, end + tabs),
            bullet_preset: preset.to_string(),
        }));
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::index_segment;
    use crate::model::{Paragraph, Segment, TextRun};

    fn indexed(segment: Segment) -> Segment {
        index_segment(segment).unwrap()
    }

    #[test]
    fn test_bold_range() {
        let current = indexed(Segment::from_paragraphs(["Hello world\n"]));
        let mut desired = Segment::new();
        desired.content.clear();
        desired.add_paragraph(Paragraph::from_runs(vec![
            TextRun::new("Hello "),
            TextRun::styled("world", TextStyle::new().with_bold(true)),
            TextRun::new("\n"),
        ]));
        let desired = indexed(desired);

        let requests = style_requests(&current.content, &desired.content);
        assert_eq!(requests.len(), 1);
        let Request::UpdateTextStyle(update) = &requests[0] else {
            panic!("expected a text style update");
        };
        assert_eq!((update.range.start_index, update.range.end_index), (7, 12));
        assert_eq!(update.fields, "bold");
    }

    #[test]
    fn test_identical_styles_emit_nothing() {
        let a = indexed(Segment::from_paragraphs(["A\n", "B\n"]));
        assert!(style_requests(&a.content, &a.content).is_empty());
    }

    #[test]
    fn test_nested_bullets_use_tabs() {
        let current = indexed(Segment::from_paragraphs(["a\n", "b\n"]));
        let mut desired = Segment::new();
        desired.content.clear();
        desired.add_paragraph(Paragraph::with_text("a").with_bullet("l1", 0));
        desired.add_paragraph(Paragraph::with_text("b").with_bullet("l1", 1));
        let desired = indexed(desired);

        let mut unsupported = Vec::new();
        let requests =
            bullet_requests(&current.content, &desired.content, &BTreeMap::new(), &mut unsupported);
        assert!(unsupported.is_empty());
        assert_eq!(
            requests,
            vec![
                Request::InsertText(InsertText {
                    text: "\t".to_string(),
                    location: Location::new(3),
                }),
                Request::CreateParagraphBullets(CreateParagraphBullets {
                    range: Range::new(1, 6),
                    bullet_preset: List::DEFAULT_PRESET.to_string(),
                }),
            ]
        );
    }

    #[test]
    fn test_leading_tab_unsupported() {
        let current = indexed(Segment::from_paragraphs(["\tx\n"]));
        let mut desired = Segment::new();
        desired.content.clear();
        desired.add_paragraph(Paragraph::with_text("\tx").with_bullet("l1", 0));
        let desired = indexed(desired);

        let mut unsupported = Vec::new();
        let requests =
            bullet_requests(&current.content, &desired.content, &BTreeMap::new(), &mut unsupported);
        assert!(requests.is_empty());
        assert_eq!(unsupported, vec![UnsupportedKind::ListItemLeadingTab]);
    }
}
