//! Content edits for one container.
//!
//! Regions and matched tables are realized highest index first, so every
//! emitted index is still a base index when the request runs. Inside a region
//! the base atoms are deleted and the desired atoms are inserted back to front
//! at the same position.

use super::atoms::{atomize, Atom, AtomKind};
use super::diff::{gaps, lcs, Bounds, Region};
use super::{table, UnsupportedKind};
use crate::error::{Error, Result};
use crate::model::{
    content_len, Block, InlineContent, Paragraph, SectionType, StructuralElement, Table,
};
use crate::request::*;

/// Which kind of segment a container belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SegmentKind {
    Body,
    Header,
    Footer,
    Footnote,
}

/// Placement context of a container.
#[derive(Debug, Clone, Copy)]
pub(super) struct Scope {
    pub segment: SegmentKind,
    pub in_table: bool,
    pub max_cells: usize,
}

impl Scope {
    pub fn cell(self) -> Self {
        Self {
            in_table: true,
            ..self
        }
    }

    /// Whether `atom` may be created here.
    fn allows(&self, atom: &Atom<'_>) -> bool {
        let body = self.segment == SegmentKind::Body;
        match atom.kind {
            AtomKind::Table(_) => self.segment != SegmentKind::Footnote && !self.in_table,
            AtomKind::Block(Block::SectionBreak(_)) => body && !self.in_table,
            AtomKind::Inline(InlineContent::PageBreak(_))
            | AtomKind::Inline(InlineContent::FootnoteReference(_)) => body && !self.in_table,
            AtomKind::Inline(InlineContent::InlineImage(_)) => {
                self.segment != SegmentKind::Footnote
            }
            _ => true,
        }
    }

    fn insertable(&self, atom: &Atom<'_>) -> bool {
        self.allows(atom) && atom.creation_issue().is_none()
    }
}

/// Requests emitted for one segment, with their bookkeeping.
#[derive(Debug, Default)]
pub(super) struct Edits {
    pub requests: Vec<Request>,
    /// `(request offset, desired footnote id)` for every `createFootnote`
    pub footnotes: Vec<(usize, String)>,
    pub unsupported: Vec<UnsupportedKind>,
}

impl Edits {
    pub fn push(&mut self, request: Request) {
        self.requests.push(request);
    }

    pub fn delete(&mut self, start: u32, end: u32) {
        self.push(Request::DeleteContentRange(DeleteContentRange {
            range: Range::new(start, end),
        }));
    }
}

enum Work {
    Region(Region),
    Table(usize, usize),
}

impl Work {
    fn base_index(&self) -> usize {
        match self {
            Work::Region(r) => r.i0,
            Work::Table(i, _) => *i,
        }
    }
}

/// Emit the edits turning `base` (first index `start`) into `desired`.
pub(super) fn diff_container(
    edits: &mut Edits,
    base: &[StructuralElement],
    start: u32,
    desired: &[StructuralElement],
    scope: Scope,
) -> Result<()> {
    let base_atoms = atomize(base, start);
    let desired_atoms = atomize(desired, 1);
    let pairs = lcs(&base_atoms, &desired_atoms, scope.max_cells, |a, b| a.same(b));
    let raw = gaps(&pairs, base_atoms.len(), desired_atoms.len());

    let before = edits.unsupported.len();
    for r in &raw {
        report(edits, &base_atoms[r.i0..r.i1], &desired_atoms[r.j0..r.j1], &scope);
    }
    if edits.unsupported.len() > before {
        return Ok(());
    }

    let insertable = |atom: &Atom<'_>| scope.insertable(atom);
    let bounds = Bounds {
        base: &base_atoms,
        desired: &desired_atoms,
        insertable: &insertable,
    };
    let regions = bounds.settle(&raw).ok_or_else(|| {
        Error::Reconcile(format!(
            "no legal edit boundary for a change near index {}",
            raw.first()
                .and_then(|r| base_atoms.get(r.i0))
                .map_or(start, |atom| atom.start)
        ))
    })?;

    let mut work: Vec<Work> = regions.iter().copied().map(Work::Region).collect();
    for &(i, j) in &pairs {
        let covered = regions.iter().any(|r| r.i0 <= i && i < r.i1);
        if !covered && matches!(base_atoms[i].kind, AtomKind::Table(_)) {
            work.push(Work::Table(i, j));
        }
    }
    work.sort_by_key(|w| std::cmp::Reverse(w.base_index()));

    for item in work {
        match item {
            Work::Region(r) => realize_region(edits, &base_atoms, &desired_atoms, &r, scope)?,
            Work::Table(i, j) => {
                if let (AtomKind::Table(b), AtomKind::Table(d)) =
                    (base_atoms[i].kind, desired_atoms[j].kind)
                {
                    table::diff_table(edits, b, base_atoms[i].start, d, scope)?;
                }
            }
        }
    }
    Ok(())
}

fn report(edits: &mut Edits, deleted: &[Atom<'_>], inserted: &[Atom<'_>], scope: &Scope) {
    if deleted.iter().any(Atom::is_horizontal_rule) {
        edits.unsupported.push(UnsupportedKind::HorizontalRuleDeletion);
    }
    for atom in inserted {
        if let Some(issue) = atom.creation_issue() {
            edits.unsupported.push(issue);
        } else if !scope.allows(atom) {
            edits.unsupported.push(UnsupportedKind::ForbiddenInSegment {
                element: atom.element_name(),
            });
        }
    }
}

/// One insertion step.
enum Op<'a> {
    Text(String),
    Table(&'a Table),
    SectionBreak(SectionType),
    PageBreak { newline: bool },
    Inline(&'a InlineContent),
}

fn realize_region(
    edits: &mut Edits,
    base: &[Atom<'_>],
    desired: &[Atom<'_>],
    r: &Region,
    scope: Scope,
) -> Result<()> {
    let at = base[r.i0].start;
    if r.deletes() {
        edits.delete(at, base[r.i1].start);
    }
    let ops = group(&desired[r.j0..r.j1]);
    for op in ops.into_iter().rev() {
        emit(edits, op, at, scope)?;
    }
    Ok(())
}

fn group<'a>(tokens: &[Atom<'a>]) -> Vec<Op<'a>> {
    let mut ops = Vec::new();
    let mut text = String::new();
    let mut k = 0;
    while k < tokens.len() {
        let next = tokens.get(k + 1).map(|a| a.kind);
        let (op, step) = match (tokens[k].kind, next) {
            (AtomKind::Newline, Some(AtomKind::Table(table))) => (Some(Op::Table(table)), 2),
            (AtomKind::Newline, Some(AtomKind::Block(Block::SectionBreak(section)))) => {
                let kind = section.section_style.section_type.unwrap_or(SectionType::NextPage);
                (Some(Op::SectionBreak(kind)), 2)
            }
            (AtomKind::Newline, _) => {
                text.push('\n');
                (None, 1)
            }
            (AtomKind::Char(c), _) => {
                text.push(c);
                (None, 1)
            }
            (AtomKind::Inline(InlineContent::PageBreak(_)), Some(AtomKind::Newline)) => {
                (Some(Op::PageBreak { newline: true }), 2)
            }
            (AtomKind::Inline(InlineContent::PageBreak(_)), _) => {
                (Some(Op::PageBreak { newline: false }), 1)
            }
            (AtomKind::Inline(inline), _) => (Some(Op::Inline(inline)), 1),
            // Legality checks keep unpaired blocks out of insert regions.
            (AtomKind::Table(_) | AtomKind::Block(_), _) => (None, 1),
        };
        if let Some(op) = op {
            if !text.is_empty() {
                ops.push(Op::Text(std::mem::take(&mut text)));
            }
            ops.push(op);
        }
        k += step;
    }
    if !text.is_empty() {
        ops.push(Op::Text(text));
    }
    ops
}

fn emit(edits: &mut Edits, op: Op<'_>, at: u32, scope: Scope) -> Result<()> {
    let location = Location::new(at);
    match op {
        Op::Text(text) => edits.push(Request::InsertText(InsertText { text, location })),
        Op::Table(table) => {
            edits.push(Request::InsertTable(InsertTable {
                rows: table.table_rows.len() as u32,
                columns: table.column_count() as u32,
                location,
            }));
            let lens: Vec<Vec<u32>> = table
                .table_rows
                .iter()
                .map(|row| vec![1; row.table_cells.len()])
                .collect();
            fill_cells(edits, at + 1, table, &lens, &|_, _| true, scope)?;
        }
        Op::SectionBreak(section_type) => {
            edits.push(Request::InsertSectionBreak(InsertSectionBreak {
                location,
                section_type,
            }))
        }
        Op::PageBreak { newline } => {
            edits.push(Request::InsertPageBreak(InsertPageBreak { location }));
            if !newline {
                edits.delete(at + 1, at + 2);
            }
        }
        Op::Inline(inline) => match inline {
            InlineContent::FootnoteReference(reference) => {
                edits.push(Request::CreateFootnote(CreateFootnote { location }));
                let offset = edits.requests.len() - 1;
                edits.footnotes.push((offset, reference.footnote_id.clone()));
            }
            InlineContent::InlineImage(image) => {
                edits.push(Request::InsertInlineImage(InsertInlineImage {
                    uri: image.uri.clone().unwrap_or_default(),
                    location,
                    object_size: image.size,
                }))
            }
            InlineContent::Person(person) => edits.push(Request::InsertPerson(InsertPerson {
                person_properties: PersonProperties {
                    email: person.email.clone(),
                    name: person.name.clone(),
                },
                location,
            })),
            InlineContent::Date(date) => edits.push(Request::InsertDate(InsertDate {
                date_element_properties: DateElementProperties {
                    timestamp: date.timestamp,
                    date_format: date.date_format.clone(),
                    locale: date.locale.clone(),
                },
                location,
            })),
            other => {
                return Err(Error::Reconcile(format!(
                    "{} cannot be inserted",
                    other.kind_name()
                )))
            }
        },
    }
    Ok(())
}

/// Fill the cells of `desired` for which `fresh` holds, back to front.
///
/// `lens[r][c]` is the current content length of each cell, and fresh cells
/// currently hold a single empty paragraph.
pub(super) fn fill_cells(
    edits: &mut Edits,
    table_start: u32,
    desired: &Table,
    lens: &[Vec<u32>],
    fresh: &dyn Fn(usize, usize) -> bool,
    scope: Scope,
) -> Result<()> {
    let empty = vec![StructuralElement::paragraph(Paragraph::with_text("\n"))];
    let starts = cell_starts(table_start, lens);
    for (r, row) in desired.table_rows.iter().enumerate().rev() {
        for (c, cell) in row.table_cells.iter().enumerate().rev() {
            if fresh(r, c) && content_len(&cell.content) > 1 {
                diff_container(edits, &empty, starts[r][c] + 1, &cell.content, scope.cell())?;
            }
        }
    }
    Ok(())
}

/// Start index of every cell given the content length of each cell.
pub(super) fn cell_starts(table_start: u32, lens: &[Vec<u32>]) -> Vec<Vec<u32>> {
    let mut pos = table_start + 1;
    lens.iter()
        .map(|row| {
            pos += 1;
            row.iter()
                .map(|len| {
                    let start = pos;
                    pos += 1 + len;
                    start
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Segment;

    fn scope() -> Scope {
        Scope {
            segment: SegmentKind::Body,
            in_table: false,
            max_cells: 1 << 20,
        }
    }

    fn edits_for(base: &Segment, desired: &Segment) -> Edits {
        let mut edits = Edits::default();
        diff_container(&mut edits, &base.content, 1, &desired.content, scope()).unwrap();
        edits
    }

    #[test]
    fn test_append_text() {
        let edits = edits_for(
            &Segment::from_paragraphs(["Hello\n"]),
            &Segment::from_paragraphs(["Hello World\n"]),
        );
        assert_eq!(
            edits.requests,
            vec![Request::InsertText(InsertText {
                text: " World".to_string(),
                location: Location::new(6),
            })]
        );
    }

    #[test]
    fn test_delete_keeps_newline_before_table() {
        let mut base = Segment::from_paragraphs(["X\n", "Y\n"]);
        base.add_table(Table::from_text(&[vec!["a\n"]]));
        base.add_paragraph(Paragraph::with_text("\n"));
        let mut desired = Segment::from_paragraphs(["X\n"]);
        desired.add_table(Table::from_text(&[vec!["a\n"]]));
        desired.add_paragraph(Paragraph::with_text("\n"));

        let edits = edits_for(&base, &desired);
        // The newline in front of the table stays.
        assert_eq!(
            edits.requests,
            vec![Request::DeleteContentRange(DeleteContentRange {
                range: Range::new(2, 4),
            })]
        );
    }

    #[test]
    fn test_insert_table_fills_cells() {
        let base = Segment::from_paragraphs(["A\n"]);
        let mut desired = Segment::from_paragraphs(["A\n"]);
        desired.add_table(Table::from_text(&[vec!["x\n", "y\n"]]));
        desired.add_paragraph(Paragraph::with_text("\n"));

        let edits = edits_for(&base, &desired);
        assert!(matches!(edits.requests[0], Request::InsertTable(_)));
        // Empty 1x2 table at 3: row marker 4, cells at 5 and 7.
        assert_eq!(edits.requests.len(), 3);
        assert_eq!(
            edits.requests[1],
            Request::InsertText(InsertText {
                text: "y".to_string(),
                location: Location::new(8),
            })
        );
    }

    #[test]
    fn test_forbidden_element_reported() {
        let base = Segment::from_paragraphs(["A\n"]);
        let mut desired = Segment::from_paragraphs(["A\n"]);
        desired.add_table(Table::from_text(&[vec!["x\n"]]));
        desired.add_paragraph(Paragraph::with_text("\n"));

        let mut edits = Edits::default();
        let footnote = Scope {
            segment: SegmentKind::Footnote,
            ..scope()
        };
        diff_container(&mut edits, &base.content, 1, &desired.content, footnote).unwrap();
        assert!(edits.requests.is_empty());
        assert_eq!(
            edits.unsupported,
            vec![UnsupportedKind::ForbiddenInSegment { element: "table" }]
        );
    }

    #[test]
    fn test_cell_starts() {
        let starts = cell_starts(3, &[vec![1, 1], vec![3, 1]]);
        assert_eq!(starts, vec![vec![5, 7], vec![10, 14]]);
    }
}
