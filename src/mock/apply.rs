//! Validation and application of single requests.
//!
//! Every request is checked and applied against a scratch copy of the
//! document. After each mutation the touched segment is renumbered and named
//! ranges in it are shifted, so the next request sees fresh indices.

use super::error::ValidationErrorKind as Kind;
use super::ids::{self, IdGenerator};
use super::layout::{renumber, splits_char, Flat, Item, Slot};
use super::rules::Rules;
use crate::model::{
    parse_mask, Block, Bullet, DateElement, Document, FootnoteReference, HeaderFooterKind,
    InlineContent, InlineImage, List, NamedRange, PageBreak, ParagraphField, ParagraphStyle,
    Person, SectionBreak, Segment, SegmentKey, StructuralElement, StyleFields, Tab, Table,
    TableCell, TableCellStyle, TableRow, TextField, TextStyle,
};
use crate::request::*;
use crate::text::is_stripped_char;
use std::collections::BTreeSet;

pub(super) type Outcome<T> = std::result::Result<T, Kind>;

/// `(element, row, column)` steps from a container down into a table cell.
type Path = Vec<(usize, usize, usize)>;

/// A resolved segment.
struct Place {
    tab: usize,
    key: SegmentKey,
    segment_id: Option<String>,
}

/// A resolved insertion point.
struct Point {
    path: Path,
    start: u32,
    item: usize,
}

#[derive(Debug, Clone, Copy)]
enum Shift {
    Insert { index: u32, len: u32 },
    Delete { start: u32, end: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TabField {
    Title,
    Index,
}

/// Document state a batch is applied to.
#[derive(Debug, Clone)]
pub(super) struct Scratch {
    pub document: Document,
    pub ids: IdGenerator,
}

impl Scratch {
    pub fn apply(&mut self, request: &Request, rules: &Rules) -> Outcome<Reply> {
        let mut deferred = None;
        request.for_each_id(&mut |id| {
            if id.is_deferred() && deferred.is_none() {
                deferred = Some(id.to_string());
            }
        });
        if let Some(id) = deferred {
            return Err(Kind::UnresolvedDeferredId(id));
        }

        let mut reply = Reply::empty();
        match request {
            Request::InsertText(r) => self.insert_text(r)?,
            Request::DeleteContentRange(r) => self.delete_content(&r.range)?,
            Request::UpdateTextStyle(r) => self.update_text_style(r)?,
            Request::UpdateParagraphStyle(r) => self.update_paragraph_style(r)?,
            Request::CreateParagraphBullets(r) => {
                let list_id = self.create_bullets(r)?;
                reply.create_paragraph_bullets = Some(CreatedList { list_id });
            }
            Request::DeleteParagraphBullets(r) => self.delete_bullets(&r.range)?,
            Request::InsertTable(r) => self.insert_table(r)?,
            Request::InsertTableRow(r) => self.insert_table_row(r)?,
            Request::InsertTableColumn(r) => self.insert_table_column(r)?,
            Request::DeleteTableRow(r) => self.delete_table_row(&r.table_cell_location)?,
            Request::DeleteTableColumn(r) => self.delete_table_column(&r.table_cell_location)?,
            Request::MergeTableCells(r) => self.merge_cells(&r.table_range)?,
            Request::UnmergeTableCells(r) => self.unmerge_cells(&r.table_range)?,
            Request::CreateNamedRange(r) => {
                let named_range_id = self.create_named_range(r, rules)?;
                reply.create_named_range = Some(CreatedNamedRange { named_range_id });
            }
            Request::DeleteNamedRange(r) => self.delete_named_range(r)?,
            Request::CreateHeader(r) => {
                let header_id = self.create_header_footer(r, false)?;
                reply.create_header = Some(CreatedHeader { header_id });
            }
            Request::CreateFooter(r) => {
                let footer_id = self.create_header_footer(r, true)?;
                reply.create_footer = Some(CreatedFooter { footer_id });
            }
            Request::DeleteHeader(r) => {
                self.delete_header_footer(r.tab_id.as_ref(), &r.header_id, false)?
            }
            Request::DeleteFooter(r) => {
                self.delete_header_footer(r.tab_id.as_ref(), &r.footer_id, true)?
            }
            Request::CreateFootnote(r) => {
                let footnote_id = self.create_footnote(&r.location)?;
                reply.create_footnote = Some(CreatedFootnote { footnote_id });
            }
            Request::InsertPageBreak(r) => self.insert_page_break(&r.location)?,
            Request::InsertSectionBreak(r) => self.insert_section_break(r)?,
            Request::InsertInlineImage(r) => {
                let object_id = self.insert_image(r, rules)?;
                reply.insert_inline_image = Some(CreatedObject { object_id });
            }
            Request::InsertPerson(r) => {
                rules.check_email(&r.person_properties.email)?;
                let person = InlineContent::Person(Person {
                    email: r.person_properties.email.clone(),
                    name: r.person_properties.name.clone(),
                });
                self.insert_inline(&r.location, person)?;
            }
            Request::InsertDate(r) => {
                let props = &r.date_element_properties;
                let date = InlineContent::Date(DateElement {
                    timestamp: props.timestamp,
                    date_format: props.date_format.clone(),
                    locale: props.locale.clone(),
                });
                self.insert_inline(&r.location, date)?;
            }
            Request::AddDocumentTab(r) => {
                let tab_id = self.add_tab(&r.tab_properties)?;
                reply.add_document_tab = Some(CreatedTab {
                    tab_properties: CreatedTabProperties { tab_id },
                });
            }
            Request::DeleteTab(r) => self.delete_tab(&r.tab_id)?,
            Request::UpdateDocumentTabProperties(r) => self.update_tab(r)?,
        }
        Ok(reply)
    }

    // Resolution

    fn tab_index(&self, tab_id: Option<&Id>) -> Outcome<usize> {
        match tab_id {
            None if self.document.tabs.is_empty() => Err(Kind::TabNotFound(String::new())),
            None => Ok(0),
            Some(id) => {
                let id = known(id)?;
                self.document
                    .tabs
                    .iter()
                    .position(|t| t.tab_id == id)
                    .ok_or_else(|| Kind::TabNotFound(id.to_string()))
            }
        }
    }

    fn place(&self, tab_id: Option<&Id>, segment_id: Option<&Id>) -> Outcome<Place> {
        let tab = self.tab_index(tab_id)?;
        let key = match segment_id {
            None => SegmentKey::Body,
            Some(id) => {
                let id = known(id)?;
                self.document.tabs[tab]
                    .segment_key(Some(id))
                    .ok_or_else(|| Kind::SegmentNotFound(id.to_string()))?
            }
        };
        let segment_id = self.document.tabs[tab].segment_id(&key);
        Ok(Place {
            tab,
            key,
            segment_id,
        })
    }

    fn place_at(&self, location: &Location) -> Outcome<Place> {
        self.place(location.tab_id.as_ref(), location.segment_id.as_ref())
    }

    fn place_in(&self, range: &Range) -> Outcome<Place> {
        self.place(range.tab_id.as_ref(), range.segment_id.as_ref())
    }

    fn segment(&self, place: &Place) -> Outcome<&Segment> {
        self.document.tabs[place.tab]
            .segment(&place.key)
            .ok_or_else(|| Kind::SegmentNotFound(place.key.to_string()))
    }

    fn segment_mut(&mut self, place: &Place) -> Outcome<&mut Segment> {
        self.document.tabs[place.tab]
            .segment_mut(&place.key)
            .ok_or_else(|| Kind::SegmentNotFound(place.key.to_string()))
    }

    fn point(&self, place: &Place, index: u32) -> Outcome<Point> {
        let segment = self.segment(place)?;
        let end = segment.end_index();
        if index < 1 || index >= end {
            return Err(Kind::IndexOutOfBounds { index, end });
        }
        let (path, start) = descend_point(&segment.content, index)?;
        let content = container(&segment.content, &path)
            .ok_or_else(|| Kind::SegmentNotFound(place.key.to_string()))?;
        let flat = Flat::new(content, start);
        let item = match flat.slot(index) {
            Slot::Boundary(i) if i < flat.items.len() => match &flat.items[i] {
                Item::Block(block) => {
                    return Err(Kind::InsertAtStructureStart {
                        kind: block.kind_name(),
                        index,
                    })
                }
                _ => i,
            },
            Slot::Inside(i) => return Err(inside_error(&flat, i, index)),
            Slot::Boundary(_) | Slot::Outside => return Err(Kind::IndexOutOfBounds { index, end }),
        };
        Ok(Point { path, start, item })
    }

    fn check_range(&self, place: &Place, range: &Range) -> Outcome<()> {
        let (a, b) = (range.start_index, range.end_index);
        let segment = self.segment(place)?;
        let end = segment.end_index();
        if b <= a {
            return Err(Kind::InvalidRange { start: a, end: b });
        }
        if a < 1 {
            return Err(Kind::IndexOutOfBounds { index: a, end });
        }
        if b > end {
            return Err(Kind::IndexOutOfBounds { index: b, end });
        }
        for index in [a, b] {
            if splits_char(&segment.content, index) {
                return Err(Kind::SurrogateSplit { index });
            }
        }
        Ok(())
    }

    // Mutation plumbing

    fn insert_items(
        &mut self,
        place: &Place,
        point: &Point,
        build: impl FnOnce(&Flat, usize) -> Vec<Item>,
    ) -> Outcome<()> {
        let segment = self.segment_mut(place)?;
        let content = container_mut(&mut segment.content, &point.path)
            .ok_or_else(|| Kind::SegmentNotFound(place.key.to_string()))?;
        let mut flat = Flat::new(content, point.start);
        let items = build(&flat, point.item);
        let len: u32 = items.iter().map(Item::len).sum();
        let index = flat.offset(point.item);
        flat.items.splice(point.item..point.item, items);
        *content = flat.rebuild();
        renumber(&mut segment.content, 1);
        self.shift(place, &[Shift::Insert { index, len }]);
        Ok(())
    }

    fn insert_inline(&mut self, location: &Location, inline: InlineContent) -> Outcome<()> {
        let place = self.place_at(location)?;
        let point = self.point(&place, location.index)?;
        self.insert_items(&place, &point, |_, _| vec![Item::Inline(inline)])
    }

    /// Visit every container overlapping the range, table cells first.
    fn walk_range(
        &mut self,
        place: &Place,
        range: &Range,
        visit: &mut dyn FnMut(&mut Flat, &[u32]) -> Outcome<()>,
    ) -> Outcome<()> {
        let segment = self.segment_mut(place)?;
        walk_container(
            &mut segment.content,
            1,
            range.start_index,
            range.end_index,
            visit,
        )?;
        renumber(&mut segment.content, 1);
        Ok(())
    }

    /// Run `op` on the table starting at `location` and renumber its segment.
    fn table_op<T>(
        &mut self,
        location: &Location,
        op: impl FnOnce(&mut Table) -> Outcome<T>,
    ) -> Outcome<(Place, T)> {
        let place = self.place_at(location)?;
        let index = location.index;
        let (path, e) = find_table(&self.segment(&place)?.content, index)
            .ok_or(Kind::TableNotFound { index })?;
        let segment = self.segment_mut(&place)?;
        let content = container_mut(&mut segment.content, &path).ok_or(Kind::TableNotFound { index })?;
        let Some(StructuralElement {
            block: Block::Table(table),
            ..
        }) = content.get_mut(e)
        else {
            return Err(Kind::TableNotFound { index });
        };
        let out = op(table)?;
        renumber(&mut segment.content, 1);
        Ok((place, out))
    }

    /// Shift named ranges of the segment; shifts apply in order.
    fn shift(&mut self, place: &Place, shifts: &[Shift]) {
        let tab = &mut self.document.tabs[place.tab];
        let segment_id = place.segment_id.as_deref();
        for range in tab
            .named_ranges
            .iter_mut()
            .filter(|r| r.segment_id.as_deref().filter(|s| !s.is_empty()) == segment_id)
        {
            for shift in shifts {
                match *shift {
                    Shift::Insert { index, len } => {
                        if range.start_index >= index {
                            range.start_index += len;
                        }
                        if range.end_index > index {
                            range.end_index += len;
                        }
                    }
                    Shift::Delete { start, end } => {
                        let map = |p: u32| {
                            if p >= end {
                                p - (end - start)
                            } else if p > start {
                                start
                            } else {
                                p
                            }
                        };
                        range.start_index = map(range.start_index);
                        range.end_index = map(range.end_index);
                    }
                }
            }
        }
        tab.named_ranges.retain(|r| r.start_index < r.end_index);
    }

    fn drop_footnotes(&mut self, tab: usize, footnotes: &[String]) {
        let tab = &mut self.document.tabs[tab];
        for id in footnotes {
            if tab.footnotes.remove(id).is_some() {
                log::debug!("footnote {} removed with its reference", id);
            }
            tab.named_ranges
                .retain(|r| r.segment_id.as_deref() != Some(id.as_str()));
        }
    }

    // Text

    fn insert_text(&mut self, r: &InsertText) -> Outcome<()> {
        if r.text.is_empty() {
            return Err(Kind::MissingField("text"));
        }
        let text: String = r.text.chars().filter(|c| !is_stripped_char(*c)).collect();
        if text.len() != r.text.len() {
            log::warn!(
                "stripped {} control or private-use characters from inserted text",
                r.text.chars().count() - text.chars().count()
            );
        }
        let place = self.place_at(&r.location)?;
        let point = self.point(&place, r.location.index)?;
        if text.is_empty() {
            return Ok(());
        }
        self.insert_items(&place, &point, |flat, i| {
            let style = flat.inherited_style(i);
            let meta = flat.paragraph_meta(i);
            text.chars()
                .map(|c| match c {
                    '\n' => Item::Newline(style.clone(), meta.clone()),
                    c => Item::Char(c, style.clone()),
                })
                .collect()
        })
    }

    fn delete_content(&mut self, range: &Range) -> Outcome<()> {
        let place = self.place_in(range)?;
        let (a, b) = (range.start_index, range.end_index);
        let segment = self.segment(&place)?;
        let end = segment.end_index();
        if b <= a {
            return Err(Kind::InvalidRange { start: a, end: b });
        }
        if a < 1 {
            return Err(Kind::IndexOutOfBounds { index: a, end });
        }
        if b > end {
            return Err(Kind::IndexOutOfBounds { index: b, end });
        }

        let (path, start) = descend_range(&segment.content, a, b)?;
        let content = container(&segment.content, &path)
            .ok_or_else(|| Kind::SegmentNotFound(place.key.to_string()))?;
        let flat = Flat::new(content, start);
        let i = boundary(&flat, a, end)?;
        let j = boundary(&flat, b, end)?;
        if j == flat.items.len() {
            return Err(if path.is_empty() {
                Kind::FinalNewline { index: b - 1 }
            } else {
                Kind::CellFinalNewline { index: b - 1 }
            });
        }
        if flat.items[j - 1].is_newline() {
            let kind = match &flat.items[j] {
                Item::Block(block) => Some(block.kind_name()),
                Item::Inline(InlineContent::Equation(_)) => Some("equation"),
                _ => None,
            };
            if let Some(kind) = kind {
                return Err(Kind::NewlineBeforeStructure { index: b - 1, kind });
            }
        }

        let mut footnotes = Vec::new();
        for item in &flat.items[i..j] {
            match item {
                Item::Inline(InlineContent::FootnoteReference(r)) => {
                    footnotes.push(r.footnote_id.clone())
                }
                Item::Block(block) => block_footnotes(block, &mut footnotes),
                _ => {}
            }
        }

        let segment = self.segment_mut(&place)?;
        let content = container_mut(&mut segment.content, &path)
            .ok_or_else(|| Kind::SegmentNotFound(place.key.to_string()))?;
        let mut flat = Flat::new(content, start);
        flat.items.drain(i..j);
        *content = flat.rebuild();
        renumber(&mut segment.content, 1);
        self.shift(&place, &[Shift::Delete { start: a, end: b }]);
        self.drop_footnotes(place.tab, &footnotes);
        Ok(())
    }

    // Styles and bullets

    fn update_text_style(&mut self, r: &UpdateTextStyle) -> Outcome<()> {
        let mask = field_mask(&r.fields, TextField::ALL, TextField::parse)?;
        let place = self.place_in(&r.range)?;
        self.check_range(&place, &r.range)?;
        let (a, b) = (r.range.start_index, r.range.end_index);
        let update: &TextStyle = &r.text_style;
        self.walk_range(&place, &r.range, &mut |flat, offsets| {
            for (i, item) in flat.items.iter_mut().enumerate() {
                if offsets[i] < a || offsets[i] >= b {
                    continue;
                }
                if let Item::Char(_, style) | Item::Newline(style, _) = item {
                    style.apply_masked(update, &mask);
                }
            }
            Ok(())
        })
    }

    fn update_paragraph_style(&mut self, r: &UpdateParagraphStyle) -> Outcome<()> {
        let mask = field_mask(&r.fields, ParagraphField::ALL, ParagraphField::parse)?;
        let place = self.place_in(&r.range)?;
        self.check_range(&place, &r.range)?;
        let (a, b) = (r.range.start_index, r.range.end_index);
        let update: &ParagraphStyle = &r.paragraph_style;
        self.walk_range(&place, &r.range, &mut |flat, offsets| {
            let mut paragraph_start = flat.start;
            for (i, item) in flat.items.iter_mut().enumerate() {
                match item {
                    Item::Newline(_, meta) => {
                        if paragraph_start < b && offsets[i + 1] > a {
                            meta.style.apply_masked(update, &mask);
                        }
                        paragraph_start = offsets[i + 1];
                    }
                    Item::Block(_) => paragraph_start = offsets[i + 1],
                    _ => {}
                }
            }
            Ok(())
        })
    }

    fn create_bullets(&mut self, r: &CreateParagraphBullets) -> Outcome<String> {
        if r.bullet_preset.is_empty() {
            return Err(Kind::MissingField("bulletPreset"));
        }
        let place = self.place_in(&r.range)?;
        self.check_range(&place, &r.range)?;
        let (a, b) = (r.range.start_index, r.range.end_index);
        let list_id = self.ids.next(ids::LIST, &self.document);

        let mut removed = Vec::new();
        self.walk_range(&place, &r.range, &mut |flat, offsets| {
            let mut paragraphs = Vec::new();
            let mut first = 0;
            for (i, item) in flat.items.iter().enumerate() {
                match item {
                    Item::Newline(..) => {
                        if offsets[first] < b && offsets[i + 1] > a {
                            paragraphs.push((first, i));
                        }
                        first = i + 1;
                    }
                    Item::Block(_) => first = i + 1,
                    _ => {}
                }
            }
            for (first, newline) in paragraphs.into_iter().rev() {
                let tabs = flat.items[first..newline]
                    .iter()
                    .take_while(|item| matches!(item, Item::Char('\t', _)))
                    .count();
                removed.extend_from_slice(&offsets[first..first + tabs]);
                flat.items.drain(first..first + tabs);
                if let Item::Newline(_, meta) = &mut flat.items[newline - tabs] {
                    meta.bullet = Some(Bullet {
                        list_id: list_id.clone(),
                        nesting_level: tabs as u32,
                    });
                }
            }
            Ok(())
        })?;

        removed.sort_unstable_by(|x, y| y.cmp(x));
        let shifts: Vec<_> = removed
            .into_iter()
            .map(|p| Shift::Delete { start: p, end: p + 1 })
            .collect();
        self.shift(&place, &shifts);
        self.document.tabs[place.tab].lists.insert(
            list_id.clone(),
            List {
                bullet_preset: r.bullet_preset.clone(),
            },
        );
        Ok(list_id)
    }

    fn delete_bullets(&mut self, range: &Range) -> Outcome<()> {
        let place = self.place_in(range)?;
        self.check_range(&place, range)?;
        let (a, b) = (range.start_index, range.end_index);
        self.walk_range(&place, range, &mut |flat, offsets| {
            let mut paragraph_start = flat.start;
            for (i, item) in flat.items.iter_mut().enumerate() {
                match item {
                    Item::Newline(_, meta) => {
                        if paragraph_start < b && offsets[i + 1] > a {
                            meta.bullet = None;
                        }
                        paragraph_start = offsets[i + 1];
                    }
                    Item::Block(_) => paragraph_start = offsets[i + 1],
                    _ => {}
                }
            }
            Ok(())
        })
    }

    // Structural inserts

    fn insert_table(&mut self, r: &InsertTable) -> Outcome<()> {
        if r.rows == 0 {
            return Err(Kind::InvalidField {
                field: "rows",
                reason: "must be at least 1".to_string(),
            });
        }
        if r.columns == 0 {
            return Err(Kind::InvalidField {
                field: "columns",
                reason: "must be at least 1".to_string(),
            });
        }
        let place = self.place_at(&r.location)?;
        if let SegmentKey::Footnote(_) = place.key {
            return Err(Kind::ForbiddenInSegment {
                element: "table",
                segment: place.key.to_string(),
            });
        }
        let point = self.point(&place, r.location.index)?;
        if !point.path.is_empty() {
            return Err(Kind::ForbiddenInTable { element: "table" });
        }
        let table = Table::new(r.rows, r.columns);
        self.insert_items(&place, &point, |flat, i| {
            vec![
                Item::Newline(flat.inherited_style(i), flat.paragraph_meta(i)),
                Item::Block(Block::Table(table)),
            ]
        })
    }

    /// Resolve a location that only the body outside tables accepts.
    fn body_point(&self, location: &Location, element: &'static str) -> Outcome<(Place, Point)> {
        let place = self.place_at(location)?;
        match place.key {
            SegmentKey::Body => {}
            SegmentKey::Footnote(_) if element == "footnote" => return Err(Kind::NestedFootnote),
            _ => {
                return Err(Kind::ForbiddenInSegment {
                    element,
                    segment: place.key.to_string(),
                })
            }
        }
        let point = self.point(&place, location.index)?;
        if !point.path.is_empty() {
            return Err(Kind::ForbiddenInTable { element });
        }
        Ok((place, point))
    }

    fn insert_section_break(&mut self, r: &InsertSectionBreak) -> Outcome<()> {
        let (place, point) = self.body_point(&r.location, "section break")?;
        let section = SectionBreak::new(r.section_type);
        self.insert_items(&place, &point, |flat, i| {
            vec![
                Item::Newline(flat.inherited_style(i), flat.paragraph_meta(i)),
                Item::Block(Block::SectionBreak(section)),
            ]
        })
    }

    fn insert_page_break(&mut self, location: &Location) -> Outcome<()> {
        let (place, point) = self.body_point(location, "page break")?;
        self.insert_items(&place, &point, |flat, i| {
            vec![
                Item::Inline(InlineContent::PageBreak(PageBreak {})),
                Item::Newline(flat.inherited_style(i), flat.paragraph_meta(i)),
            ]
        })
    }

    fn create_footnote(&mut self, location: &Location) -> Outcome<String> {
        let (place, point) = self.body_point(location, "footnote")?;
        let footnote_id = self.ids.next(ids::FOOTNOTE, &self.document);
        let reference = InlineContent::FootnoteReference(FootnoteReference {
            footnote_id: footnote_id.clone(),
        });
        self.insert_items(&place, &point, |_, _| vec![Item::Inline(reference)])?;

        let mut segment = Segment::new();
        renumber(&mut segment.content, 1);
        self.document.tabs[place.tab]
            .footnotes
            .insert(footnote_id.clone(), segment);
        Ok(footnote_id)
    }

    fn insert_image(&mut self, r: &InsertInlineImage, rules: &Rules) -> Outcome<String> {
        rules.check_uri(&r.uri)?;
        let place = self.place_at(&r.location)?;
        if let SegmentKey::Footnote(_) = place.key {
            return Err(Kind::ForbiddenInSegment {
                element: "inline image",
                segment: place.key.to_string(),
            });
        }
        let point = self.point(&place, r.location.index)?;
        let object_id = self.ids.next(ids::IMAGE, &self.document);
        let image = InlineContent::InlineImage(InlineImage {
            object_id: Some(object_id.clone()),
            uri: Some(r.uri.clone()),
            size: r.object_size,
        });
        self.insert_items(&place, &point, |_, _| vec![Item::Inline(image)])?;
        Ok(object_id)
    }

    // Tables

    fn insert_table_row(&mut self, r: &InsertTableRow) -> Outcome<()> {
        let cell = &r.table_cell_location;
        let below = r.insert_below;
        let (place, shift) = self.table_op(&cell.table_start_location, |table| {
            let (row, _) = check_cell(table, cell)?;
            let at = if below { row + 1 } else { row };
            if merge_heads(table).any(|h| h.row < at && at < h.row + h.row_span) {
                return Err(Kind::MergeConflict);
            }
            let index = if below {
                table.table_rows[row].end_index
            } else {
                table.table_rows[row].start_index
            };
            let columns = table.columns;
            let cells = (0..columns).map(|_| TableCell::empty()).collect();
            table.table_rows.insert(at, TableRow::new(cells));
            table.rows += 1;
            Ok(Shift::Insert {
                index,
                len: 1 + 2 * columns,
            })
        })?;
        self.shift(&place, &[shift]);
        Ok(())
    }

    fn insert_table_column(&mut self, r: &InsertTableColumn) -> Outcome<()> {
        let cell = &r.table_cell_location;
        let right = r.insert_right;
        let (place, shifts) = self.table_op(&cell.table_start_location, |table| {
            let (_, column) = check_cell(table, cell)?;
            let at = if right { column + 1 } else { column };
            if merge_heads(table).any(|h| h.column < at && at < h.column + h.column_span) {
                return Err(Kind::MergeConflict);
            }
            let mut shifts = Vec::with_capacity(table.table_rows.len());
            for row in table.table_rows.iter_mut().rev() {
                let index = row
                    .table_cells
                    .get(at)
                    .map(|c| c.start_index)
                    .unwrap_or(row.end_index);
                row.table_cells.insert(at, TableCell::empty());
                shifts.push(Shift::Insert { index, len: 2 });
            }
            table.columns += 1;
            Ok(shifts)
        })?;
        self.shift(&place, &shifts);
        Ok(())
    }

    fn delete_table_row(&mut self, cell: &TableCellLocation) -> Outcome<()> {
        let (place, (shift, footnotes)) = self.table_op(&cell.table_start_location, |table| {
            let (row, _) = check_cell(table, cell)?;
            if table.table_rows.len() == 1 {
                return Err(Kind::LastRowOrColumn("row"));
            }
            if merge_heads(table).any(|h| h.row_span > 1 && h.row <= row && row < h.row + h.row_span) {
                return Err(Kind::MergeConflict);
            }
            let removed = table.table_rows.remove(row);
            table.rows -= 1;
            let mut footnotes = Vec::new();
            for cell in &removed.table_cells {
                content_footnotes(&cell.content, &mut footnotes);
            }
            let shift = Shift::Delete {
                start: removed.start_index,
                end: removed.end_index,
            };
            Ok((shift, footnotes))
        })?;
        self.shift(&place, &[shift]);
        self.drop_footnotes(place.tab, &footnotes);
        Ok(())
    }

    fn delete_table_column(&mut self, cell: &TableCellLocation) -> Outcome<()> {
        let (place, (shifts, footnotes)) = self.table_op(&cell.table_start_location, |table| {
            let (_, column) = check_cell(table, cell)?;
            if table.columns == 1 {
                return Err(Kind::LastRowOrColumn("column"));
            }
            if merge_heads(table).any(|h| {
                h.column_span > 1 && h.column <= column && column < h.column + h.column_span
            }) {
                return Err(Kind::MergeConflict);
            }
            let mut shifts = Vec::with_capacity(table.table_rows.len());
            let mut footnotes = Vec::new();
            for row in table.table_rows.iter_mut().rev() {
                let removed = row.table_cells.remove(column);
                content_footnotes(&removed.content, &mut footnotes);
                shifts.push(Shift::Delete {
                    start: removed.start_index,
                    end: removed.end_index,
                });
            }
            table.columns -= 1;
            Ok((shifts, footnotes))
        })?;
        self.shift(&place, &shifts);
        self.drop_footnotes(place.tab, &footnotes);
        Ok(())
    }

    fn merge_cells(&mut self, range: &TableRange) -> Outcome<()> {
        self.table_op(&range.table_cell_location.table_start_location, |table| {
            if range.row_span * range.column_span < 2 {
                return Err(Kind::InvalidField {
                    field: "tableRange",
                    reason: "a merge must cover at least two cells".to_string(),
                });
            }
            let target = check_block(table, range)?;
            if merge_heads(table).any(|h| h.overlaps(&target)) {
                return Err(Kind::MergeOverlap);
            }
            if let Some(cell) = table.cell_mut(target.row, target.column) {
                cell.table_cell_style = TableCellStyle {
                    row_span: range.row_span,
                    column_span: range.column_span,
                };
            }
            Ok(())
        })?;
        Ok(())
    }

    fn unmerge_cells(&mut self, range: &TableRange) -> Outcome<()> {
        self.table_op(&range.table_cell_location.table_start_location, |table| {
            let target = check_block(table, range)?;
            let heads: Vec<_> = merge_heads(table).filter(|h| h.overlaps(&target)).collect();
            for head in heads {
                if let Some(cell) = table.cell_mut(head.row, head.column) {
                    cell.table_cell_style = TableCellStyle::default();
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    // Named ranges

    fn create_named_range(&mut self, r: &CreateNamedRange, rules: &Rules) -> Outcome<String> {
        rules.check_name(&r.name)?;
        let place = self.place_in(&r.range)?;
        self.check_range(&place, &r.range)?;
        let named_range_id = self.ids.next(ids::NAMED_RANGE, &self.document);
        self.document.tabs[place.tab].named_ranges.push(NamedRange {
            named_range_id: named_range_id.clone(),
            name: r.name.clone(),
            segment_id: place.segment_id,
            start_index: r.range.start_index,
            end_index: r.range.end_index,
        });
        Ok(named_range_id)
    }

    fn delete_named_range(&mut self, r: &DeleteNamedRange) -> Outcome<()> {
        let tabs: Vec<usize> = match &r.tab_id {
            Some(id) => vec![self.tab_index(Some(id))?],
            None => (0..self.document.tabs.len()).collect(),
        };
        match (&r.named_range_id, &r.name) {
            (Some(id), _) => {
                let id = known(id)?;
                let mut found = false;
                for t in tabs {
                    let ranges = &mut self.document.tabs[t].named_ranges;
                    let before = ranges.len();
                    ranges.retain(|n| n.named_range_id != id);
                    found |= ranges.len() != before;
                }
                if !found {
                    return Err(Kind::NamedRangeNotFound(id.to_string()));
                }
            }
            (None, Some(name)) => {
                for t in tabs {
                    self.document.tabs[t].named_ranges.retain(|n| &n.name != name);
                }
            }
            (None, None) => return Err(Kind::MissingField("namedRangeId")),
        }
        Ok(())
    }

    // Headers, footers and tabs

    fn create_header_footer(&mut self, r: &CreateHeaderFooter, footer: bool) -> Outcome<String> {
        let tab_id = r
            .section_break_location
            .as_ref()
            .and_then(|l| l.tab_id.as_ref());
        let t = self.tab_index(tab_id)?;
        let tab = &self.document.tabs[t];
        if footer && tab.footers.contains_key(&r.kind) {
            return Err(Kind::FooterExists(r.kind.as_str()));
        }
        if !footer && tab.headers.contains_key(&r.kind) {
            return Err(Kind::HeaderExists(r.kind.as_str()));
        }

        let prefix = if footer { ids::FOOTER } else { ids::HEADER };
        let id = self.ids.next(prefix, &self.document);
        let mut segment = Segment::new();
        renumber(&mut segment.content, 1);
        let tab = &mut self.document.tabs[t];
        if footer {
            tab.set_footer(r.kind, id.clone(), segment);
        } else {
            tab.set_header(r.kind, id.clone(), segment);
        }
        Ok(id)
    }

    fn delete_header_footer(&mut self, tab_id: Option<&Id>, id: &Id, footer: bool) -> Outcome<()> {
        let t = self.tab_index(tab_id)?;
        let id = known(id)?;
        let tab = &mut self.document.tabs[t];
        let map = if footer { &mut tab.footers } else { &mut tab.headers };
        let kind: HeaderFooterKind = map
            .iter()
            .find(|(_, h)| h.id == id)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| Kind::SegmentNotFound(id.to_string()))?;
        map.remove(&kind);
        tab.named_ranges.retain(|r| r.segment_id.as_deref() != Some(id));
        Ok(())
    }

    fn add_tab(&mut self, props: &TabProperties) -> Outcome<String> {
        let count = self.document.tabs.len();
        let position = match props.index {
            Some(i) if i as usize > count => {
                return Err(Kind::InvalidField {
                    field: "tabProperties.index",
                    reason: format!("{} exceeds the tab count {}", i, count),
                })
            }
            Some(i) => i as usize,
            None => count,
        };
        let tab_id = self.ids.next(ids::TAB, &self.document);
        let mut tab = Tab::new(tab_id.clone(), props.title.clone().unwrap_or_default());
        renumber(&mut tab.body.content, 1);
        self.document.tabs.insert(position, tab);
        Ok(tab_id)
    }

    fn delete_tab(&mut self, tab_id: &Id) -> Outcome<()> {
        let t = self.tab_index(Some(tab_id))?;
        if self.document.tabs.len() == 1 {
            return Err(Kind::LastTab);
        }
        self.document.tabs.remove(t);
        Ok(())
    }

    fn update_tab(&mut self, r: &UpdateDocumentTabProperties) -> Outcome<()> {
        let props = &r.tab_properties;
        let tab_id = props
            .tab_id
            .as_ref()
            .ok_or(Kind::MissingField("tabProperties.tabId"))?;
        let t = self.tab_index(Some(tab_id))?;
        let fields = field_mask(&r.fields, &[TabField::Title, TabField::Index], |name| {
            match name {
                "title" => Some(TabField::Title),
                "index" => Some(TabField::Index),
                _ => None,
            }
        })?;

        if fields.contains(&TabField::Title) {
            self.document.tabs[t].title = props.title.clone().unwrap_or_default();
        }
        if fields.contains(&TabField::Index) {
            let to = props.index.ok_or(Kind::MissingField("tabProperties.index"))? as usize;
            if to >= self.document.tabs.len() {
                return Err(Kind::InvalidField {
                    field: "tabProperties.index",
                    reason: format!("{} is past the last tab", to),
                });
            }
            let tab = self.document.tabs.remove(t);
            self.document.tabs.insert(to, tab);
        }
        Ok(())
    }
}

fn known(id: &Id) -> Outcome<&str> {
    id.known()
        .ok_or_else(|| Kind::UnresolvedDeferredId(id.to_string()))
}

fn field_mask<F: Copy + Ord>(
    mask: &str,
    all: &[F],
    parse: impl Fn(&str) -> Option<F>,
) -> Outcome<BTreeSet<F>> {
    if mask.trim().is_empty() {
        return Err(Kind::MissingField("fields"));
    }
    parse_mask(mask, all, parse).map_err(|name| Kind::InvalidField {
        field: "fields",
        reason: format!("unknown field {:?}", name),
    })
}

fn inside_error(flat: &Flat, i: usize, index: u32) -> Kind {
    let start = flat.offset(i);
    match &flat.items[i] {
        Item::Char(..) => Kind::SurrogateSplit { index },
        Item::Inline(inline) => Kind::PartialStructure {
            kind: inline.kind_name(),
            index: start,
        },
        Item::Block(Block::TableOfContents(_)) => Kind::InsideTableOfContents { index },
        Item::Block(block) => Kind::PartialStructure {
            kind: block.kind_name(),
            index: start,
        },
        Item::Newline(..) => Kind::IndexOutOfBounds {
            index,
            end: flat.end(),
        },
    }
}

fn boundary(flat: &Flat, index: u32, end: u32) -> Outcome<usize> {
    match flat.slot(index) {
        Slot::Boundary(i) => Ok(i),
        Slot::Inside(i) => Err(inside_error(flat, i, index)),
        Slot::Outside => Err(Kind::IndexOutOfBounds { index, end }),
    }
}

/// Find the table cell an insertion at `index` lands in, innermost first.
fn descend_point(content: &[StructuralElement], index: u32) -> Outcome<(Path, u32)> {
    let mut path = Vec::new();
    let mut content = content;
    let mut start = 1;
    'outer: loop {
        for (e, element) in content.iter().enumerate() {
            if index <= element.start_index || index >= element.end_index {
                continue;
            }
            match &element.block {
                Block::Table(table) => {
                    let mut marker = "end";
                    for (r, row) in table.table_rows.iter().enumerate() {
                        if index == row.start_index {
                            marker = "row";
                        }
                        for (c, cell) in row.table_cells.iter().enumerate() {
                            if index == cell.start_index {
                                marker = "cell";
                            }
                            if index > cell.start_index && index < cell.end_index {
                                path.push((e, r, c));
                                start = cell.start_index + 1;
                                content = cell.content.as_slice();
                                continue 'outer;
                            }
                        }
                    }
                    return Err(Kind::TableMarker { marker, index });
                }
                Block::TableOfContents(_) => return Err(Kind::InsideTableOfContents { index }),
                _ => {}
            }
        }
        return Ok((path, start));
    }
}

/// Find the innermost container holding all of `[a, b)`.
fn descend_range(content: &[StructuralElement], a: u32, b: u32) -> Outcome<(Path, u32)> {
    let mut path = Vec::new();
    let mut content = content;
    let mut start = 1;
    'outer: loop {
        for (e, element) in content.iter().enumerate() {
            if b <= element.start_index || a >= element.end_index {
                continue;
            }
            if a <= element.start_index && b >= element.end_index {
                continue;
            }
            match &element.block {
                Block::Table(table) => {
                    if a <= element.start_index || b >= element.end_index {
                        return Err(Kind::PartialStructure {
                            kind: "table",
                            index: element.start_index,
                        });
                    }
                    for (r, row) in table.table_rows.iter().enumerate() {
                        for (c, cell) in row.table_cells.iter().enumerate() {
                            if a > cell.start_index && b <= cell.end_index {
                                path.push((e, r, c));
                                start = cell.start_index + 1;
                                content = cell.content.as_slice();
                                continue 'outer;
                            }
                        }
                    }
                    return Err(Kind::CrossesCellBoundary { start: a, end: b });
                }
                Block::TableOfContents(_) => {
                    let index = if a > element.start_index { a } else { b };
                    return Err(Kind::InsideTableOfContents { index });
                }
                _ => {}
            }
        }
        return Ok((path, start));
    }
}

fn container<'a>(
    mut content: &'a [StructuralElement],
    path: &[(usize, usize, usize)],
) -> Option<&'a [StructuralElement]> {
    for &(e, r, c) in path {
        let Block::Table(table) = &content.get(e)?.block else {
            return None;
        };
        content = table.table_rows.get(r)?.table_cells.get(c)?.content.as_slice();
    }
    Some(content)
}

fn container_mut<'a>(
    mut content: &'a mut Vec<StructuralElement>,
    path: &[(usize, usize, usize)],
) -> Option<&'a mut Vec<StructuralElement>> {
    for &(e, r, c) in path {
        let current = content;
        let Block::Table(table) = &mut current.get_mut(e)?.block else {
            return None;
        };
        content = &mut table.table_rows.get_mut(r)?.table_cells.get_mut(c)?.content;
    }
    Some(content)
}

fn walk_container(
    content: &mut Vec<StructuralElement>,
    start: u32,
    a: u32,
    b: u32,
    visit: &mut dyn FnMut(&mut Flat, &[u32]) -> Outcome<()>,
) -> Outcome<()> {
    let mut flat = Flat::new(content, start);
    let mut offsets = Vec::with_capacity(flat.items.len() + 1);
    let mut pos = start;
    for item in &flat.items {
        offsets.push(pos);
        pos += item.len();
    }
    offsets.push(pos);

    for (i, item) in flat.items.iter_mut().enumerate() {
        if offsets[i] >= b || offsets[i + 1] <= a {
            continue;
        }
        if let Item::Block(Block::Table(table)) = item {
            let cells = table
                .table_rows
                .iter_mut()
                .flat_map(|row| row.table_cells.iter_mut());
            for cell in cells {
                if cell.start_index + 1 < b && cell.end_index > a {
                    let start = cell.start_index + 1;
                    walk_container(&mut cell.content, start, a, b, visit)?;
                }
            }
        }
    }
    visit(&mut flat, &offsets)?;
    *content = flat.rebuild();
    Ok(())
}

/// Locate the table starting at `index`: the path to its container and its
/// element position there.
fn find_table(content: &[StructuralElement], index: u32) -> Option<(Path, usize)> {
    for (e, element) in content.iter().enumerate() {
        let Block::Table(table) = &element.block else {
            continue;
        };
        if element.start_index == index {
            return Some((Vec::new(), e));
        }
        if element.start_index < index && index < element.end_index {
            for (r, row) in table.table_rows.iter().enumerate() {
                for (c, cell) in row.table_cells.iter().enumerate() {
                    if let Some((mut path, found)) = find_table(&cell.content, index) {
                        path.insert(0, (e, r, c));
                        return Some((path, found));
                    }
                }
            }
        }
    }
    None
}

/// A rectangle of cells.
#[derive(Debug, Clone, Copy)]
struct CellBlock {
    row: usize,
    column: usize,
    row_span: usize,
    column_span: usize,
}

impl CellBlock {
    fn overlaps(&self, other: &CellBlock) -> bool {
        self.row < other.row + other.row_span
            && other.row < self.row + self.row_span
            && self.column < other.column + other.column_span
            && other.column < self.column + self.column_span
    }
}

fn merge_heads(table: &Table) -> impl Iterator<Item = CellBlock> + '_ {
    table.table_rows.iter().enumerate().flat_map(|(r, row)| {
        row.table_cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_merge_head())
            .map(move |(c, cell)| CellBlock {
                row: r,
                column: c,
                row_span: cell.table_cell_style.row_span as usize,
                column_span: cell.table_cell_style.column_span as usize,
            })
    })
}

fn check_cell(table: &Table, cell: &TableCellLocation) -> Outcome<(usize, usize)> {
    let (row, column) = (cell.row_index as usize, cell.column_index as usize);
    if row >= table.table_rows.len() || column >= table.columns as usize {
        return Err(Kind::TableCoordinates {
            row: cell.row_index,
            column: cell.column_index,
        });
    }
    Ok((row, column))
}

fn check_block(table: &Table, range: &TableRange) -> Outcome<CellBlock> {
    let (row, column) = check_cell(table, &range.table_cell_location)?;
    let block = CellBlock {
        row,
        column,
        row_span: range.row_span as usize,
        column_span: range.column_span as usize,
    };
    if block.row_span == 0
        || block.column_span == 0
        || row + block.row_span > table.table_rows.len()
        || column + block.column_span > table.columns as usize
    {
        return Err(Kind::TableCoordinates {
            row: (row + block.row_span).saturating_sub(1) as u32,
            column: (column + block.column_span).saturating_sub(1) as u32,
        });
    }
    Ok(block)
}

fn content_footnotes(content: &[StructuralElement], out: &mut Vec<String>) {
    for element in content {
        match &element.block {
            Block::Paragraph(p) => {
                for e in &p.elements {
                    if let InlineContent::FootnoteReference(r) = &e.content {
                        out.push(r.footnote_id.clone());
                    }
                }
            }
            other => block_footnotes(other, out),
        }
    }
}

fn block_footnotes(block: &Block, out: &mut Vec<String>) {
    match block {
        Block::Table(table) => {
            for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                content_footnotes(&cell.content, out);
            }
        }
        Block::TableOfContents(toc) => content_footnotes(&toc.content, out),
        Block::Paragraph(_) | Block::SectionBreak(_) | Block::HorizontalRule(_) => {}
    }
}
