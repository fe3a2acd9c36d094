//! Request payloads.

use super::{Id, Location, Range, TableCellLocation, TableRange};
use crate::model::{
    HeaderFooterKind, ParagraphField, ParagraphStyle, SectionType, Size, StyleFields, TextField,
    TextStyle,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One edit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    /// Insert text at a location
    InsertText(InsertText),
    /// Delete a range of content
    DeleteContentRange(DeleteContentRange),
    /// Update character styles over a range
    UpdateTextStyle(UpdateTextStyle),
    /// Update paragraph styles of paragraphs overlapping a range
    UpdateParagraphStyle(UpdateParagraphStyle),
    /// Turn paragraphs into list items
    CreateParagraphBullets(CreateParagraphBullets),
    /// Remove list membership
    DeleteParagraphBullets(DeleteParagraphBullets),
    /// Insert a table preceded by a newline
    InsertTable(InsertTable),
    /// Insert a table row
    InsertTableRow(InsertTableRow),
    /// Insert a table column
    InsertTableColumn(InsertTableColumn),
    /// Delete a table row
    DeleteTableRow(DeleteTableRow),
    /// Delete a table column
    DeleteTableColumn(DeleteTableColumn),
    /// Merge a block of cells
    MergeTableCells(MergeTableCells),
    /// Unmerge cells
    UnmergeTableCells(UnmergeTableCells),
    /// Create a named range
    CreateNamedRange(CreateNamedRange),
    /// Delete named ranges by id or name
    DeleteNamedRange(DeleteNamedRange),
    /// Create a header
    CreateHeader(CreateHeaderFooter),
    /// Delete a header
    DeleteHeader(DeleteHeader),
    /// Create a footer
    CreateFooter(CreateHeaderFooter),
    /// Delete a footer
    DeleteFooter(DeleteFooter),
    /// Insert a footnote reference and create its segment
    CreateFootnote(CreateFootnote),
    /// Insert a page break followed by a newline
    InsertPageBreak(InsertPageBreak),
    /// Insert a newline followed by a section break
    InsertSectionBreak(InsertSectionBreak),
    /// Insert an image
    InsertInlineImage(InsertInlineImage),
    /// Insert a person chip
    InsertPerson(InsertPerson),
    /// Insert a date chip
    InsertDate(InsertDate),
    /// Add a tab
    AddDocumentTab(AddDocumentTab),
    /// Delete a tab
    DeleteTab(DeleteTab),
    /// Update tab properties
    UpdateDocumentTabProperties(UpdateDocumentTabProperties),
}

impl Request {
    /// Wire name of the operation.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Request::InsertText(_) => "insertText",
            Request::DeleteContentRange(_) => "deleteContentRange",
            Request::UpdateTextStyle(_) => "updateTextStyle",
            Request::UpdateParagraphStyle(_) => "updateParagraphStyle",
            Request::CreateParagraphBullets(_) => "createParagraphBullets",
            Request::DeleteParagraphBullets(_) => "deleteParagraphBullets",
            Request::InsertTable(_) => "insertTable",
            Request::InsertTableRow(_) => "insertTableRow",
            Request::InsertTableColumn(_) => "insertTableColumn",
            Request::DeleteTableRow(_) => "deleteTableRow",
            Request::DeleteTableColumn(_) => "deleteTableColumn",
            Request::MergeTableCells(_) => "mergeTableCells",
            Request::UnmergeTableCells(_) => "unmergeTableCells",
            Request::CreateNamedRange(_) => "createNamedRange",
            Request::DeleteNamedRange(_) => "deleteNamedRange",
            Request::CreateHeader(_) => "createHeader",
            Request::DeleteHeader(_) => "deleteHeader",
            Request::CreateFooter(_) => "createFooter",
            Request::DeleteFooter(_) => "deleteFooter",
            Request::CreateFootnote(_) => "createFootnote",
            Request::InsertPageBreak(_) => "insertPageBreak",
            Request::InsertSectionBreak(_) => "insertSectionBreak",
            Request::InsertInlineImage(_) => "insertInlineImage",
            Request::InsertPerson(_) => "insertPerson",
            Request::InsertDate(_) => "insertDate",
            Request::AddDocumentTab(_) => "addDocumentTab",
            Request::DeleteTab(_) => "deleteTab",
            Request::UpdateDocumentTabProperties(_) => "updateDocumentTabProperties",
        }
    }

    /// Visit every id carried by the request.
    pub fn for_each_id(&self, f: &mut dyn FnMut(&Id)) {
        let mut clone = self.clone();
        clone.for_each_id_mut(&mut |id| f(&*id));
    }

    /// Visit every id carried by the request, mutably.
    pub fn for_each_id_mut(&mut self, f: &mut dyn FnMut(&mut Id)) {
        fn opt(id: &mut Option<Id>, f: &mut dyn FnMut(&mut Id)) {
            if let Some(id) = id {
                f(id);
            }
        }
        fn loc(l: &mut Location, f: &mut dyn FnMut(&mut Id)) {
            opt(&mut l.segment_id, f);
            opt(&mut l.tab_id, f);
        }
        fn range(r: &mut Range, f: &mut dyn FnMut(&mut Id)) {
            opt(&mut r.segment_id, f);
            opt(&mut r.tab_id, f);
        }

        match self {
            Request::InsertText(r) => loc(&mut r.location, f),
            Request::DeleteContentRange(r) => range(&mut r.range, f),
            Request::UpdateTextStyle(r) => range(&mut r.range, f),
            Request::UpdateParagraphStyle(r) => range(&mut r.range, f),
            Request::CreateParagraphBullets(r) => range(&mut r.range, f),
            Request::DeleteParagraphBullets(r) => range(&mut r.range, f),
            Request::InsertTable(r) => loc(&mut r.location, f),
            Request::InsertTableRow(r) => loc(&mut r.table_cell_location.table_start_location, f),
            Request::InsertTableColumn(r) => {
                loc(&mut r.table_cell_location.table_start_location, f)
            }
            Request::DeleteTableRow(r) => loc(&mut r.table_cell_location.table_start_location, f),
            Request::DeleteTableColumn(r) => {
                loc(&mut r.table_cell_location.table_start_location, f)
            }
            Request::MergeTableCells(r) => loc(
                &mut r.table_range.table_cell_location.table_start_location,
                f,
            ),
            Request::UnmergeTableCells(r) => loc(
                &mut r.table_range.table_cell_location.table_start_location,
                f,
            ),
            Request::CreateNamedRange(r) => range(&mut r.range, f),
            Request::DeleteNamedRange(r) => {
                opt(&mut r.named_range_id, f);
                opt(&mut r.tab_id, f);
            }
            Request::CreateHeader(r) | Request::CreateFooter(r) => {
                if let Some(l) = &mut r.section_break_location {
                    loc(l, f);
                }
            }
            Request::DeleteHeader(r) => {
                f(&mut r.header_id);
                opt(&mut r.tab_id, f);
            }
            Request::DeleteFooter(r) => {
                f(&mut r.footer_id);
                opt(&mut r.tab_id, f);
            }
            Request::CreateFootnote(r) => loc(&mut r.location, f),
            Request::InsertPageBreak(r) => loc(&mut r.location, f),
            Request::InsertSectionBreak(r) => loc(&mut r.location, f),
            Request::InsertInlineImage(r) => loc(&mut r.location, f),
            Request::InsertPerson(r) => loc(&mut r.location, f),
            Request::InsertDate(r) => loc(&mut r.location, f),
            Request::AddDocumentTab(_) => {}
            Request::DeleteTab(r) => f(&mut r.tab_id),
            Request::UpdateDocumentTabProperties(r) => opt(&mut r.tab_properties.tab_id, f),
        }
    }

    /// Point every location and range of a content request at one segment.
    ///
    /// Requests that address tabs, headers or named ranges by id are left
    /// untouched.
    pub fn retarget(&mut self, tab_id: Option<&Id>, segment_id: Option<&Id>) {
        if let Some(location) = self.location_mut() {
            location.segment_id = segment_id.cloned();
            location.tab_id = tab_id.cloned();
        } else if let Some(range) = self.range_mut() {
            range.segment_id = segment_id.cloned();
            range.tab_id = tab_id.cloned();
        }
    }

    fn location_mut(&mut self) -> Option<&mut Location> {
        match self {
            Request::InsertText(r) => Some(&mut r.location),
            Request::InsertTable(r) => Some(&mut r.location),
            Request::InsertTableRow(r) => Some(&mut r.table_cell_location.table_start_location),
            Request::InsertTableColumn(r) => Some(&mut r.table_cell_location.table_start_location),
            Request::DeleteTableRow(r) => Some(&mut r.table_cell_location.table_start_location),
            Request::DeleteTableColumn(r) => Some(&mut r.table_cell_location.table_start_location),
            Request::MergeTableCells(r) => {
                Some(&mut r.table_range.table_cell_location.table_start_location)
            }
            Request::UnmergeTableCells(r) => {
                Some(&mut r.table_range.table_cell_location.table_start_location)
            }
            Request::CreateFootnote(r) => Some(&mut r.location),
            Request::InsertPageBreak(r) => Some(&mut r.location),
            Request::InsertSectionBreak(r) => Some(&mut r.location),
            Request::InsertInlineImage(r) => Some(&mut r.location),
            Request::InsertPerson(r) => Some(&mut r.location),
            Request::InsertDate(r) => Some(&mut r.location),
            _ => None,
        }
    }

    fn range_mut(&mut self) -> Option<&mut Range> {
        match self {
            Request::DeleteContentRange(r) => Some(&mut r.range),
            Request::UpdateTextStyle(r) => Some(&mut r.range),
            Request::UpdateParagraphStyle(r) => Some(&mut r.range),
            Request::CreateParagraphBullets(r) => Some(&mut r.range),
            Request::DeleteParagraphBullets(r) => Some(&mut r.range),
            Request::CreateNamedRange(r) => Some(&mut r.range),
            _ => None,
        }
    }

    /// Check whether any id in the request is still deferred.
    pub fn has_deferred(&self) -> bool {
        let mut found = false;
        self.for_each_id(&mut |id| found |= id.is_deferred());
        found
    }
}

/// Payload of `insertText`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertText {
    /// Text to insert; `\n` starts a new paragraph
    pub text: String,
    /// Where to insert
    pub location: Location,
}

/// Payload of `deleteContentRange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteContentRange {
    /// Range to delete
    pub range: Range,
}

/// Payload of `updateTextStyle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyle {
    /// Range to restyle
    pub range: Range,
    /// New values
    pub text_style: TextStyle,
    /// Comma separated field mask; `*` for all
    pub fields: String,
}

impl UpdateTextStyle {
    /// Build an update that sets exactly the masked fields of `style`.
    pub fn masked(range: Range, style: &TextStyle, fields: &BTreeSet<TextField>) -> Self {
        Self {
            range,
            text_style: style.restricted(fields),
            fields: TextStyle::mask_string(fields),
        }
    }
}

/// Payload of `updateParagraphStyle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParagraphStyle {
    /// Paragraphs overlapping this range are updated
    pub range: Range,
    /// New values
    pub paragraph_style: ParagraphStyle,
    /// Comma separated field mask; `*` for all
    pub fields: String,
}

impl UpdateParagraphStyle {
    /// Build an update that sets exactly the masked fields of `style`.
    pub fn masked(range: Range, style: &ParagraphStyle, fields: &BTreeSet<ParagraphField>) -> Self {
        Self {
            range,
            paragraph_style: style.restricted(fields),
            fields: ParagraphStyle::mask_string(fields),
        }
    }
}

/// Payload of `createParagraphBullets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParagraphBullets {
    /// Paragraphs overlapping this range become list items
    pub range: Range,
    /// Glyph preset
    pub bullet_preset: String,
}

/// Payload of `deleteParagraphBullets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteParagraphBullets {
    /// Paragraphs overlapping this range lose their bullets
    pub range: Range,
}

/// Payload of `insertTable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertTable {
    /// Row count
    pub rows: u32,
    /// Column count
    pub columns: u32,
    /// Where to insert; a newline is inserted first
    pub location: Location,
}

/// Payload of `insertTableRow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTableRow {
    /// Reference cell
    pub table_cell_location: TableCellLocation,
    /// Insert below the reference row instead of above
    pub insert_below: bool,
}

/// Payload of `insertTableColumn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTableColumn {
    /// Reference cell
    pub table_cell_location: TableCellLocation,
    /// Insert right of the reference column instead of left
    pub insert_right: bool,
}

/// Payload of `deleteTableRow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTableRow {
    /// Cell in the row to delete
    pub table_cell_location: TableCellLocation,
}

/// Payload of `deleteTableColumn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTableColumn {
    /// Cell in the column to delete
    pub table_cell_location: TableCellLocation,
}

/// Payload of `mergeTableCells`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeTableCells {
    /// Cells to merge
    pub table_range: TableRange,
}

/// Payload of `unmergeTableCells`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmergeTableCells {
    /// Cells to unmerge
    pub table_range: TableRange,
}

/// Payload of `createNamedRange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNamedRange {
    /// Name, 1 to 256 UTF-16 units
    pub name: String,
    /// Covered range
    pub range: Range,
}

/// Payload of `deleteNamedRange`. Exactly one of id or name is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNamedRange {
    /// Range id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_range_id: Option<Id>,
    /// Delete every range with this name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Restrict to one tab
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<Id>,
}

/// Payload of `createHeader` and `createFooter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHeaderFooter {
    /// Header or footer kind
    #[serde(rename = "type")]
    pub kind: HeaderFooterKind,
    /// Section the segment belongs to; carries the tab id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_break_location: Option<Location>,
}

/// Payload of `deleteHeader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteHeader {
    /// Header segment id
    pub header_id: Id,
    /// Tab holding the header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<Id>,
}

/// Payload of `deleteFooter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFooter {
    /// Footer segment id
    pub footer_id: Id,
    /// Tab holding the footer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<Id>,
}

/// Payload of `createFootnote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFootnote {
    /// Where to insert the reference
    pub location: Location,
}

/// Payload of `insertPageBreak`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertPageBreak {
    /// Where to insert
    pub location: Location,
}

/// Payload of `insertSectionBreak`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSectionBreak {
    /// Where to insert; a newline is inserted first
    pub location: Location,
    /// How the new section starts
    pub section_type: SectionType,
}

/// Payload of `insertInlineImage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertInlineImage {
    /// Public http(s) URI, under 2 KiB
    pub uri: String,
    /// Where to insert
    pub location: Location,
    /// Display size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_size: Option<Size>,
}

/// Payload of `insertPerson`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertPerson {
    /// Person to mention
    pub person_properties: PersonProperties,
    /// Where to insert
    pub location: Location,
}

/// Person chip properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProperties {
    /// E-mail address
    pub email: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Payload of `insertDate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertDate {
    /// Date to insert
    pub date_element_properties: DateElementProperties,
    /// Where to insert
    pub location: Location,
}

/// Date chip properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateElementProperties {
    /// Point in time
    pub timestamp: DateTime<Utc>,
    /// Display format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    /// Locale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Payload of `addDocumentTab`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDocumentTab {
    /// Properties of the new tab
    pub tab_properties: TabProperties,
}

/// Tab properties used by tab requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabProperties {
    /// Tab id (updates only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<Id>,
    /// Title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Position among tabs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// Payload of `deleteTab`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTab {
    /// Tab to delete
    pub tab_id: Id,
}

/// Payload of `updateDocumentTabProperties`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentTabProperties {
    /// New values; `tab_id` selects the tab
    pub tab_properties: TabProperties,
    /// Comma separated field mask
    pub fields: String,
}
