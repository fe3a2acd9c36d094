//! Integration tests for the mock validation engine.

use docsync::model::{
    Block, Equation, HeaderFooterKind, InlineContent, Paragraph, SectionType, Segment, Table,
    TextRun,
};
use docsync::request::{
    AddDocumentTab, CreateFootnote, CreateHeaderFooter, CreateNamedRange, DeleteContentRange,
    DeleteTab, Id, InsertInlineImage, InsertPageBreak, InsertSectionBreak, InsertTable,
    InsertText, Location, Range, Request, TabProperties,
};
use docsync::{Document, MockEngine, MockOptions, ValidationErrorKind};

fn engine(text: &str) -> MockEngine {
    MockEngine::new(Document::with_body("d", Segment::from_paragraphs([text])))
}

fn insert(text: &str, index: u32) -> Request {
    Request::InsertText(InsertText {
        text: text.to_string(),
        location: Location::new(index),
    })
}

fn delete(start: u32, end: u32) -> Request {
    Request::DeleteContentRange(DeleteContentRange {
        range: Range::new(start, end),
    })
}

fn body_text(engine: &MockEngine) -> String {
    engine.get().tabs[0].body.plain_text()
}

#[test]
fn test_insert_text_shifts_end() {
    let mut engine = engine("Hello\n");
    engine.batch_update(&[insert(" World", 6)], None).unwrap();
    let doc = engine.get();
    assert_eq!(doc.tabs[0].body.plain_text(), "Hello World\n");
    assert_eq!(doc.tabs[0].body.end_index(), 13);
}

#[test]
fn test_delete_range_is_half_open() {
    let mut engine = engine("Hello World\n");
    engine.batch_update(&[delete(6, 12)], None).unwrap();
    let doc = engine.get();
    assert_eq!(doc.tabs[0].body.plain_text(), "Hello\n");
    assert_eq!(doc.tabs[0].body.end_index(), 7);

    // [6, 11) stops before the "d".
    let mut shorter = crate::engine("Hello World\n");
    shorter.batch_update(&[delete(6, 11)], None).unwrap();
    let doc = shorter.get();
    assert_eq!(doc.tabs[0].body.plain_text(), "Hellod\n");
    assert_eq!(doc.tabs[0].body.end_index(), 8);
}

#[test]
fn test_emoji_takes_two_units() {
    let mut engine = engine("Hello\n");
    engine.batch_update(&[insert("😀", 6)], None).unwrap();
    assert_eq!(engine.get().tabs[0].body.end_index(), 9);
}

#[test]
fn test_cell_final_newline_protected() {
    let mut body = Segment::from_paragraphs(["\n"]);
    body.add_table(Table::from_text(&[vec!["text\n"]]));
    body.add_paragraph(Paragraph::with_text("\n"));
    let mut engine = MockEngine::new(Document::with_body("d", body));

    let start = match &engine.get().tabs[0].body.content[1].block {
        Block::Table(table) => table.table_rows[0].table_cells[0].content[0].start_index,
        other => panic!("expected table, got {:?}", other),
    };
    assert_eq!(start, 5);

    let err = engine
        .batch_update(&[delete(start, start + 5)], None)
        .unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::CellFinalNewline { .. }));

    engine.batch_update(&[delete(start, start + 4)], None).unwrap();
    let Block::Table(table) = &engine.get().tabs[0].body.content[1].block else {
        panic!("table disappeared");
    };
    assert_eq!(table.table_rows[0].table_cells[0].plain_text(), "\n");
}

#[test]
fn test_stale_revision_leaves_document_unchanged() {
    let mut engine = engine("Hello\n");
    engine.batch_update(&[insert("!", 6)], None).unwrap();
    let before = engine.get();

    let err = engine
        .batch_update(&[insert("?", 1)], Some("mock-rev-0"))
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(engine.get(), before);
    assert_eq!(engine.revision_id(), "mock-rev-1");

    engine
        .batch_update(&[insert("?", 1)], Some("mock-rev-1"))
        .unwrap();
    assert_eq!(body_text(&engine), "?Hello!\n");
}

#[test]
fn test_batch_is_atomic() {
    let mut engine = engine("Hello\n");
    let before = engine.get();
    let err = engine
        .batch_update(&[insert("A", 1), insert("B", 2), delete(3, 50)], None)
        .unwrap_err();
    assert_eq!(err.request_index, Some(2));
    assert_eq!(engine.get(), before);
    assert_eq!(engine.revision_id(), "mock-rev-0");
}

#[test]
fn test_surrogate_split_rejected() {
    let mut engine = engine("a😀\n");
    let err = engine.batch_update(&[delete(2, 3)], None).unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::SurrogateSplit { .. }));

    engine.batch_update(&[delete(2, 4)], None).unwrap();
    assert_eq!(body_text(&engine), "a\n");
}

#[test]
fn test_insert_inside_surrogate_rejected() {
    let mut engine = engine("😀\n");
    let err = engine.batch_update(&[insert("x", 2)], None).unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::SurrogateSplit { index: 2 }));
}

#[test]
fn test_insert_table_and_fill_cell() {
    let mut engine = engine("Intro\n");
    let table = Request::InsertTable(InsertTable {
        rows: 1,
        columns: 2,
        location: Location::new(6),
    });
    engine.batch_update(&[table], None).unwrap();
    let doc = engine.get();
    let body = &doc.tabs[0].body;
    let Block::Table(table) = &body.content[1].block else {
        panic!("expected table after the intro paragraph");
    };
    assert_eq!(table.column_count(), 2);

    let cell = table.table_rows[0].table_cells[1].content[0].start_index;
    engine.batch_update(&[insert("x", cell)], None).unwrap();
    let Block::Table(table) = &engine.get().tabs[0].body.content[1].block else {
        panic!("table disappeared");
    };
    assert_eq!(table.table_rows[0].table_cells[1].plain_text(), "x\n");
}

#[test]
fn test_footnote_not_allowed_in_header() {
    let mut engine = engine("Body\n");
    let response = engine
        .batch_update(
            &[Request::CreateHeader(CreateHeaderFooter {
                kind: HeaderFooterKind::Default,
                section_break_location: None,
            })],
            None,
        )
        .unwrap();
    let header_id = response.replies[0].created_id().unwrap().to_string();

    let err = engine
        .batch_update(
            &[Request::CreateFootnote(CreateFootnote {
                location: Location::new(1).in_segment(Some(Id::from(header_id))),
            })],
            None,
        )
        .unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::ForbiddenInSegment { .. }));
}

#[test]
fn test_duplicate_header_rejected() {
    let mut engine = engine("Body\n");
    let create = Request::CreateHeader(CreateHeaderFooter {
        kind: HeaderFooterKind::Default,
        section_break_location: None,
    });
    engine.batch_update(&[create.clone()], None).unwrap();
    let err = engine.batch_update(&[create], None).unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::HeaderExists(_)));
}

#[test]
fn test_footnote_created_with_empty_segment() {
    let mut engine = engine("Body\n");
    let response = engine
        .batch_update(
            &[Request::CreateFootnote(CreateFootnote {
                location: Location::new(5),
            })],
            None,
        )
        .unwrap();
    let id = response.replies[0].created_id().unwrap().to_string();
    let doc = engine.get();
    assert_eq!(doc.tabs[0].footnotes[&id].plain_text(), "\n");
    assert_eq!(doc.tabs[0].body.end_index(), 7);
}

#[test]
fn test_named_range_name_length() {
    let mut engine = engine("Body\n");
    let err = engine
        .batch_update(
            &[Request::CreateNamedRange(CreateNamedRange {
                name: String::new(),
                range: Range::new(1, 3),
            })],
            None,
        )
        .unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::NameLength { len: 0 }));
}

#[test]
fn test_last_tab_cannot_be_deleted() {
    let mut engine = engine("Body\n");
    let err = engine
        .batch_update(
            &[Request::DeleteTab(DeleteTab {
                tab_id: Id::from("t.0"),
            })],
            None,
        )
        .unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::LastTab));

    engine
        .batch_update(
            &[
                Request::AddDocumentTab(AddDocumentTab {
                    tab_properties: TabProperties {
                        title: Some("Two".to_string()),
                        ..TabProperties::default()
                    },
                }),
                Request::DeleteTab(DeleteTab {
                    tab_id: Id::from("t.0"),
                }),
            ],
            None,
        )
        .unwrap();
    let doc = engine.get();
    assert_eq!(doc.tabs.len(), 1);
    assert_eq!(doc.tabs[0].title, "Two");
}

#[test]
fn test_image_uri_checked_unless_relaxed() {
    let image = Request::InsertInlineImage(InsertInlineImage {
        uri: "file:///tmp/cat.png".to_string(),
        location: Location::new(1),
        object_size: None,
    });

    let mut strict = engine("Body\n");
    let err = strict.batch_update(&[image.clone()], None).unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::InvalidField { field: "uri", .. }));

    let options = MockOptions::new().with_strict_uris(false);
    let mut relaxed = MockEngine::with_options(
        Document::with_body("d", Segment::from_paragraphs(["Body\n"])),
        options,
    );
    relaxed.batch_update(&[image], None).unwrap();
    assert_eq!(relaxed.get().tabs[0].body.end_index(), 7);
}

/// Body "A\n", a 1x1 table holding "x\n" at [3, 9), then "\n".
fn table_engine() -> MockEngine {
    let mut body = Segment::from_paragraphs(["A\n"]);
    body.add_table(Table::from_text(&[vec!["x\n"]]));
    body.add_paragraph(Paragraph::with_text("\n"));
    MockEngine::new(Document::with_body("d", body))
}

#[test]
fn test_newline_before_table_protected() {
    let mut engine = table_engine();
    let err = engine.batch_update(&[delete(2, 3)], None).unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::NewlineBeforeStructure { index: 2, kind: "table" }
    ));
}

#[test]
fn test_table_deleted_whole_or_not_at_all() {
    let mut engine = table_engine();
    let err = engine.batch_update(&[delete(4, 9)], None).unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::PartialStructure { kind: "table", index: 3 }
    ));

    engine.batch_update(&[delete(3, 9)], None).unwrap();
    let doc = engine.get();
    assert!(doc.tabs[0]
        .body
        .content
        .iter()
        .all(|e| !matches!(e.block, Block::Table(_))));
    assert_eq!(doc.tabs[0].body.plain_text(), "A\n\n");
}

#[test]
fn test_insert_at_table_end_marker_rejected() {
    let mut engine = table_engine();
    let err = engine.batch_update(&[insert("z", 8)], None).unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::TableMarker { marker: "end", index: 8 }
    ));
}

#[test]
fn test_equation_deleted_whole_or_not_at_all() {
    let mut p = Paragraph::new();
    p.add_run(TextRun::new("ab"));
    p.add_inline(InlineContent::Equation(Equation {
        content: "x+y".to_string(),
    }));
    p.add_run(TextRun::new("\n"));
    let mut body = Segment::default();
    body.add_paragraph(p);
    let mut engine = MockEngine::new(Document::with_body("d", body));

    let err = engine.batch_update(&[delete(4, 6)], None).unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::PartialStructure { kind: "equation", index: 3 }
    ));
    assert_eq!(err.kind.to_string(), "range partially covers an equation at index 3");

    engine.batch_update(&[delete(3, 6)], None).unwrap();
    assert_eq!(body_text(&engine), "ab\n");
}

#[test]
fn test_footnote_inside_footnote_rejected() {
    let mut engine = engine("Body\n");
    let response = engine
        .batch_update(
            &[Request::CreateFootnote(CreateFootnote {
                location: Location::new(5),
            })],
            None,
        )
        .unwrap();
    let footnote = response.replies[0].created_id().unwrap().to_string();

    let err = engine
        .batch_update(
            &[Request::CreateFootnote(CreateFootnote {
                location: Location::new(1).in_segment(Some(Id::from(footnote))),
            })],
            None,
        )
        .unwrap_err();
    assert!(matches!(err.kind, ValidationErrorKind::NestedFootnote));
    assert_eq!(err.kind.to_string(), "footnotes cannot be nested");
}

#[test]
fn test_image_not_allowed_in_footnote() {
    let mut engine = engine("Body\n");
    let response = engine
        .batch_update(
            &[Request::CreateFootnote(CreateFootnote {
                location: Location::new(5),
            })],
            None,
        )
        .unwrap();
    let footnote = response.replies[0].created_id().unwrap().to_string();

    let image = Request::InsertInlineImage(InsertInlineImage {
        uri: "https://example.com/cat.png".to_string(),
        location: Location::new(1).in_segment(Some(Id::from(footnote))),
        object_size: None,
    });
    let err = engine.batch_update(&[image], None).unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::ForbiddenInSegment { element: "inline image", .. }
    ));
}

#[test]
fn test_breaks_only_in_body_outside_tables() {
    let mut engine = table_engine();
    let response = engine
        .batch_update(
            &[Request::CreateHeader(CreateHeaderFooter {
                kind: HeaderFooterKind::Default,
                section_break_location: None,
            })],
            None,
        )
        .unwrap();
    let header = response.replies[0].created_id().unwrap().to_string();

    let err = engine
        .batch_update(
            &[Request::InsertPageBreak(InsertPageBreak {
                location: Location::new(1).in_segment(Some(Id::from(header))),
            })],
            None,
        )
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::ForbiddenInSegment { element: "page break", .. }
    ));

    // The cell content starts at 6.
    let err = engine
        .batch_update(
            &[Request::InsertSectionBreak(InsertSectionBreak {
                location: Location::new(6),
                section_type: SectionType::NextPage,
            })],
            None,
        )
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::ForbiddenInTable { element: "section break" }
    ));

    let err = engine
        .batch_update(
            &[Request::InsertPageBreak(InsertPageBreak {
                location: Location::new(6),
            })],
            None,
        )
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ValidationErrorKind::ForbiddenInTable { element: "page break" }
    ));
}
