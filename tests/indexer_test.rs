//! Integration tests for the indexer.

use docsync::model::{
    Block, FootnoteReference, HeaderFooterKind, InlineContent, List, NamedRange, Paragraph,
    Segment, Table, TextRun,
};
use docsync::{index, Document, IndexError, IndexOptions, Indexer};

fn body_doc(paragraphs: &[&str]) -> Document {
    Document::with_body("d", Segment::from_paragraphs(paragraphs.iter().copied()))
}

#[test]
fn test_index_is_idempotent() {
    let mut body = Segment::from_paragraphs(["Intro\n"]);
    body.add_table(Table::from_text(&[vec!["a\n", "b\n"], vec!["c\n", "d\n"]]));
    body.add_paragraph(Paragraph::with_text("Tail 😀\n"));
    let once = index(Document::with_body("d", body)).unwrap();
    let twice = index(once.clone()).unwrap();
    assert_eq!(once, twice);
    assert!(Indexer::new().validate(&once).is_ok());
}

#[test]
fn test_surrogate_pair_counts_two_units() {
    let doc = index(body_doc(&["a😀\n"])).unwrap();
    let body = &doc.tabs[0].body;
    assert_eq!(body.content[0].start_index, 1);
    assert_eq!(body.content[0].end_index, 5);
    assert_eq!(body.end_index(), 5);
}

#[test]
fn test_embedded_newlines_split_paragraphs() {
    let doc = index(body_doc(&["one\ntwo\n"])).unwrap();
    let body = &doc.tabs[0].body;
    assert_eq!(body.content.len(), 2);
    assert_eq!(body.content[0].end_index, 5);
    assert_eq!(body.content[1].start_index, 5);
    assert_eq!(body.plain_text(), "one\ntwo\n");
}

#[test]
fn test_embedded_newline_rejected_without_splitting() {
    let indexer = Indexer::with_options(IndexOptions::new().with_split_newlines(false));
    let err = indexer.index(body_doc(&["one\ntwo\n"])).unwrap_err();
    assert!(matches!(err, IndexError::EmbeddedNewline { .. }));
}

#[test]
fn test_segments_are_independent_index_spaces() {
    let mut doc = body_doc(&["Body text\n"]);
    doc.tabs[0].set_header(
        HeaderFooterKind::Default,
        "kix.h1",
        Segment::from_paragraphs(["Head\n"]),
    );
    let doc = index(doc).unwrap();
    let header = &doc.tabs[0].headers[&HeaderFooterKind::Default].segment;
    assert_eq!(header.content[0].start_index, 1);
    assert_eq!(header.end_index(), 6);
}

#[test]
fn test_missing_footnote_rejected() {
    let mut p = Paragraph::with_text("See\n");
    p.add_inline(InlineContent::FootnoteReference(FootnoteReference {
        footnote_id: "kix.fn9".to_string(),
    }));
    let mut body = Segment::default();
    body.add_paragraph(p);
    let err = Indexer::new().index(Document::with_body("d", body)).unwrap_err();
    assert!(matches!(err, IndexError::MissingFootnote { ref footnote_id, .. } if footnote_id == "kix.fn9"));
}

#[test]
fn test_unknown_list_rejected() {
    let mut body = Segment::default();
    body.add_paragraph(Paragraph::with_text("item\n").with_bullet("kix.list", 0));
    let doc = Document::with_body("d", body);
    let err = Indexer::new().index(doc.clone()).unwrap_err();
    assert!(matches!(err, IndexError::UnknownList { .. }));

    let mut doc = doc;
    doc.tabs[0].lists.insert("kix.list".to_string(), List::default());
    assert!(index(doc).is_ok());
}

#[test]
fn test_named_range_bounds_checked() {
    let mut doc = body_doc(&["Hi\n"]);
    doc.tabs[0].named_ranges.push(NamedRange {
        named_range_id: "kix.r1".to_string(),
        name: "greeting".to_string(),
        segment_id: None,
        start_index: 1,
        end_index: 9,
    });
    let err = Indexer::new().index(doc).unwrap_err();
    assert!(matches!(err, IndexError::NamedRangeOutOfBounds { end: 9, .. }));
}

#[test]
fn test_runs_keep_styles_after_indexing() {
    let mut body = Segment::default();
    body.add_paragraph(Paragraph::from_runs(vec![
        TextRun::new("plain "),
        TextRun::styled("bold\n", docsync::TextStyle::new().with_bold(true)),
    ]));
    let doc = index(Document::with_body("d", body)).unwrap();
    match &doc.tabs[0].body.content[0].block {
        Block::Paragraph(p) => {
            assert_eq!(p.elements.len(), 2);
            assert_eq!(p.elements[1].start_index, 7);
            assert_eq!(p.elements[1].end_index, 12);
        }
        other => panic!("expected paragraph, got {:?}", other),
    }
}

#[test]
fn test_parallel_and_sequential_agree() {
    let mut doc = body_doc(&["first tab\n"]);
    let mut second = docsync::Tab::new("t.1", "Two");
    second.body = Segment::from_paragraphs(["second tab\n"]);
    doc.tabs.push(second);

    let parallel = Indexer::new().index(doc.clone()).unwrap();
    let sequential = Indexer::with_options(IndexOptions::new().sequential())
        .index(doc)
        .unwrap();
    assert_eq!(parallel, sequential);
}
