//! Integration tests for reconciliation, checked by replaying on the mock engine.

use docsync::model::{
    Block, FootnoteReference, HeaderFooterKind, HorizontalRule, InlineContent, InlineImage, List,
    NamedRange, Paragraph, ParagraphStyle, Segment, Tab, Table, TextRun, TextStyle,
};
use docsync::model::{Alignment, NamedStyleType};
use docsync::{
    reconcile, verify, Document, Error, ReconcileOptions, Reconciler, Request, UnsupportedKind,
};

fn doc(paragraphs: &[&str]) -> Document {
    Document::with_body("d", Segment::from_paragraphs(paragraphs.iter().copied()))
}

fn with_body(body: Segment) -> Document {
    Document::with_body("d", body)
}

fn assert_round_trip(base: &Document, desired: &Document) {
    for options in [ReconcileOptions::new(), ReconcileOptions::new().sequential()] {
        let verification = verify(base, desired, &options).unwrap();
        assert!(
            verification.reconciliation.unsupported.is_empty(),
            "unsupported: {:?}",
            verification.reconciliation.unsupported
        );
        assert!(
            verification.is_equivalent(),
            "mismatches: {:?}\nbatches: {:#?}",
            verification.mismatches,
            verification.reconciliation.batches
        );
    }
}

fn table_body(rows: &[Vec<&str>]) -> Segment {
    let mut body = Segment::from_paragraphs(["Before\n"]);
    body.add_table(Table::from_text(rows));
    body.add_paragraph(Paragraph::with_text("After\n"));
    body
}

#[test]
fn test_identical_documents_yield_no_batches() {
    let mut body = table_body(&[vec!["a\n", "b\n"]]);
    body.add_paragraph(Paragraph::heading("Title\n", 1));
    let d = with_body(body);
    let plan = reconcile(&d, &d).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.request_count(), 0);
}

#[test]
fn test_stale_indices_are_ignored() {
    let d = doc(&["Hello\n"]);
    let mut stale = d.clone();
    stale.tabs[0].body.content[0].start_index = 40;
    stale.tabs[0].body.content[0].end_index = 3;
    assert!(reconcile(&d, &stale).unwrap().is_empty());
}

#[test]
fn test_append_text_is_one_insert() {
    let plan = reconcile(&doc(&["Hello\n"]), &doc(&["Hello World\n"])).unwrap();
    assert_eq!(plan.batches.len(), 1);
    match &plan.batches[0].requests[..] {
        [Request::InsertText(insert)] => {
            assert_eq!(insert.text, " World");
            assert_eq!(insert.location.index, 6);
        }
        other => panic!("unexpected requests: {:?}", other),
    }
}

#[test]
fn test_text_edits_round_trip() {
    assert_round_trip(&doc(&["Hello World\n"]), &doc(&["Hello\n"]));
    assert_round_trip(&doc(&["The quick fox\n"]), &doc(&["The slow brown fox\n"]));
    assert_round_trip(&doc(&["one\n", "two\n", "three\n"]), &doc(&["one\n", "three\n"]));
    assert_round_trip(&doc(&["one\n"]), &doc(&["zero\n", "one\n", "two\n"]));
    assert_round_trip(&doc(&["a😀b\n"]), &doc(&["a😀😀b\n"]));
}

#[test]
fn test_text_style_round_trip() {
    let base = doc(&["Hello world\n"]);
    let desired = with_body(Segment::from_elements(vec![docsync::StructuralElement::paragraph(
        Paragraph::from_runs(vec![
            TextRun::new("Hello "),
            TextRun::styled("world", TextStyle::new().with_bold(true).with_italic(true)),
            TextRun::new("\n"),
        ]),
    )]));
    assert_round_trip(&base, &desired);
    assert_round_trip(&desired, &base);
}

#[test]
fn test_paragraph_style_round_trip() {
    let base = doc(&["Title\n", "Body\n"]);
    let mut body = Segment::default();
    body.add_paragraph(Paragraph::with_text("Title\n").with_style(ParagraphStyle::named(
        NamedStyleType::Heading1,
    )));
    body.add_paragraph(
        Paragraph::with_text("Body\n")
            .with_style(ParagraphStyle::new().with_alignment(Alignment::Center)),
    );
    assert_round_trip(&base, &with_body(body));
}

#[test]
fn test_bullets_round_trip() {
    let base = doc(&["intro\n", "first\n", "second\n"]);
    let mut body = Segment::default();
    body.add_paragraph(Paragraph::with_text("intro\n"));
    body.add_paragraph(Paragraph::with_text("first\n").with_bullet("kix.list1", 0));
    body.add_paragraph(Paragraph::with_text("second\n").with_bullet("kix.list1", 1));
    let mut desired = with_body(body);
    desired.tabs[0]
        .lists
        .insert("kix.list1".to_string(), List::default());
    assert_round_trip(&base, &desired);
    assert_round_trip(&desired, &base);
}

#[test]
fn test_table_cell_edit_round_trip() {
    let base = with_body(table_body(&[vec!["a\n", "b\n"], vec!["c\n", "d\n"]]));
    let desired = with_body(table_body(&[vec!["a\n", "bee\n"], vec!["c\n", "\n"]]));
    assert_round_trip(&base, &desired);
}

#[test]
fn test_table_rows_and_columns_round_trip() {
    let base = with_body(table_body(&[vec!["a\n", "b\n"], vec!["c\n", "d\n"]]));
    let more_rows = with_body(table_body(&[
        vec!["a\n", "b\n"],
        vec!["x\n", "y\n"],
        vec!["c\n", "d\n"],
    ]));
    let more_columns = with_body(table_body(&[
        vec!["a\n", "b\n", "e\n"],
        vec!["c\n", "d\n", "f\n"],
    ]));
    assert_round_trip(&base, &more_rows);
    assert_round_trip(&more_rows, &base);
    assert_round_trip(&base, &more_columns);
    assert_round_trip(&more_columns, &base);
}

#[test]
fn test_table_insert_and_delete_round_trip() {
    let base = doc(&["Before\n", "After\n"]);
    let desired = with_body(table_body(&[vec!["a\n", "b\n"], vec!["c\n", "d\n"]]));
    assert_round_trip(&base, &desired);
    assert_round_trip(&desired, &base);
}

#[test]
fn test_merged_cells_round_trip() {
    let base = with_body(table_body(&[vec!["a\n", "b\n"], vec!["c\n", "d\n"]]));
    let mut body = Segment::from_paragraphs(["Before\n"]);
    body.add_table(Table::from_text(&[vec!["a\n", "b\n"], vec!["c\n", "d\n"]]).merge(0, 0, 1, 2));
    body.add_paragraph(Paragraph::with_text("After\n"));
    let desired = with_body(body);
    assert_round_trip(&base, &desired);
}

#[test]
fn test_header_and_footer_round_trip() {
    let base = doc(&["Body\n"]);
    let mut desired = base.clone();
    desired.tabs[0].set_header(
        HeaderFooterKind::Default,
        "kix.h1",
        Segment::from_paragraphs(["Page header\n"]),
    );
    desired.tabs[0].set_footer(
        HeaderFooterKind::Default,
        "kix.f1",
        Segment::from_paragraphs(["Page footer\n"]),
    );
    assert_round_trip(&base, &desired);
    assert_round_trip(&desired, &base);

    let mut edited = desired.clone();
    edited.tabs[0].set_header(
        HeaderFooterKind::Default,
        "kix.h1",
        Segment::from_paragraphs(["New header\n"]),
    );
    assert_round_trip(&desired, &edited);
}

#[test]
fn test_footnote_round_trip() {
    let base = doc(&["See here\n"]);
    let mut p = Paragraph::with_text("See here\n");
    p.add_inline(InlineContent::FootnoteReference(FootnoteReference {
        footnote_id: "kix.fn1".to_string(),
    }));
    let mut body = Segment::default();
    body.add_paragraph(p);
    let mut desired = with_body(body);
    desired.tabs[0]
        .footnotes
        .insert("kix.fn1".to_string(), Segment::from_paragraphs(["A note\n"]));

    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(plan.batches.len(), 2);
    assert!(plan.batches[1].has_deferred());
    assert_round_trip(&base, &desired);
    assert_round_trip(&desired, &base);
}

#[test]
fn test_new_and_removed_tabs_round_trip() {
    let base = doc(&["First\n"]);
    let mut desired = base.clone();
    let mut tab = Tab::new("t.new", "Notes");
    tab.body = Segment::from_paragraphs(["Tab body\n"]);
    tab.set_header(
        HeaderFooterKind::Default,
        "kix.h9",
        Segment::from_paragraphs(["Tab header\n"]),
    );
    desired.tabs.push(tab);
    assert_round_trip(&base, &desired);
    assert_round_trip(&desired, &base);

    let mut renamed = desired.clone();
    renamed.tabs[0].title = "Renamed".to_string();
    assert_round_trip(&desired, &renamed);
}

#[test]
fn test_named_ranges_round_trip() {
    let base = doc(&["Hello world\n"]);
    let mut desired = doc(&["Hello big world\n"]);
    desired.tabs[0].named_ranges.push(NamedRange {
        named_range_id: String::new(),
        name: "target".to_string(),
        segment_id: None,
        start_index: 11,
        end_index: 16,
    });
    assert_round_trip(&base, &desired);
    assert_round_trip(&desired, &base);
}

#[test]
fn test_image_round_trip() {
    let base = doc(&["Picture:\n"]);
    let mut p = Paragraph::with_text("Picture:\n");
    p.add_inline(InlineContent::InlineImage(InlineImage {
        object_id: None,
        uri: Some("https://example.com/cat.png".to_string()),
        size: None,
    }));
    let mut body = Segment::default();
    body.add_paragraph(p);
    assert_round_trip(&base, &with_body(body));
}

#[test]
fn test_horizontal_rule_creation_reported() {
    let base = doc(&["Above\n", "Below\n"]);
    let mut body = Segment::from_paragraphs(["Above\n"]);
    body.add_block(Block::HorizontalRule(HorizontalRule {}));
    body.add_paragraph(Paragraph::with_text("Below\n"));
    let desired = with_body(body);

    let plan = reconcile(&base, &desired).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.unsupported.len(), 1);
    assert_eq!(plan.unsupported[0].kind, UnsupportedKind::HorizontalRuleCreation);
    assert_eq!(plan.unsupported[0].segment.as_deref(), Some("body"));

    let strict = Reconciler::with_options(ReconcileOptions::new().strict());
    let err = strict.reconcile(&base, &desired).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn test_stripped_character_reported() {
    let base = doc(&["ab\n"]);
    let desired = doc(&["a\u{1}b\n"]);

    let plan = reconcile(&base, &desired).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.unsupported.len(), 1);
    assert_eq!(
        plan.unsupported[0].kind,
        UnsupportedKind::StrippedCharacter('\u{1}')
    );

    let strict = Reconciler::with_options(ReconcileOptions::new().strict());
    let err = strict.reconcile(&base, &desired).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn test_carriage_return_leaves_segment_alone() {
    let base = doc(&["one\n", "two\n"]);
    let desired = doc(&["one\r\n", "three\n"]);

    let verification = verify(&base, &desired, &ReconcileOptions::new()).unwrap();
    assert_eq!(
        verification.reconciliation.unsupported[0].kind,
        UnsupportedKind::StrippedCharacter('\r')
    );
    assert_eq!(verification.document.tabs[0].body.plain_text(), "one\ntwo\n");
}

#[test]
fn test_unsupported_segment_left_alone_while_others_sync() {
    let mut base = doc(&["Above\n", "Below\n"]);
    base.tabs[0].set_header(
        HeaderFooterKind::Default,
        "kix.h1",
        Segment::from_paragraphs(["Old\n"]),
    );
    let mut body = Segment::from_paragraphs(["Above\n"]);
    body.add_block(Block::HorizontalRule(HorizontalRule {}));
    body.add_paragraph(Paragraph::with_text("Below\n"));
    let mut desired = with_body(body);
    desired.tabs[0].set_header(
        HeaderFooterKind::Default,
        "kix.h1",
        Segment::from_paragraphs(["New\n"]),
    );

    let verification = verify(&base, &desired, &ReconcileOptions::new()).unwrap();
    assert_eq!(verification.reconciliation.unsupported.len(), 1);
    let header = &verification.document.tabs[0].headers[&HeaderFooterKind::Default];
    assert_eq!(header.segment.plain_text(), "New\n");
    assert_eq!(verification.document.tabs[0].body.plain_text(), "Above\nBelow\n");
}

#[test]
fn test_tab_reorder_reported() {
    let mut base = doc(&["one\n"]);
    base.tabs.push(Tab::new("t.1", "Two"));
    base.tabs[1].body = Segment::from_paragraphs(["two\n"]);
    let mut desired = base.clone();
    desired.tabs.swap(0, 1);

    let plan = reconcile(&base, &desired).unwrap();
    assert!(plan
        .unsupported
        .iter()
        .any(|u| u.kind == UnsupportedKind::TabReorder));
}

#[test]
fn test_comment_creation_reported() {
    let base = doc(&["Text\n"]);
    let mut desired = base.clone();
    desired.comments.push(docsync::model::Comment {
        comment_id: None,
        content: "Looks good".to_string(),
        quoted_text: Some("Text".to_string()),
    });
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(plan.unsupported[0].kind, UnsupportedKind::CommentCreation);
}
