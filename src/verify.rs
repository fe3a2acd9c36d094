//! Document equivalence and round-trip verification.
//!
//! Two documents are equivalent when every tab holds the same content with
//! the same explicit styles. Server-assigned ids, inherited style values,
//! styles of newline characters and inline elements, list identity and the
//! section type of section breaks are not compared. Footnotes are matched in
//! the order of their references, named ranges as a multiset.

use crate::error::Result;
use crate::indexer::Indexer;
use crate::mock::{MockEngine, MockOptions};
use crate::model::{
    Block, Document, InlineContent, NamedRange, ParagraphStyle, Segment, SegmentKey,
    StructuralElement, StyleFields, Tab, TextStyle,
};
use crate::reconcile::{ReconcileOptions, Reconciler, Reconciliation};
use crate::transport::{execute, ExecuteOptions};
use std::fmt;

/// One difference between two documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Where the difference was found, e.g. `tab 0 body, element 3`
    pub path: String,

    /// What differs
    pub detail: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.detail)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Char(char, TextStyle),
    Inline(String),
    End {
        style: ParagraphStyle,
        nesting: Option<u32>,
    },
    Table {
        rows: usize,
        columns: usize,
        merges: Vec<(usize, usize, u32, u32)>,
    },
    CellStart,
    TableEnd,
    Block(&'static str),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Char(c, _) => format!("{:?}", c),
            Token::Inline(name) => name.clone(),
            Token::End { .. } => "paragraph end".to_string(),
            Token::Table { rows, columns, .. } => format!("{}x{} table", rows, columns),
            Token::CellStart => "cell start".to_string(),
            Token::TableEnd => "table end".to_string(),
            Token::Block(name) => (*name).to_string(),
        }
    }
}

fn inline_token(content: &InlineContent) -> String {
    match content {
        InlineContent::InlineImage(image) => {
            format!("image {}", image.uri.as_deref().unwrap_or_default())
        }
        InlineContent::Person(person) => format!("person {}", person.email),
        InlineContent::Date(date) => format!("date {}", date.timestamp.to_rfc3339()),
        InlineContent::Equation(eq) => format!("equation {}", eq.content),
        other => other.kind_name().to_string(),
    }
}

fn tokens(content: &[StructuralElement], out: &mut Vec<Token>, footnotes: &mut Vec<String>) {
    for element in content {
        match &element.block {
            Block::Paragraph(p) => {
                for e in &p.elements {
                    match &e.content {
                        InlineContent::TextRun(run) => {
                            let style = run.text_style.explicit();
                            out.extend(
                                run.content
                                    .chars()
                                    .filter(|c| *c != '\n')
                                    .map(|c| Token::Char(c, style.clone())),
                            );
                        }
                        InlineContent::FootnoteReference(r) => {
                            footnotes.push(r.footnote_id.clone());
                            out.push(Token::Inline("footnote".to_string()));
                        }
                        other => out.push(Token::Inline(inline_token(other))),
                    }
                }
                out.push(Token::End {
                    style: p.paragraph_style.explicit(),
                    nesting: p.bullet.as_ref().map(|b| b.nesting_level),
                });
            }
            Block::Table(table) => {
                let mut merges = Vec::new();
                for (r, row) in table.table_rows.iter().enumerate() {
                    for (c, cell) in row.table_cells.iter().enumerate() {
                        if cell.is_merge_head() {
                            let style = cell.table_cell_style;
                            merges.push((r, c, style.row_span, style.column_span));
                        }
                    }
                }
                out.push(Token::Table {
                    rows: table.row_count(),
                    columns: table.column_count(),
                    merges,
                });
                for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                    out.push(Token::CellStart);
                    tokens(&cell.content, out, footnotes);
                }
                out.push(Token::TableEnd);
            }
            other => out.push(Token::Block(other.kind_name())),
        }
    }
}

fn compare_segments(
    path: &str,
    actual: &Segment,
    expected: &Segment,
    mismatches: &mut Vec<Mismatch>,
) -> (Vec<String>, Vec<String>) {
    let (mut a, mut b) = (Vec::new(), Vec::new());
    let (mut a_notes, mut b_notes) = (Vec::new(), Vec::new());
    tokens(&actual.content, &mut a, &mut a_notes);
    tokens(&expected.content, &mut b, &mut b_notes);

    if let Some(k) = (0..a.len().min(b.len())).find(|&k| a[k] != b[k]) {
        let detail = match (&a[k], &b[k]) {
            (Token::Char(x, _), Token::Char(y, _)) if x == y => {
                format!("text style of {:?} differs", x)
            }
            (Token::End { .. }, Token::End { .. }) => {
                "paragraph style or list nesting differs".to_string()
            }
            (x, y) => format!("found {}, expected {}", x.describe(), y.describe()),
        };
        mismatches.push(Mismatch {
            path: format!("{}, position {}", path, k),
            detail,
        });
    } else if a.len() != b.len() {
        mismatches.push(Mismatch {
            path: path.to_string(),
            detail: format!("{} items, expected {}", a.len(), b.len()),
        });
    }
    (a_notes, b_notes)
}

/// Named range identity with the segment id replaced by a stable label.
fn range_keys(tab: &Tab, footnote_order: &[String]) -> Vec<(String, String, u32, u32)> {
    let mut keys: Vec<_> = tab
        .named_ranges
        .iter()
        .map(|r: &NamedRange| {
            let label = match tab.segment_key(r.segment_id.as_deref()) {
                Some(SegmentKey::Footnote(id)) => match footnote_order.iter().position(|f| *f == id) {
                    Some(n) => format!("footnote #{}", n),
                    None => format!("footnote {}", id),
                },
                Some(key) => key.to_string(),
                None => format!("segment {}", r.segment_id.as_deref().unwrap_or_default()),
            };
            (label, r.name.clone(), r.start_index, r.end_index)
        })
        .collect();
    keys.sort();
    keys
}

fn compare_tabs(n: usize, actual: &Tab, expected: &Tab, mismatches: &mut Vec<Mismatch>) {
    if actual.title != expected.title {
        mismatches.push(Mismatch {
            path: format!("tab {}", n),
            detail: format!("title {:?}, expected {:?}", actual.title, expected.title),
        });
    }
    let (a_notes, b_notes) = compare_segments(
        &format!("tab {} body", n),
        &actual.body,
        &expected.body,
        mismatches,
    );

    for (label, a_map, b_map) in [
        ("header", &actual.headers, &expected.headers),
        ("footer", &actual.footers, &expected.footers),
    ] {
        let kinds: std::collections::BTreeSet<_> = a_map.keys().chain(b_map.keys()).collect();
        for kind in kinds {
            let path = format!("tab {} {} {}", n, kind.as_str(), label);
            match (a_map.get(kind), b_map.get(kind)) {
                (Some(a), Some(b)) => {
                    compare_segments(&path, &a.segment, &b.segment, mismatches);
                }
                (Some(_), None) => mismatches.push(Mismatch {
                    path,
                    detail: "unexpected".to_string(),
                }),
                (None, _) => mismatches.push(Mismatch {
                    path,
                    detail: "missing".to_string(),
                }),
            }
        }
    }

    for (k, (a, b)) in a_notes.iter().zip(&b_notes).enumerate() {
        let path = format!("tab {} footnote #{}", n, k);
        match (actual.footnotes.get(a), expected.footnotes.get(b)) {
            (Some(x), Some(y)) => {
                compare_segments(&path, x, y, mismatches);
            }
            _ => mismatches.push(Mismatch {
                path,
                detail: "footnote segment missing".to_string(),
            }),
        }
    }

    if range_keys(actual, &a_notes) != range_keys(expected, &b_notes) {
        mismatches.push(Mismatch {
            path: format!("tab {} named ranges", n),
            detail: "named ranges differ".to_string(),
        });
    }
}

/// Compare two indexed documents; an empty result means equivalent.
pub fn compare(actual: &Document, expected: &Document) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    if actual.tabs.len() != expected.tabs.len() {
        mismatches.push(Mismatch {
            path: "document".to_string(),
            detail: format!(
                "{} tabs, expected {}",
                actual.tabs.len(),
                expected.tabs.len()
            ),
        });
    }
    for (n, (a, b)) in actual.tabs.iter().zip(&expected.tabs).enumerate() {
        compare_tabs(n, a, b, &mut mismatches);
    }
    mismatches
}

/// Check whether two documents are equivalent.
pub fn equivalent(actual: &Document, expected: &Document) -> bool {
    compare(actual, expected).is_empty()
}

/// Result of a round trip.
#[derive(Debug, Clone)]
pub struct Verification {
    /// What the reconciler produced
    pub reconciliation: Reconciliation,

    /// Document held by the engine after the batches ran
    pub document: Document,

    /// Differences from the desired document
    pub mismatches: Vec<Mismatch>,
}

impl Verification {
    /// Check whether the replayed document matches.
    pub fn is_equivalent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Reconcile `base` into `desired`, replay the batches on a mock engine
/// holding `base` and compare the outcome with `desired`.
///
/// Changes reported as unsupported are not expected to round-trip, so a
/// lenient reconciliation with skipped changes usually yields mismatches.
pub fn verify(base: &Document, desired: &Document, options: &ReconcileOptions) -> Result<Verification> {
    verify_with(base, desired, options, MockOptions::default())
}

/// [`verify`] with custom engine options.
pub fn verify_with(
    base: &Document,
    desired: &Document,
    options: &ReconcileOptions,
    mock_options: MockOptions,
) -> Result<Verification> {
    let reconciliation = Reconciler::with_options(options.clone()).reconcile(base, desired)?;
    let mut engine = MockEngine::with_options(base.clone(), mock_options);
    let revision = engine.revision_id();
    execute(
        &mut engine,
        &reconciliation.batches,
        &ExecuteOptions::new().with_required_revision(revision),
    )?;

    let document = engine.get();
    let expected = Indexer::new().index(desired.clone())?;
    let mismatches = compare(&document, &expected);
    for mismatch in &mismatches {
        log::debug!("mismatch at {}", mismatch);
    }
    Ok(Verification {
        reconciliation,
        document,
        mismatches,
    })
}
