//! Benchmarks for docsync indexing and reconciliation.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic documents with a table every few paragraphs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use docsync::model::{Paragraph, Segment, Table};
use docsync::{Document, ReconcileOptions, Reconciler};

/// Creates a synthetic document with the given number of paragraphs.
fn create_test_document(paragraph_count: usize, edited: bool) -> Document {
    let mut body = Segment::default();
    for i in 0..paragraph_count {
        let text = if edited && i % 7 == 3 {
            format!("Paragraph {} was rewritten for the benchmark run.\n", i + 1)
        } else {
            format!("Paragraph {} - benchmark content for docsync 😀.\n", i + 1)
        };
        body.add_paragraph(Paragraph::with_text(text));

        if i % 10 == 9 {
            let cell = if edited { "changed\n" } else { "cell\n" };
            body.add_table(Table::from_text(&[
                vec!["a\n", cell, "c\n"],
                vec!["d\n", "e\n", "f\n"],
            ]));
        }
    }
    body.add_paragraph(Paragraph::with_text("\n"));
    Document::with_body("bench", body)
}

/// Benchmark indexing at various sizes.
fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("indexing");

    for paragraph_count in [10, 100, 1000].iter() {
        let doc = create_test_document(*paragraph_count, false);

        group.bench_function(format!("{}_paragraphs", paragraph_count), |b| {
            b.iter(|| docsync::index(black_box(doc.clone())).unwrap());
        });
    }

    group.finish();
}

/// Benchmark reconciliation at various sizes.
fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for paragraph_count in [10, 100, 500].iter() {
        let base = create_test_document(*paragraph_count, false);
        let desired = create_test_document(*paragraph_count, true);

        group.bench_function(format!("{}_paragraphs", paragraph_count), |b| {
            b.iter(|| docsync::reconcile(black_box(&base), black_box(&desired)).unwrap());
        });

        let sequential = Reconciler::with_options(ReconcileOptions::new().sequential());
        group.bench_function(format!("{}_paragraphs_sequential", paragraph_count), |b| {
            b.iter(|| sequential.reconcile(black_box(&base), black_box(&desired)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark replaying a plan on the mock engine.
fn bench_verify(c: &mut Criterion) {
    let base = create_test_document(100, false);
    let desired = create_test_document(100, true);

    c.bench_function("verify_100_paragraphs", |b| {
        b.iter(|| {
            docsync::verify(black_box(&base), black_box(&desired), &ReconcileOptions::new())
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_indexing, bench_reconcile, bench_verify);
criterion_main!(benches);
