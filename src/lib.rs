//! # docsync
//!
//! Reconcile edited document snapshots into ordered batches of remote edit
//! operations.
//!
//! A document service addresses content by UTF-16 offsets and accepts edits
//! as `batchUpdate` requests. Given the snapshot the service holds (the base)
//! and the snapshot you want (the desired), this library computes the
//! requests that turn one into the other, and ships an in-memory engine that
//! validates and applies them the way the service would.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docsync::{read_document, reconcile, MockEngine};
//!
//! fn main() -> docsync::Result<()> {
//!     let base = read_document("base.json")?;
//!     let desired = read_document("desired.json")?;
//!
//!     let plan = reconcile(&base, &desired)?;
//!     let mut engine = MockEngine::new(base);
//!     docsync::execute(&mut engine, &plan.batches, &Default::default())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **UTF-16 indexing**: canonical indices for every element of every segment
//! - **Minimal edits**: character-level alignment with table, style, list and
//!   merge passes
//! - **Deferred ids**: requests that target created tabs, headers and
//!   footnotes are chained across batches
//! - **Mock engine**: atomic batches, revision checks, structural rules
//! - **Parallel processing**: uses Rayon across tabs and segments

pub mod error;
pub mod indexer;
pub mod json;
pub mod mock;
pub mod model;
pub mod reconcile;
pub mod request;
pub mod text;
pub mod transport;
pub mod verify;

// Re-export commonly used types
pub use error::{Error, Result};
pub use indexer::{IndexError, IndexOptions, Indexer};
pub use json::{batches_to_json, document_from_json, document_to_json, read_document, JsonFormat};
pub use mock::{MockEngine, MockOptions, ValidationError, ValidationErrorKind};
pub use model::{
    Block, Document, HeaderFooterKind, InlineContent, NamedRange, Paragraph, ParagraphStyle,
    Segment, SegmentKey, StructuralElement, Tab, Table, TextRun, TextStyle,
};
pub use reconcile::{
    reconcile, ErrorMode, ReconcileOptions, Reconciler, Reconciliation, Unsupported,
    UnsupportedKind,
};
pub use request::{Batch, BatchResponse, DeferredRef, Id, Location, Range, Reply, Request};
pub use transport::{execute, ExecuteOptions, Execution, Transport};
pub use verify::{compare, equivalent, verify, Mismatch, Verification};

/// Index a document with default options.
///
/// # Example
///
/// ```
/// use docsync::{index, Document, Segment};
///
/// let doc = Document::with_body("d", Segment::from_paragraphs(["Hi\n"]));
/// let doc = index(doc).unwrap();
/// assert_eq!(doc.tabs[0].body.end_index(), 4);
/// ```
pub fn index(document: Document) -> Result<Document> {
    Ok(indexer::index(document)?)
}

/// Reconcile two snapshot files and return the batches.
///
/// # Example
///
/// ```no_run
/// let plan = docsync::reconcile_files("base.json", "desired.json").unwrap();
/// println!("{} batches", plan.batches.len());
/// ```
pub fn reconcile_files<P: AsRef<std::path::Path>>(base: P, desired: P) -> Result<Reconciliation> {
    let base = read_document(base)?;
    let desired = read_document(desired)?;
    reconcile(&base, &desired)
}

/// Builder for reconciling and replaying documents.
///
/// # Example
///
/// ```no_run
/// use docsync::{read_document, DocSync};
///
/// let base = read_document("base.json")?;
/// let desired = read_document("desired.json")?;
/// let verification = DocSync::new().strict().sequential().verify(&base, &desired)?;
/// assert!(verification.is_equivalent());
/// # Ok::<(), docsync::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocSync {
    reconcile_options: ReconcileOptions,
    mock_options: MockOptions,
}

impl DocSync {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on unsupported changes.
    pub fn strict(mut self) -> Self {
        self.reconcile_options = self.reconcile_options.strict();
        self
    }

    /// Disable parallel planning.
    pub fn sequential(mut self) -> Self {
        self.reconcile_options = self.reconcile_options.sequential();
        self
    }

    /// Set reconcile options.
    pub fn with_reconcile_options(mut self, options: ReconcileOptions) -> Self {
        self.reconcile_options = options;
        self
    }

    /// Set mock engine options used by [`DocSync::verify`].
    pub fn with_mock_options(mut self, options: MockOptions) -> Self {
        self.mock_options = options;
        self
    }

    /// Compute the batches turning `base` into `desired`.
    pub fn reconcile(&self, base: &Document, desired: &Document) -> Result<Reconciliation> {
        Reconciler::with_options(self.reconcile_options.clone()).reconcile(base, desired)
    }

    /// Reconcile and replay on a mock engine.
    pub fn verify(&self, base: &Document, desired: &Document) -> Result<Verification> {
        verify::verify_with(
            base,
            desired,
            &self.reconcile_options,
            self.mock_options.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let sync = DocSync::new().strict().sequential();
        assert_eq!(sync.reconcile_options.error_mode, ErrorMode::Strict);
        assert!(!sync.reconcile_options.parallel);
    }

    #[test]
    fn test_verify_text_edit() {
        let base = Document::with_body("d", Segment::from_paragraphs(["Hello\n"]));
        let desired = Document::with_body("d", Segment::from_paragraphs(["Hello World\n"]));
        let verification = DocSync::new().verify(&base, &desired).unwrap();
        assert!(verification.is_equivalent(), "{:?}", verification.mismatches);
        assert_eq!(verification.reconciliation.request_count(), 1);
    }
}
