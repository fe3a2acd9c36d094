//! Document reconciliation.
//!
//! [`Reconciler::reconcile`] diffs a base snapshot against a desired snapshot
//! and returns the ordered batches that turn one into the other:
//!
//! 1. structure: tab deletion and creation, title updates, headers and
//!    footers of existing tabs;
//! 2. content: named range cleanup, segment edits, footnote creation and the
//!    bodies of new tabs;
//! 3. content of the segments created by the first two batches.
//!
//! Empty batches are dropped, so identical documents yield no batches.
//! Requests that depend on a server-assigned id carry a deferred reference
//! to the request that creates it.

mod atoms;
mod diff;
mod named_range;
mod plan;
mod realize;
mod style;
mod table;

use crate::error::{Error, Result};
use crate::indexer::{IndexOptions, Indexer};
use crate::model::Document;
use crate::request::Batch;
use std::fmt;

/// How changes the remote API cannot express are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Fail with [`Error::Unsupported`]
    Strict,
    /// Leave the affected segment untouched and report the change
    #[default]
    Lenient,
}

/// Options for reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Handling of unsupported changes
    pub error_mode: ErrorMode,

    /// Plan segments in parallel
    pub parallel: bool,

    /// Largest alignment grid computed exactly; larger changes are
    /// replaced wholesale
    pub max_lcs_cells: usize,
}

impl ReconcileOptions {
    /// Create new reconcile options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail on unsupported changes.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Enable or disable parallel planning.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel planning.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the alignment grid limit.
    pub fn with_max_lcs_cells(mut self, cells: usize) -> Self {
        self.max_lcs_cells = cells;
        self
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            parallel: true,
            max_lcs_cells: 4_000_000,
        }
    }
}

/// Output of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Batches to apply in order
    pub batches: Vec<Batch>,

    /// Changes that were left out
    pub unsupported: Vec<Unsupported>,
}

impl Reconciliation {
    /// Check whether there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total number of requests over all batches.
    pub fn request_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

/// A change the remote API cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsupported {
    /// What was left out
    pub kind: UnsupportedKind,

    /// Tab holding the change, if it is tab-scoped
    pub tab_id: Option<String>,

    /// Segment holding the change, if it is segment-scoped
    pub segment: Option<String>,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match (&self.tab_id, &self.segment) {
            (Some(tab), Some(segment)) => write!(f, " ({} of tab {})", segment, tab),
            (Some(tab), None) => write!(f, " (tab {})", tab),
            (None, Some(segment)) => write!(f, " ({})", segment),
            (None, None) => Ok(()),
        }
    }
}

/// Kinds of unsupported changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedKind {
    HorizontalRuleCreation,
    HorizontalRuleDeletion,
    TableOfContentsCreation,
    EquationCreation,
    AutoTextCreation,
    ColumnBreakCreation,
    /// An inline image with no source URI
    ImageWithoutUri,
    /// An element the target segment does not allow
    ForbiddenInSegment {
        element: &'static str,
    },
    /// Existing tabs appear in a different order
    TabReorder,
    CommentCreation,
    CommentDeletion,
    /// A list item whose text starts with a tab; the tab would be read as
    /// nesting
    ListItemLeadingTab,
    /// A character the service strips from inserted text
    StrippedCharacter(char),
}

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedKind::HorizontalRuleCreation => write!(f, "horizontal rules cannot be created"),
            UnsupportedKind::HorizontalRuleDeletion => write!(f, "horizontal rules cannot be deleted"),
            UnsupportedKind::TableOfContentsCreation => {
                write!(f, "tables of contents cannot be created")
            }
            UnsupportedKind::EquationCreation => write!(f, "equations cannot be created"),
            UnsupportedKind::AutoTextCreation => write!(f, "auto text cannot be created"),
            UnsupportedKind::ColumnBreakCreation => write!(f, "column breaks cannot be created"),
            UnsupportedKind::ImageWithoutUri => write!(f, "inline image has no source URI"),
            UnsupportedKind::ForbiddenInSegment { element } => {
                write!(f, "{} is not allowed here", element)
            }
            UnsupportedKind::TabReorder => write!(f, "existing tabs cannot be reordered"),
            UnsupportedKind::CommentCreation => write!(f, "comments cannot be created"),
            UnsupportedKind::CommentDeletion => write!(f, "comments cannot be deleted"),
            UnsupportedKind::ListItemLeadingTab => {
                write!(f, "list item text cannot start with a tab")
            }
            UnsupportedKind::StrippedCharacter(c) => {
                write!(f, "character U+{:04X} cannot be inserted", *c as u32)
            }
        }
    }
}

/// Diffs documents into batches.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    /// Create a reconciler with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reconciler with custom options.
    pub fn with_options(options: ReconcileOptions) -> Self {
        Self { options }
    }

    /// Get the options.
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Compute the batches turning `base` into `desired`.
    ///
    /// Both documents are indexed first, so stale indices in either snapshot
    /// are harmless.
    pub fn reconcile(&self, base: &Document, desired: &Document) -> Result<Reconciliation> {
        let indexer = Indexer::with_options(IndexOptions::new().with_parallel(self.options.parallel));
        let base = indexer.index(base.clone())?;
        let desired = indexer.index(desired.clone())?;
        let reconciliation = plan::plan_document(&base, &desired, &self.options)?;

        if self.options.error_mode == ErrorMode::Strict {
            if let Some(first) = reconciliation.unsupported.first() {
                return Err(Error::Unsupported(first.to_string()));
            }
        }
        for issue in &reconciliation.unsupported {
            log::warn!("skipped: {}", issue);
        }
        log::debug!(
            "reconciled into {} batches, {} requests",
            reconciliation.batches.len(),
            reconciliation.request_count()
        );
        Ok(reconciliation)
    }
}

/// Reconcile with default options.
pub fn reconcile(base: &Document, desired: &Document) -> Result<Reconciliation> {
    Reconciler::new().reconcile(base, desired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = ReconcileOptions::new()
            .strict()
            .sequential()
            .with_max_lcs_cells(16);
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(!options.parallel);
        assert_eq!(options.max_lcs_cells, 16);

        let options = options.with_error_mode(ErrorMode::Lenient).with_parallel(true);
        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert!(options.parallel);
    }

    #[test]
    fn test_unsupported_display() {
        let issue = Unsupported {
            kind: UnsupportedKind::ForbiddenInSegment { element: "table" },
            tab_id: Some("t.0".to_string()),
            segment: Some("footnote kix.fn1".to_string()),
        };
        assert_eq!(
            issue.to_string(),
            "table is not allowed here (footnote kix.fn1 of tab t.0)"
        );
        assert_eq!(
            UnsupportedKind::StrippedCharacter('\r').to_string(),
            "character U+000D cannot be inserted"
        );
    }
}
