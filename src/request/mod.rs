//! Wire-format edit operations.
//!
//! Requests serialize exactly as the remote `batchUpdate` body expects: an
//! externally tagged object per operation with camelCase keys. Identifiers that
//! are only known after an earlier batch has run are carried as
//! [`Id::Deferred`] and resolved by [`resolve_batch`] before execution.

mod ops;
mod reply;
mod resolve;

pub use ops::*;
pub use reply::*;
pub use resolve::{remap_batches, resolve_batch};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A server identifier, either known or produced by an earlier batch.
///
/// A deferred id never equals a known one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// A concrete id
    Known(String),
    /// The id returned by an earlier request
    Deferred(DeferredRef),
}

impl Id {
    /// Get the concrete id, if known.
    pub fn known(&self) -> Option<&str> {
        match self {
            Id::Known(id) => Some(id),
            Id::Deferred(_) => None,
        }
    }

    /// Check whether this id still needs resolution.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Id::Deferred(_))
    }
}

impl From<&str> for Id {
    fn from(id: &str) -> Self {
        Id::Known(id.to_string())
    }
}

impl From<String> for Id {
    fn from(id: String) -> Self {
        Id::Known(id)
    }
}

impl From<DeferredRef> for Id {
    fn from(r: DeferredRef) -> Self {
        Id::Deferred(r)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Known(id) => write!(f, "{}", id),
            Id::Deferred(r) => write!(f, "<batch {} request {}>", r.batch, r.request),
        }
    }
}

/// Points at the reply of request `request` in batch `batch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeferredRef {
    /// Zero-based batch index
    pub batch: usize,
    /// Zero-based request index within the batch
    pub request: usize,
}

impl DeferredRef {
    /// Create a reference.
    pub fn new(batch: usize, request: usize) -> Self {
        Self { batch, request }
    }
}

/// A position in a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// UTF-16 index
    pub index: u32,

    /// Segment id, `None` for the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<Id>,

    /// Tab id, `None` for the first tab
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<Id>,
}

impl Location {
    /// A body location in the first tab.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            segment_id: None,
            tab_id: None,
        }
    }

    /// Set the segment.
    pub fn in_segment(mut self, segment_id: Option<Id>) -> Self {
        self.segment_id = segment_id;
        self
    }

    /// Set the tab.
    pub fn in_tab(mut self, tab_id: impl Into<Id>) -> Self {
        self.tab_id = Some(tab_id.into());
        self
    }
}

/// A half-open range `[start_index, end_index)` in a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    /// Segment id, `None` for the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<Id>,

    /// Start index (inclusive)
    pub start_index: u32,

    /// End index (exclusive)
    pub end_index: u32,

    /// Tab id, `None` for the first tab
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<Id>,
}

impl Range {
    /// A body range in the first tab.
    pub fn new(start_index: u32, end_index: u32) -> Self {
        Self {
            segment_id: None,
            start_index,
            end_index,
            tab_id: None,
        }
    }

    /// Set the segment.
    pub fn in_segment(mut self, segment_id: Option<Id>) -> Self {
        self.segment_id = segment_id;
        self
    }

    /// Set the tab.
    pub fn in_tab(mut self, tab_id: impl Into<Id>) -> Self {
        self.tab_id = Some(tab_id.into());
        self
    }

    /// Length in UTF-16 units.
    pub fn len(&self) -> u32 {
        self.end_index.saturating_sub(self.start_index)
    }

    /// Check if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.end_index <= self.start_index
    }
}

/// A cell addressed through its table's start location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellLocation {
    /// Location of the table's start marker
    pub table_start_location: Location,

    /// Zero-based row
    #[serde(default)]
    pub row_index: u32,

    /// Zero-based column
    #[serde(default)]
    pub column_index: u32,
}

/// A rectangular block of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRange {
    /// Top-left cell
    pub table_cell_location: TableCellLocation,

    /// Rows covered
    pub row_span: u32,

    /// Columns covered
    pub column_span: u32,
}

/// An atomically applied list of requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Requests in application order
    pub requests: Vec<Request>,
}

impl Batch {
    /// Create a batch.
    pub fn new(requests: Vec<Request>) -> Self {
        Self { requests }
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Check whether any request still carries a deferred id.
    pub fn has_deferred(&self) -> bool {
        let mut found = false;
        for request in &self.requests {
            request.for_each_id(&mut |id| found |= id.is_deferred());
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serde_untagged() {
        let known: Id = serde_json::from_str(r#""kix.hdr1""#).unwrap();
        assert_eq!(known, Id::Known("kix.hdr1".to_string()));

        let deferred: Id = serde_json::from_str(r#"{"batch":0,"request":2}"#).unwrap();
        assert_eq!(deferred, Id::Deferred(DeferredRef::new(0, 2)));
        assert_ne!(deferred, Id::Known("0".to_string()));
    }

    #[test]
    fn test_location_serde() {
        let loc = Location::new(6).in_tab("t.0");
        assert_eq!(
            serde_json::to_string(&loc).unwrap(),
            r#"{"index":6,"tabId":"t.0"}"#
        );
    }

    #[test]
    fn test_range_len() {
        let range = Range::new(6, 11);
        assert_eq!(range.len(), 5);
        assert!(!range.is_empty());
        assert!(Range::new(3, 3).is_empty());
    }
}
