//! Validation errors reported by the mock engine.

use thiserror::Error;

/// A rejected batch. Nothing was applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{kind}", request_prefix(.request_index))]
pub struct ValidationError {
    /// Index of the offending request, `None` for batch-level failures
    pub request_index: Option<usize>,

    /// What went wrong
    pub kind: ValidationErrorKind,
}

fn request_prefix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("request {}: ", i),
        None => String::new(),
    }
}

fn article(kind: &str) -> &'static str {
    match kind.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

impl ValidationError {
    /// A batch-level error.
    pub fn batch(kind: ValidationErrorKind) -> Self {
        Self {
            request_index: None,
            kind,
        }
    }

    /// An error attributed to request `index`.
    pub fn at(index: usize, kind: ValidationErrorKind) -> Self {
        Self {
            request_index: Some(index),
            kind,
        }
    }

    /// Check whether this is an optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, ValidationErrorKind::StaleRevision { .. })
    }
}

/// Reasons a request is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The batch was prepared against an older revision.
    #[error("required revision {required} is stale, current revision is {current}")]
    StaleRevision {
        /// Revision the caller expected
        required: String,
        /// Revision the engine holds
        current: String,
    },

    /// A deferred id reached the engine.
    #[error("unresolved deferred id {0}")]
    UnresolvedDeferredId(String),

    /// No tab with this id.
    #[error("tab {0} not found")]
    TabNotFound(String),

    /// No segment with this id in the tab.
    #[error("segment {0} not found")]
    SegmentNotFound(String),

    /// Index outside the segment.
    #[error("index {index} is out of bounds (segment ends at {end})")]
    IndexOutOfBounds {
        /// Offending index
        index: u32,
        /// Segment end index
        end: u32,
    },

    /// End index not after start index.
    #[error("invalid range [{start}, {end})")]
    InvalidRange {
        /// Range start
        start: u32,
        /// Range end
        end: u32,
    },

    /// Boundary between the two halves of a surrogate pair.
    #[error("index {index} splits a surrogate pair")]
    SurrogateSplit {
        /// Offending index
        index: u32,
    },

    /// Attempt to delete the final newline of a segment.
    #[error("the final newline of a segment at index {index} cannot be deleted")]
    FinalNewline {
        /// Index of the newline
        index: u32,
    },

    /// Attempt to delete the final newline of a table cell.
    #[error("the final newline of a table cell at index {index} cannot be deleted")]
    CellFinalNewline {
        /// Index of the newline
        index: u32,
    },

    /// A range partially covers an atomic element.
    #[error("range partially covers {} {kind} at index {index}", article(.kind))]
    PartialStructure {
        /// Element kind
        kind: &'static str,
        /// Element start
        index: u32,
    },

    /// Deleting the newline before a structural element without the element.
    #[error(
        "the newline at index {index} precedes {} {kind} and cannot be deleted alone",
        article(.kind)
    )]
    NewlineBeforeStructure {
        /// Index of the newline
        index: u32,
        /// Following element
        kind: &'static str,
    },

    /// Edit inside a table of contents.
    #[error("index {index} is inside a table of contents")]
    InsideTableOfContents {
        /// Offending index
        index: u32,
    },

    /// Insertion at the start boundary of a structural element.
    #[error("cannot insert at the start of {} {kind} (index {index})", article(.kind))]
    InsertAtStructureStart {
        /// Element kind
        kind: &'static str,
        /// Offending index
        index: u32,
    },

    /// Insertion at a row, cell or end marker of a table.
    #[error("index {index} is the {marker} marker of a table, outside any cell")]
    TableMarker {
        /// `row`, `cell` or `end`
        marker: &'static str,
        /// Offending index
        index: u32,
    },

    /// A delete range spans more than one table cell.
    #[error("range [{start}, {end}) crosses a table cell boundary")]
    CrossesCellBoundary {
        /// Range start
        start: u32,
        /// Range end
        end: u32,
    },

    /// The element is not allowed in this kind of segment.
    #[error("{element} is not allowed in {segment}")]
    ForbiddenInSegment {
        /// Element kind
        element: &'static str,
        /// Segment description
        segment: String,
    },

    /// The element is not allowed inside a table.
    #[error("{element} is not allowed inside a table")]
    ForbiddenInTable {
        /// Element kind
        element: &'static str,
    },

    /// Footnotes cannot contain footnotes.
    #[error("footnotes cannot be nested")]
    NestedFootnote,

    /// A required field is missing or empty.
    #[error("missing required field {0}")]
    MissingField(&'static str),

    /// A field holds an unacceptable value.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// A named range name has the wrong length.
    #[error("named range name must be 1 to 256 UTF-16 units, got {len}")]
    NameLength {
        /// Name length in UTF-16 units
        len: u32,
    },

    /// No table starts at the given index.
    #[error("no table starts at index {index}")]
    TableNotFound {
        /// Table start location
        index: u32,
    },

    /// Cell coordinates outside the table.
    #[error("cell ({row}, {column}) is outside the table")]
    TableCoordinates {
        /// Row index
        row: u32,
        /// Column index
        column: u32,
    },

    /// The only row or column of a table cannot be deleted.
    #[error("cannot delete the last {0} of a table")]
    LastRowOrColumn(&'static str),

    /// A row or column operation cuts through merged cells.
    #[error("operation cuts through merged cells")]
    MergeConflict,

    /// A merge overlaps an existing merged region.
    #[error("merge overlaps an existing merged region")]
    MergeOverlap,

    /// A header of this type already exists.
    #[error("a {0} header already exists")]
    HeaderExists(&'static str),

    /// A footer of this type already exists.
    #[error("a {0} footer already exists")]
    FooterExists(&'static str),

    /// No named range matched.
    #[error("named range {0} not found")]
    NamedRangeNotFound(String),

    /// A document keeps at least one tab.
    #[error("the last tab of a document cannot be deleted")]
    LastTab,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_request_index() {
        let err = ValidationError::at(2, ValidationErrorKind::SurrogateSplit { index: 7 });
        assert_eq!(err.to_string(), "request 2: index 7 splits a surrogate pair");

        let err = ValidationError::batch(ValidationErrorKind::StaleRevision {
            required: "mock-rev-0".to_string(),
            current: "mock-rev-1".to_string(),
        });
        assert!(err.is_conflict());
        assert!(err.to_string().starts_with("required revision"));
    }

    #[test]
    fn test_structure_messages_pick_article() {
        let err = ValidationErrorKind::PartialStructure {
            kind: "equation",
            index: 3,
        };
        assert_eq!(err.to_string(), "range partially covers an equation at index 3");

        let err = ValidationErrorKind::NewlineBeforeStructure {
            index: 2,
            kind: "table",
        };
        assert_eq!(
            err.to_string(),
            "the newline at index 2 precedes a table and cannot be deleted alone"
        );

        let err = ValidationErrorKind::TableMarker {
            marker: "end",
            index: 9,
        };
        assert_eq!(
            err.to_string(),
            "index 9 is the end marker of a table, outside any cell"
        );
    }
}
