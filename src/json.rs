//! JSON snapshots and wire batches.

use crate::error::Result;
use crate::model::Document;
use crate::request::Batch;
use serde::Serialize;
use std::path::Path;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

fn to_string<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    Ok(match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    })
}

/// Serialize a document snapshot.
pub fn document_to_json(doc: &Document, format: JsonFormat) -> Result<String> {
    to_string(doc, format)
}

/// Parse a document snapshot.
pub fn document_from_json(json: &str) -> Result<Document> {
    Ok(serde_json::from_str(json)?)
}

/// Read a document snapshot from a file.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<Document> {
    let json = std::fs::read_to_string(path)?;
    document_from_json(&json)
}

/// Serialize batches as a list of `batchUpdate` bodies.
pub fn batches_to_json(batches: &[Batch], format: JsonFormat) -> Result<String> {
    to_string(batches, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Segment;
    use crate::request::{InsertText, Location, Request};

    #[test]
    fn test_document_pretty_and_back() {
        let doc = Document::with_body("doc-1", Segment::from_paragraphs(["Hello\n"]));
        let json = document_to_json(&doc, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"documentId\""));
        assert!(json.contains('\n'));
        assert_eq!(document_from_json(&json).unwrap(), doc);
    }

    #[test]
    fn test_batches_compact() {
        let batch = Batch::new(vec![Request::InsertText(InsertText {
            text: "x".to_string(),
            location: Location::new(1),
        })]);
        let json = batches_to_json(&[batch], JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"insertText\""));
    }
}
