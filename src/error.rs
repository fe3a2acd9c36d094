//! Error types for the docsync library.

use crate::indexer::IndexError;
use crate::mock::ValidationError;
use std::io;
use thiserror::Error;

/// Result type alias for docsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while indexing, reconciling or replaying documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing snapshots.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot or batch (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document tree cannot be given consistent indices.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// A request was rejected by the validation engine.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Base and desired documents cannot be aligned.
    #[error("Reconcile error: {0}")]
    Reconcile(String),

    /// The desired change cannot be expressed with the remote API.
    #[error("Unsupported change: {0}")]
    Unsupported(String),

    /// A deferred id could not be resolved from earlier replies.
    #[error("Unresolved deferred id: {0}")]
    UnresolvedId(String),

    /// A batch failed while executing a multi-batch sequence.
    #[error("Batch {index} failed ({index} batches already applied): {source}")]
    Batch {
        /// Zero-based index of the failing batch
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check whether this error is an optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Validation(e) => e.is_conflict(),
            Error::Batch { source, .. } => source.is_conflict(),
            _ => false,
        }
    }
}
