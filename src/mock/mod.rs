//! In-memory stand-in for the remote `get`/`batchUpdate` contract.
//!
//! The engine owns one document and a revision counter. A batch is applied to
//! a scratch copy request by request; the copy replaces the live document only
//! when every request succeeded, so a rejected batch leaves no trace. Indices
//! are maintained by the engine's own length logic, independent of the
//! [`Indexer`](crate::indexer::Indexer).

mod apply;
mod error;
mod ids;
mod layout;
mod rules;

pub use error::{ValidationError, ValidationErrorKind};
pub use rules::{MAX_NAME_UNITS, MAX_URI_BYTES};

use crate::model::Document;
use crate::request::{BatchResponse, Request};
use apply::Scratch;
use ids::IdGenerator;
use rules::Rules;

/// Options for the mock engine.
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Prefix of revision tokens; the counter is appended
    pub revision_prefix: String,

    /// Require image URIs to be http or https URLs
    pub strict_uris: bool,
}

impl MockOptions {
    /// Create new mock options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the revision token prefix.
    pub fn with_revision_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.revision_prefix = prefix.into();
        self
    }

    /// Enable or disable URI scheme checks.
    pub fn with_strict_uris(mut self, strict: bool) -> Self {
        self.strict_uris = strict;
        self
    }
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            revision_prefix: "mock-rev-".to_string(),
            strict_uris: true,
        }
    }
}

/// The mock validation engine.
#[derive(Debug, Clone)]
pub struct MockEngine {
    document: Document,
    revision: u64,
    ids: IdGenerator,
    rules: Rules,
    options: MockOptions,
}

impl MockEngine {
    /// Create an engine holding `document` at the first revision.
    pub fn new(document: Document) -> Self {
        Self::with_options(document, MockOptions::default())
    }

    /// Create an engine with custom options.
    pub fn with_options(mut document: Document, options: MockOptions) -> Self {
        renumber_all(&mut document);
        Self {
            document,
            revision: 0,
            ids: IdGenerator::default(),
            rules: Rules::new(options.strict_uris),
            options,
        }
    }

    /// Current revision token.
    pub fn revision_id(&self) -> String {
        format!("{}{}", self.options.revision_prefix, self.revision)
    }

    /// Borrow the current document. Its `revision_id` is not maintained.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Snapshot of the current document, stamped with the revision.
    pub fn get(&self) -> Document {
        let mut document = self.document.clone();
        document.revision_id = Some(self.revision_id());
        document
    }

    /// Validate and apply a batch atomically.
    ///
    /// Fails without mutation when `required_revision` is given and is not
    /// the current revision, or when any request is rejected.
    pub fn batch_update(
        &mut self,
        requests: &[Request],
        required_revision: Option<&str>,
    ) -> Result<BatchResponse, ValidationError> {
        let current = self.revision_id();
        if let Some(required) = required_revision {
            if required != current {
                return Err(ValidationError::batch(ValidationErrorKind::StaleRevision {
                    required: required.to_string(),
                    current,
                }));
            }
        }

        let mut scratch = Scratch {
            document: self.document.clone(),
            ids: self.ids.clone(),
        };
        let mut replies = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            let reply = scratch.apply(request, &self.rules).map_err(|kind| {
                log::debug!("request {} ({}) rejected: {}", i, request.kind_name(), kind);
                ValidationError::at(i, kind)
            })?;
            replies.push(reply);
        }

        renumber_all(&mut scratch.document);
        self.document = scratch.document;
        self.ids = scratch.ids;
        self.revision += 1;
        log::debug!(
            "applied {} requests, now at {}",
            requests.len(),
            self.revision_id()
        );
        Ok(BatchResponse {
            replies,
            revision_id: self.revision_id(),
        })
    }
}

fn renumber_all(document: &mut Document) {
    for tab in &mut document.tabs {
        layout::renumber(&mut tab.body.content, 1);
        for header in tab.headers.values_mut().chain(tab.footers.values_mut()) {
            layout::renumber(&mut header.segment.content, 1);
        }
        for footnote in tab.footnotes.values_mut() {
            layout::renumber(&mut footnote.content, 1);
        }
    }
}
