//! Batch execution against a document service.
//!
//! [`execute`] runs reconciled batches in order. Before each batch, deferred
//! ids are replaced with the ids returned by earlier batches. Each batch can
//! be pinned to the revision produced by the previous one, so a concurrent
//! writer makes the sequence stop instead of editing a moved target.

use crate::error::{Error, Result};
use crate::mock::MockEngine;
use crate::model::Document;
use crate::request::{resolve_batch, Batch, BatchResponse, Reply, Request};

/// A document service accepting `batchUpdate` calls.
pub trait Transport {
    /// Fetch the current document.
    fn get(&self) -> Result<Document>;

    /// Apply one batch atomically.
    fn batch_update(
        &mut self,
        requests: &[Request],
        required_revision: Option<&str>,
    ) -> Result<BatchResponse>;
}

impl Transport for MockEngine {
    fn get(&self) -> Result<Document> {
        Ok(MockEngine::get(self))
    }

    fn batch_update(
        &mut self,
        requests: &[Request],
        required_revision: Option<&str>,
    ) -> Result<BatchResponse> {
        Ok(MockEngine::batch_update(self, requests, required_revision)?)
    }
}

/// Options for [`execute`].
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Revision the first batch must apply to
    pub required_revision: Option<String>,

    /// Pin every later batch to the revision returned by the previous one
    pub chain_revisions: bool,
}

impl ExecuteOptions {
    /// Create new execute options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the first batch to apply to `revision`.
    pub fn with_required_revision(mut self, revision: impl Into<String>) -> Self {
        self.required_revision = Some(revision.into());
        self
    }

    /// Enable or disable revision chaining.
    pub fn with_chain_revisions(mut self, chain: bool) -> Self {
        self.chain_revisions = chain;
        self
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            required_revision: None,
            chain_revisions: true,
        }
    }
}

/// Outcome of a successful execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    /// One response per batch, in order
    pub responses: Vec<BatchResponse>,
}

impl Execution {
    /// Revision after the last batch, if any batch ran.
    pub fn revision_id(&self) -> Option<&str> {
        self.responses.last().map(|r| r.revision_id.as_str())
    }

    /// Replies of every batch, as needed by [`resolve_batch`].
    pub fn replies(&self) -> Vec<Vec<Reply>> {
        self.responses.iter().map(|r| r.replies.clone()).collect()
    }
}

/// Run `batches` in order.
///
/// On failure the error is [`Error::Batch`] carrying the index of the failing
/// batch, which is also the number of batches already applied.
pub fn execute<T: Transport + ?Sized>(
    transport: &mut T,
    batches: &[Batch],
    options: &ExecuteOptions,
) -> Result<Execution> {
    execute_with_progress(transport, batches, options, |_, _| {})
}

/// [`execute`], calling `progress(index, response)` after each batch.
pub fn execute_with_progress<T, F>(
    transport: &mut T,
    batches: &[Batch],
    options: &ExecuteOptions,
    mut progress: F,
) -> Result<Execution>
where
    T: Transport + ?Sized,
    F: FnMut(usize, &BatchResponse),
{
    let mut replies: Vec<Vec<Reply>> = Vec::with_capacity(batches.len());
    let mut execution = Execution::default();
    let mut required = options.required_revision.clone();

    for (index, batch) in batches.iter().enumerate() {
        let fail = |source: Error| Error::Batch {
            index,
            source: Box::new(source),
        };
        let resolved = resolve_batch(batch, &replies).map_err(fail)?;
        let response = transport
            .batch_update(&resolved.requests, required.as_deref())
            .map_err(fail)?;
        log::debug!(
            "batch {} applied: {} requests, revision {}",
            index,
            resolved.len(),
            response.revision_id
        );

        if options.chain_revisions {
            required = Some(response.revision_id.clone());
        } else {
            required = None;
        }
        progress(index, &response);
        replies.push(response.replies.clone());
        execution.responses.push(response);
    }
    Ok(execution)
}
