//! Deferred id resolution.

use super::{Batch, Id, Reply};
use crate::error::{Error, Result};

/// Replace every deferred id in `batch` with the id found in earlier replies.
///
/// `replies[b][r]` is the reply to request `r` of batch `b`.
pub fn resolve_batch(batch: &Batch, replies: &[Vec<Reply>]) -> Result<Batch> {
    let mut resolved = batch.clone();
    let mut failure = None;
    for request in &mut resolved.requests {
        request.for_each_id_mut(&mut |id| {
            let Id::Deferred(r) = id else {
                return;
            };
            let found = replies
                .get(r.batch)
                .and_then(|b| b.get(r.request))
                .and_then(Reply::created_id);
            match found {
                Some(known) => *id = Id::Known(known.to_string()),
                None => {
                    if failure.is_none() {
                        failure = Some(id.to_string());
                    }
                }
            }
        });
    }
    match failure {
        Some(id) => Err(Error::UnresolvedId(id)),
        None => Ok(resolved),
    }
}

/// Drop empty batches and renumber the batch part of every deferred id.
///
/// Deferred ids must point at an earlier, non-empty batch.
pub fn remap_batches(batches: Vec<Batch>) -> Vec<Batch> {
    let mut index = Vec::with_capacity(batches.len());
    let mut next = 0;
    for batch in &batches {
        index.push(next);
        if !batch.is_empty() {
            next += 1;
        }
    }

    batches
        .into_iter()
        .filter(|b| !b.is_empty())
        .map(|mut batch| {
            for request in &mut batch.requests {
                request.for_each_id_mut(&mut |id| {
                    if let Id::Deferred(r) = id {
                        if let Some(&b) = index.get(r.batch) {
                            r.batch = b;
                        }
                    }
                });
            }
            batch
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::reply::CreatedHeader;
    use crate::request::{DeferredRef, InsertText, Location, Request};

    fn insert_into(segment: Id) -> Request {
        Request::InsertText(InsertText {
            text: "Top".to_string(),
            location: Location::new(1).in_segment(Some(segment)),
        })
    }

    #[test]
    fn test_resolve_batch() {
        let batch = Batch::new(vec![insert_into(DeferredRef::new(0, 0).into())]);
        let replies = vec![vec![Reply {
            create_header: Some(CreatedHeader {
                header_id: "kix.hdr1".to_string(),
            }),
            ..Default::default()
        }]];
        let resolved = resolve_batch(&batch, &replies).unwrap();
        assert!(!resolved.has_deferred());
        assert_eq!(resolved.requests[0], insert_into("kix.hdr1".into()));
    }

    #[test]
    fn test_resolve_batch_missing_reply() {
        let batch = Batch::new(vec![insert_into(DeferredRef::new(0, 3).into())]);
        let err = resolve_batch(&batch, &[vec![Reply::empty()]]).unwrap_err();
        assert!(matches!(err, Error::UnresolvedId(_)));
    }

    #[test]
    fn test_remap_batches_drops_empty() {
        let batches = vec![
            Batch::default(),
            Batch::new(vec![insert_into("kix.hdr1".into())]),
            Batch::new(vec![insert_into(DeferredRef::new(1, 0).into())]),
        ];
        let remapped = remap_batches(batches);
        assert_eq!(remapped.len(), 2);
        assert_eq!(
            remapped[1].requests[0],
            insert_into(DeferredRef::new(0, 0).into())
        );
    }
}
