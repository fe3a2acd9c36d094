//! Named range matching.

use crate::model::NamedRange;
use crate::request::{CreateNamedRange, Range, Request};

/// Ranges to drop and to create so that `current` matches `desired`.
///
/// Ranges match on `(name, start, end)` as a multiset; ids never take part.
/// Returns the ids of unmatched current ranges and one create request per
/// unmatched desired range.
pub(super) fn reconcile_ranges(
    current: &[&NamedRange],
    desired: &[&NamedRange],
) -> (Vec<String>, Vec<Request>) {
    let key = |r: &NamedRange| (r.name.clone(), r.start_index, r.end_index);
    let mut unmatched: Vec<&NamedRange> = desired.to_vec();
    let mut stale = Vec::new();
    for range in current {
        match unmatched.iter().position(|d| key(d) == key(range)) {
            Some(p) => {
                unmatched.remove(p);
            }
            None => stale.push(range.named_range_id.clone()),
        }
    }
    let creates = unmatched
        .into_iter()
        .map(|r| {
            Request::CreateNamedRange(CreateNamedRange {
                name: r.name.clone(),
                range: Range::new(r.start_index, r.end_index),
            })
        })
        .collect();
    (stale, creates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(id: &str, name: &str, start: u32, end: u32) -> NamedRange {
        NamedRange {
            named_range_id: id.to_string(),
            name: name.to_string(),
            segment_id: None,
            start_index: start,
            end_index: end,
        }
    }

    #[test]
    fn test_multiset_matching() {
        let a = range("kix.1", "x", 1, 3);
        let b = range("kix.2", "x", 1, 3);
        let c = range("kix.3", "y", 2, 4);
        let d1 = range("", "x", 1, 3);
        let d2 = range("", "y", 2, 5);

        let (stale, creates) = reconcile_ranges(&[&a, &b, &c], &[&d1, &d2]);
        assert_eq!(stale, vec!["kix.2".to_string(), "kix.3".to_string()]);
        assert_eq!(
            creates,
            vec![Request::CreateNamedRange(CreateNamedRange {
                name: "y".to_string(),
                range: Range::new(2, 5),
            })]
        );
    }
}
