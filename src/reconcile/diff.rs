//! Sequence alignment and edit regions.
//!
//! Alignment trims the common suffix, then the common prefix, and runs a
//! quadratic LCS over what remains. When the remaining grid is too large the
//! middle becomes one replace region. Gaps between matched atoms become
//! regions, which are then moved to boundaries the remote service accepts.

use super::atoms::Atom;

/// Longest common subsequence as ascending index pairs.
pub(super) fn lcs<T>(
    a: &[T],
    b: &[T],
    max_cells: usize,
    eq: impl Fn(&T, &T) -> bool,
) -> Vec<(usize, usize)> {
    let (mut head, mut a_end, mut b_end) = (0, a.len(), b.len());
    let mut tail = Vec::new();
    while a_end > 0 && b_end > 0 && eq(&a[a_end - 1], &b[b_end - 1]) {
        a_end -= 1;
        b_end -= 1;
        tail.push((a_end, b_end));
    }
    while head < a_end && head < b_end && eq(&a[head], &b[head]) {
        head += 1;
    }

    let mut pairs: Vec<(usize, usize)> = (0..head).map(|i| (i, i)).collect();
    let (n, m) = (a_end - head, b_end - head);
    if n > 0 && m > 0 && n.saturating_mul(m) <= max_cells {
        pairs.extend(
            dp(&a[head..a_end], &b[head..b_end], &eq)
                .into_iter()
                .map(|(i, j)| (i + head, j + head)),
        );
    } else if n > 0 && m > 0 {
        log::debug!("alignment grid {}x{} too large, replacing the middle", n, m);
    }
    pairs.extend(tail.into_iter().rev());
    pairs
}

fn dp<T>(a: &[T], b: &[T], eq: &impl Fn(&T, &T) -> bool) -> Vec<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if eq(&a[i], &b[j]) {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if eq(&a[i], &b[j]) {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

/// Pair two sequences, matching equal items by LCS and pairing leftovers
/// inside each gap by position.
pub(super) fn pair<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> Vec<(usize, usize)> {
    if a.len() == b.len() {
        return (0..a.len()).map(|i| (i, i)).collect();
    }
    let anchors = lcs(a, b, usize::MAX, eq);
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    for &(x, y) in anchors.iter().chain(std::iter::once(&(a.len(), b.len()))) {
        let gap = (x - i).min(y - j);
        pairs.extend((0..gap).map(|k| (i + k, j + k)));
        if x < a.len() {
            pairs.push((x, y));
        }
        i = x + 1;
        j = y + 1;
    }
    pairs
}

/// Base atoms `[i0, i1)` are replaced by desired atoms `[j0, j1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Region {
    pub i0: usize,
    pub i1: usize,
    pub j0: usize,
    pub j1: usize,
}

impl Region {
    pub fn deletes(&self) -> bool {
        self.i1 > self.i0
    }

    pub fn inserts(&self) -> bool {
        self.j1 > self.j0
    }

    fn union(&self, other: &Region) -> Region {
        Region {
            i0: self.i0.min(other.i0),
            i1: self.i1.max(other.i1),
            j0: self.j0.min(other.j0),
            j1: self.j1.max(other.j1),
        }
    }
}

/// Gaps between matched pairs.
pub(super) fn gaps(pairs: &[(usize, usize)], n: usize, m: usize) -> Vec<Region> {
    let mut regions = Vec::new();
    let (mut i, mut j) = (0, 0);
    for &(x, y) in pairs.iter().chain(std::iter::once(&(n, m))) {
        if x > i || y > j {
            regions.push(Region {
                i0: i,
                i1: x,
                j0: j,
                j1: y,
            });
        }
        i = x + 1;
        j = y + 1;
    }
    regions
}

/// Boundary rules for one container.
pub(super) struct Bounds<'s, 'a> {
    pub base: &'s [Atom<'a>],
    pub desired: &'s [Atom<'a>],
    /// Whether a desired atom can be inserted in this container
    pub insertable: &'s dyn Fn(&Atom<'a>) -> bool,
}

impl Bounds<'_, '_> {
    /// Whether the region can be applied as one delete and one insert.
    pub fn legal(&self, r: &Region) -> bool {
        let (nb, nd) = (self.base.len(), self.desired.len());
        // The container's final newline is never touched.
        if r.i1 + 1 > nb || r.j1 + 1 > nd || r.i0 > r.i1 || r.j0 > r.j1 {
            return false;
        }
        if r.deletes() {
            if self.base[r.i0..r.i1].iter().any(Atom::is_horizontal_rule) {
                return false;
            }
            if self.base[r.i1 - 1].is_newline() && self.base[r.i1].guards_newline() {
                return false;
            }
        }
        if r.inserts() {
            if self.base[r.i1].is_block() {
                return false;
            }
            for k in r.j0..r.j1 {
                let atom = &self.desired[k];
                if !(self.insertable)(atom) {
                    return false;
                }
                if atom.needs_newline() && (k == r.j0 || !self.desired[k - 1].is_newline()) {
                    return false;
                }
            }
        }
        true
    }

    fn candidates(&self, r: &Region) -> Vec<Region> {
        let mut out = vec![*r];
        let (nb, nd) = (self.base.len(), self.desired.len());
        if r.deletes() && !r.inserts() {
            for s in 1..=3 {
                if r.i0 >= s
                    && r.j0 >= s
                    && (1..=s).all(|t| self.base[r.i0 - t].same(&self.base[r.i1 - t]))
                {
                    out.push(Region {
                        i0: r.i0 - s,
                        i1: r.i1 - s,
                        j0: r.j0 - s,
                        j1: r.j0 - s,
                    });
                }
                if r.i1 + s < nb
                    && r.j0 + s < nd
                    && (0..s).all(|t| self.base[r.i0 + t].same(&self.base[r.i1 + t]))
                {
                    out.push(Region {
                        i0: r.i0 + s,
                        i1: r.i1 + s,
                        j0: r.j0 + s,
                        j1: r.j0 + s,
                    });
                }
            }
        }
        if r.inserts() && !r.deletes() {
            for s in 1..=3 {
                if r.i0 >= s
                    && r.j0 >= s
                    && (1..=s).all(|t| self.desired[r.j0 - t].same(&self.desired[r.j1 - t]))
                {
                    out.push(Region {
                        i0: r.i0 - s,
                        i1: r.i0 - s,
                        j0: r.j0 - s,
                        j1: r.j1 - s,
                    });
                }
                if r.i0 + s < nb
                    && r.j1 + s < nd
                    && (0..s).all(|t| self.desired[r.j0 + t].same(&self.desired[r.j1 + t]))
                {
                    out.push(Region {
                        i0: r.i0 + s,
                        i1: r.i0 + s,
                        j0: r.j0 + s,
                        j1: r.j1 + s,
                    });
                }
            }
        }
        for total in 1..=6 {
            for left in 0..=total.min(3) {
                let right = total - left;
                if right > 3 || left > r.i0 || left > r.j0 {
                    continue;
                }
                out.push(Region {
                    i0: r.i0 - left,
                    i1: r.i1 + right,
                    j0: r.j0 - left,
                    j1: r.j1 + right,
                });
            }
        }
        if nb > 0 && nd > 0 {
            out.push(Region {
                i0: 0,
                i1: nb - 1,
                j0: 0,
                j1: nd - 1,
            });
        }
        out
    }

    fn settle_one(&self, r: &Region) -> Option<Region> {
        self.candidates(r).into_iter().find(|c| self.legal(c))
    }

    /// Move every region to legal boundaries, merging regions that touch.
    /// Returns `None` when no legal placement exists.
    pub fn settle(&self, raw: &[Region]) -> Option<Vec<Region>> {
        let mut settled: Vec<Region> = Vec::new();
        for r in raw {
            let mut current = self.settle_one(r)?;
            while let Some(last) = settled.last() {
                if current.i0 > last.i1 && current.j0 > last.j1 {
                    break;
                }
                let merged = current.union(last);
                settled.pop();
                current = self.settle_one(&merged)?;
            }
            settled.push(current);
        }
        Some(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::super::atoms::atomize;
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_lcs_trims_and_aligns() {
        let a = chars("Hello World\n");
        let b = chars("Hello\n");
        let pairs = lcs(&a, &b, 1 << 20, |x, y| x == y);
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs.last(), Some(&(11, 5)));
        assert_eq!(gaps(&pairs, a.len(), b.len()), vec![Region { i0: 5, i1: 11, j0: 5, j1: 5 }]);
    }

    #[test]
    fn test_lcs_grid_limit() {
        let a = chars("xaby\n");
        let b = chars("xbay\n");
        let pairs = lcs(&a, &b, 0, |x, y| x == y);
        assert_eq!(pairs, vec![(0, 0), (3, 3), (4, 4)]);
    }

    #[test]
    fn test_pair_fills_gaps_positionally() {
        let a = ["h", "x", "y", "t"];
        let b = ["h", "z", "t", "u"];
        let pairs = pair(&a, &b, |p, q| p == q);
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);

        let b = ["h", "z", "t"];
        let pairs = pair(&a, &b, |p, q| p == q);
        assert_eq!(pairs, vec![(0, 0), (1, 1), (3, 2)]);
    }

    fn with_table(before: &[&str]) -> crate::model::Segment {
        let mut segment = crate::model::Segment::from_paragraphs(before.iter().copied());
        segment.add_table(crate::model::Table::from_text(&[vec!["x\n"]]));
        segment.add_paragraph(crate::model::Paragraph::with_text("\n"));
        segment
    }

    fn settle_with(
        base: &crate::model::Segment,
        desired: &crate::model::Segment,
        raw: Region,
    ) -> Option<Vec<Region>> {
        let base_atoms = atomize(&base.content, 1);
        let desired_atoms = atomize(&desired.content, 1);
        let insertable = |_: &Atom<'_>| true;
        let bounds = Bounds {
            base: &base_atoms,
            desired: &desired_atoms,
            insertable: &insertable,
        };
        bounds.settle(&[raw])
    }

    #[test]
    fn test_settle_keeps_final_newline() {
        // "x\n" "\n" -> "x\n": deleting the last newline slides onto the first.
        let base = crate::model::Segment::from_paragraphs(["x\n", "\n"]);
        let desired = crate::model::Segment::from_paragraphs(["x\n"]);
        let raw = Region { i0: 2, i1: 3, j0: 2, j1: 2 };
        assert_eq!(
            settle_with(&base, &desired, raw),
            Some(vec![Region { i0: 1, i1: 2, j0: 1, j1: 1 }])
        );
    }

    #[test]
    fn test_settle_spares_newline_before_table() {
        let base = with_table(&["A\n", "\n"]);
        let desired = with_table(&["A\n"]);
        // Atoms: A, NL, NL, table, NL. The second newline guards the table.
        let raw = Region { i0: 2, i1: 3, j0: 2, j1: 2 };
        assert_eq!(
            settle_with(&base, &desired, raw),
            Some(vec![Region { i0: 1, i1: 2, j0: 1, j1: 1 }])
        );
    }

    #[test]
    fn test_settle_moves_insert_off_table_start() {
        let base = with_table(&["A\n"]);
        let desired = with_table(&["A\n", "x\n"]);
        // Inserting "x\n" directly before the table is not allowed; the
        // equivalent insert before the preceding newline is.
        let raw = Region { i0: 2, i1: 2, j0: 2, j1: 4 };
        assert_eq!(
            settle_with(&base, &desired, raw),
            Some(vec![Region { i0: 1, i1: 1, j0: 1, j1: 3 }])
        );
    }

    #[test]
    fn test_surrogate_pair_is_one_atom() {
        let base = crate::model::Segment::from_paragraphs(["a😀b\n"]);
        let desired = crate::model::Segment::from_paragraphs(["ab\n"]);
        let a = atomize(&base.content, 1);
        let b = atomize(&desired.content, 1);
        let pairs = lcs(&a, &b, 1 << 20, |x, y| x.same(y));
        let raw = gaps(&pairs, a.len(), b.len());
        assert_eq!(raw, vec![Region { i0: 1, i1: 2, j0: 1, j1: 1 }]);
        // The deleted range covers both code units.
        assert_eq!((a[raw[0].i0].start, a[raw[0].i1].start), (2, 4));
    }
}
