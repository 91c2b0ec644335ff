//! Dominated-diagonal bookkeeping.
//!
//! Once the wavefront leaves a node through a diagonal, that diagonal (and,
//! as scores pass, a growing band around it) cannot produce a better cell in
//! that node any more: whatever it could reach is reached at least as cheaply
//! through the successor the jump activated. Each jump therefore seeds
//! segments of invalid diagonals whose boundaries creep outward on a
//! countdown; a dominated diagonal stays dominated, so segments only grow.

use crate::trace::Matrix;
use crate::types::{Diag, NodeId, Score};
use rustc_hash::FxHashMap;

/// A contiguous range of dominated diagonals. `start_d > end_d` encodes a
/// segment that is empty until one of its countdowns brings a boundary in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidSegment {
    pub start_d: Diag,
    pub end_d: Diag,
    /// Scores left until `start_d` moves down by one.
    pub rem_down: Score,
    /// Scores left until `end_d` moves up by one.
    pub rem_up: Score,
}

impl InvalidSegment {
    fn contains(&self, d: Diag) -> bool {
        self.start_d <= d && d <= self.end_d
    }
}

#[derive(Default)]
struct NodeSegments {
    m: Vec<InvalidSegment>,
    i: Vec<InvalidSegment>,
    d: Vec<InvalidSegment>,
    dirty: bool,
}

impl NodeSegments {
    fn list(&self, matrix: Matrix) -> &Vec<InvalidSegment> {
        match matrix {
            Matrix::M => &self.m,
            Matrix::I => &self.i,
            Matrix::D => &self.d,
        }
    }
}

/// Per-node invalid segments for the three wavefront kinds.
pub struct InvalidDiagonals {
    nodes: FxHashMap<NodeId, NodeSegments>,
    gap_open: Score,
    gap_extend: Score,
}

impl InvalidDiagonals {
    /// `gap_open` and `gap_extend` in the rescaled space the search runs in.
    pub fn new(gap_open: Score, gap_extend: Score) -> Self {
        InvalidDiagonals {
            nodes: FxHashMap::default(),
            gap_open,
            gap_extend,
        }
    }

    /// A match cell jumped out of `node` on diagonal `d`.
    pub fn on_match_jump(&mut self, node: NodeId, d: Diag) {
        let oe = self.gap_open + self.gap_extend;
        let entry = self.nodes.entry(node).or_default();
        entry.m.push(InvalidSegment {
            start_d: d,
            end_d: d,
            rem_down: oe,
            rem_up: oe,
        });
        entry.i.push(InvalidSegment {
            start_d: d + 1,
            end_d: d,
            rem_down: 2 * oe,
            rem_up: oe,
        });
        entry.d.push(InvalidSegment {
            start_d: d,
            end_d: d - 1,
            rem_down: oe,
            rem_up: 2 * oe,
        });
        entry.dirty = true;
    }

    /// An insertion cell jumped out of `node` on diagonal `d`.
    pub fn on_ins_jump(&mut self, node: NodeId, d: Diag) {
        let o = self.gap_open;
        let e = self.gap_extend;
        let entry = self.nodes.entry(node).or_default();
        entry.m.push(InvalidSegment {
            start_d: d,
            end_d: d,
            rem_down: o + e,
            rem_up: e,
        });
        entry.i.push(InvalidSegment {
            start_d: d,
            end_d: d,
            rem_down: 2 * o + 3 * e,
            rem_up: e,
        });
        entry.d.push(InvalidSegment {
            start_d: d,
            end_d: d - 1,
            rem_down: o + e,
            rem_up: o + 2 * e,
        });
        entry.dirty = true;
    }

    /// Whether diagonal `d` of `node` may still be written in `matrix`.
    pub fn is_valid(&self, node: NodeId, matrix: Matrix, d: Diag) -> bool {
        let Some(entry) = self.nodes.get(&node) else {
            return true;
        };
        let list = entry.list(matrix);
        if entry.dirty {
            // Fresh segments from the current wave; not merged yet.
            return !list.iter().any(|seg| seg.contains(d));
        }
        // Sorted and non-overlapping: only the last segment starting at or
        // before `d` can cover it.
        let idx = list.partition_point(|seg| seg.start_d <= d);
        idx > 0 && list[idx - 1].contains(d)
    }

    /// Ticks every countdown by one score step, growing boundaries that hit
    /// zero and rearming them with the extend cost.
    pub fn expand(&mut self) {
        let e = self.gap_extend;
        for entry in self.nodes.values_mut() {
            for list in [&mut entry.m, &mut entry.i, &mut entry.d] {
                for seg in list.iter_mut() {
                    seg.rem_down -= 1;
                    if seg.rem_down <= 0 {
                        seg.start_d -= 1;
                        seg.rem_down = e;
                    }
                    seg.rem_up -= 1;
                    if seg.rem_up <= 0 {
                        seg.end_d += 1;
                        seg.rem_up = e;
                    }
                }
            }
        }
    }

    /// Sorts and merges overlapping or adjacent segments, keeping for each
    /// boundary the countdown that reaches furthest soonest.
    pub fn compact(&mut self) {
        let e = self.gap_extend;
        for entry in self.nodes.values_mut() {
            for list in [&mut entry.m, &mut entry.i, &mut entry.d] {
                merge_segments(list, e);
            }
            entry.dirty = false;
        }
    }
}

fn merge_segments(list: &mut Vec<InvalidSegment>, e: Score) {
    if list.len() <= 1 {
        return;
    }
    list.sort_by_key(|seg| (seg.start_d, seg.end_d));
    let mut merged: Vec<InvalidSegment> = Vec::with_capacity(list.len());
    for seg in list.drain(..) {
        match merged.last_mut() {
            Some(last) if seg.start_d <= last.end_d + 1 => {
                // Same band: a boundary is guarded by whichever countdown
                // reaches it first, distance priced at the extend cost.
                last.rem_down = last
                    .rem_down
                    .min(seg.rem_down + (seg.start_d - last.start_d) * e);
                if seg.end_d > last.end_d {
                    last.rem_up = seg.rem_up.min(last.rem_up + (seg.end_d - last.end_d) * e);
                    last.end_d = seg.end_d;
                } else {
                    last.rem_up = last.rem_up.min(seg.rem_up + (last.end_d - seg.end_d) * e);
                }
            }
            _ => merged.push(seg),
        }
    }
    *list = merged;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn match_jump_invalidates_its_diagonal() {
        let mut inv = InvalidDiagonals::new(4, 2);
        assert!(inv.is_valid(0, Matrix::M, 5));
        inv.on_match_jump(0, 5);
        assert!(!inv.is_valid(0, Matrix::M, 5));
        assert!(inv.is_valid(0, Matrix::M, 4));
        assert!(inv.is_valid(0, Matrix::M, 6));
        // The I segment starts empty.
        assert!(inv.is_valid(0, Matrix::I, 5));
        // The D segment already covers d.
        assert!(!inv.is_valid(0, Matrix::D, 5));
        inv.compact();
        assert!(!inv.is_valid(0, Matrix::M, 5));
    }

    #[test]
    fn segments_grow_on_countdown_and_never_shrink() {
        let mut inv = InvalidDiagonals::new(4, 2);
        inv.on_match_jump(0, 0);
        inv.compact();
        // rem_up = rem_down = 6 for the M segment.
        for _ in 0..5 {
            inv.expand();
            inv.compact();
            assert!(inv.is_valid(0, Matrix::M, 1));
            assert!(inv.is_valid(0, Matrix::M, -1));
        }
        inv.expand();
        inv.compact();
        assert!(!inv.is_valid(0, Matrix::M, 1));
        assert!(!inv.is_valid(0, Matrix::M, -1));
        assert!(!inv.is_valid(0, Matrix::M, 0));
        // Rearmed with the extend cost: one more diagonal after two steps.
        inv.expand();
        inv.compact();
        assert!(inv.is_valid(0, Matrix::M, 2));
        inv.expand();
        inv.compact();
        assert!(!inv.is_valid(0, Matrix::M, 2));
    }

    #[test]
    fn overlapping_segments_merge() {
        let mut inv = InvalidDiagonals::new(4, 2);
        inv.on_match_jump(0, 0);
        inv.on_match_jump(0, 1);
        inv.compact();
        let entry = inv.nodes.get(&0).unwrap();
        assert_eq!(entry.m.len(), 1);
        assert_eq!(entry.m[0].start_d, 0);
        assert_eq!(entry.m[0].end_d, 1);
        // Tighter upper countdown: own 6 vs neighbour's 6 + distance 1 * 2.
        assert_eq!(entry.m[0].rem_up, 6);
        assert_eq!(entry.m[0].rem_down, 6);
    }
}
