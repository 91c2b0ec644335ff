//! A ring of recent per-score wavefronts, keyed by `score mod window`.
//!
//! Only the insertion and deletion wavefronts live here: nothing ever looks
//! further back at them than the score window. Match wavefronts are kept for
//! the whole alignment by the search itself. Every slot is tagged with the
//! score it holds, so a slot whose score was recycled reads as absent.

use crate::trace::Cell;
use crate::types::{NodeId, Score};
use crate::wavefront::Wavefront;
use rustc_hash::FxHashMap;

struct Slot {
    score: Score,
    ins: FxHashMap<NodeId, Wavefront<Cell>>,
    del: FxHashMap<NodeId, Wavefront<Cell>>,
}

pub struct ScoreRing {
    slots: Vec<Slot>,
}

impl ScoreRing {
    pub fn new(window: Score) -> Self {
        assert!(window > 0);
        ScoreRing {
            slots: (0..window)
                .map(|_| Slot {
                    score: -1,
                    ins: FxHashMap::default(),
                    del: FxHashMap::default(),
                })
                .collect(),
        }
    }

    fn slot(&self, score: Score) -> &Slot {
        &self.slots[(score % self.slots.len() as Score) as usize]
    }

    fn slot_mut(&mut self, score: Score) -> &mut Slot {
        let w = self.slots.len() as Score;
        &mut self.slots[(score % w) as usize]
    }

    /// Claims the slot for `score`, erasing whatever older score used it.
    pub fn advance(&mut self, score: Score) {
        let slot = self.slot_mut(score);
        debug_assert!(slot.score < score);
        slot.score = score;
        slot.ins.clear();
        slot.del.clear();
    }

    pub fn ins(&self, score: Score, node: NodeId) -> Option<&Wavefront<Cell>> {
        if score < 0 {
            return None;
        }
        let slot = self.slot(score);
        if slot.score != score {
            return None;
        }
        slot.ins.get(&node)
    }

    pub fn del(&self, score: Score, node: NodeId) -> Option<&Wavefront<Cell>> {
        if score < 0 {
            return None;
        }
        let slot = self.slot(score);
        if slot.score != score {
            return None;
        }
        slot.del.get(&node)
    }

    pub fn put_ins(&mut self, score: Score, node: NodeId, wf: Wavefront<Cell>) {
        let slot = self.slot_mut(score);
        debug_assert_eq!(slot.score, score);
        slot.ins.insert(node, wf);
    }

    pub fn put_del(&mut self, score: Score, node: NodeId, wf: Wavefront<Cell>) {
        let slot = self.slot_mut(score);
        debug_assert_eq!(slot.score, score);
        slot.del.insert(node, wf);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn wf(offset: i32) -> Wavefront<Cell> {
        let mut w = Wavefront::new(0, 0, Cell::default());
        w[0] = Cell { offset, trace: 0 };
        w
    }

    #[test]
    fn recycled_slots_read_as_absent() {
        let mut ring = ScoreRing::new(3);
        ring.advance(0);
        ring.put_ins(0, 7, wf(5));
        assert_eq!(ring.ins(0, 7).unwrap()[0].offset, 5);

        ring.advance(1);
        ring.advance(2);
        assert!(ring.ins(0, 7).is_some());

        // Score 3 reuses slot 0 and erases it.
        ring.advance(3);
        assert!(ring.ins(0, 7).is_none());
        assert!(ring.ins(3, 7).is_none());
        ring.put_del(3, 7, wf(1));
        assert_eq!(ring.del(3, 7).unwrap()[0].offset, 1);
        assert!(ring.del(3, 8).is_none());
    }
}
