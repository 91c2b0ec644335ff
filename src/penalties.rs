//! The user-facing affine cost model and its internally rescaled form.
//!
//! The search runs in a rescaled space where a match costs 0, so exact
//! matches extend along a diagonal without changing the score. The score
//! reported to the caller is always recomputed from the produced edit string
//! under the original penalties; the rescaled values only drive the search.

use crate::error::{AlignError, Result};
use crate::types::{EditOp, Edits, Score};

/// Affine-gap penalties, smaller total is better. A gap of length `k` costs
/// `gap_open + k * gap_extend`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Penalties {
    pub match_cost: Score,
    pub mismatch_cost: Score,
    pub gap_open: Score,
    pub gap_extend: Score,
}

impl Penalties {
    /// Validates the preconditions the rescaling relies on:
    /// all costs nonnegative, `gap_extend` positive, the match cost not
    /// larger than any other cost, and `gap_open >= gap_extend`.
    pub fn new(
        match_cost: Score,
        mismatch_cost: Score,
        gap_open: Score,
        gap_extend: Score,
    ) -> Result<Self> {
        let p = Penalties {
            match_cost,
            mismatch_cost,
            gap_open,
            gap_extend,
        };
        p.validate()?;
        Ok(p)
    }

    fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(AlignError::InvalidPenalties(format!("{msg}: {self:?}")));
        if self.match_cost < 0 || self.mismatch_cost < 0 || self.gap_open < 0 {
            return fail("negative cost");
        }
        if self.gap_extend <= 0 {
            return fail("gap_extend must be positive");
        }
        if self.match_cost > self.mismatch_cost {
            return fail("match_cost must not exceed mismatch_cost");
        }
        if self.match_cost > self.gap_open || self.match_cost > self.gap_extend {
            return fail("match_cost must not exceed gap costs");
        }
        if self.gap_open < self.gap_extend {
            return fail("gap_open must be at least gap_extend");
        }
        Ok(())
    }

    /// Rescale so matches become free: every operation is charged twice its
    /// cost minus the match cost per consumed character.
    pub(crate) fn rescale(&self) -> InternalPenalties {
        let mismatch = 2 * (self.mismatch_cost - self.match_cost);
        let gap_open = 2 * self.gap_open;
        let gap_extend = 2 * self.gap_extend - self.match_cost;
        InternalPenalties {
            mismatch,
            gap_open,
            gap_extend,
            window: mismatch.max(gap_open + gap_extend) + 1,
        }
    }

    /// Total penalty of an edit string under these penalties. A gap run is
    /// charged `gap_open` once plus `gap_extend` per character; runs of `I`
    /// and `D` are separate even when adjacent.
    pub fn score_edits(&self, edits: &Edits) -> Score {
        let mut score = 0;
        let mut prev: Option<EditOp> = None;
        for op in edits.iter() {
            score += match op {
                EditOp::Match => self.match_cost,
                EditOp::Mismatch => self.mismatch_cost,
                EditOp::Ins | EditOp::Del => {
                    let open = prev != Some(op);
                    self.gap_extend + if open { self.gap_open } else { 0 }
                }
            };
            prev = Some(op);
        }
        score
    }
}

/// Penalties in the match-free space the search runs in.
#[derive(Clone, Copy, Debug)]
pub(crate) struct InternalPenalties {
    pub mismatch: Score,
    pub gap_open: Score,
    pub gap_extend: Score,
    /// Number of past scores any transition can look back on, plus one.
    pub window: Score,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::EditOp::*;

    #[test]
    fn rejects_bad_penalties() {
        assert!(Penalties::new(0, 1, 2, 1).is_ok());
        assert!(Penalties::new(1, 0, 2, 1).is_err());
        assert!(Penalties::new(0, 1, 1, 2).is_err());
        assert!(Penalties::new(0, 1, 2, 0).is_err());
        assert!(Penalties::new(-1, 1, 2, 1).is_err());
        assert!(Penalties::new(2, 3, 3, 1).is_err());
    }

    #[test]
    fn rescaled_match_is_free() {
        let p = Penalties::new(1, 3, 4, 2).unwrap();
        let ip = p.rescale();
        assert_eq!(ip.mismatch, 4);
        assert_eq!(ip.gap_open, 8);
        assert_eq!(ip.gap_extend, 3);
        assert_eq!(ip.window, 12);
    }

    #[test]
    fn scores_gap_runs_affinely() {
        let p = Penalties::new(0, 2, 3, 1).unwrap();
        let edits: Edits = [Match, Ins, Ins, Match, Mismatch].into_iter().collect();
        // 0 + (3+1) + 1 + 0 + 2
        assert_eq!(p.score_edits(&edits), 7);
        // Adjacent I and D runs each pay their own open.
        let edits: Edits = [Ins, Del].into_iter().collect();
        assert_eq!(p.score_edits(&edits), 8);
    }
}
