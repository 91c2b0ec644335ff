//! Shared scalar types and the alignment result model.

use serde::Serialize;
use std::fmt;

/// Alignment penalty total. Signed so rescaled arithmetic can go through
/// intermediate negative values.
pub type Score = i32;

/// Diagonal index within a node: query position minus label position.
pub type Diag = i32;

/// Number of label characters consumed along a diagonal.
pub type Offset = i32;

/// Dense node identifier, assigned in order of first appearance.
pub type NodeId = u32;

/// Sentinel offset for an untouched cell.
pub const OFFSET_UNSET: Offset = -1;

/// One column of an alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOp {
    /// Query and reference agree; both advance.
    Match,
    /// Query and reference disagree; both advance.
    Mismatch,
    /// Extra query character.
    Ins,
    /// Extra reference character.
    Del,
}

impl EditOp {
    pub fn to_char(self) -> char {
        match self {
            EditOp::Match => 'M',
            EditOp::Mismatch => 'X',
            EditOp::Ins => 'I',
            EditOp::Del => 'D',
        }
    }
}

/// Edit operations of a full alignment, one entry per column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Edits(Vec<EditOp>);

impl Edits {
    pub fn new() -> Self {
        Edits(Vec::new())
    }

    pub fn push(&mut self, op: EditOp) {
        self.0.push(op);
    }

    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EditOp> + '_ {
        self.0.iter().copied()
    }

    pub fn count(&self, op: EditOp) -> usize {
        self.0.iter().filter(|&&o| o == op).count()
    }

    /// Number of query characters the edits consume.
    pub fn query_len(&self) -> usize {
        self.0
            .iter()
            .filter(|o| matches!(o, EditOp::Match | EditOp::Mismatch | EditOp::Ins))
            .count()
    }
}

impl FromIterator<EditOp> for Edits {
    fn from_iter<T: IntoIterator<Item = EditOp>>(iter: T) -> Self {
        Edits(iter.into_iter().collect())
    }
}

impl fmt::Display for Edits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.0 {
            write!(f, "{}", op.to_char())?;
        }
        Ok(())
    }
}

impl Serialize for Edits {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The result of aligning one query against the graph.
#[derive(Clone, Debug, Serialize)]
pub struct Alignment {
    /// Total penalty of `edits` under the caller's penalties.
    pub score: Score,
    /// Edit operations, query order.
    pub edits: Edits,
    /// Nodes traversed, in order. Always a directed walk in the graph.
    pub path: Vec<NodeId>,
    /// Label offset inside `path[0]` where the alignment begins.
    pub start_offset: Offset,
    /// Label offset inside the final path node where the alignment ends.
    pub end_offset: Offset,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn edits_display_roundtrip() {
        let edits: Edits = [EditOp::Match, EditOp::Mismatch, EditOp::Ins, EditOp::Del]
            .into_iter()
            .collect();
        assert_eq!(edits.to_string(), "MXID");
        assert_eq!(edits.query_len(), 3);
        assert_eq!(edits.count(EditOp::Del), 1);
    }
}
