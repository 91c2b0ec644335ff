//! Typed errors surfaced to callers.

use crate::types::Score;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AlignError {
    /// Penalty preconditions violated at construction.
    #[error("invalid penalties: {0}")]
    InvalidPenalties(String),

    /// A GFA record that the subset parser cannot accept.
    #[error("malformed GFA at line {line}: {msg}")]
    MalformedGfa { line: usize, msg: String },

    /// Graph shape the aligner does not support (cycles, nonzero overlaps).
    #[error("unsupported graph: {0}")]
    UnsupportedGraph(String),

    /// Start node unknown or start offset outside its label.
    #[error("bad start position: {0}")]
    BadStart(String),

    /// Empty query or empty graph.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// The score bound was exhausted before the sink was reached.
    #[error("no alignment found within score bound {max_score}")]
    NoAlignment { max_score: Score },

    /// Impossible internal state; the alignment is aborted.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AlignError>;
