//! Affine-gap alignment of a query sequence against a variation graph, with
//! an optional partial-order mode that accumulates a multiple sequence
//! alignment over repeated calls.
//!
//! The search is a diagonal-transition wavefront: scores grow one unit at a
//! time, per-node wavefronts hold furthest-reaching cells per diagonal,
//! exact matches extend for free in a rescaled cost space, and cells crossing
//! a node boundary jump into the successors at unchanged score. See
//! [`Aligner`] for one-shot use and [`MsaAligner`] for the progressive mode.
//!
//! ```
//! use wavegraph::{Aligner, Penalties};
//!
//! let gfa = "S\ta\tAC\nS\tb\tGT\nL\ta\t+\tb\t+\t0M\n";
//! let aligner = Aligner::from_gfa(Penalties::new(0, 2, 3, 1).unwrap(), gfa.as_bytes()).unwrap();
//! let alignment = aligner.align(b"ACGT", "a", 0).unwrap();
//! assert_eq!(alignment.edits.to_string(), "MMMM");
//! assert_eq!(alignment.score, 0);
//! ```

mod align;
mod aligner;
mod error;
mod gfa;
mod graph;
mod msa;
mod output;
mod penalties;
mod poa;
mod prune;
mod ring;
mod trace;
mod types;
mod wavefront;


pub use align::Aligner;
pub use error::{AlignError, Result};
pub use graph::{Graph, GraphBuilder, Node};
pub use msa::MsaAligner;
pub use penalties::Penalties;
pub use poa::PoaGraph;
pub use types::{Alignment, Diag, EditOp, Edits, NodeId, Offset, Score};
