//! One-shot public facade: a graph plus a cost model, aligned against by
//! name. Each call builds a fresh search; two aligners share nothing.

use crate::aligner::align_core;
use crate::error::{AlignError, Result};
use crate::gfa;
use crate::graph::Graph;
use crate::penalties::Penalties;
use crate::types::{Alignment, Offset, Score};
use std::io::BufRead;

pub struct Aligner {
    graph: Graph,
    penalties: Penalties,
    /// Optional cap on the rescaled score the search may reach before giving
    /// up with `NoAlignment`. Defaults to a bound no start-to-sink alignment
    /// can exceed.
    pub max_score: Option<Score>,
}

impl Aligner {
    pub fn new(penalties: Penalties, graph: Graph) -> Result<Self> {
        if graph.is_empty() {
            return Err(AlignError::EmptyInput("graph has no nodes"));
        }
        Ok(Aligner {
            graph,
            penalties,
            max_score: None,
        })
    }

    pub fn from_gfa(penalties: Penalties, reader: impl BufRead) -> Result<Self> {
        Self::new(penalties, gfa::parse(reader)?)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn penalties(&self) -> &Penalties {
        &self.penalties
    }

    /// Aligns `query` end-to-end, starting at `start_offset` inside
    /// `start_node`'s label and ending at the sink.
    pub fn align(&self, query: &[u8], start_node: &str, start_offset: Offset) -> Result<Alignment> {
        let start = self
            .graph
            .node_id(start_node)
            .ok_or_else(|| AlignError::BadStart(format!("unknown node {start_node:?}")))?;
        align_core(
            &self.graph,
            &self.penalties,
            query,
            start,
            start_offset,
            self.max_score,
        )
    }
}
