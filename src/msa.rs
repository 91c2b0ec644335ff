//! Progressive multiple sequence alignment: align a query against the
//! compacted partial-order graph, then thread it back into the graph and
//! recompact for the next round.

use crate::aligner::align_core;
use crate::error::{AlignError, Result};
use crate::gfa;
use crate::graph::Graph;
use crate::output;
use crate::penalties::Penalties;
use crate::poa::{PoaGraph, PoaIdx};
use crate::types::{Alignment, NodeId, Score};
use std::io::Write;

pub struct MsaAligner {
    penalties: Penalties,
    poa: PoaGraph,
    graph: Graph,
    runs: Vec<Vec<PoaIdx>>,
    source: NodeId,
    /// Forwarded to every alignment; see [`crate::Aligner::max_score`].
    pub max_score: Option<Score>,
}

impl MsaAligner {
    /// Seeds the partial-order graph with `initial`.
    pub fn new(penalties: Penalties, initial: &[u8]) -> Result<Self> {
        if initial.is_empty() {
            return Err(AlignError::EmptyInput("initial sequence is empty"));
        }
        let poa = PoaGraph::new(initial);
        let (graph, runs, source) = poa.compact()?;
        Ok(MsaAligner {
            penalties,
            poa,
            graph,
            runs,
            source,
            max_score: None,
        })
    }

    /// Aligns `query` against the current graph without touching it.
    pub fn align_only(&self, query: &[u8]) -> Result<Alignment> {
        align_core(
            &self.graph,
            &self.penalties,
            query,
            self.source,
            0,
            self.max_score,
        )
    }

    /// Aligns `query` and grows the partial-order graph with the result.
    pub fn align(&mut self, query: &[u8]) -> Result<Alignment> {
        let alignment = self.align_only(query)?;
        self.poa
            .integrate(query, &alignment.edits, &alignment.path, &self.runs)?;
        let (graph, runs, source) = self.poa.compact()?;
        self.graph = graph;
        self.runs = runs;
        self.source = source;
        Ok(alignment)
    }

    /// The compacted graph the next alignment will run against.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn poa(&self) -> &PoaGraph {
        &self.poa
    }

    pub fn sequence_count(&self) -> usize {
        self.poa.sequence_count()
    }

    pub fn consensus(&self) -> Vec<u8> {
        self.poa.consensus()
    }

    pub fn write_gfa(&self, out: impl Write) -> Result<()> {
        gfa::emit(&self.graph, out)
    }

    pub fn write_msa_fasta(&self, out: impl Write) -> Result<()> {
        output::write_msa_fasta(&self.poa, out)
    }

    pub fn write_dot(&self, out: impl Write) -> Result<()> {
        output::write_dot(&self.graph, out)
    }
}
