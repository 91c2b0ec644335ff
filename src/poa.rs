//! The partial-order alignment graph behind the MSA aligner.
//!
//! Every vertex holds one character; each aligned sequence is threaded
//! through as a stored walk. Vertices occupying the same alignment column
//! are kept in mutual `aligned` sets, which is what the MSA emitter keys on.
//! The aligner itself never sees this graph: it runs against the compacted
//! form, where maximal linear chains collapse into labelled nodes.

use crate::error::{AlignError, Result};
use crate::graph::{Graph, GraphBuilder};
use crate::types::{EditOp, Edits, NodeId};
use smallvec::SmallVec;

pub type PoaIdx = u32;

#[derive(Clone, Debug)]
pub struct PoaNode {
    pub base: u8,
    pub succs: SmallVec<[PoaIdx; 2]>,
    pub preds: SmallVec<[PoaIdx; 2]>,
    /// Vertices sharing this vertex's alignment column (a clique).
    pub aligned: SmallVec<[PoaIdx; 2]>,
    /// Sequences whose walk visits this vertex.
    pub seqs: SmallVec<[u32; 2]>,
}

pub struct PoaGraph {
    nodes: Vec<PoaNode>,
    source: PoaIdx,
    sink: PoaIdx,
    /// Per sequence, the character vertices visited, in order.
    paths: Vec<Vec<PoaIdx>>,
}

impl PoaGraph {
    /// Seeds the graph with a single sequence: source, one vertex per
    /// character, sink.
    pub fn new(seed: &[u8]) -> Self {
        let mut g = PoaGraph {
            nodes: Vec::with_capacity(seed.len() + 2),
            source: 0,
            sink: 1,
            paths: Vec::new(),
        };
        g.push_node(0);
        g.push_node(0);
        let mut prev = g.source;
        let mut path = Vec::with_capacity(seed.len());
        for &ch in seed {
            let v = g.push_node(ch);
            g.nodes[v as usize].seqs.push(0);
            g.link(prev, v);
            path.push(v);
            prev = v;
        }
        g.link(prev, g.sink);
        g.paths.push(path);
        g
    }

    fn push_node(&mut self, base: u8) -> PoaIdx {
        let id = self.nodes.len() as PoaIdx;
        self.nodes.push(PoaNode {
            base,
            succs: SmallVec::new(),
            preds: SmallVec::new(),
            aligned: SmallVec::new(),
            seqs: SmallVec::new(),
        });
        id
    }

    fn link(&mut self, from: PoaIdx, to: PoaIdx) {
        if !self.nodes[from as usize].succs.contains(&to) {
            self.nodes[from as usize].succs.push(to);
            self.nodes[to as usize].preds.push(from);
        }
    }

    pub fn node(&self, v: PoaIdx) -> &PoaNode {
        &self.nodes[v as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn sequence_count(&self) -> usize {
        self.paths.len()
    }

    /// Topological order by depth-first search from the source.
    pub fn topo_order(&self) -> Vec<PoaIdx> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(PoaIdx, usize)> = vec![(self.source, 0)];
        visited[self.source as usize] = true;
        while let Some(&(v, next)) = stack.last() {
            let succs = &self.nodes[v as usize].succs;
            if next < succs.len() {
                stack.last_mut().unwrap().1 += 1;
                let w = succs[next];
                if !visited[w as usize] {
                    visited[w as usize] = true;
                    stack.push((w, 0));
                }
            } else {
                order.push(v);
                stack.pop();
            }
        }
        order.reverse();
        order
    }

    /// Threads an aligned query into the graph. `path` is the walk through
    /// the compacted graph and `runs` maps each compact node to the
    /// character vertices it spans.
    pub fn integrate(
        &mut self,
        query: &[u8],
        edits: &Edits,
        path: &[NodeId],
        runs: &[Vec<PoaIdx>],
    ) -> Result<()> {
        let seq_id = self.paths.len() as u32;

        // Flatten the walk into the reference vertex sequence, checking that
        // every run is edge-contiguous in this graph.
        let mut refseq: Vec<PoaIdx> = Vec::new();
        for &node in path {
            let run = runs.get(node as usize).ok_or_else(|| {
                AlignError::InternalInvariant(format!("path node {node} outside compact mapping"))
            })?;
            for pair in run.windows(2) {
                if !self.nodes[pair[0] as usize].succs.contains(&pair[1]) {
                    return Err(AlignError::InternalInvariant(
                        "compact node does not span a contiguous vertex run".into(),
                    ));
                }
            }
            refseq.extend_from_slice(run);
        }

        let mut qi = 0usize;
        let mut ri = 0usize;
        let mut prev = self.source;
        let mut walk = Vec::with_capacity(query.len());
        for op in edits.iter() {
            match op {
                EditOp::Match | EditOp::Mismatch => {
                    let u = *refseq.get(ri).ok_or_else(|| {
                        AlignError::InternalInvariant("edits overrun the reference walk".into())
                    })?;
                    let ch = query[qi];
                    let vtx = if self.nodes[u as usize].base == ch {
                        u
                    } else {
                        self.aligned_with_base(u, ch)
                            .unwrap_or_else(|| self.push_aligned(u, ch))
                    };
                    self.link(prev, vtx);
                    self.nodes[vtx as usize].seqs.push(seq_id);
                    walk.push(vtx);
                    prev = vtx;
                    qi += 1;
                    ri += 1;
                }
                EditOp::Ins => {
                    let vtx = self.push_node(query[qi]);
                    self.link(prev, vtx);
                    self.nodes[vtx as usize].seqs.push(seq_id);
                    walk.push(vtx);
                    prev = vtx;
                    qi += 1;
                }
                EditOp::Del => ri += 1,
            }
        }
        if qi != query.len() || ri != refseq.len() {
            return Err(AlignError::InternalInvariant(
                "edits do not consume query and reference walk exactly".into(),
            ));
        }
        self.link(prev, self.sink);
        self.paths.push(walk);
        Ok(())
    }

    fn aligned_with_base(&self, u: PoaIdx, ch: u8) -> Option<PoaIdx> {
        self.nodes[u as usize]
            .aligned
            .iter()
            .copied()
            .find(|&w| self.nodes[w as usize].base == ch)
    }

    /// Creates a fresh vertex for `ch` in the same column as `u`.
    fn push_aligned(&mut self, u: PoaIdx, ch: u8) -> PoaIdx {
        let vtx = self.push_node(ch);
        let mut column = self.nodes[u as usize].aligned.clone();
        column.push(u);
        for &w in &column {
            self.nodes[w as usize].aligned.push(vtx);
        }
        self.nodes[vtx as usize].aligned = column;
        vtx
    }

    /// Collapses maximal linear chains into labelled nodes. Returns the
    /// compacted graph, the per-node vertex runs (empty for source/sink)
    /// and the compact id of the source.
    pub fn compact(&self) -> Result<(Graph, Vec<Vec<PoaIdx>>, NodeId)> {
        let order = self.topo_order();
        let mut comp = vec![u32::MAX; self.nodes.len()];
        let mut builder = GraphBuilder::new();
        let mut runs: Vec<Vec<PoaIdx>> = Vec::new();

        let mut new_compact = |run: Vec<PoaIdx>, label: Vec<u8>, runs: &mut Vec<Vec<PoaIdx>>| {
            let id = builder.add_node(&runs.len().to_string(), &label);
            debug_assert_eq!(id as usize, runs.len());
            runs.push(run);
            id
        };

        for &v in &order {
            if comp[v as usize] != u32::MAX {
                continue;
            }
            if v == self.source || v == self.sink {
                let id = new_compact(Vec::new(), Vec::new(), &mut runs);
                comp[v as usize] = id;
                continue;
            }
            // Chain start: anything whose single predecessor cannot absorb it.
            let preds = &self.nodes[v as usize].preds;
            let starts_chain = preds.len() != 1 || {
                let p = preds[0];
                p == self.source || self.nodes[p as usize].succs.len() != 1
            };
            if !starts_chain {
                continue;
            }
            let mut run = vec![v];
            let mut cur = v;
            loop {
                let succs = &self.nodes[cur as usize].succs;
                if succs.len() != 1 {
                    break;
                }
                let w = succs[0];
                if w == self.sink || self.nodes[w as usize].preds.len() != 1 {
                    break;
                }
                run.push(w);
                cur = w;
            }
            let label: Vec<u8> = run.iter().map(|&u| self.nodes[u as usize].base).collect();
            let id = new_compact(run.clone(), label, &mut runs);
            for &u in &run {
                comp[u as usize] = id;
            }
        }

        if comp.iter().any(|&c| c == u32::MAX) {
            return Err(AlignError::InternalInvariant(
                "vertex not covered by compaction".into(),
            ));
        }

        for (u, node) in self.nodes.iter().enumerate() {
            for &w in &node.succs {
                let (cu, cw) = (comp[u], comp[w as usize]);
                if cu != cw {
                    builder.add_edge(cu, cw);
                }
            }
        }

        let graph = builder.build()?;
        Ok((graph, runs, comp[self.source as usize]))
    }

    /// Heaviest path from source to sink, weighting vertices by the number
    /// of sequences that visit them.
    pub fn consensus(&self) -> Vec<u8> {
        let order = self.topo_order();
        let mut best = vec![i64::MIN; self.nodes.len()];
        let mut from = vec![u32::MAX; self.nodes.len()];
        best[self.source as usize] = 0;
        for &v in &order {
            if best[v as usize] == i64::MIN {
                continue;
            }
            for &w in &self.nodes[v as usize].succs {
                let cand = best[v as usize] + self.nodes[w as usize].seqs.len() as i64;
                if cand > best[w as usize] {
                    best[w as usize] = cand;
                    from[w as usize] = v;
                }
            }
        }
        let mut out = Vec::new();
        let mut cur = self.sink;
        while cur != self.source && from[cur as usize] != u32::MAX {
            cur = from[cur as usize];
            if cur != self.source {
                out.push(self.nodes[cur as usize].base);
            }
        }
        out.reverse();
        out
    }

    /// One row per sequence; vertices sharing an aligned set share a column,
    /// `-` fills the columns a sequence does not visit.
    pub fn msa_rows(&self) -> Vec<String> {
        let order = self.topo_order();
        let mut col = vec![u32::MAX; self.nodes.len()];
        let mut columns = 0u32;
        for &v in &order {
            if v == self.source || v == self.sink || col[v as usize] != u32::MAX {
                continue;
            }
            col[v as usize] = columns;
            for &w in &self.nodes[v as usize].aligned {
                col[w as usize] = columns;
            }
            columns += 1;
        }

        self.paths
            .iter()
            .map(|path| {
                let mut row = String::with_capacity(columns as usize);
                let mut k = 0;
                for c in 0..columns {
                    if k < path.len() && col[path[k] as usize] == c {
                        row.push(self.nodes[path[k] as usize].base as char);
                        k += 1;
                    } else {
                        row.push('-');
                    }
                }
                debug_assert_eq!(k, path.len());
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seed_graph_shape() {
        let poa = PoaGraph::new(b"ACG");
        assert_eq!(poa.len(), 5);
        assert_eq!(poa.sequence_count(), 1);
        let order = poa.topo_order();
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], poa.source);
        assert_eq!(*order.last().unwrap(), poa.sink);
        assert_eq!(poa.consensus(), b"ACG");
    }

    #[test]
    fn compacts_seed_into_single_node() {
        let poa = PoaGraph::new(b"ACGT");
        let (graph, runs, source) = poa.compact().unwrap();
        // Source, one chain, sink.
        assert_eq!(graph.len(), 3);
        assert!(graph.node(source).label.is_empty());
        let chain = (0..graph.len() as u32)
            .find(|&v| !graph.node(v).label.is_empty())
            .unwrap();
        assert_eq!(graph.node(chain).label, b"ACGT");
        assert_eq!(runs[chain as usize].len(), 4);
    }

    #[test]
    fn msa_rows_for_seed() {
        let poa = PoaGraph::new(b"ACGT");
        assert_eq!(poa.msa_rows(), vec!["ACGT".to_string()]);
    }
}
