//! The immutable reference graph the aligner walks.
//!
//! Nodes carry string labels; edges are directed and overlap-free. The graph
//! must be a DAG: construction computes a topological order (which doubles as
//! the cycle check) and resolves the designated sink.

use crate::error::{AlignError, Result};
use crate::types::NodeId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub label: Vec<u8>,
    pub succs: SmallVec<[NodeId; 4]>,
    pub preds: SmallVec<[NodeId; 4]>,
}

/// Accumulates nodes and edges, then seals them into a [`Graph`].
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    by_name: FxHashMap<String, NodeId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or returns the existing id when the name is known.
    /// A known node keeps its label unless it was added label-less before.
    pub fn add_node(&mut self, name: &str, label: &[u8]) -> NodeId {
        if let Some(&id) = self.by_name.get(name) {
            if self.nodes[id as usize].label.is_empty() {
                self.nodes[id as usize].label = label.to_vec();
            }
            return id;
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            name: name.to_string(),
            label: label.to_vec(),
            succs: SmallVec::new(),
            preds: SmallVec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if !self.nodes[from as usize].succs.contains(&to) {
            self.nodes[from as usize].succs.push(to);
            self.nodes[to as usize].preds.push(from);
        }
    }

    /// Seals the graph: computes the topological order, rejects cycles, and
    /// resolves the sink. When several nodes have out-degree 0, an
    /// empty-label sink is synthesized behind them.
    pub fn build(mut self) -> Result<Graph> {
        if self.nodes.is_empty() {
            return Err(AlignError::EmptyInput("graph has no nodes"));
        }

        let terminals: Vec<NodeId> = (0..self.nodes.len() as NodeId)
            .filter(|&v| self.nodes[v as usize].succs.is_empty())
            .collect();
        let sink = match terminals.as_slice() {
            [] => return Err(AlignError::UnsupportedGraph("no sink node".into())),
            [only] => *only,
            many => {
                let many = many.to_vec();
                let sink = self.add_node("", b"");
                for v in many {
                    self.add_edge(v, sink);
                }
                sink
            }
        };

        let topo_rank = topological_ranks(&self.nodes)?;
        Ok(Graph {
            nodes: self.nodes,
            by_name: self.by_name,
            sink,
            topo_rank,
        })
    }
}

/// Kahn's algorithm; any leftover node means a cycle.
fn topological_ranks(nodes: &[Node]) -> Result<Vec<u32>> {
    let mut indeg: Vec<u32> = nodes.iter().map(|n| n.preds.len() as u32).collect();
    let mut queue: Vec<NodeId> = (0..nodes.len() as NodeId)
        .filter(|&v| indeg[v as usize] == 0)
        .collect();
    let mut rank = vec![u32::MAX; nodes.len()];
    let mut next = 0u32;
    let mut head = 0;
    while head < queue.len() {
        let v = queue[head];
        head += 1;
        rank[v as usize] = next;
        next += 1;
        for &w in &nodes[v as usize].succs {
            indeg[w as usize] -= 1;
            if indeg[w as usize] == 0 {
                queue.push(w);
            }
        }
    }
    if (next as usize) < nodes.len() {
        return Err(AlignError::UnsupportedGraph(
            "cycle reachable in reference graph".into(),
        ));
    }
    Ok(rank)
}

#[derive(Clone, Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    by_name: FxHashMap<String, NodeId>,
    sink: NodeId,
    topo_rank: Vec<u32>,
}

impl Graph {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn rank(&self, id: NodeId) -> u32 {
        self.topo_rank[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i as NodeId, n))
    }

    pub fn label_len(&self, id: NodeId) -> usize {
        self.nodes[id as usize].label.len()
    }

    /// Longest label in the graph; bounds the diagonal range of any node.
    pub fn max_label_len(&self) -> usize {
        self.nodes.iter().map(|n| n.label.len()).max().unwrap_or(0)
    }

    /// Sum of all label lengths; used for the default score bound.
    pub fn total_label_len(&self) -> usize {
        self.nodes.iter().map(|n| n.label.len()).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_and_ranks_a_dag() {
        let mut b = GraphBuilder::new();
        let a = b.add_node("a", b"AC");
        let c = b.add_node("c", b"GT");
        let d = b.add_node("d", b"TT");
        b.add_edge(a, c);
        b.add_edge(a, d);
        b.add_edge(c, d);
        let g = b.build().unwrap();
        assert_eq!(g.sink(), d);
        assert!(g.rank(a) < g.rank(c));
        assert!(g.rank(c) < g.rank(d));
    }

    #[test]
    fn synthesizes_sink_for_two_terminals() {
        let mut b = GraphBuilder::new();
        let a = b.add_node("a", b"A");
        let c = b.add_node("c", b"C");
        let d = b.add_node("d", b"G");
        b.add_edge(a, c);
        b.add_edge(a, d);
        let g = b.build().unwrap();
        assert_eq!(g.len(), 4);
        assert!(g.node(g.sink()).label.is_empty());
        assert_eq!(g.node(c).succs.as_slice(), &[g.sink()]);
    }

    #[test]
    fn rejects_cycles() {
        let mut b = GraphBuilder::new();
        let a = b.add_node("a", b"A");
        let c = b.add_node("c", b"C");
        let d = b.add_node("d", b"G");
        b.add_edge(a, c);
        b.add_edge(c, a);
        b.add_edge(c, d);
        assert!(matches!(
            b.build(),
            Err(AlignError::UnsupportedGraph(_))
        ));
    }

    #[test]
    fn rejects_empty_graph() {
        assert!(matches!(
            GraphBuilder::new().build(),
            Err(AlignError::EmptyInput(_))
        ));
    }
}
