//! Flat-file emitters for the MSA aligner: FASTA rows of the column-aligned
//! sequences, and a Graphviz rendering of the compacted graph.

use crate::error::Result;
use crate::graph::Graph;
use crate::poa::PoaGraph;
use std::io::Write;

pub fn write_msa_fasta(poa: &PoaGraph, mut out: impl Write) -> Result<()> {
    for (idx, row) in poa.msa_rows().iter().enumerate() {
        writeln!(out, ">seq{idx}")?;
        writeln!(out, "{row}")?;
    }
    Ok(())
}

pub fn write_dot(graph: &Graph, mut out: impl Write) -> Result<()> {
    writeln!(out, "digraph G {{")?;
    for (id, node) in graph.iter() {
        writeln!(
            out,
            "    {id} [label=\"{}\"]",
            String::from_utf8_lossy(&node.label)
        )?;
    }
    for (id, node) in graph.iter() {
        for &succ in &node.succs {
            writeln!(out, "    {id} -> {succ}")?;
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::poa::PoaGraph;

    #[test]
    fn fasta_and_dot_shapes() {
        let poa = PoaGraph::new(b"AC");
        let mut fasta = Vec::new();
        write_msa_fasta(&poa, &mut fasta).unwrap();
        assert_eq!(String::from_utf8(fasta).unwrap(), ">seq0\nAC\n");

        let (graph, _, _) = poa.compact().unwrap();
        let mut dot = Vec::new();
        write_dot(&graph, &mut dot).unwrap();
        let text = String::from_utf8(dot).unwrap();
        assert!(text.starts_with("digraph G {"));
        assert!(text.contains("[label=\"AC\"]"));
        assert!(text.trim_end().ends_with('}'));
    }
}
