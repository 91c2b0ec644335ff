//! GFA ingest and emit, restricted to the subset the aligner consumes:
//! `S` segments and forward-oriented `L` links with zero overlap. Links may
//! precede their segments; resolution happens after the full read.

use crate::error::{AlignError, Result};
use crate::graph::{Graph, GraphBuilder};
use std::io::{BufRead, Write};

pub fn parse(reader: impl BufRead) -> Result<Graph> {
    let mut builder = GraphBuilder::new();
    let mut links: Vec<(String, String, usize)> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "S" => {
                if fields.len() < 3 {
                    return Err(malformed(lineno, "segment record needs name and sequence"));
                }
                let seq = if fields[2] == "*" { b"" as &[u8] } else { fields[2].as_bytes() };
                builder.add_node(fields[1], seq);
            }
            "L" => {
                if fields.len() < 6 {
                    return Err(malformed(lineno, "link record needs six fields"));
                }
                match (fields[2], fields[4]) {
                    ("+", "+") => {}
                    // Reverse-strand links are outside the supported subset.
                    ("+" | "-", "+" | "-") => continue,
                    _ => return Err(malformed(lineno, "unknown orientation")),
                }
                let overlap = fields[5]
                    .strip_suffix('M')
                    .and_then(|n| n.parse::<u64>().ok())
                    .ok_or_else(|| malformed(lineno, "unparseable overlap"))?;
                if overlap != 0 {
                    return Err(AlignError::UnsupportedGraph(format!(
                        "link with nonzero overlap {overlap}M at line {lineno}"
                    )));
                }
                links.push((fields[1].to_string(), fields[3].to_string(), lineno));
            }
            // Header, path, containment, walk and unknown records are ignored.
            _ => {}
        }
    }

    for (from, to, lineno) in links {
        let from = builder
            .node_id(&from)
            .ok_or_else(|| malformed(lineno, "link references unknown segment"))?;
        let to = builder
            .node_id(&to)
            .ok_or_else(|| malformed(lineno, "link references unknown segment"))?;
        builder.add_edge(from, to);
    }

    builder.build()
}

fn malformed(line: usize, msg: &str) -> AlignError {
    AlignError::MalformedGfa {
        line,
        msg: msg.to_string(),
    }
}

pub fn emit(graph: &Graph, mut out: impl Write) -> Result<()> {
    for (_, node) in graph.iter() {
        let seq = if node.label.is_empty() {
            "*".to_string()
        } else {
            String::from_utf8_lossy(&node.label).into_owned()
        };
        writeln!(out, "S\t{}\t{}", node.name, seq)?;
    }
    for (_, node) in graph.iter() {
        for &succ in &node.succs {
            writeln!(out, "L\t{}\t+\t{}\t+\t0M", node.name, graph.node(succ).name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn graph_of(text: &str) -> Result<Graph> {
        parse(text.as_bytes())
    }

    #[test]
    fn parses_segments_and_links() {
        let g = graph_of("H\tVN:Z:1.0\nS\ta\tACGT\nS\tb\tTT\nL\ta\t+\tb\t+\t0M\n").unwrap();
        assert_eq!(g.len(), 2);
        let a = g.node_id("a").unwrap();
        let b = g.node_id("b").unwrap();
        assert_eq!(g.node(a).label, b"ACGT");
        assert_eq!(g.node(a).succs.as_slice(), &[b]);
        assert_eq!(g.sink(), b);
    }

    #[test]
    fn links_may_precede_segments() {
        let g = graph_of("L\ta\t+\tb\t+\t0M\nS\ta\tA\nS\tb\tC\n").unwrap();
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn rejects_short_records_and_bad_overlap() {
        assert!(matches!(
            graph_of("S\tonly\n"),
            Err(AlignError::MalformedGfa { line: 1, .. })
        ));
        assert!(matches!(
            graph_of("S\ta\tA\nS\tb\tC\nL\ta\t+\tb\t+\tzz\n"),
            Err(AlignError::MalformedGfa { line: 3, .. })
        ));
        assert!(matches!(
            graph_of("S\ta\tA\nS\tb\tC\nL\ta\t+\tb\t+\t3M\n"),
            Err(AlignError::UnsupportedGraph(_))
        ));
        assert!(matches!(
            graph_of("S\ta\tA\nS\tb\tC\nL\ta\t?\tb\t+\t0M\n"),
            Err(AlignError::MalformedGfa { .. })
        ));
    }

    #[test]
    fn skips_reverse_links_and_unknown_records() {
        let g = graph_of("S\ta\tA\nS\tb\tC\nL\ta\t+\tb\t-\t0M\nP\tp\ta+\t*\nL\ta\t+\tb\t+\t0M\n")
            .unwrap();
        let a = g.node_id("a").unwrap();
        assert_eq!(g.node(a).succs.len(), 1);
    }

    #[test]
    fn emit_roundtrips_shape() {
        let g = graph_of("S\ta\tAC\nS\tb\tGT\nL\ta\t+\tb\t+\t0M\n").unwrap();
        let mut out = Vec::new();
        emit(&g, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("S\ta\tAC"));
        assert!(text.contains("L\ta\t+\tb\t+\t0M"));
    }
}
