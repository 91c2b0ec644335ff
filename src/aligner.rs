//! The score-driven wavefront search over the reference graph.
//!
//! The driver grows a score `s = 0, 1, 2, …` and keeps, per active node, one
//! wavefront per matrix per score: furthest-reaching cells indexed by
//! diagonal. Within a wave the active nodes are processed in topological
//! order; insertion and deletion wavefronts are computed before the match
//! wavefront so that free gap closes land in the same wave. Match cells
//! extend along exact matches for free. A cell that consumes its node's full
//! label jumps into every successor at unchanged score, activating it lazily;
//! jumps out of a diagonal mark a growing band of diagonals in the source
//! node as dominated so they are not re-explored.
//!
//! Terminology:
//! - wavefront: the cells of one (node, matrix) at a fixed score.
//! - diagonal `d` in node `v`: cells with `query_pos - label_pos = d`.
//! - offset: label characters consumed on the diagonal; the cell at
//!   diagonal `d` with offset `j` has consumed `i = d + j` query characters.
//! - jump: transition from the last column of a node into the first column
//!   of a successor, at unchanged score.

use crate::error::{AlignError, Result};
use crate::graph::Graph;
use crate::penalties::{InternalPenalties, Penalties};
use crate::prune::InvalidDiagonals;
use crate::ring::ScoreRing;
use crate::trace::{Cell, Matrix, Step, TraceArena, TraceCell, TraceIdx, TRACE_NONE};
use crate::types::{Alignment, Diag, EditOp, Edits, NodeId, Offset, Score};
use crate::wavefront::{Scratchpad, Wavefront};
use log::{debug, trace};
use rustc_hash::FxHashMap;

/// A cell arriving in a node from outside its own wavefronts: either the
/// start position, or a landing from a predecessor jump.
struct Landing {
    diag: Diag,
    offset: Offset,
    via: Step,
    prev: TraceIdx,
}

#[derive(Default)]
struct Pending {
    m: Vec<Landing>,
    i: Vec<Landing>,
    d: Vec<Landing>,
}

/// Per-node append-only history of match wavefronts. Backtrace never reads
/// it (the arena carries the chains); the search reads back a bounded span
/// of past scores for mismatch steps and gap opens.
type MatchHistory = FxHashMap<NodeId, Vec<(Score, Wavefront<Cell>)>>;

fn m_at<'h>(hist: &'h MatchHistory, node: NodeId, score: Score) -> Option<&'h Wavefront<Cell>> {
    if score < 0 {
        return None;
    }
    let list = hist.get(&node)?;
    let idx = list.partition_point(|&(s, _)| s < score);
    match list.get(idx) {
        Some((s, wf)) if *s == score => Some(wf),
        _ => None,
    }
}

/// Projects every live cell of `src` into the scratchpad with the diagonal
/// and offset shift of one edit operation, skipping cells that would leave
/// the node or the query, and diagonals already dominated.
#[allow(clippy::too_many_arguments)]
fn sparsify(
    scratch: &mut Scratchpad,
    invalid: &InvalidDiagonals,
    node: NodeId,
    matrix: Matrix,
    src: &Wavefront<Cell>,
    d_shift: Diag,
    off_shift: Offset,
    via: Step,
    label_len: Offset,
    query_len: Offset,
) {
    for d_src in src.range() {
        let cell = src[d_src];
        if !cell.is_set() {
            continue;
        }
        let d = d_src + d_shift;
        let off = cell.offset + off_shift;
        if off > label_len || d + off > query_len {
            continue;
        }
        if !invalid.is_valid(node, matrix, d) {
            continue;
        }
        scratch.combine(d, off, via, cell.trace);
    }
}

/// Writes the scratchpad out as a dense wavefront, materializing every
/// surviving cell in the arena, and clears the scratchpad.
fn flush(scratch: &mut Scratchpad, arena: &mut TraceArena, node: NodeId) -> Option<Wavefront<Cell>> {
    let (lo, hi) = scratch.touched_range()?;
    let mut wf = Wavefront::new(lo, hi, Cell::default());
    for d in lo..=hi {
        let c = scratch.get(d);
        if c.is_set() {
            let trace = arena.push(TraceCell {
                node,
                diag: d,
                offset: c.offset,
                via: c.via,
                prev: c.prev,
            });
            wf[d] = Cell {
                offset: c.offset,
                trace,
            };
        }
    }
    scratch.reset();
    Some(wf)
}

pub(crate) struct Search<'a> {
    graph: &'a Graph,
    q: &'a [u8],
    n: Offset,
    pen: InternalPenalties,
    start_node: NodeId,
    start_offset: Offset,
    max_score: Score,

    ring: ScoreRing,
    arena: TraceArena,
    invalid: InvalidDiagonals,
    m_hist: MatchHistory,
    scratch: Scratchpad,

    /// Active nodes, kept sorted by topological rank. Jumps follow edges, so
    /// a node activated mid-wave always sorts after the node being processed.
    active: Vec<NodeId>,
    is_active: Vec<bool>,
    pending: FxHashMap<NodeId, Pending>,

    end: Option<TraceIdx>,
}

impl<'a> Search<'a> {
    pub(crate) fn new(
        graph: &'a Graph,
        penalties: &Penalties,
        q: &'a [u8],
        start_node: NodeId,
        start_offset: Offset,
        max_score: Option<Score>,
    ) -> Search<'a> {
        let pen = penalties.rescale();
        let n = q.len() as Offset;
        let max_score = max_score.unwrap_or_else(|| default_score_bound(graph, &pen, n));
        Search {
            graph,
            q,
            n,
            start_node,
            start_offset,
            max_score,
            ring: ScoreRing::new(pen.window),
            arena: TraceArena::new(),
            invalid: InvalidDiagonals::new(pen.gap_open, pen.gap_extend),
            m_hist: MatchHistory::default(),
            scratch: Scratchpad::new(-(graph.max_label_len() as Diag), n),
            active: Vec::new(),
            is_active: vec![false; graph.len()],
            pending: FxHashMap::default(),
            end: None,
            pen,
        }
    }

    fn activate(&mut self, node: NodeId) {
        if self.is_active[node as usize] {
            return;
        }
        self.is_active[node as usize] = true;
        let rank = self.graph.rank(node);
        let pos = self
            .active
            .partition_point(|&u| self.graph.rank(u) < rank);
        self.active.insert(pos, node);
    }

    /// Runs the search to completion and returns the alignment.
    pub(crate) fn run(mut self) -> Result<Alignment> {
        self.ring.advance(0);
        self.activate(self.start_node);
        self.pending
            .entry(self.start_node)
            .or_default()
            .m
            .push(Landing {
                diag: -self.start_offset,
                offset: self.start_offset,
                via: Step::Seed,
                prev: TRACE_NONE,
            });

        let mut s = 0;
        let end = loop {
            let mut idx = 0;
            while idx < self.active.len() {
                let v = self.active[idx];
                self.process_node(v, s);
                idx += 1;
            }
            debug_assert!(
                self.pending.values().all(|p| p.m.is_empty() && p.i.is_empty() && p.d.is_empty()),
                "jump landed on a node processed earlier in the wave"
            );
            self.pending.clear();

            if let Some(end) = self.end {
                debug!(
                    "alignment found at rescaled score {s}, {} active nodes, {} cells",
                    self.active.len(),
                    self.arena.len()
                );
                break end;
            }

            s += 1;
            if s > self.max_score {
                return Err(AlignError::NoAlignment {
                    max_score: self.max_score,
                });
            }
            self.ring.advance(s);
            self.invalid.expand();
            self.invalid.compact();
        };

        self.backtrace(end)
    }

    fn process_node(&mut self, v: NodeId, s: Score) {
        let pend = self.pending.remove(&v).unwrap_or_default();
        let label_len = self.graph.label_len(v) as Offset;
        let n = self.n;
        let (o, e, x) = (self.pen.gap_open, self.pen.gap_extend, self.pen.mismatch);

        // Insertion wavefront: landings, then extensions, then opens.
        for l in &pend.i {
            if l.offset <= label_len
                && l.diag + l.offset <= n
                && self.invalid.is_valid(v, Matrix::I, l.diag)
            {
                self.scratch.combine(l.diag, l.offset, l.via, l.prev);
            }
        }
        if let Some(src) = self.ring.ins(s - e, v) {
            sparsify(
                &mut self.scratch,
                &self.invalid,
                v,
                Matrix::I,
                src,
                1,
                0,
                Step::ExtendIns,
                label_len,
                n,
            );
        }
        if let Some(src) = m_at(&self.m_hist, v, s - o - e) {
            sparsify(
                &mut self.scratch,
                &self.invalid,
                v,
                Matrix::I,
                src,
                1,
                0,
                Step::OpenIns,
                label_len,
                n,
            );
        }
        let mut i_jumps = Vec::new();
        if let Some(wf) = flush(&mut self.scratch, &mut self.arena, v) {
            collect_boundary(&wf, label_len, &mut i_jumps);
            self.ring.put_ins(s, v, wf);
        }

        // Deletion wavefront: same shape, shifted the other way.
        for l in &pend.d {
            if l.offset <= label_len
                && l.diag + l.offset <= n
                && self.invalid.is_valid(v, Matrix::D, l.diag)
            {
                self.scratch.combine(l.diag, l.offset, l.via, l.prev);
            }
        }
        if let Some(src) = self.ring.del(s - e, v) {
            sparsify(
                &mut self.scratch,
                &self.invalid,
                v,
                Matrix::D,
                src,
                -1,
                1,
                Step::ExtendDel,
                label_len,
                n,
            );
        }
        if let Some(src) = m_at(&self.m_hist, v, s - o - e) {
            sparsify(
                &mut self.scratch,
                &self.invalid,
                v,
                Matrix::D,
                src,
                -1,
                1,
                Step::OpenDel,
                label_len,
                n,
            );
        }
        let mut d_jumps = Vec::new();
        if let Some(wf) = flush(&mut self.scratch, &mut self.arena, v) {
            collect_boundary(&wf, label_len, &mut d_jumps);
            self.ring.put_del(s, v, wf);
        }

        // Match wavefront: landings, free gap closes, then the mismatch step.
        for l in &pend.m {
            if l.offset <= label_len
                && l.diag + l.offset <= n
                && self.invalid.is_valid(v, Matrix::M, l.diag)
            {
                self.scratch.combine(l.diag, l.offset, l.via, l.prev);
            }
        }
        if let Some(src) = self.ring.ins(s, v) {
            sparsify(
                &mut self.scratch,
                &self.invalid,
                v,
                Matrix::M,
                src,
                0,
                0,
                Step::CloseIns,
                label_len,
                n,
            );
        }
        if let Some(src) = self.ring.del(s, v) {
            sparsify(
                &mut self.scratch,
                &self.invalid,
                v,
                Matrix::M,
                src,
                0,
                0,
                Step::CloseDel,
                label_len,
                n,
            );
        }
        if x > 0 {
            if let Some(src) = m_at(&self.m_hist, v, s - x) {
                sparsify(
                    &mut self.scratch,
                    &self.invalid,
                    v,
                    Matrix::M,
                    src,
                    0,
                    1,
                    Step::Mismatch,
                    label_len,
                    n,
                );
            }
        }
        if self.scratch.is_empty() {
            self.emit_jumps(v, label_len, &i_jumps, Matrix::I);
            self.emit_jumps(v, label_len, &d_jumps, Matrix::D);
            return;
        }

        self.extend_matches(v, label_len);

        let mut m_jumps = Vec::new();
        if let Some(wf) = flush(&mut self.scratch, &mut self.arena, v) {
            collect_boundary(&wf, label_len, &mut m_jumps);

            if v == self.graph.sink() && self.end.is_none() {
                if let Some(c) = wf.get(n - label_len) {
                    if c.is_set() && c.offset == label_len {
                        self.end = Some(c.trace);
                    }
                }
            }

            self.m_hist.entry(v).or_default().push((s, wf));
        }

        self.emit_jumps(v, label_len, &m_jumps, Matrix::M);
        self.emit_jumps(v, label_len, &i_jumps, Matrix::I);
        self.emit_jumps(v, label_len, &d_jumps, Matrix::D);
    }

    /// Walks exact matches along every touched diagonal. When the rescaled
    /// mismatch cost is zero, unequal pairs are consumed too; the backtrace
    /// re-compares characters, so reported edits stay faithful.
    fn extend_matches(&mut self, v: NodeId, label_len: Offset) {
        let label = &self.graph.node(v).label;
        let free_sub = self.pen.mismatch == 0;
        for k in 0..self.scratch.touched().len() {
            let d = self.scratch.touched()[k];
            let mut j = self.scratch.get(d).offset;
            let start = j;
            while j < label_len
                && d + j < self.n
                && (free_sub || self.q[(d + j) as usize] == label[j as usize])
            {
                j += 1;
            }
            if j != start {
                self.scratch.get_mut(d).offset = j;
            }
        }
    }

    /// Sends boundary cells into every successor and records the vacated
    /// diagonals as dominated. A node without successors dominates nothing.
    fn emit_jumps(&mut self, v: NodeId, label_len: Offset, jumps: &[(Diag, TraceIdx)], kind: Matrix) {
        if jumps.is_empty() {
            return;
        }
        let succs = self.graph.node(v).succs.clone();
        for &(d, trace_idx) in jumps {
            trace!("{:?}-jump out of node {v} diagonal {d}", kind);
            for &w in &succs {
                self.activate(w);
                let pend = self.pending.entry(w).or_default();
                let landing = Landing {
                    diag: d + label_len,
                    offset: 0,
                    via: match kind {
                        Matrix::M => Step::JumpMatch,
                        Matrix::I => Step::JumpIns,
                        Matrix::D => Step::JumpDel,
                    },
                    prev: trace_idx,
                };
                match kind {
                    Matrix::M => pend.m.push(landing),
                    Matrix::I => pend.i.push(landing),
                    Matrix::D => pend.d.push(landing),
                }
            }
            if !succs.is_empty() {
                match kind {
                    Matrix::M => self.invalid.on_match_jump(v, d),
                    Matrix::I => self.invalid.on_ins_jump(v, d),
                    // Deletion jumps prune nothing; see DESIGN.md.
                    Matrix::D => {}
                }
            }
        }
    }

    /// Walks arena predecessors from the winning sink cell, emitting edits
    /// and recording a path hop per jump. Built reversed, flipped at the end.
    fn backtrace(&self, end: TraceIdx) -> Result<Alignment> {
        let mut edits = Edits::new();
        let mut path = vec![self.arena.get(end).node];
        let end_offset = self.arena.get(end).offset;

        let mut cur = end;
        loop {
            let c = *self.arena.get(cur);
            if c.via != Step::Seed && c.prev == TRACE_NONE {
                return Err(AlignError::InternalInvariant(
                    "backtrace reached a cell without predecessor".into(),
                ));
            }
            debug_assert!(c.via == Step::Seed || c.prev < cur);
            match c.via {
                Step::Seed => {
                    self.emit_run(&mut edits, c.node, c.diag, self.start_offset, c.offset);
                    break;
                }
                Step::Mismatch | Step::CloseIns | Step::CloseDel => {
                    let p = self.arena.get(c.prev);
                    self.emit_run(&mut edits, c.node, c.diag, p.offset, c.offset);
                }
                Step::JumpMatch => {
                    self.emit_run(&mut edits, c.node, c.diag, 0, c.offset);
                    path.push(self.arena.get(c.prev).node);
                }
                Step::OpenIns | Step::ExtendIns => edits.push(EditOp::Ins),
                Step::OpenDel | Step::ExtendDel => edits.push(EditOp::Del),
                Step::JumpIns | Step::JumpDel => {
                    debug_assert_eq!(c.offset, 0);
                    path.push(self.arena.get(c.prev).node);
                }
            }
            cur = c.prev;
        }

        edits.reverse();
        path.reverse();

        debug_assert_eq!(edits.query_len(), self.n as usize, "edits must consume the query");
        debug_assert!(path
            .windows(2)
            .all(|w| self.graph.node(w[0]).succs.contains(&w[1])));

        Ok(Alignment {
            score: 0,
            edits,
            path,
            start_offset: self.start_offset,
            end_offset,
        })
    }

    /// Pushes the diagonal stretch `j0..j1` of a node in reverse, comparing
    /// characters to tell matches from substitutions.
    fn emit_run(&self, edits: &mut Edits, v: NodeId, d: Diag, j0: Offset, j1: Offset) {
        let label = &self.graph.node(v).label;
        let mut j = j1;
        while j > j0 {
            j -= 1;
            let op = if self.q[(d + j) as usize] == label[j as usize] {
                EditOp::Match
            } else {
                EditOp::Mismatch
            };
            edits.push(op);
        }
    }
}

fn collect_boundary(wf: &Wavefront<Cell>, label_len: Offset, out: &mut Vec<(Diag, TraceIdx)>) {
    for d in wf.range() {
        let c = wf[d];
        if c.is_set() && c.offset == label_len {
            out.push((d, c.trace));
        }
    }
}

/// A rescaled score that any start-to-sink alignment stays under: open and
/// close one gap over the whole query and one over the longest possible
/// label path.
fn default_score_bound(graph: &Graph, pen: &InternalPenalties, n: Offset) -> Score {
    let total = graph.total_label_len() as i64;
    let bound = 2 * (pen.gap_open as i64 + pen.gap_extend as i64)
        + (n as i64 + total) * pen.gap_extend.max(pen.mismatch) as i64
        + 1;
    bound.min(i32::MAX as i64 / 2) as Score
}

/// Aligns `q` end-to-end from `(start_node, start_offset)` to the sink.
pub(crate) fn align_core(
    graph: &Graph,
    penalties: &Penalties,
    q: &[u8],
    start_node: NodeId,
    start_offset: Offset,
    max_score: Option<Score>,
) -> Result<Alignment> {
    if q.is_empty() {
        return Err(AlignError::EmptyInput("query is empty"));
    }
    let label_len = graph.label_len(start_node) as Offset;
    let ok = if label_len == 0 {
        start_offset == 0
    } else {
        (0..label_len).contains(&start_offset)
    };
    if !ok {
        return Err(AlignError::BadStart(format!(
            "offset {start_offset} outside label of node {}",
            graph.node(start_node).name
        )));
    }

    let search = Search::new(graph, penalties, q, start_node, start_offset, max_score);
    let mut alignment = search.run()?;
    // The reported score is recomputed from the edits under the caller's
    // penalties; the rescaled search score is only an ordering device.
    alignment.score = penalties.score_edits(&alignment.edits);
    Ok(alignment)
}
