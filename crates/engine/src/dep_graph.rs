//! Dependency graph over cell positions.
//!
//! Tracks which cells a formula reads and, inversely, which formulas read a
//! given cell. The sheet consults it for cycle rejection before an edit
//! commits and for cache invalidation after one does.
//!
//! # Edge Direction
//!
//! ```text
//! A reads B   ⇒   B ∈ reads[A]  and  A ∈ readers[B]
//! ```
//!
//! # Invariants
//!
//! 1. **Bidirectional consistency:** `B ∈ reads[A]` iff `A ∈ readers[B]`.
//! 2. **No dangling entries:** empty sets are removed, not stored.
//! 3. **No duplicate edges:** set semantics; a formula mentioning the same
//!    cell twice still has one edge.
//! 4. **Atomic updates:** `replace_reads` is the only mutator touching both
//!    maps.
//! 5. **Acyclic:** callers gate every mutation on `would_create_cycle`.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// For each formula cell, the cells it reads (outgoing edges).
    reads: FxHashMap<Position, FxHashSet<Position>>,

    /// For each referenced cell, the formula cells reading it (incoming
    /// edges).
    readers: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells `cell` reads (its outgoing edges).
    pub fn reads_of(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.reads
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Cells reading `cell` (its incoming edges).
    pub fn readers_of(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.readers
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// True when the cell participates in no edge in either direction.
    /// Such a node may be physically dropped from the store.
    pub fn is_isolated(&self, cell: Position) -> bool {
        !self.reads.contains_key(&cell) && !self.readers.contains_key(&cell)
    }

    /// Replace the outgoing edges of `cell` atomically.
    ///
    /// Removes `cell` from all its old reads' reader sets, then wires the
    /// new set both ways. Pass an empty set to detach a cell that stopped
    /// being a formula.
    pub fn replace_reads(&mut self, cell: Position, new_reads: FxHashSet<Position>) {
        if let Some(old_reads) = self.reads.remove(&cell) {
            for read in old_reads {
                if let Some(readers) = self.readers.get_mut(&read) {
                    readers.remove(&cell);
                    // No dangling entries
                    if readers.is_empty() {
                        self.readers.remove(&read);
                    }
                }
            }
        }

        if new_reads.is_empty() {
            return;
        }

        for &read in &new_reads {
            self.readers.entry(read).or_default().insert(cell);
        }
        self.reads.insert(cell, new_reads);
    }

    /// Remove the outgoing edges of `cell` (content stopped being a
    /// formula). Incoming edges are untouched: other formulas may still
    /// read this cell.
    pub fn clear_reads(&mut self, cell: Position) {
        self.replace_reads(cell, FxHashSet::default());
    }

    /// Whether wiring `cell` to read `new_reads` would close a cycle.
    ///
    /// A cycle forms exactly when some proposed read can already reach
    /// `cell` through existing read edges; self-reference is the one-step
    /// case. Runs against the graph as it is, before any mutation, with an
    /// explicit stack and a visited set.
    ///
    /// The edges being replaced cannot cause false positives: they all
    /// start at `cell`, and the walk stops the moment it reaches `cell`.
    pub fn would_create_cycle(&self, cell: Position, new_reads: &[Position]) -> bool {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack: Vec<Position> = Vec::new();

        for &read in new_reads {
            if read == cell {
                return true;
            }
            stack.push(read);
        }

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(reads) = self.reads.get(&current) {
                for &next in reads {
                    if next == cell {
                        return true;
                    }
                    if !visited.contains(&next) {
                        stack.push(next);
                    }
                }
            }
        }

        false
    }

    /// Every cell whose value may embed `origin`'s, `origin` included: the
    /// closure over reader edges. Breadth-first with a visited set, so each
    /// cell appears exactly once even when several paths reach it.
    pub fn reader_closure(&self, origin: Position) -> Vec<Position> {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut queue: VecDeque<Position> = VecDeque::new();
        let mut closure: Vec<Position> = Vec::new();

        visited.insert(origin);
        queue.push_back(origin);

        while let Some(pos) = queue.pop_front() {
            closure.push(pos);
            if let Some(readers) = self.readers.get(&pos) {
                for &reader in readers {
                    if visited.insert(reader) {
                        queue.push_back(reader);
                    }
                }
            }
        }

        closure
    }

    /// Every position appearing as an edge endpoint, in either direction.
    #[cfg(test)]
    pub fn all_nodes(&self) -> FxHashSet<Position> {
        self.reads
            .keys()
            .chain(self.readers.keys())
            .copied()
            .collect()
    }

    /// Verify the structural invariants. Test-only.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (cell, reads) in &self.reads {
            assert!(!reads.is_empty(), "empty read set stored for {}", cell);
            for read in reads {
                assert!(
                    self.readers
                        .get(read)
                        .map_or(false, |r| r.contains(cell)),
                    "missing inverse edge: {} reads {}",
                    cell,
                    read
                );
            }
        }
        for (cell, readers) in &self.readers {
            assert!(!readers.is_empty(), "empty reader set stored for {}", cell);
            for reader in readers {
                assert!(
                    self.reads
                        .get(reader)
                        .map_or(false, |r| r.contains(cell)),
                    "missing forward edge: {} reads {}",
                    reader,
                    cell
                );
            }
        }
    }

    /// Verify acyclicity by draining the graph in topological order.
    /// Test-only.
    #[cfg(test)]
    pub fn assert_acyclic(&self) {
        let mut indegree: FxHashMap<Position, usize> = FxHashMap::default();
        for (&cell, reads) in &self.reads {
            indegree.entry(cell).or_insert(0);
            for &read in reads {
                *indegree.entry(read).or_insert(0) += 1;
            }
        }

        let mut ready: Vec<Position> = indegree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&pos, _)| pos)
            .collect();
        let mut drained = 0usize;

        while let Some(pos) = ready.pop() {
            drained += 1;
            if let Some(reads) = self.reads.get(&pos) {
                for read in reads {
                    let d = indegree
                        .get_mut(read)
                        .expect("edge target missing from indegree map");
                    *d -= 1;
                    if *d == 0 {
                        ready.push(*read);
                    }
                }
            }
        }

        assert_eq!(drained, indegree.len(), "dependency graph contains a cycle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(a1: &str) -> Position {
        Position::from_a1(a1).unwrap()
    }

    fn set(cells: &[&str]) -> FxHashSet<Position> {
        cells.iter().map(|a1| pos(a1)).collect()
    }

    fn sorted(iter: impl Iterator<Item = Position>) -> Vec<Position> {
        let mut v: Vec<Position> = iter.collect();
        v.sort();
        v
    }

    #[test]
    fn test_single_edge() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));

        assert_eq!(sorted(graph.reads_of(pos("B1"))), vec![pos("A1")]);
        assert_eq!(sorted(graph.readers_of(pos("A1"))), vec![pos("B1")]);
        assert!(graph.readers_of(pos("B1")).next().is_none());
        graph.assert_consistent();
    }

    #[test]
    fn test_rewiring_removes_stale_inverse_edges() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("C1"), set(&["A1", "B1"]));
        graph.replace_reads(pos("C1"), set(&["B1", "D1"]));

        assert!(graph.readers_of(pos("A1")).next().is_none());
        assert_eq!(sorted(graph.readers_of(pos("B1"))), vec![pos("C1")]);
        assert_eq!(sorted(graph.readers_of(pos("D1"))), vec![pos("C1")]);
        assert_eq!(
            sorted(graph.reads_of(pos("C1"))),
            vec![pos("B1"), pos("D1")]
        );
        graph.assert_consistent();
    }

    #[test]
    fn test_clear_reads_unwires() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.clear_reads(pos("B1"));

        assert!(graph.reads_of(pos("B1")).next().is_none());
        assert!(graph.readers_of(pos("A1")).next().is_none());
        assert!(graph.is_isolated(pos("A1")));
        assert!(graph.is_isolated(pos("B1")));
        graph.assert_consistent();
    }

    #[test]
    fn test_clear_reads_keeps_incoming() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.replace_reads(pos("A1"), set(&["Z9"]));

        // A1 stops being a formula but B1 still reads it
        graph.clear_reads(pos("A1"));
        assert_eq!(sorted(graph.readers_of(pos("A1"))), vec![pos("B1")]);
        assert!(!graph.is_isolated(pos("A1")));
        assert!(graph.is_isolated(pos("Z9")));
        graph.assert_consistent();
    }

    #[test]
    fn test_shared_read() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.replace_reads(pos("C1"), set(&["A1"]));

        assert_eq!(
            sorted(graph.readers_of(pos("A1"))),
            vec![pos("B1"), pos("C1")]
        );
        graph.assert_consistent();
    }

    #[test]
    fn test_cycle_self_reference() {
        let graph = DepGraph::new();
        assert!(graph.would_create_cycle(pos("A1"), &[pos("A1")]));
    }

    #[test]
    fn test_cycle_two_cell() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));

        assert!(graph.would_create_cycle(pos("A1"), &[pos("B1")]));
        assert!(!graph.would_create_cycle(pos("A1"), &[pos("C1")]));
    }

    #[test]
    fn test_cycle_indirect() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.replace_reads(pos("C1"), set(&["B1"]));
        graph.replace_reads(pos("D1"), set(&["C1"]));

        // A1 = ...D1... closes A1 <- B1 <- C1 <- D1 <- A1
        assert!(graph.would_create_cycle(pos("A1"), &[pos("D1")]));
        assert!(graph.would_create_cycle(pos("A1"), &[pos("E1"), pos("D1")]));
        assert!(!graph.would_create_cycle(pos("A1"), &[pos("E1")]));
    }

    #[test]
    fn test_cycle_check_ignores_replaced_edges() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));

        // Rewiring B1 away from A1 to C1 is fine even though C1 is fresh
        assert!(!graph.would_create_cycle(pos("B1"), &[pos("C1")]));
        // Re-stating the same edge is fine too
        assert!(!graph.would_create_cycle(pos("B1"), &[pos("A1")]));
    }

    #[test]
    fn test_cycle_check_mutates_nothing() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));

        assert!(graph.would_create_cycle(pos("A1"), &[pos("B1")]));
        assert!(graph.is_isolated(pos("C1")));
        assert_eq!(sorted(graph.reads_of(pos("B1"))), vec![pos("A1")]);
        graph.assert_consistent();
    }

    #[test]
    fn test_reader_closure_chain() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.replace_reads(pos("C1"), set(&["B1"]));

        let mut closure = graph.reader_closure(pos("A1"));
        closure.sort();
        assert_eq!(closure, vec![pos("A1"), pos("B1"), pos("C1")]);
    }

    #[test]
    fn test_reader_closure_diamond_visits_once() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.replace_reads(pos("C1"), set(&["A1"]));
        graph.replace_reads(pos("D1"), set(&["B1", "C1"]));

        let closure = graph.reader_closure(pos("A1"));
        assert_eq!(closure.len(), 4, "each cell exactly once: {:?}", closure);

        let mut sorted_closure = closure;
        sorted_closure.sort();
        assert_eq!(
            sorted_closure,
            vec![pos("A1"), pos("B1"), pos("C1"), pos("D1")]
        );
    }

    #[test]
    fn test_reader_closure_unreferenced_cell() {
        let graph = DepGraph::new();
        assert_eq!(graph.reader_closure(pos("A1")), vec![pos("A1")]);
    }

    #[test]
    fn test_duplicate_references_collapse() {
        let mut graph = DepGraph::new();
        // =A1+A1 supplies A1 twice; the set keeps one edge
        let mut reads = FxHashSet::default();
        reads.insert(pos("A1"));
        reads.insert(pos("A1"));
        graph.replace_reads(pos("B1"), reads);

        assert_eq!(graph.reads_of(pos("B1")).count(), 1);
        graph.assert_consistent();
    }

    #[test]
    fn test_assert_acyclic_passes_on_dag() {
        let mut graph = DepGraph::new();
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.replace_reads(pos("C1"), set(&["A1", "B1"]));
        graph.assert_acyclic();
    }

    #[test]
    #[should_panic(expected = "contains a cycle")]
    fn test_assert_acyclic_catches_cycle() {
        let mut graph = DepGraph::new();
        // Bypass the guard deliberately
        graph.replace_reads(pos("A1"), set(&["B1"]));
        graph.replace_reads(pos("B1"), set(&["A1"]));
        graph.assert_acyclic();
    }
}
