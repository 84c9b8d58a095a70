//! The sheet: node store, dependency graph, and every operation on them.
//!
//! All mutation funnels through `set_cell` and `clear_cell`; both validate
//! fully before touching anything, so a rejected call leaves no trace.
//! Values are computed lazily on read and memoized per formula cell; edits
//! invalidate the memo of the edited cell and of every transitive reader.

use std::io::{self, Write};

use rustc_hash::FxHashMap;

use crate::cell::{strip_escape, Cell, CellContent};
use crate::dep_graph::DepGraph;
use crate::error::EngineError;
use crate::formula::CellLookup;
use crate::position::{Position, Size};
use crate::value::CellValue;

#[derive(Default, Debug)]
pub struct Sheet {
    cells: FxHashMap<Position, Cell>,
    deps: DepGraph,
    /// Formula evaluations actually performed (cache misses). Monotonic;
    /// the observable measure of invalidation behavior.
    evals: std::cell::Cell<u64>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Set the cell at `pos` from raw input text.
    ///
    /// Validation happens in full before the first write: position bounds,
    /// formula parse, then the cycle guard. Any rejection returns with the
    /// sheet untouched. The commit replaces edges atomically, swaps the
    /// content in place (node identity survives), and invalidates the memo
    /// of `pos` and of every transitive reader.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), EngineError> {
        if !pos.is_valid() {
            return Err(EngineError::InvalidPosition(pos));
        }

        // Identical text is a no-op: no re-parse, no cache effects
        if let Some(cell) = self.cells.get(&pos) {
            if cell.text() == text {
                return Ok(());
            }
        }

        let content = CellContent::from_input(text).map_err(EngineError::Syntax)?;
        let new_reads: Vec<Position> = match &content {
            CellContent::Formula { formula, .. } => formula.referenced_cells().to_vec(),
            _ => Vec::new(),
        };

        if self.deps.would_create_cycle(pos, &new_reads) {
            return Err(EngineError::CircularDependency(pos));
        }

        // Commit point: nothing below can fail
        for &read in &new_reads {
            self.cells.entry(read).or_insert_with(Cell::empty);
        }
        self.deps.replace_reads(pos, new_reads.into_iter().collect());
        self.cells
            .entry(pos)
            .or_insert_with(Cell::empty)
            .set_content(content);
        self.invalidate(pos);

        Ok(())
    }

    /// Reset the cell at `pos` to empty.
    ///
    /// The node keeps its identity while other formulas read it; readers
    /// see the empty value after their memos are invalidated. A node left
    /// with no edges in either direction is dropped from the store.
    /// Clearing an absent or already-empty cell is a no-op.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), EngineError> {
        if !pos.is_valid() {
            return Err(EngineError::InvalidPosition(pos));
        }

        match self.cells.get(&pos) {
            None => return Ok(()),
            Some(cell) if cell.is_empty() => return Ok(()),
            Some(_) => {}
        }

        self.deps.clear_reads(pos);
        if let Some(cell) = self.cells.get_mut(&pos) {
            cell.set_content(CellContent::Empty);
        }
        self.invalidate(pos);

        if self.deps.is_isolated(pos) {
            self.cells.remove(&pos);
        }

        Ok(())
    }

    /// Drop the memoized results of `origin` and of every transitive
    /// reader. The walk always covers the whole reader closure: a cold
    /// memo on the way proves nothing about readers beyond it.
    fn invalidate(&mut self, origin: Position) {
        for pos in self.deps.reader_closure(origin) {
            if let Some(cell) = self.cells.get(&pos) {
                cell.clear_cache();
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The node at `pos`, if one has been materialized (set directly, or
    /// auto-vivified by a formula referencing it).
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, EngineError> {
        if !pos.is_valid() {
            return Err(EngineError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos))
    }

    /// Text form at `pos`. Absent nodes read as empty text.
    pub fn get_text(&self, pos: Position) -> Result<String, EngineError> {
        Ok(self.get_cell(pos)?.map(Cell::text).unwrap_or_default())
    }

    /// Observable value at `pos`. Absent nodes read as empty. Warms the
    /// formula memo on the way; performs no other mutation.
    pub fn value(&self, pos: Position) -> Result<CellValue, EngineError> {
        if !pos.is_valid() {
            return Err(EngineError::InvalidPosition(pos));
        }
        Ok(self.cell_value(pos))
    }

    /// Number of formula evaluations performed so far (cache misses only;
    /// warm reads do not count).
    pub fn eval_count(&self) -> u64 {
        self.evals.get()
    }

    /// Iterate materialized nodes in unspecified order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells.iter().map(|(&pos, cell)| (pos, cell))
    }

    // =========================================================================
    // Printing
    // =========================================================================

    /// Smallest rectangle covering every cell with non-empty text.
    /// Cleared nodes, auto-vivified empties, and never-set positions do
    /// not extend it.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (pos, cell) in &self.cells {
            if cell.is_empty() {
                continue;
            }
            size.rows = size.rows.max(pos.row + 1);
            size.cols = size.cols.max(pos.col + 1);
        }
        size
    }

    /// Write the printable rectangle as rendered values: fields separated
    /// by tabs, one row per line. Empty cells render as empty fields,
    /// formula errors as their token.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, pos| sheet.cell_value(pos).to_string())
    }

    /// Write the printable rectangle as raw text forms, same layout as
    /// `print_values`.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, pos| {
            sheet.cells.get(&pos).map(Cell::text).unwrap_or_default()
        })
    }

    fn print_with<W: Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Self, Position) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                write!(out, "{}", render(self, Position::new(row, col)))?;
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    // =========================================================================
    // Test support
    // =========================================================================

    /// Structural invariants: edge maps mirror each other, the graph is
    /// acyclic, and every edge endpoint has a materialized node.
    #[cfg(test)]
    pub(crate) fn assert_internally_consistent(&self) {
        self.deps.assert_consistent();
        self.deps.assert_acyclic();
        for node in self.deps.all_nodes() {
            assert!(
                self.cells.contains_key(&node),
                "edge endpoint {} has no node",
                node
            );
        }
    }
}

impl CellLookup for Sheet {
    /// The evaluation entry point. Formula cells return their memoized
    /// result when warm; a cold read evaluates (recursing through this
    /// same lookup), stores the memo, and bumps the eval counter.
    fn cell_value(&self, pos: Position) -> CellValue {
        let Some(cell) = self.cells.get(&pos) else {
            return CellValue::Empty;
        };
        match cell.content() {
            CellContent::Empty => CellValue::Empty,
            CellContent::Text(raw) => CellValue::Text(strip_escape(raw).to_string()),
            CellContent::Formula { formula, cache } => {
                let cached = *cache.borrow();
                let result = match cached {
                    Some(result) => result,
                    None => {
                        self.evals.set(self.evals.get() + 1);
                        let result = formula.evaluate(self);
                        *cache.borrow_mut() = Some(result);
                        result
                    }
                };
                match result {
                    Ok(n) => CellValue::Number(n),
                    Err(e) => CellValue::Error(e),
                }
            }
        }
    }
}
