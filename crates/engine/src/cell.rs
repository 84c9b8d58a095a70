//! Cell content: the three-way split between empty, literal text, and
//! formulas, plus the per-cell result memo.

use std::cell::RefCell;

use crate::formula::Formula;
use crate::position::Position;
use crate::value::FormulaError;

/// Leading character selecting formula parsing.
pub const FORMULA_MARKER: char = '=';
/// Leading character of a text cell that hides itself from the value.
/// `'=1+2` is text whose value is `=1+2`.
pub const ESCAPE_MARKER: char = '\'';

/// What a cell holds.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Empty,
    /// Literal text, stored raw (escape marker included).
    Text(String),
    Formula {
        formula: Formula,
        /// Memoized evaluation result. Cleared by invalidation, filled by
        /// the sheet on read.
        cache: RefCell<Option<Result<f64, FormulaError>>>,
    },
}

impl CellContent {
    /// Classify raw input.
    ///
    /// Empty string is empty content; the formula marker followed by at
    /// least one character parses as a formula (a parse failure rejects the
    /// whole input); everything else, the bare marker included, is text.
    pub fn from_input(text: &str) -> Result<Self, String> {
        if text.is_empty() {
            return Ok(CellContent::Empty);
        }
        if let Some(expression) = text.strip_prefix(FORMULA_MARKER) {
            if !expression.is_empty() {
                let formula = Formula::parse(expression)?;
                return Ok(CellContent::Formula {
                    formula,
                    cache: RefCell::new(None),
                });
            }
        }
        Ok(CellContent::Text(text.to_string()))
    }
}

/// Strip a leading escape marker from a text cell's raw form. The marker
/// only hides itself; the rest of the text is untouched.
pub(crate) fn strip_escape(raw: &str) -> &str {
    raw.strip_prefix(ESCAPE_MARKER).unwrap_or(raw)
}

/// One node in the sheet's store. Identity lives in the position keying it;
/// edges live in the dependency graph.
///
/// Equality covers the full state, memoized result included; tests lean on
/// it to compare store lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    content: CellContent,
}

impl Cell {
    pub fn empty() -> Self {
        Self {
            content: CellContent::Empty,
        }
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub(crate) fn set_content(&mut self, content: CellContent) {
        self.content = content;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    /// Text form: the raw literal, or the formula marker plus canonical
    /// expression text.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(raw) => raw.clone(),
            CellContent::Formula { formula, .. } => {
                format!("{}{}", FORMULA_MARKER, formula.expression_text())
            }
        }
    }

    /// Cells this cell's formula reads; empty for non-formula content.
    pub fn referenced_cells(&self) -> &[Position] {
        match &self.content {
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
            _ => &[],
        }
    }

    /// Drop the memoized result, if any.
    pub(crate) fn clear_cache(&self) {
        if let CellContent::Formula { cache, .. } = &self.content {
            *cache.borrow_mut() = None;
        }
    }

    #[cfg(test)]
    pub(crate) fn has_cached_result(&self) -> bool {
        match &self.content {
            CellContent::Formula { cache, .. } => cache.borrow().is_some(),
            _ => false,
        }
    }
}
