// Formula parsing and evaluation

pub mod eval;
pub mod parser;

pub use eval::CellLookup;

use crate::position::Position;
use crate::value::FormulaError;

use parser::Expr;

/// A parsed formula: the expression tree, its canonical text, and the cells
/// it reads collected in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    text: String,
    expr: Expr,
    refs: Vec<Position>,
}

impl Formula {
    /// Parse expression text (everything after the formula marker).
    pub fn parse(expression: &str) -> Result<Self, String> {
        let expr = parser::parse(expression)?;
        let mut refs = Vec::new();
        collect_refs(&expr, &mut refs);
        Ok(Self {
            text: expr.to_string(),
            expr,
            refs,
        })
    }

    /// Canonical expression text: no whitespace, minimal parentheses.
    /// Setting a cell to `=` plus this text round-trips exactly.
    pub fn expression_text(&self) -> &str {
        &self.text
    }

    /// Cells this formula reads, in source order, duplicates preserved.
    /// References outside the grid bounds are excluded: they evaluate to a
    /// ref error and never become graph nodes.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.refs
    }

    /// Evaluate against `lookup`.
    pub fn evaluate(&self, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
        eval::evaluate(&self.expr, lookup)
    }
}

fn collect_refs(expr: &Expr, out: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Ref(pos) => {
            if pos.is_valid() {
                out.push(*pos);
            }
        }
        Expr::Unary { expr, .. } => collect_refs(expr, out),
        Expr::Binary { left, right, .. } => {
            collect_refs(left, out);
            collect_refs(right, out);
        }
    }
}
