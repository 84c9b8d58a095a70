// Formula evaluator. Reads other cells through the CellLookup seam so the
// evaluator stays decoupled from sheet storage.

use crate::position::Position;
use crate::value::{CellValue, FormulaError};

use super::parser::{BinOp, Expr, UnaryOp};

/// How the evaluator reads other cells. The sheet implements this.
pub trait CellLookup {
    /// Value at `pos`. Absent cells read as empty. Only called with
    /// in-bounds positions; out-of-bounds references fail before lookup.
    fn cell_value(&self, pos: Position) -> CellValue;
}

/// Evaluate a tree to a number, or the first error encountered in
/// left-to-right order.
pub fn evaluate(expr: &Expr, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ref(pos) => {
            if !pos.is_valid() {
                return Err(FormulaError::Ref);
            }
            lookup.cell_value(*pos).to_number()
        }
        Expr::Unary { op, expr } => {
            let v = evaluate(expr, lookup)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Minus => -v,
            })
        }
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, lookup)?;
            let r = evaluate(right, lookup)?;
            match op {
                BinOp::Add => Ok(l + r),
                BinOp::Sub => Ok(l - r),
                BinOp::Mul => Ok(l * r),
                BinOp::Div => {
                    if r == 0.0 {
                        Err(FormulaError::Div0)
                    } else {
                        Ok(l / r)
                    }
                }
            }
        }
    }
}
