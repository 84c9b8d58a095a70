//! Engine operation errors.
//!
//! Rejection never leaves partial state: when an operation returns an
//! error, the sheet is exactly as it was before the call.

use crate::position::{Position, MAX_COLS, MAX_ROWS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Position outside the grid bounds.
    InvalidPosition(Position),
    /// Committing the edit would create a dependency cycle through this
    /// cell.
    CircularDependency(Position),
    /// Formula text failed to parse.
    Syntax(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidPosition(pos) => {
                write!(
                    f,
                    "position {} is outside the {}x{} grid",
                    pos, MAX_ROWS, MAX_COLS
                )
            }
            EngineError::CircularDependency(pos) => {
                write!(f, "circular dependency through {}", pos)
            }
            EngineError::Syntax(msg) => write!(f, "formula syntax error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}
