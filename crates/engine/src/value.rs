//! Observable cell values and formula error values.

use serde::{Deserialize, Serialize};

/// Error value a formula can evaluate to.
///
/// These are values, not operation failures: they live in caches, propagate
/// through dependent formulas, and print as their token. Setting a cell
/// never fails because evaluation would produce one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaError {
    /// Reference to a position outside the grid bounds.
    Ref,
    /// A referenced cell's value cannot be read as a number.
    Value,
    /// Division by zero.
    Div0,
}

impl FormulaError {
    /// The spreadsheet-style display token.
    pub fn as_token(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

impl std::error::Error for FormulaError {}

/// The observable value of a cell.
///
/// Literal cells produce `Empty` or `Text`; only formula cells produce
/// `Number` or `Error`. Numeric-looking text stays text until a formula
/// reads it (see [`CellValue::to_number`]).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl CellValue {
    /// Numeric coercion applied when a formula reads a cell.
    ///
    /// Empty and empty text read as 0. Text must parse fully as a number;
    /// anything else is a value error. Errors propagate unchanged.
    pub fn to_number(&self) -> Result<f64, FormulaError> {
        match self {
            CellValue::Empty => Ok(0.0),
            CellValue::Number(n) => Ok(*n),
            CellValue::Text(s) if s.is_empty() => Ok(0.0),
            CellValue::Text(s) => s.parse::<f64>().map_err(|_| FormulaError::Value),
            CellValue::Error(e) => Err(*e),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tokens() {
        assert_eq!(FormulaError::Ref.to_string(), "#REF!");
        assert_eq!(FormulaError::Value.to_string(), "#VALUE!");
        assert_eq!(FormulaError::Div0.to_string(), "#DIV/0!");
    }

    #[test]
    fn test_to_number_coercion() {
        assert_eq!(CellValue::Empty.to_number(), Ok(0.0));
        assert_eq!(CellValue::Text(String::new()).to_number(), Ok(0.0));
        assert_eq!(CellValue::Text("42".into()).to_number(), Ok(42.0));
        assert_eq!(CellValue::Text("2.5".into()).to_number(), Ok(2.5));
        assert_eq!(CellValue::Number(7.0).to_number(), Ok(7.0));
    }

    #[test]
    fn test_to_number_rejects_non_numeric_text() {
        assert_eq!(
            CellValue::Text("hello".into()).to_number(),
            Err(FormulaError::Value)
        );
        // Partial parses are not numbers
        assert_eq!(
            CellValue::Text("5 apples".into()).to_number(),
            Err(FormulaError::Value)
        );
    }

    #[test]
    fn test_to_number_propagates_errors() {
        assert_eq!(
            CellValue::Error(FormulaError::Div0).to_number(),
            Err(FormulaError::Div0)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Text("hi".into()).to_string(), "hi");
        assert_eq!(CellValue::Number(2.0).to_string(), "2");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Error(FormulaError::Ref).to_string(), "#REF!");
    }
}
