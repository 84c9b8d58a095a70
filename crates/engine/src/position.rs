//! Cell positions and grid bounds.
//!
//! A `Position` is the identity of one cell. It doubles as the node key in
//! the dependency graph, so it is small, `Copy`, and hashable.

use serde::{Deserialize, Serialize};

/// Maximum number of rows in a sheet.
pub const MAX_ROWS: usize = 16_384;
/// Maximum number of columns in a sheet.
pub const MAX_COLS: usize = 16_384;

/// Zero-based (row, col) coordinates of a cell.
///
/// Positions outside the grid bounds are representable (formula parsing can
/// produce them); `is_valid` is the acceptance predicate every sheet
/// operation applies at its boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl Position {
    /// Create a new Position.
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Whether this position lies inside the grid bounds.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Parse A1 notation: uppercase column letters followed by a one-based
    /// row number with no leading zero.
    ///
    /// Accepts exactly `[A-Z]+[1-9][0-9]*`; anything else returns `None`.
    /// Coordinates beyond the grid bounds still parse (callers decide what
    /// an out-of-bounds reference means); inputs too large to represent at
    /// all return `None`.
    pub fn from_a1(s: &str) -> Option<Self> {
        let letters_end = s.find(|c: char| !c.is_ascii_uppercase())?;
        if letters_end == 0 {
            return None;
        }
        let (letters, digits) = s.split_at(letters_end);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.starts_with('0') {
            return None;
        }

        // Column letters fold: A=0, B=1, ..., Z=25, AA=26, AB=27, ...
        let mut col: usize = 0;
        for c in letters.chars() {
            col = col
                .checked_mul(26)?
                .checked_add(c as usize - 'A' as usize + 1)?;
        }
        let col = col - 1;

        let row: usize = digits.parse().ok()?;
        Some(Self::new(row - 1, col))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row + 1)
    }
}

/// Convert 0-based column index to spreadsheet-style letter(s).
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Rectangular extent of a sheet region, in whole rows and columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

impl Size {
    #[inline]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_equality() {
        let a = Position::new(0, 0);
        let b = Position::new(0, 0);
        let c = Position::new(0, 1);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_position_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Position::new(0, 0));
        set.insert(Position::new(0, 0)); // duplicate
        set.insert(Position::new(1, 0));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_col_to_letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(1), "B");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(27), "AB");
        assert_eq!(col_to_letters(701), "ZZ");
        assert_eq!(col_to_letters(702), "AAA");
    }

    #[test]
    fn test_display() {
        assert_eq!(Position::new(0, 0).to_string(), "A1");
        assert_eq!(Position::new(9, 26).to_string(), "AA10");
        assert_eq!(Position::new(16_383, 16_383).to_string(), "XFD16384");
    }

    #[test]
    fn test_from_a1_accepts() {
        assert_eq!(Position::from_a1("A1"), Some(Position::new(0, 0)));
        assert_eq!(Position::from_a1("B3"), Some(Position::new(2, 1)));
        assert_eq!(Position::from_a1("AA10"), Some(Position::new(9, 26)));
        assert_eq!(Position::from_a1("XFD16384"), Some(Position::new(16_383, 16_383)));
    }

    #[test]
    fn test_from_a1_rejects_malformed() {
        assert_eq!(Position::from_a1(""), None);
        assert_eq!(Position::from_a1("A"), None);
        assert_eq!(Position::from_a1("1"), None);
        assert_eq!(Position::from_a1("a1"), None);
        assert_eq!(Position::from_a1("A0"), None);
        assert_eq!(Position::from_a1("A01"), None);
        assert_eq!(Position::from_a1("A1B"), None);
        assert_eq!(Position::from_a1("A-1"), None);
        assert_eq!(Position::from_a1("A 1"), None);
    }

    #[test]
    fn test_from_a1_out_of_bounds_still_parses() {
        let p = Position::from_a1("XFE1").unwrap();
        assert_eq!(p.col, MAX_COLS);
        assert!(!p.is_valid());

        let p = Position::from_a1("A16385").unwrap();
        assert_eq!(p.row, MAX_ROWS);
        assert!(!p.is_valid());
    }

    #[test]
    fn test_validity_bounds() {
        assert!(Position::new(0, 0).is_valid());
        assert!(Position::new(MAX_ROWS - 1, MAX_COLS - 1).is_valid());
        assert!(!Position::new(MAX_ROWS, 0).is_valid());
        assert!(!Position::new(0, MAX_COLS).is_valid());
    }

    #[test]
    fn test_display_round_trip() {
        for &pos in &[
            Position::new(0, 0),
            Position::new(2, 1),
            Position::new(9, 26),
            Position::new(99, 701),
            Position::new(16_383, 16_383),
        ] {
            assert_eq!(Position::from_a1(&pos.to_string()), Some(pos));
        }
    }
}
