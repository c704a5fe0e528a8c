//! A1-style cell addresses and bounded cell ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address such as `B7` or `$B$7`.
///
/// Rows and columns are 0-based internally. The `$` anchors are kept so
/// reference text can be rendered back the way it was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Parse `A1`, `$A1`, `A$1` or `$A$1` (case-insensitive column letters).
    ///
    /// ```
    /// use gridcalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$C$12").unwrap();
    /// assert_eq!((addr.row, addr.col), (11, 2));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let (col_absolute, rest) = strip_anchor(s.trim());
        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if letters_end == 0 {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let col = Self::letters_to_column(&rest[..letters_end])?;

        let (row_absolute, digits) = strip_anchor(&rest[letters_end..]);
        let row = parse_row_number(digits).ok_or_else(|| Error::InvalidAddress(s.to_string()))?;

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// 0 → `A`, 25 → `Z`, 26 → `AA`
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }

    /// `A` → 0, `AA` → 26. Fails past the last addressable column.
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(Error::InvalidAddress(letters.to_string()));
        }
        let mut col: u32 = 0;
        for b in letters.bytes() {
            col = col * 26 + (b.to_ascii_uppercase() - b'A') as u32 + 1;
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(letters.to_string()));
            }
        }
        Ok((col - 1) as u16)
    }

    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }
}

pub(crate) fn strip_anchor(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// Parse a 1-based row number into a 0-based index.
pub(crate) fn parse_row_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS {
        return None;
    }
    Some(row - 1)
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A bounded rectangle of cells, always normalized so `start` is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        Self::from_indices(start.row, start.col, end.row, end.col)
    }

    pub fn from_indices(row1: u32, col1: u16, row2: u32, col2: u16) -> Self {
        Self {
            start: CellAddress::new(row1.min(row2), col1.min(col2)),
            end: CellAddress::new(row1.max(row2), col1.max(col2)),
        }
    }

    pub fn single(addr: CellAddress) -> Self {
        Self::from_indices(addr.row, addr.col, addr.row, addr.col)
    }

    /// Parse `A1:B10` or a single cell `C3`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        (self.start.row..=self.end.row).contains(&row)
            && (self.start.col..=self.end.col).contains(&col)
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
