//! Rectangular zones that may be unbounded along one axis

use crate::cell::{parse_row_number, strip_anchor, CellAddress, CellRange};
use crate::error::{Error, Result};
use std::fmt;

/// A rectangle of cells. `bottom == None` means the zone runs to the last
/// row of the sheet (`A:A`, `B3:C`), `right == None` to the last column
/// (`1:4`). Bounded sides always satisfy `top <= bottom` and `left <= right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone {
    pub top: u32,
    pub left: u16,
    pub bottom: Option<u32>,
    pub right: Option<u16>,
}

/// One side of a `a:b` reference
enum Corner {
    Cell(CellAddress),
    Column(u16),
    Row(u32),
}

fn parse_corner(s: &str) -> Option<Corner> {
    if let Ok(addr) = CellAddress::parse(s) {
        return Some(Corner::Cell(addr));
    }
    let (_, rest) = strip_anchor(s);
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphabetic()) {
        return CellAddress::letters_to_column(rest).ok().map(Corner::Column);
    }
    parse_row_number(rest).map(Corner::Row)
}

impl Zone {
    pub fn cell(row: u32, col: u16) -> Self {
        Self::bounded(row, col, row, col)
    }

    /// A bounded zone from two opposite corners in any order.
    pub fn bounded(row1: u32, col1: u16, row2: u32, col2: u16) -> Self {
        Self {
            top: row1.min(row2),
            left: col1.min(col2),
            bottom: Some(row1.max(row2)),
            right: Some(col1.max(col2)),
        }
    }

    /// Parse the zone part of a reference (no sheet prefix).
    ///
    /// ```
    /// use gridcalc_core::Zone;
    ///
    /// let z = Zone::parse("B3:A").unwrap();
    /// assert_eq!((z.top, z.left, z.bottom, z.right), (2, 0, None, Some(1)));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRange(s.to_string());
        let Some((a, b)) = s.trim().split_once(':') else {
            let addr = CellAddress::parse(s).map_err(|_| invalid())?;
            return Ok(Self::cell(addr.row, addr.col));
        };
        let zone = match (parse_corner(a), parse_corner(b)) {
            (Some(Corner::Cell(a)), Some(Corner::Cell(b))) => {
                Self::bounded(a.row, a.col, b.row, b.col)
            }
            (Some(Corner::Column(a)), Some(Corner::Column(b))) => Self {
                top: 0,
                left: a.min(b),
                bottom: None,
                right: Some(a.max(b)),
            },
            (Some(Corner::Row(a)), Some(Corner::Row(b))) => Self {
                top: a.min(b),
                left: 0,
                bottom: Some(a.max(b)),
                right: None,
            },
            (Some(Corner::Cell(c)), Some(Corner::Column(col)))
            | (Some(Corner::Column(col)), Some(Corner::Cell(c))) => Self {
                top: c.row,
                left: c.col.min(col),
                bottom: None,
                right: Some(c.col.max(col)),
            },
            (Some(Corner::Cell(c)), Some(Corner::Row(row)))
            | (Some(Corner::Row(row)), Some(Corner::Cell(c))) => Self {
                top: c.row.min(row),
                left: c.col,
                bottom: Some(c.row.max(row)),
                right: None,
            },
            _ => return Err(invalid()),
        };
        Ok(zone)
    }

    pub fn is_bounded(&self) -> bool {
        self.bottom.is_some() && self.right.is_some()
    }

    pub fn is_single_cell(&self) -> bool {
        self.bottom == Some(self.top) && self.right == Some(self.left)
    }

    /// Clip against a sheet of `rows × cols`. `None` when nothing remains.
    pub fn clip(&self, rows: u32, cols: u16) -> Option<CellRange> {
        if rows == 0 || cols == 0 || self.top >= rows || self.left >= cols {
            return None;
        }
        let bottom = self.bottom.map_or(rows - 1, |b| b.min(rows - 1));
        let right = self.right.map_or(cols - 1, |r| r.min(cols - 1));
        Some(CellRange::from_indices(self.top, self.left, bottom, right))
    }

    /// Inclusive corners with unbounded sides stretched to the address limits.
    pub fn corners(&self) -> ([u32; 2], [u32; 2]) {
        let bottom = self.bottom.unwrap_or(crate::MAX_ROWS - 1);
        let right = self.right.unwrap_or(crate::MAX_COLS - 1) as u32;
        ([self.left as u32, self.top], [right, bottom])
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.top
            && col >= self.left
            && self.bottom.map_or(true, |b| row <= b)
            && self.right.map_or(true, |r| col <= r)
    }

    pub fn intersects(&self, other: &Zone) -> bool {
        let (a_min, a_max) = self.corners();
        let (b_min, b_max) = other.corners();
        a_min[0] <= b_max[0] && b_min[0] <= a_max[0] && a_min[1] <= b_max[1] && b_min[1] <= a_max[1]
    }

    pub fn to_a1_string(&self) -> String {
        let col = CellAddress::column_to_letters;
        match (self.bottom, self.right) {
            (Some(b), Some(r)) if b == self.top && r == self.left => {
                CellAddress::new(self.top, self.left).to_string()
            }
            (Some(b), Some(r)) => format!(
                "{}:{}",
                CellAddress::new(self.top, self.left),
                CellAddress::new(b, r)
            ),
            (None, Some(r)) if self.top == 0 => format!("{}:{}", col(self.left), col(r)),
            (None, Some(r)) => format!("{}{}:{}", col(self.left), self.top + 1, col(r)),
            (Some(b), None) if self.left == 0 => format!("{}:{}", self.top + 1, b + 1),
            (Some(b), None) => format!("{}{}:{}", col(self.left), self.top + 1, b + 1),
            (None, None) => format!("{}{}:", col(self.left), self.top + 1),
        }
    }
}

impl From<CellRange> for Zone {
    fn from(range: CellRange) -> Self {
        Self::bounded(range.start.row, range.start.col, range.end.row, range.end.col)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}
