//! Sheet-qualified positions and ranges

use crate::cell::CellAddress;
use crate::zone::Zone;
use std::fmt;

/// Stable sheet identity. Ids are never reused after a sheet is removed,
/// so a stale reference can never silently point at a newer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetId(pub u32);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet#{}", self.0)
    }
}

/// One cell of one sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPosition {
    pub sheet_id: SheetId,
    pub row: u32,
    pub col: u16,
}

impl CellPosition {
    pub fn new(sheet_id: SheetId, row: u32, col: u16) -> Self {
        Self { sheet_id, row, col }
    }

    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl fmt::Display for CellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet_id, self.address())
    }
}

/// A reference bound to a sheet.
///
/// A range that could not be bound keeps the offending text instead:
/// `invalid_sheet_name` when the sheet prefix names no sheet, `invalid_xc`
/// when the zone text itself is malformed. Reading an invalid range always
/// yields an invalid-reference error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub sheet_id: SheetId,
    pub zone: Zone,
    pub invalid_sheet_name: Option<String>,
    pub invalid_xc: Option<String>,
}

/// Canonical cache/index key for a valid range: sheet plus the four zone
/// bounds, with unbounded sides stored as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeKey {
    pub sheet_id: SheetId,
    pub top: u32,
    pub left: u16,
    pub bottom: Option<u32>,
    pub right: Option<u16>,
}

impl Range {
    pub fn new(sheet_id: SheetId, zone: Zone) -> Self {
        Self {
            sheet_id,
            zone,
            invalid_sheet_name: None,
            invalid_xc: None,
        }
    }

    pub fn cell(position: CellPosition) -> Self {
        Self::new(position.sheet_id, Zone::cell(position.row, position.col))
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_sheet_name.is_none() && self.invalid_xc.is_none()
    }

    pub fn is_single_cell(&self) -> bool {
        self.zone.is_single_cell()
    }

    pub fn key(&self) -> Option<RangeKey> {
        self.is_valid().then(|| RangeKey {
            sheet_id: self.sheet_id,
            top: self.zone.top,
            left: self.zone.left,
            bottom: self.zone.bottom,
            right: self.zone.right,
        })
    }

    /// Top-left position of the zone.
    pub fn origin(&self) -> CellPosition {
        CellPosition::new(self.sheet_id, self.zone.top, self.zone.left)
    }

    pub fn intersects(&self, sheet_id: SheetId, zone: &Zone) -> bool {
        self.is_valid() && self.sheet_id == sheet_id && self.zone.intersects(zone)
    }
}
