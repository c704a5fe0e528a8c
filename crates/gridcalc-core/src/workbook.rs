//! The set of sheets the engine evaluates over

use crate::error::{Error, Result};
use crate::range::SheetId;
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Default size of a new sheet: 100 rows by 26 columns (`A1:Z100`)
pub const DEFAULT_SHEET_SIZE: (u32, u16) = (100, 26);

/// An ordered collection of sheets with stable ids.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    next_id: u32,
    default_size: (u32, u16),
}

impl Workbook {
    /// A workbook holding one empty sheet named `Sheet1`.
    pub fn new() -> Self {
        Self::with_default_size(DEFAULT_SHEET_SIZE.0, DEFAULT_SHEET_SIZE.1)
    }

    pub fn with_default_size(rows: u32, cols: u16) -> Self {
        let mut wb = Self {
            sheets: Vec::new(),
            next_id: 1,
            default_size: (rows, cols),
        };
        let id = wb.allocate_id();
        wb.sheets.push(Worksheet::new(id, "Sheet1", rows, cols));
        wb
    }

    fn allocate_id(&mut self) -> SheetId {
        let id = SheetId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.sheets.iter()
    }

    pub fn sheet_ids(&self) -> Vec<SheetId> {
        self.sheets.iter().map(Worksheet::id).collect()
    }

    pub fn first_sheet_id(&self) -> SheetId {
        self.sheets[0].id()
    }

    pub fn sheet(&self, id: SheetId) -> Option<&Worksheet> {
        self.sheets.iter().find(|ws| ws.id() == id)
    }

    pub fn sheet_mut(&mut self, id: SheetId) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|ws| ws.id() == id)
    }

    /// Like [`Workbook::sheet_mut`], failing with [`Error::SheetNotFound`].
    pub fn require_sheet_mut(&mut self, id: SheetId) -> Result<&mut Worksheet> {
        self.sheet_mut(id)
            .ok_or_else(|| Error::SheetNotFound(id.to_string()))
    }

    /// Case-insensitive lookup by name.
    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        let lower = name.to_lowercase();
        self.sheets.iter().find(|ws| ws.name().to_lowercase() == lower)
    }

    pub fn sheet_id(&self, name: &str) -> Option<SheetId> {
        self.sheet_by_name(name).map(Worksheet::id)
    }

    /// Add a sheet of the default size at the end.
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        let (rows, cols) = self.default_size;
        self.add_sheet_with_size(name, rows, cols)
    }

    pub fn add_sheet_with_size(&mut self, name: &str, rows: u32, cols: u16) -> Result<SheetId> {
        self.validate_sheet_name(name, None)?;
        let id = self.allocate_id();
        self.sheets.push(Worksheet::new(id, name, rows, cols));
        Ok(id)
    }

    pub fn remove_sheet(&mut self, id: SheetId) -> Result<Worksheet> {
        let index = self.index_of(id)?;
        if self.sheets.len() == 1 {
            return Err(Error::LastSheet);
        }
        Ok(self.sheets.remove(index))
    }

    pub fn rename_sheet(&mut self, id: SheetId, new_name: &str) -> Result<()> {
        self.validate_sheet_name(new_name, Some(id))?;
        self.require_sheet_mut(id)?.set_name(new_name);
        Ok(())
    }

    fn index_of(&self, id: SheetId) -> Result<usize> {
        self.sheets
            .iter()
            .position(|ws| ws.id() == id)
            .ok_or_else(|| Error::SheetNotFound(id.to_string()))
    }

    fn validate_sheet_name(&self, name: &str, exclude: Option<SheetId>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }
        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']', '!'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::InvalidSheetName(
                "Sheet name cannot start or end with an apostrophe".into(),
            ));
        }
        let lower = name.to_lowercase();
        if self
            .sheets
            .iter()
            .any(|ws| Some(ws.id()) != exclude && ws.name().to_lowercase() == lower)
        {
            return Err(Error::DuplicateSheetName(name.into()));
        }
        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        let sheet = wb.sheet(wb.first_sheet_id()).unwrap();
        assert_eq!(sheet.name(), "Sheet1");
        assert_eq!((sheet.row_count(), sheet.col_count()), DEFAULT_SHEET_SIZE);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut wb = Workbook::new();
        let data = wb.add_sheet("Data").unwrap();
        wb.remove_sheet(data).unwrap();
        let again = wb.add_sheet("Data").unwrap();
        assert_ne!(data, again);
        assert!(wb.sheet(data).is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut wb = Workbook::new();
        let id = wb.add_sheet("Données").unwrap();
        assert_eq!(wb.sheet_id("DONNÉES"), Some(id));
        assert!(wb.add_sheet("sheet1").is_err());
    }

    #[test]
    fn test_invalid_names() {
        let mut wb = Workbook::new();
        for name in ["", "a/b", "a:b", "x[1]", "'quoted'", "Sheet!"] {
            assert!(wb.add_sheet(name).is_err(), "{name:?}");
        }
        assert!(wb.add_sheet(&"A".repeat(MAX_SHEET_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_rename_and_remove() {
        let mut wb = Workbook::new();
        let first = wb.first_sheet_id();
        let other = wb.add_sheet("Other").unwrap();
        assert!(wb.rename_sheet(first, "other").is_err());
        wb.rename_sheet(first, "Main").unwrap();
        assert_eq!(wb.sheet_id("main"), Some(first));
        wb.remove_sheet(other).unwrap();
        assert_eq!(wb.remove_sheet(first).unwrap_err(), Error::LastSheet);
    }
}
