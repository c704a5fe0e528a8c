//! Sparse storage for raw cell content

use std::collections::BTreeMap;

/// What the host stored at a position: the typed text and an optional
/// forced display format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellData {
    pub content: String,
    pub format: Option<String>,
}

impl CellData {
    pub fn is_formula(&self) -> bool {
        self.content.starts_with('=')
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.format.is_none()
    }
}

/// Row-major sparse map: `row → col → CellData`. Only non-empty cells are kept.
#[derive(Debug, Default, Clone)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,
}

impl CellStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Apply `update` to the cell, creating it if needed and dropping it if
    /// it ends up empty.
    pub fn update<F: FnOnce(&mut CellData)>(&mut self, row: u32, col: u16, update: F) {
        let cells = self.rows.entry(row).or_default();
        let cell = cells.entry(col).or_default();
        update(cell);
        if cell.is_empty() {
            cells.remove(&col);
            if cells.is_empty() {
                self.rows.remove(&row);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(&row, cells)| cells.iter().map(move |(&col, data)| (row, col, data)))
    }

    /// Largest populated (row, col), if any cell is stored.
    pub fn extent(&self) -> Option<(u32, u16)> {
        let max_row = *self.rows.keys().next_back()?;
        let max_col = self
            .rows
            .values()
            .filter_map(|r| r.keys().next_back().copied())
            .max()?;
        Some((max_row, max_col))
    }

    /// Drop everything outside `rows × cols`.
    pub fn truncate(&mut self, rows: u32, cols: u16) {
        self.rows.split_off(&rows);
        self.rows.retain(|_, cells| {
            cells.split_off(&cols);
            !cells.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_remove() {
        let mut storage = CellStorage::new();
        storage.update(3, 1, |c| c.content = "=A1".into());
        assert!(storage.get(3, 1).is_some_and(|c| c.is_formula()));
        assert_eq!(storage.extent(), Some((3, 1)));

        storage.update(3, 1, |c| c.content.clear());
        assert!(storage.get(3, 1).is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_format_keeps_cell_alive() {
        let mut storage = CellStorage::new();
        storage.update(0, 0, |c| c.format = Some("0.00".into()));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get(0, 0).unwrap().content, "");
    }

    #[test]
    fn test_truncate() {
        let mut storage = CellStorage::new();
        storage.update(0, 0, |c| c.content = "1".into());
        storage.update(5, 0, |c| c.content = "2".into());
        storage.update(0, 7, |c| c.content = "3".into());
        storage.truncate(4, 4);
        assert_eq!(storage.iter().count(), 1);
    }
}
