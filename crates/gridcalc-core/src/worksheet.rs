//! Sheet geometry and raw content

use crate::cell::{CellData, CellRange, CellStorage};
use crate::error::{Error, Result};
use crate::range::SheetId;
use crate::{MAX_COLS, MAX_ROWS};
use rstar::{RTree, RTreeObject, AABB};

/// A merged region as stored in the lookup tree
#[derive(Debug, Clone, PartialEq)]
struct MergedRegion(CellRange);

impl RTreeObject for MergedRegion {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let CellRange { start, end } = self.0;
        AABB::from_corners(
            [start.col.into(), start.row.into()],
            [end.col.into(), end.row.into()],
        )
    }
}

/// One sheet: its size, the content typed into it and its merged regions.
#[derive(Debug, Clone)]
pub struct Worksheet {
    id: SheetId,
    name: String,
    rows: u32,
    cols: u16,
    cells: CellStorage,
    merges: Vec<CellRange>,
    merge_tree: RTree<MergedRegion>,
}

impl Worksheet {
    pub fn new<S: Into<String>>(id: SheetId, name: S, rows: u32, cols: u16) -> Self {
        Self {
            id,
            name: name.into(),
            rows: rows.clamp(1, MAX_ROWS),
            cols: cols.clamp(1, MAX_COLS),
            cells: CellStorage::new(),
            merges: Vec::new(),
            merge_tree: RTree::new(),
        }
    }

    pub fn id(&self) -> SheetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn row_count(&self) -> u32 {
        self.rows
    }

    pub fn col_count(&self) -> u16 {
        self.cols
    }

    /// Change the sheet size. Content and merges outside the new size are dropped.
    pub fn resize(&mut self, rows: u32, cols: u16) -> Result<()> {
        if rows == 0 || cols == 0 || rows > MAX_ROWS || cols > MAX_COLS {
            return Err(Error::InvalidSheetSize { rows, cols });
        }
        self.rows = rows;
        self.cols = cols;
        self.cells.truncate(rows, cols);
        self.merges
            .retain(|m| m.end.row < rows && m.end.col < cols);
        self.merge_tree = RTree::bulk_load(self.merges.iter().copied().map(MergedRegion).collect());
        Ok(())
    }

    fn check_bounds(row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col.to_string()));
        }
        Ok(())
    }

    fn grow_to(&mut self, row: u32, col: u16) {
        self.rows = self.rows.max(row + 1);
        self.cols = self.cols.max(col + 1);
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(row, col)
    }

    /// Raw content, `""` for untouched cells.
    pub fn content(&self, row: u32, col: u16) -> &str {
        self.cell(row, col).map_or("", |c| c.content.as_str())
    }

    pub fn format(&self, row: u32, col: u16) -> Option<&str> {
        self.cell(row, col).and_then(|c| c.format.as_deref())
    }

    /// Store content, growing the sheet when the cell lies beyond it.
    pub fn set_content<S: Into<String>>(&mut self, row: u32, col: u16, content: S) -> Result<()> {
        Self::check_bounds(row, col)?;
        let content = content.into();
        if !content.is_empty() {
            self.grow_to(row, col);
        }
        self.cells.update(row, col, |cell| cell.content = content);
        Ok(())
    }

    pub fn set_format(&mut self, row: u32, col: u16, format: Option<String>) -> Result<()> {
        Self::check_bounds(row, col)?;
        if format.is_some() {
            self.grow_to(row, col);
        }
        self.cells.update(row, col, |cell| cell.format = format);
        Ok(())
    }

    /// Non-empty cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells.iter()
    }

    /// Formula cells in row-major order.
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.cells
            .iter()
            .filter(|(_, _, c)| c.is_formula())
            .map(|(r, c, d)| (r, c, d.content.as_str()))
    }

    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    /// Merge a region. Single cells are ignored; overlapping merges are rejected.
    pub fn merge(&mut self, range: CellRange) -> Result<()> {
        if range.start == range.end {
            return Ok(());
        }
        let region = MergedRegion(range);
        if self
            .merge_tree
            .locate_in_envelope_intersecting(&region.envelope())
            .next()
            .is_some()
        {
            return Err(Error::MergedCellConflict(range.to_string()));
        }
        self.grow_to(range.end.row, range.end.col);
        self.merges.push(range);
        self.merge_tree.insert(region);
        Ok(())
    }

    pub fn unmerge(&mut self, range: &CellRange) -> bool {
        if self.merge_tree.remove(&MergedRegion(*range)).is_none() {
            return false;
        }
        self.merges.retain(|m| m != range);
        true
    }

    /// The merge a cell belongs to, if any.
    pub fn merge_at(&self, row: u32, col: u16) -> Option<&CellRange> {
        let point = AABB::from_point([col.into(), row.into()]);
        self.merge_tree
            .locate_in_envelope_intersecting(&point)
            .next()
            .map(|region| &region.0)
    }

    /// Whether the cell is covered by a merge without being its top-left
    /// anchor. Such cells read as empty.
    pub fn is_merge_shadowed(&self, row: u32, col: u16) -> bool {
        self.merge_at(row, col)
            .is_some_and(|m| (m.start.row, m.start.col) != (row, col))
    }
}
