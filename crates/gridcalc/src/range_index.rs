//! Spatial index over the ranges formulas depend on
//!
//! One R-tree per sheet answers "which dependency ranges overlap this
//! zone" without scanning every formula. Entries are value objects: an
//! entry is identified by its owner cell, its slot in the owner's
//! dependency list and its bounds, so a recompiled formula can remove the
//! entries it inserted earlier.

use ahash::AHashMap;
use gridcalc_core::{CellPosition, CellRange, Range, RangeKey, SheetId, Worksheet, Zone};
use rstar::{RTree, RTreeObject, AABB};

/// One dependency range of one formula cell
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRange {
    /// Formula cell reading the range
    pub owner: CellPosition,
    /// Position of the range in the owner's dependency list
    pub slot: usize,
    pub key: RangeKey,
    envelope: AABB<[i64; 2]>,
}

impl IndexedRange {
    /// `None` for ranges that could not be bound; they never match an edit.
    pub fn new(owner: CellPosition, slot: usize, range: &Range) -> Option<Self> {
        let key = range.key()?;
        Some(Self {
            owner,
            slot,
            key,
            envelope: envelope(&range.zone),
        })
    }
}

impl RTreeObject for IndexedRange {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// `[col, row]` corners; unbounded sides reach the end of the grid.
fn envelope(zone: &Zone) -> AABB<[i64; 2]> {
    let (min, max) = zone.corners();
    AABB::from_corners(
        [min[0] as i64, min[1] as i64],
        [max[0] as i64, max[1] as i64],
    )
}

#[derive(Debug, Default)]
pub struct RangeIndex {
    trees: AHashMap<SheetId, RTree<IndexedRange>>,
}

impl RangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index in one go, which packs the trees better than
    /// repeated inserts.
    pub fn bulk_load(items: impl IntoIterator<Item = IndexedRange>) -> Self {
        let mut by_sheet: AHashMap<SheetId, Vec<IndexedRange>> = AHashMap::new();
        for item in items {
            by_sheet.entry(item.key.sheet_id).or_default().push(item);
        }
        Self {
            trees: by_sheet
                .into_iter()
                .map(|(sheet, items)| (sheet, RTree::bulk_load(items)))
                .collect(),
        }
    }

    pub fn insert(&mut self, item: IndexedRange) {
        self.trees.entry(item.key.sheet_id).or_default().insert(item);
    }

    /// Remove an entry equal to `item`. Returns whether one was found.
    pub fn remove(&mut self, item: &IndexedRange) -> bool {
        self.trees
            .get_mut(&item.key.sheet_id)
            .and_then(|tree| tree.remove(item))
            .is_some()
    }

    /// Entries of `sheet` overlapping `zone`
    pub fn search<'a>(
        &'a self,
        sheet: SheetId,
        zone: &Zone,
    ) -> impl Iterator<Item = &'a IndexedRange> + 'a {
        let envelope = envelope(zone);
        self.trees
            .get(&sheet)
            .into_iter()
            .flat_map(move |tree| tree.locate_in_envelope_intersecting(&envelope))
    }

    /// Drop every entry of a sheet
    pub fn clear_sheet(&mut self, sheet: SheetId) {
        self.trees.remove(&sheet);
    }

    pub fn len(&self) -> usize {
        self.trees.values().map(RTree::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The part of `zone` that exists on `sheet`, honouring its current size.
/// `None` when the zone lies entirely outside the sheet.
pub fn clip_to_sheet(sheet: &Worksheet, zone: &Zone) -> Option<CellRange> {
    zone.clip(sheet.row_count(), sheet.col_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(owner: &str, slot: usize, zone: &str) -> IndexedRange {
        let sheet = SheetId(1);
        let owner = gridcalc_core::CellAddress::parse(owner).unwrap();
        let owner = CellPosition::new(sheet, owner.row, owner.col);
        IndexedRange::new(owner, slot, &Range::new(sheet, Zone::parse(zone).unwrap())).unwrap()
    }

    fn owners(index: &RangeIndex, zone: &str) -> Vec<String> {
        let mut found: Vec<String> = index
            .search(SheetId(1), &Zone::parse(zone).unwrap())
            .map(|e| format!("{}#{}", e.owner.address(), e.slot))
            .collect();
        found.sort();
        found
    }

    #[test]
    fn test_search_overlaps() {
        let index = RangeIndex::bulk_load([
            entry("C1", 0, "A1:A10"),
            entry("C2", 0, "B:B"),
            entry("C3", 0, "5:6"),
            entry("C4", 0, "D4"),
        ]);
        assert_eq!(owners(&index, "A3"), ["C1#0"]);
        assert_eq!(owners(&index, "B900"), ["C2#0"]);
        assert_eq!(owners(&index, "A5:B5"), ["C1#0", "C2#0", "C3#0"]);
        assert_eq!(owners(&index, "D4:E4"), ["C4#0"]);
        assert!(owners(&index, "Z99").is_empty());
        assert!(index.search(SheetId(2), &Zone::parse("A1").unwrap()).next().is_none());
    }

    #[test]
    fn test_remove_by_value() {
        let mut index = RangeIndex::new();
        index.insert(entry("C1", 0, "A1:A10"));
        index.insert(entry("C1", 1, "A1:A10"));
        assert_eq!(index.len(), 2);

        assert!(index.remove(&entry("C1", 1, "A1:A10")));
        assert!(!index.remove(&entry("C1", 1, "A1:A10")));
        assert_eq!(owners(&index, "A1"), ["C1#0"]);
    }

    #[test]
    fn test_invalid_ranges_are_not_indexed() {
        let range = Range {
            invalid_sheet_name: Some("Nope".into()),
            ..Range::new(SheetId(1), Zone::cell(0, 0))
        };
        assert!(IndexedRange::new(CellPosition::new(SheetId(1), 0, 0), 0, &range).is_none());
    }

    #[test]
    fn test_clip_to_sheet() {
        let sheet = Worksheet::new(SheetId(1), "Sheet1", 4, 4);
        let clipped = clip_to_sheet(&sheet, &Zone::parse("A2:Z10").unwrap()).unwrap();
        assert_eq!(clipped.to_string(), "A2:D4");
        assert!(clip_to_sheet(&sheet, &Zone::parse("E1").unwrap()).is_none());
    }
}
