//! The calculation engine
//!
//! Owns the workbook, the compiled formulas bound to their cells, the
//! range index over their dependencies and the evaluated cells. Content
//! changes invalidate exactly the cells whose dependencies overlap the
//! change; reads recompute what is missing in a fresh [`EvaluationPass`].
//!
//! # Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let sheet = engine.workbook().first_sheet_id();
//! engine.set_cell_content(CellPosition::new(sheet, 0, 0), "10").unwrap();
//! engine.set_cell_content(CellPosition::new(sheet, 1, 0), "=A1*2").unwrap();
//!
//! let cell = engine.get_evaluated_cell(CellPosition::new(sheet, 1, 0));
//! assert_eq!(cell.value, CellValue::Number(20.0));
//! ```

use crate::calculation::EvaluationPass;
use crate::error::{Error, Result};
use crate::hooks::{DependencyListener, IterationHook, IterationRequest, PassReport};
use crate::options::EngineOptions;
use crate::range_index::{IndexedRange, RangeIndex};
use ahash::{AHashMap, AHashSet};
use gridcalc_core::{
    CellError, CellPosition, CellRange, CellValue, EvaluatedCell, Matrix, Range,
    SheetId, Workbook, Zone,
};
use gridcalc_formula::{compile, CompiledFormula, EvaluationContext, FormulaReference, FormulaValue};
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// A compiled formula and its references bound for one cell
#[derive(Debug, Clone)]
pub(crate) struct BoundFormula {
    pub compiled: Rc<CompiledFormula>,
    pub dependencies: Vec<Range>,
}

/// Result of [`Engine::evaluate_formula`]
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaOutput {
    Scalar(CellValue),
    Matrix(Matrix<CellValue>),
}

/// Statistics from [`Engine::evaluate_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    /// Number of formula cells
    pub formula_count: usize,
    /// Number of formula cells calling a volatile function
    pub volatile_cells: usize,
    /// Number of passes run
    pub passes: usize,
    /// Cells computed, summed over all passes
    pub cells_computed: usize,
    /// Cells holding an error after the last pass
    pub errors: usize,
    /// Cells caught in a circular reference
    pub circular_references: usize,
}

pub struct Engine {
    workbook: Workbook,
    options: EngineOptions,
    /// Compiled formulas keyed by their text, shared between cells
    compiled: AHashMap<String, Rc<CompiledFormula>>,
    formulas: AHashMap<CellPosition, BoundFormula>,
    index: RangeIndex,
    evaluated: AHashMap<CellPosition, EvaluatedCell>,
    volatile: AHashSet<CellPosition>,
    iteration_hooks: Vec<IterationHook>,
    dependency_listeners: Vec<DependencyListener>,
}

impl Engine {
    /// An engine over a workbook holding one empty sheet.
    pub fn new(options: EngineOptions) -> Self {
        let (rows, cols) = options.default_sheet_size;
        Self::from_workbook(Workbook::with_default_size(rows, cols), options)
    }

    /// An engine over existing content. Every formula is compiled and the
    /// range index is bulk loaded; nothing is evaluated yet.
    pub fn from_workbook(workbook: Workbook, options: EngineOptions) -> Self {
        let mut engine = Self {
            workbook,
            options,
            compiled: AHashMap::new(),
            formulas: AHashMap::new(),
            index: RangeIndex::new(),
            evaluated: AHashMap::new(),
            volatile: AHashSet::new(),
            iteration_hooks: Vec::new(),
            dependency_listeners: Vec::new(),
        };
        engine.rebuild();
        engine
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub(crate) fn cached(&self, position: CellPosition) -> Option<&EvaluatedCell> {
        self.evaluated.get(&position)
    }

    pub(crate) fn formula(&self, position: CellPosition) -> Option<&BoundFormula> {
        self.formulas.get(&position)
    }

    /// Dependencies of the formula at `position`, empty for other cells.
    pub fn dependencies(&self, position: CellPosition) -> &[Range] {
        self.formulas
            .get(&position)
            .map_or(&[], |bound| bound.dependencies.as_slice())
    }

    /// Register a hook run after every pass of [`Engine::evaluate_all`].
    pub fn on_iteration_end(&mut self, hook: impl FnMut(&PassReport) -> IterationRequest + 'static) {
        self.iteration_hooks.push(Box::new(hook));
    }

    /// Register a listener told whenever a formula cell's dependencies change.
    pub fn on_dependencies_changed(&mut self, listener: impl FnMut(CellPosition, &[Range]) + 'static) {
        self.dependency_listeners.push(Box::new(listener));
    }

    /// Resolve `A1` or `Sheet2!B3` to a position; unqualified references
    /// point into the first sheet.
    pub fn position(&self, reference: &str) -> Result<CellPosition> {
        let parsed = FormulaReference::parse(reference);
        let sheet_id = match &parsed.sheet_name {
            Some(name) => self
                .workbook
                .sheet_id(name)
                .ok_or_else(|| gridcalc_core::Error::SheetNotFound(name.clone()))?,
            None => self.workbook.first_sheet_id(),
        };
        match parsed.zone {
            Some(zone) if zone.is_single_cell() => Ok(CellPosition::new(sheet_id, zone.top, zone.left)),
            _ => Err(gridcalc_core::Error::InvalidAddress(reference.to_string()).into()),
        }
    }

    /// Store raw content: a literal, or a formula starting with `=`. An
    /// empty string clears the cell.
    pub fn set_cell_content(&mut self, position: CellPosition, content: &str) -> Result<()> {
        let sheet = self.sheet_mut(position.sheet_id)?;
        let size = (sheet.row_count(), sheet.col_count());
        sheet.set_content(position.row, position.col, content)?;
        self.rebind(position);
        let mut zones = self.grown_zones(position.sheet_id, size);
        zones.push(Zone::cell(position.row, position.col));
        self.invalidate(position.sheet_id, &zones);
        Ok(())
    }

    /// Force the display format of a cell, or remove it with `None`.
    pub fn set_cell_format(&mut self, position: CellPosition, format: Option<String>) -> Result<()> {
        let sheet = self.sheet_mut(position.sheet_id)?;
        let size = (sheet.row_count(), sheet.col_count());
        sheet.set_format(position.row, position.col, format)?;
        let mut zones = self.grown_zones(position.sheet_id, size);
        zones.push(Zone::cell(position.row, position.col));
        self.invalidate(position.sheet_id, &zones);
        Ok(())
    }

    pub fn add_merge(&mut self, sheet_id: SheetId, range: CellRange) -> Result<()> {
        let sheet = self.sheet_mut(sheet_id)?;
        let size = (sheet.row_count(), sheet.col_count());
        sheet.merge(range)?;
        let mut zones = self.grown_zones(sheet_id, size);
        zones.push(range.into());
        self.invalidate(sheet_id, &zones);
        Ok(())
    }

    /// Returns whether the merge existed.
    pub fn remove_merge(&mut self, sheet_id: SheetId, range: &CellRange) -> Result<bool> {
        let removed = self.sheet_mut(sheet_id)?.unmerge(range);
        if removed {
            self.invalidate(sheet_id, &[(*range).into()]);
        }
        Ok(removed)
    }

    pub fn create_sheet(&mut self, name: &str) -> Result<SheetId> {
        let id = self.workbook.add_sheet(name)?;
        self.rebuild();
        Ok(id)
    }

    pub fn create_sheet_with_size(&mut self, name: &str, rows: u32, cols: u16) -> Result<SheetId> {
        let id = self.workbook.add_sheet_with_size(name, rows, cols)?;
        self.rebuild();
        Ok(id)
    }

    pub fn delete_sheet(&mut self, sheet_id: SheetId) -> Result<()> {
        self.workbook.remove_sheet(sheet_id)?;
        self.rebuild();
        Ok(())
    }

    /// Rename a sheet. Formulas are not rewritten: references to the old
    /// name become invalid, references to the new name start resolving.
    pub fn rename_sheet(&mut self, sheet_id: SheetId, name: &str) -> Result<()> {
        self.workbook.rename_sheet(sheet_id, name)?;
        self.rebuild();
        Ok(())
    }

    /// Resize a sheet, dropping content and merges outside the new size.
    pub fn resize_sheet(&mut self, sheet_id: SheetId, rows: u32, cols: u16) -> Result<()> {
        self.sheet_mut(sheet_id)?.resize(rows, cols)?;
        self.rebuild();
        Ok(())
    }

    fn sheet_mut(&mut self, sheet_id: SheetId) -> Result<&mut gridcalc_core::Worksheet> {
        self.workbook
            .sheet_mut(sheet_id)
            .ok_or(Error::SheetNotFound(sheet_id))
    }

    /// The rows and columns a sheet gained since it measured `rows × cols`.
    /// Every range reaching into them may clip differently now.
    fn grown_zones(&self, sheet_id: SheetId, (rows, cols): (u32, u16)) -> Vec<Zone> {
        let Some(sheet) = self.workbook.sheet(sheet_id) else {
            return Vec::new();
        };
        let mut zones = Vec::new();
        if sheet.row_count() > rows {
            zones.push(Zone {
                top: rows,
                left: 0,
                bottom: None,
                right: None,
            });
        }
        if sheet.col_count() > cols {
            zones.push(Zone {
                top: 0,
                left: cols,
                bottom: None,
                right: None,
            });
        }
        if !zones.is_empty() {
            debug!(
                sheet = %sheet_id,
                rows = sheet.row_count(),
                cols = sheet.col_count(),
                "sheet grew"
            );
        }
        zones
    }

    /// The evaluated value of a cell, computing it and whatever it depends
    /// on if needed.
    pub fn get_evaluated_cell(&mut self, position: CellPosition) -> EvaluatedCell {
        if let Some(cell) = self.evaluated.get(&position) {
            return cell.clone();
        }
        let mut pass = EvaluationPass::new(self);
        let cell = pass.evaluate(position);
        let computed = pass.into_computed();
        trace!(cell = %position, computed = computed.len(), "evaluated on read");
        self.evaluated.extend(computed);
        cell
    }

    /// Evaluate every non-empty cell from scratch, running further passes
    /// while an iteration hook asks for them.
    pub fn evaluate_all(&mut self) -> EvaluationSummary {
        let positions: Vec<CellPosition> = self
            .workbook
            .sheets()
            .flat_map(|sheet| {
                let id = sheet.id();
                sheet
                    .cells()
                    .map(move |(row, col, _)| CellPosition::new(id, row, col))
            })
            .collect();

        let mut summary = EvaluationSummary {
            formula_count: self.formulas.len(),
            volatile_cells: self.volatile.len(),
            ..Default::default()
        };
        for pass in 1..=self.options.max_passes {
            debug!(pass, cells = positions.len(), "evaluation pass started");
            self.evaluated.clear();
            let mut evaluation = EvaluationPass::new(self);
            for position in &positions {
                evaluation.evaluate(*position);
            }
            let cells_computed = evaluation.computed_count();
            self.evaluated = evaluation.into_computed();
            summary.passes = pass;
            summary.cells_computed += cells_computed;
            debug!(pass, cells_computed, "evaluation pass finished");

            let report = PassReport { pass, cells_computed };
            let mut reevaluate = false;
            for hook in &mut self.iteration_hooks {
                reevaluate |= hook(&report) == IterationRequest::Reevaluate;
            }
            if !reevaluate {
                break;
            }
            if pass == self.options.max_passes {
                warn!(max_passes = self.options.max_passes, "maximum evaluation passes reached");
            }
        }

        summary.errors = self.evaluated.values().filter(|cell| cell.is_error()).count();
        summary.circular_references = self
            .evaluated
            .values()
            .filter(|cell| cell.value == CellValue::Error(CellError::Cycle))
            .count();
        summary
    }

    /// Evaluate canonical formula text as if it were in `sheet_id`, without
    /// storing it. Cells computed along the way are kept.
    pub fn evaluate_formula(&mut self, sheet_id: SheetId, formula: &str) -> Result<FormulaOutput> {
        if self.workbook.sheet(sheet_id).is_none() {
            return Err(Error::SheetNotFound(sheet_id));
        }
        let compiled = compile(formula);
        if compiled.is_bad_expression {
            return Ok(FormulaOutput::Scalar(CellValue::Error(CellError::BadExpression)));
        }
        let workbook = &self.workbook;
        let dependencies = compiled.bind_dependencies(sheet_id, |name| workbook.sheet_id(name));

        let ctx = EvaluationContext::new(self.options.locale);
        let mut pass = EvaluationPass::new(self);
        let outcome = loop {
            let outcome = compiled.execute(&dependencies, &mut pass, &ctx);
            if !pass.overflowed() || pass.settle_dependencies(&dependencies) == 0 {
                break outcome;
            }
        };
        let computed = pass.into_computed();
        self.evaluated.extend(computed);

        Ok(match outcome {
            Ok(FormulaValue::Scalar(result)) => FormulaOutput::Scalar(match result.value {
                CellValue::Empty => CellValue::Number(0.0),
                value => value,
            }),
            Ok(FormulaValue::Matrix(matrix)) => FormulaOutput::Matrix(
                matrix
                    .into_iter()
                    .map(|column| column.into_iter().map(|result| result.value).collect())
                    .collect(),
            ),
            Err(err) => FormulaOutput::Scalar(err.to_result().value),
        })
    }

    fn compile_cached(&mut self, text: &str) -> Rc<CompiledFormula> {
        if let Some(compiled) = self.compiled.get(text) {
            return Rc::clone(compiled);
        }
        let compiled = Rc::new(compile(text));
        self.compiled.insert(text.to_string(), Rc::clone(&compiled));
        compiled
    }

    fn bind(&mut self, position: CellPosition, text: &str) -> BoundFormula {
        let compiled = self.compile_cached(text);
        let workbook = &self.workbook;
        let dependencies = compiled.bind_dependencies(position.sheet_id, |name| workbook.sheet_id(name));
        BoundFormula {
            compiled,
            dependencies,
        }
    }

    fn notify(&mut self, position: CellPosition, dependencies: &[Range]) {
        for listener in &mut self.dependency_listeners {
            listener(position, dependencies);
        }
    }

    /// Recompile the formula of one cell after its content changed.
    fn rebind(&mut self, position: CellPosition) {
        let previous = self.formulas.remove(&position);
        if let Some(previous) = &previous {
            for entry in index_entries(position, &previous.dependencies) {
                self.index.remove(&entry);
            }
        }
        self.volatile.remove(&position);

        let content = self
            .workbook
            .sheet(position.sheet_id)
            .map(|sheet| sheet.content(position.row, position.col).to_string())
            .unwrap_or_default();
        if !content.starts_with('=') {
            if previous.is_some() {
                self.notify(position, &[]);
            }
            return;
        }

        let bound = self.bind(position, &content);
        for entry in index_entries(position, &bound.dependencies) {
            self.index.insert(entry);
        }
        if bound.compiled.is_volatile() {
            self.volatile.insert(position);
        }
        if previous.map_or(true, |p| p.dependencies != bound.dependencies) {
            self.notify(position, &bound.dependencies);
        }
        self.formulas.insert(position, bound);
    }

    /// Recompile and rebind every formula, e.g. after the set of sheets
    /// changed. All evaluated cells are dropped.
    fn rebuild(&mut self) {
        let cells: Vec<(CellPosition, String)> = self
            .workbook
            .sheets()
            .flat_map(|sheet| {
                let id = sheet.id();
                sheet
                    .formula_cells()
                    .map(move |(row, col, text)| (CellPosition::new(id, row, col), text.to_string()))
            })
            .collect();

        let mut previous = std::mem::take(&mut self.formulas);
        self.volatile.clear();
        let mut entries = Vec::new();
        for (position, text) in cells {
            let bound = self.bind(position, &text);
            entries.extend(index_entries(position, &bound.dependencies));
            if bound.compiled.is_volatile() {
                self.volatile.insert(position);
            }
            if previous.remove(&position).map_or(true, |p| p.dependencies != bound.dependencies) {
                self.notify(position, &bound.dependencies);
            }
            self.formulas.insert(position, bound);
        }
        for position in previous.into_keys() {
            self.notify(position, &[]);
        }

        self.index = RangeIndex::bulk_load(entries);
        self.evaluated.clear();
        debug!(
            formulas = self.formulas.len(),
            indexed_ranges = self.index.len(),
            "formulas rebound"
        );
    }

    /// Drop the evaluated cells in `zones`, every formula reading them
    /// (transitively) and every volatile formula with its readers.
    fn invalidate(&mut self, sheet_id: SheetId, zones: &[Zone]) {
        let mut stale: AHashSet<CellPosition> = self.volatile.iter().copied().collect();
        let mut pending: Vec<(SheetId, Zone)> = stale
            .iter()
            .map(|p| (p.sheet_id, Zone::cell(p.row, p.col)))
            .collect();
        pending.extend(zones.iter().map(|zone| (sheet_id, *zone)));

        while let Some((sheet, zone)) = pending.pop() {
            for entry in self.index.search(sheet, &zone) {
                if stale.insert(entry.owner) {
                    pending.push((entry.owner.sheet_id, Zone::cell(entry.owner.row, entry.owner.col)));
                }
            }
        }

        let before = self.evaluated.len();
        self.evaluated.retain(|position, _| {
            !stale.contains(position)
                && !(position.sheet_id == sheet_id
                    && zones.iter().any(|zone| zone.contains(position.row, position.col)))
        });
        debug!(
            zones = zones.len(),
            dependents = stale.len(),
            dropped = before - self.evaluated.len(),
            "invalidated"
        );
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("sheets", &self.workbook.sheet_count())
            .field("formulas", &self.formulas.len())
            .field("evaluated", &self.evaluated.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn index_entries(owner: CellPosition, dependencies: &[Range]) -> impl Iterator<Item = IndexedRange> + '_ {
    dependencies
        .iter()
        .enumerate()
        .filter_map(move |(slot, range)| IndexedRange::new(owner, slot, range))
}
