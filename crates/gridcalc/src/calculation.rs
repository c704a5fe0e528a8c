//! One evaluation pass
//!
//! An [`EvaluationPass`] computes cells lazily: reading a cell computes it,
//! and a formula computes the cells it references through the pass, which
//! acts as the formula's [`ReferenceResolver`]. Everything the pass learns
//! (computed cells, in-progress marks, materialized ranges) lives in the
//! pass and is dropped with it.
//!
//! Recursion is bounded by the engine's maximum depth. When a chain runs
//! deeper, the pass stops caching, unwinds, computes the blocked cell's
//! inputs bottom-up from an explicit stack and tries again, so long chains
//! still resolve. Only a cycle longer than the maximum depth keeps the
//! depth error.
//!
//! Re-entering a cell that is still in progress raises a circular reference
//! carrying that cell's position. The error unwinds through every cell of
//! the cycle, each of which records the cycle error, and stops at the cell
//! where the cycle started. Cells outside the cycle read the cycle error as
//! a generic error.

use crate::engine::{BoundFormula, Engine};
use crate::range_index::clip_to_sheet;
use ahash::{AHashMap, AHashSet};
use gridcalc_core::{
    parse_literal_with_format, CellError, CellPosition, CellValue, EvaluatedCell, FunctionResult,
    Matrix, Range, RangeKey, Worksheet,
};
use gridcalc_formula::{EvaluationContext, FormulaError, FormulaResult, ReferenceResolver};
use tracing::{debug, warn};

/// Ranges up to this many cells are scanned cell by cell when looking for
/// formula inputs; larger ones filter the sheet's formula cells instead.
const SCAN_LIMIT: u64 = 4096;

pub(crate) struct EvaluationPass<'e> {
    engine: &'e Engine,
    computed: AHashMap<CellPosition, EvaluatedCell>,
    in_progress: AHashSet<CellPosition>,
    range_cache: AHashMap<RangeKey, Matrix<FunctionResult>>,
    depth: usize,
    /// Set when the depth guard tripped; nothing computed while it is set
    /// gets cached
    overflowed: bool,
}

impl<'e> EvaluationPass<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            computed: AHashMap::new(),
            in_progress: AHashSet::new(),
            range_cache: AHashMap::new(),
            depth: 0,
            overflowed: false,
        }
    }

    /// Cells computed by this pass, to be merged into the engine's cache.
    pub fn into_computed(self) -> AHashMap<CellPosition, EvaluatedCell> {
        self.computed
    }

    pub fn computed_count(&self) -> usize {
        self.computed.len()
    }

    /// Whether the depth guard tripped since the last settle.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    fn sheet(&self, range: &Range) -> FormulaResult<&'e Worksheet> {
        if let Some(name) = &range.invalid_sheet_name {
            return Err(FormulaError::InvalidReference(format!("Sheet {name} does not exist")));
        }
        if let Some(xc) = &range.invalid_xc {
            return Err(FormulaError::InvalidReference(format!("Invalid reference {xc}")));
        }
        self.engine
            .workbook()
            .sheet(range.sheet_id)
            .ok_or_else(|| FormulaError::InvalidReference(format!("{} does not exist", range.sheet_id)))
    }

    /// Compute a cell from outside any formula, settling its inputs
    /// bottom-up whenever the depth guard trips. A cycle always stops at
    /// its origin, which is on the stack below this call, so the fallback
    /// only guards against a resolver bug.
    pub fn evaluate(&mut self, position: CellPosition) -> EvaluatedCell {
        let engine = self.engine;
        loop {
            let cell = self.compute(position).unwrap_or_else(|err| {
                EvaluatedCell::from_result(err.to_result(), &engine.options().locale, None)
            });
            if !self.overflowed {
                return cell;
            }
            let dependencies = engine
                .formula(position)
                .map_or(&[][..], |bound| bound.dependencies.as_slice());
            if self.settle_dependencies(dependencies) == 0 {
                warn!(
                    cell = %position,
                    max_depth = engine.options().max_depth,
                    "maximum recursion depth reached"
                );
                self.computed.insert(position, cell.clone());
                return cell;
            }
        }
    }

    /// Compute, deepest first, every formula cell `dependencies` lead to
    /// that is not known yet. Returns the number of cells this settled.
    pub fn settle_dependencies(&mut self, dependencies: &[Range]) -> usize {
        self.overflowed = false;
        let mut order = Vec::new();
        let mut visited = AHashSet::new();
        let mut stack: Vec<(CellPosition, bool)> = self
            .formula_inputs(dependencies)
            .into_iter()
            .map(|position| (position, false))
            .collect();
        while let Some((position, expanded)) = stack.pop() {
            if expanded {
                order.push(position);
                continue;
            }
            if !visited.insert(position) {
                continue;
            }
            stack.push((position, true));
            if let Some(bound) = self.engine.formula(position) {
                for input in self.formula_inputs(&bound.dependencies) {
                    if !visited.contains(&input) {
                        stack.push((input, false));
                    }
                }
            }
        }

        let before = self.computed.len();
        for position in order {
            self.overflowed = false;
            // nothing is in progress, so a cycle stops inside this call
            let _ = self.compute(position);
        }
        self.overflowed = false;
        let settled = self.computed.len() - before;
        debug!(settled, "dependencies settled bottom-up");
        settled
    }

    /// Formula cells read through `dependencies` with no value yet.
    fn formula_inputs(&self, dependencies: &[Range]) -> Vec<CellPosition> {
        let engine = self.engine;
        let known = |position: &CellPosition| {
            self.computed.contains_key(position) || engine.cached(*position).is_some()
        };
        let mut inputs = Vec::new();
        for range in dependencies {
            let Ok(sheet) = self.sheet(range) else {
                continue;
            };
            let Some(clipped) = clip_to_sheet(sheet, &range.zone) else {
                continue;
            };
            let rows = u64::from(clipped.end.row - clipped.start.row + 1);
            let cols = u64::from(clipped.end.col - clipped.start.col + 1);
            if rows * cols <= SCAN_LIMIT {
                for row in clipped.start.row..=clipped.end.row {
                    for col in clipped.start.col..=clipped.end.col {
                        let position = CellPosition::new(range.sheet_id, row, col);
                        if engine.formula(position).is_some() && !known(&position) {
                            inputs.push(position);
                        }
                    }
                }
            } else {
                inputs.extend(
                    sheet
                        .formula_cells()
                        .filter(|(row, col, _)| clipped.contains(*row, *col))
                        .map(|(row, col, _)| CellPosition::new(range.sheet_id, row, col))
                        .filter(|position| !known(position)),
                );
            }
        }
        inputs
    }

    /// Compute a cell. Only a circular reference escapes as `Err`, and only
    /// while unwinding towards the cell that started the cycle.
    pub fn compute(&mut self, position: CellPosition) -> FormulaResult<EvaluatedCell> {
        if let Some(cell) = self.computed.get(&position) {
            return Ok(cell.clone());
        }
        if let Some(cell) = self.engine.cached(position) {
            return Ok(cell.clone());
        }
        if self.in_progress.contains(&position) {
            return Err(FormulaError::CircularReference(position));
        }

        let engine = self.engine;
        let locale = engine.options().locale;
        let Some(sheet) = engine.workbook().sheet(position.sheet_id) else {
            return Ok(EvaluatedCell::from_result(
                FormulaError::InvalidReference(format!("{} does not exist", position.sheet_id))
                    .to_result(),
                &locale,
                None,
            ));
        };
        let forced_format = sheet.format(position.row, position.col);

        let cell = match engine.formula(position) {
            None => {
                let (value, format) =
                    parse_literal_with_format(sheet.content(position.row, position.col), &locale);
                EvaluatedCell::from_result(
                    FunctionResult::new(value).with_format(format),
                    &locale,
                    forced_format,
                )
            }
            Some(bound) if bound.compiled.is_bad_expression => {
                debug!(
                    cell = %position,
                    message = bound.compiled.message.as_deref().unwrap_or_default(),
                    "bad expression"
                );
                let message = bound.compiled.message.clone().unwrap_or_default();
                EvaluatedCell::from_result(
                    FunctionResult::error(CellError::BadExpression, message),
                    &locale,
                    forced_format,
                )
            }
            Some(_) if self.overflowed || self.depth >= engine.options().max_depth => {
                if !self.overflowed {
                    debug!(cell = %position, depth = self.depth, "recursion depth guard tripped");
                    self.overflowed = true;
                }
                return Ok(EvaluatedCell::from_result(
                    FunctionResult::error(
                        CellError::Generic,
                        "Maximum recursion depth reached while evaluating the formula.",
                    ),
                    &locale,
                    forced_format,
                ));
            }
            Some(bound) => {
                let result = match self.execute(position, bound) {
                    Ok(result) => result,
                    Err(FormulaError::CircularReference(origin)) => {
                        let cycle = EvaluatedCell::from_result(
                            FormulaError::CircularReference(origin).to_result(),
                            &locale,
                            forced_format,
                        );
                        self.computed.insert(position, cycle.clone());
                        if origin == position {
                            return Ok(cycle);
                        }
                        return Err(FormulaError::CircularReference(origin));
                    }
                    Err(err) => err.to_result(),
                };
                EvaluatedCell::from_result(result, &locale, forced_format)
            }
        };
        if !self.overflowed {
            self.computed.insert(position, cell.clone());
        }
        Ok(cell)
    }

    fn execute(&mut self, position: CellPosition, bound: &BoundFormula) -> FormulaResult<FunctionResult> {
        let ctx = EvaluationContext::new(self.engine.options().locale).at(position);
        self.in_progress.insert(position);
        self.depth += 1;
        let outcome = bound.compiled.execute(&bound.dependencies, self, &ctx);
        self.depth -= 1;
        self.in_progress.remove(&position);

        let mut result = outcome?.top_left();
        if result.value.is_empty() {
            result.value = CellValue::Number(0.0);
        }
        Ok(result)
    }

    /// A cell's value as a formula sees it.
    fn read_cell(&mut self, sheet: &Worksheet, position: CellPosition) -> FormulaResult<FunctionResult> {
        if sheet.is_merge_shadowed(position.row, position.col)
            || sheet.cell(position.row, position.col).is_none()
        {
            return Ok(FunctionResult::empty());
        }
        let cell = self.compute(position)?;
        let value = match cell.value {
            CellValue::Error(CellError::Cycle | CellError::BadExpression) => {
                CellValue::Error(CellError::Generic)
            }
            value => value,
        };
        Ok(FunctionResult {
            value,
            format: cell.format,
            message: cell.message,
        })
    }
}

impl ReferenceResolver for EvaluationPass<'_> {
    fn resolve_scalar(&mut self, range: &Range, is_meta: bool) -> FormulaResult<FunctionResult> {
        let sheet = self.sheet(range)?;
        if is_meta {
            return Ok(FunctionResult::new(format!(
                "{}!{}",
                quote_sheet_name(sheet.name()),
                range.zone.to_a1_string()
            )));
        }
        let cell = clip_to_sheet(sheet, &range.zone).ok_or_else(|| {
            FormulaError::InvalidReference(format!("{} is outside of {}", range.zone, sheet.name()))
        })?;
        self.read_cell(sheet, CellPosition::new(range.sheet_id, cell.start.row, cell.start.col))
    }

    fn resolve_range(&mut self, range: &Range) -> FormulaResult<Matrix<FunctionResult>> {
        let sheet = self.sheet(range)?;
        let key = range
            .key()
            .ok_or_else(|| FormulaError::InvalidReference(range.zone.to_a1_string()))?;
        if let Some(matrix) = self.range_cache.get(&key) {
            return Ok(matrix.clone());
        }

        let clipped = clip_to_sheet(sheet, &range.zone).ok_or_else(|| {
            FormulaError::InvalidReference(format!("{} is outside of {}", range.zone, sheet.name()))
        })?;
        let rows = (clipped.end.row - clipped.start.row + 1) as usize;
        let mut matrix = Vec::with_capacity(usize::from(clipped.end.col - clipped.start.col) + 1);
        for col in clipped.start.col..=clipped.end.col {
            let mut column = Vec::with_capacity(rows);
            for row in clipped.start.row..=clipped.end.row {
                column.push(self.read_cell(sheet, CellPosition::new(range.sheet_id, row, col))?);
            }
            matrix.push(column);
        }
        if !self.overflowed {
            self.range_cache.insert(key, matrix.clone());
        }
        Ok(matrix)
    }
}

/// Sheet name as it must appear in a reference: quoted, with doubled
/// quotes, unless it is a plain identifier.
pub fn quote_sheet_name(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
