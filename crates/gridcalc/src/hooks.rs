//! Callbacks the engine runs around evaluation
//!
//! Iteration hooks run after each full evaluation pass and may ask for
//! another one, up to [`EngineOptions::max_passes`](crate::EngineOptions).
//! Dependency listeners hear about every formula cell whose bound
//! dependencies change.

use gridcalc_core::{CellPosition, Range};

/// What an iteration hook wants after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterationRequest {
    #[default]
    Done,
    Reevaluate,
}

/// Statistics handed to iteration hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// 1-based pass number
    pub pass: usize,
    pub cells_computed: usize,
}

pub type IterationHook = Box<dyn FnMut(&PassReport) -> IterationRequest>;

/// Called with a formula cell and its new dependencies. An empty slice
/// means the cell no longer holds a formula.
pub type DependencyListener = Box<dyn FnMut(CellPosition, &[Range])>;
