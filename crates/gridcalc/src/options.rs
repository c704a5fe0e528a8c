//! Engine configuration

use gridcalc_core::{Locale, DEFAULT_SHEET_SIZE};

/// Options for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Locale used to read literals and render evaluated values
    pub locale: Locale,
    /// Upper bound on evaluation passes when iteration hooks keep asking
    /// for another one (default: 10)
    pub max_passes: usize,
    /// Deepest chain of formula cells evaluated recursively. Deeper chains
    /// are settled bottom-up instead; only a cycle longer than this
    /// resolves to an error (default: 128)
    pub max_depth: usize,
    /// Size of sheets created without an explicit size, as `(rows, cols)`
    pub default_sheet_size: (u32, u16),
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            locale: Locale::en_us(),
            max_passes: 10,
            max_depth: 128,
            default_sheet_size: DEFAULT_SHEET_SIZE,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_default_sheet_size(mut self, rows: u32, cols: u16) -> Self {
        self.default_sheet_size = (rows, cols);
        self
    }
}
