//! Locale settings for literals, display formatting and formula text

/// Order of day, month and year in a typed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DateOrder {
    /// `1/2/2024` is January 2nd
    MDY,
    /// `1/2/2024` is February 1st
    DMY,
    /// `2024/1/2` is January 2nd
    YMD,
}

/// Separators and date conventions of one locale.
///
/// Stored formulas always use the canonical (`en_us`) separators; a locale's
/// `formula_arg_separator` and `decimal_separator` only apply to formula
/// text shown to or typed by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub code: &'static str,
    pub decimal_separator: char,
    /// Grouping separator accepted in literals and used for `#,##0` formats
    pub thousands_separator: Option<char>,
    pub formula_arg_separator: char,
    pub date_order: DateOrder,
    pub date_separator: char,
}

impl Locale {
    #[must_use]
    pub const fn en_us() -> Self {
        Self {
            code: "en_US",
            decimal_separator: '.',
            thousands_separator: Some(','),
            formula_arg_separator: ',',
            date_order: DateOrder::MDY,
            date_separator: '/',
        }
    }

    #[must_use]
    pub const fn en_gb() -> Self {
        Self {
            code: "en_GB",
            date_order: DateOrder::DMY,
            ..Self::en_us()
        }
    }

    #[must_use]
    pub const fn de_de() -> Self {
        Self {
            code: "de_DE",
            decimal_separator: ',',
            thousands_separator: Some('.'),
            formula_arg_separator: ';',
            date_order: DateOrder::DMY,
            date_separator: '.',
        }
    }

    /// Groups with a no-break space so `44 45` is never read as a number.
    #[must_use]
    pub const fn fr_fr() -> Self {
        Self {
            code: "fr_FR",
            thousands_separator: Some('\u{00A0}'),
            date_separator: '/',
            ..Self::de_de()
        }
    }

    /// Look a preset up by code, accepting `de-DE`, `de_de` and `de`.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.replace('-', "_").to_ascii_lowercase();
        [Self::en_us(), Self::en_gb(), Self::de_de(), Self::fr_fr()]
            .into_iter()
            .find(|l| {
                let preset = l.code.to_ascii_lowercase();
                preset == normalized || preset.split('_').next() == Some(normalized.as_str())
            })
    }

    /// Whether this locale writes formulas exactly like the canonical form.
    pub fn is_canonical(&self) -> bool {
        self.decimal_separator == '.' && self.formula_arg_separator == ','
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::en_us()
    }
}
