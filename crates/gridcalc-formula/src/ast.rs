//! Compiled expression tree

use crate::functions::FunctionDef;
use gridcalc_core::{CellError, Zone};

/// Expression node produced by the compiler.
///
/// References are not stored inline: `Reference(i)` points into the
/// formula's reference list, which the engine binds to concrete sheets
/// once per cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    Boolean(bool),
    Reference(usize),
    /// An empty argument slot, as in `IF(A1,,2)`
    Missing,
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: &'static FunctionDef,
        args: Vec<Expr>,
    },
    /// A node that always evaluates to an error, e.g. a call with the wrong
    /// number of arguments
    Fail { kind: CellError, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Concat,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Self::Add,
            "-" => Self::Subtract,
            "*" => Self::Multiply,
            "/" => Self::Divide,
            "^" => Self::Power,
            "=" => Self::Equal,
            "<>" => Self::NotEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterEqual,
            "&" => Self::Concat,
            _ => return None,
        })
    }

    /// Name used in error messages about the operator
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Subtract => "MINUS",
            Self::Multiply => "MULTIPLY",
            Self::Divide => "DIVIDE",
            Self::Power => "POWER",
            Self::Equal => "EQ",
            Self::NotEqual => "NE",
            Self::LessThan => "LT",
            Self::LessEqual => "LTE",
            Self::GreaterThan => "GT",
            Self::GreaterEqual => "GTE",
            Self::Concat => "CONCAT",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessEqual
                | Self::GreaterThan
                | Self::GreaterEqual
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

impl UnaryOperator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Negate => "UMINUS",
            Self::Percent => "UNARY.PERCENT",
        }
    }
}

/// A reference as written in the formula, not yet bound to a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaReference {
    /// Sheet prefix with quotes removed, `None` for the formula's own sheet
    pub sheet_name: Option<String>,
    /// `None` when the zone text is out of the addressable grid (`ZZZ1`)
    pub zone: Option<Zone>,
    /// Original token text
    pub text: String,
}

impl FormulaReference {
    /// Split `Sheet!A1:B2` / `'My sheet'!A1` into its sheet and zone parts.
    pub fn parse(text: &str) -> Self {
        let (sheet_name, xc) = match text.rfind('!') {
            Some(i) => {
                let sheet = &text[..i];
                let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
                    Some(quoted) => quoted.replace("''", "'"),
                    None => sheet.to_string(),
                };
                (Some(sheet), &text[i + 1..])
            }
            None => (None, text),
        };
        Self {
            sheet_name,
            zone: Zone::parse(xc).ok(),
            text: text.to_string(),
        }
    }

    /// The zone part of the original text
    pub fn xc(&self) -> &str {
        self.text.rfind('!').map_or(&self.text, |i| &self.text[i + 1..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_parts() {
        let r = FormulaReference::parse("'It''s'!B2:C");
        assert_eq!(r.sheet_name.as_deref(), Some("It's"));
        assert_eq!(r.zone, Zone::parse("B2:C").ok());
        assert_eq!(r.xc(), "B2:C");

        let local = FormulaReference::parse("$A$1");
        assert_eq!(local.sheet_name, None);
        assert_eq!(local.zone, Some(Zone::cell(0, 0)));
    }

    #[test]
    fn test_out_of_grid_zone() {
        let r = FormulaReference::parse("ZZZ1");
        assert_eq!(r.zone, None);
        assert_eq!(r.xc(), "ZZZ1");
    }
}
