//! Conditional aggregation: SUMIF, COUNTIF, AVERAGEIF
//!
//! A criterion is a number (`5`), a comparison written as text (`">=10"`,
//! `"<>apple"`), or a text pattern where `*` and `?` are wildcards. The
//! empty criterion matches blank cells.

use super::{check_error, scalar_arg, ArgSpec, FunctionDef};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{compare_values, Arg, EvaluationContext, FormulaValue};
use gridcalc_core::{parse_number, CellValue, FunctionResult, Locale, Matrix};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "SUMIF",
        args: &[
            ArgSpec::range("criteria_range"),
            ArgSpec::scalar("criterion"),
            ArgSpec::range("sum_range").optional(),
        ],
        implementation: fn_sumif,
        volatile: false,
    },
    FunctionDef {
        name: "COUNTIF",
        args: &[ArgSpec::range("range"), ArgSpec::scalar("criterion")],
        implementation: fn_countif,
        volatile: false,
    },
    FunctionDef {
        name: "AVERAGEIF",
        args: &[
            ArgSpec::range("criteria_range"),
            ArgSpec::scalar("criterion"),
            ArgSpec::range("average_range").optional(),
        ],
        implementation: fn_averageif,
        volatile: false,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparison {
    fn split(text: &str) -> (Self, &str) {
        for (prefix, op) in [
            ("<>", Comparison::NotEqual),
            ("<=", Comparison::LessEqual),
            (">=", Comparison::GreaterEqual),
            ("<", Comparison::Less),
            (">", Comparison::Greater),
            ("=", Comparison::Equal),
        ] {
            if let Some(rest) = text.strip_prefix(prefix) {
                return (op, rest);
            }
        }
        (Comparison::Equal, text)
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Equal => ordering.is_eq(),
            Comparison::NotEqual => ordering.is_ne(),
            Comparison::Less => ordering.is_lt(),
            Comparison::LessEqual => ordering.is_le(),
            Comparison::Greater => ordering.is_gt(),
            Comparison::GreaterEqual => ordering.is_ge(),
        }
    }
}

#[derive(Debug)]
enum Operand {
    Number(f64),
    Pattern(Regex),
    Text(CellValue),
    Blank,
}

/// A compiled criterion
#[derive(Debug)]
pub struct Criterion {
    comparison: Comparison,
    operand: Operand,
}

impl Criterion {
    pub fn new(criterion: &FunctionResult, locale: &Locale) -> FormulaResult<Self> {
        let text = match &criterion.value {
            CellValue::Number(n) => return Ok(Self::equal(Operand::Number(*n))),
            CellValue::Boolean(b) => return Ok(Self::equal(Operand::Text(CellValue::Boolean(*b)))),
            CellValue::Empty => return Ok(Self::equal(Operand::Blank)),
            CellValue::String(s) => s.as_str().to_string(),
            CellValue::Error(kind) => {
                return Err(FormulaError::Cell {
                    kind: *kind,
                    message: criterion.message.clone(),
                })
            }
        };
        let (comparison, rest) = Comparison::split(&text);
        let operand = if rest.is_empty() {
            Operand::Blank
        } else if let Some((n, _)) = parse_number(rest, locale) {
            Operand::Number(n)
        } else if rest.eq_ignore_ascii_case("true") || rest.eq_ignore_ascii_case("false") {
            Operand::Text(CellValue::Boolean(rest.eq_ignore_ascii_case("true")))
        } else if matches!(comparison, Comparison::Equal | Comparison::NotEqual)
            && rest.contains(['*', '?'])
        {
            Operand::Pattern(wildcard_regex(rest)?)
        } else {
            Operand::Text(CellValue::string(rest))
        };
        Ok(Self { comparison, operand })
    }

    fn equal(operand: Operand) -> Self {
        Self {
            comparison: Comparison::Equal,
            operand,
        }
    }

    pub fn matches(&self, value: &CellValue) -> bool {
        let matched = match &self.operand {
            Operand::Blank => {
                return match self.comparison {
                    Comparison::Equal => value.is_empty() || value.as_str() == Some(""),
                    Comparison::NotEqual => !value.is_empty(),
                    _ => false,
                }
            }
            Operand::Pattern(regex) => match value.as_str() {
                Some(text) => regex.is_match(text),
                None => false,
            },
            Operand::Number(n) => match value {
                CellValue::Number(v) => return self.comparison.holds(v.total_cmp(n)),
                _ => false,
            },
            Operand::Text(expected) => {
                if std::mem::discriminant(value) != std::mem::discriminant(expected) {
                    false
                } else {
                    return self.comparison.holds(compare_values(value, expected));
                }
            }
        };
        match self.comparison {
            Comparison::NotEqual => !matched,
            _ => matched,
        }
    }
}

/// `a*c` → `^a.*c$`, case-insensitive; `~*` and `~?` are literal.
fn wildcard_regex(pattern: &str) -> FormulaResult<Regex> {
    let mut source = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            '~' => match chars.next() {
                Some(next) => source.push_str(&regex::escape(&next.to_string())),
                None => source.push('~'),
            },
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|err| FormulaError::Evaluation(format!("Invalid criterion '{pattern}': {err}")))
}

fn as_matrix(args: &[Arg], index: usize) -> Option<Matrix<FunctionResult>> {
    match args.get(index) {
        None | Some(Arg::Missing) => None,
        Some(Arg::Matrix(matrix)) => Some(matrix.clone()),
        Some(Arg::Value(value)) => Some(vec![vec![value.clone()]]),
    }
}

/// Values of `target` at the positions where `range` matches the
/// criterion. `target` is read with the shape of `range` from its top-left.
fn matching_values(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<Vec<CellValue>> {
    let range = as_matrix(args, 0).unwrap_or_default();
    let criterion = Criterion::new(scalar_arg(args, 1), &ctx.locale)?;
    let target = as_matrix(args, 2);
    let mut values = Vec::new();
    for (col, column) in range.iter().enumerate() {
        for (row, cell) in column.iter().enumerate() {
            if !criterion.matches(&cell.value) {
                continue;
            }
            let value = match &target {
                Some(target) => target.get(col).and_then(|c| c.get(row)),
                None => Some(cell),
            };
            if let Some(value) = value {
                check_error(value)?;
                values.push(value.value.clone());
            }
        }
    }
    Ok(values)
}

/// SUMIF(criteria_range, criterion, [sum_range])
pub fn fn_sumif(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let sum: f64 = matching_values(args, ctx)?
        .iter()
        .filter_map(|v| match v {
            CellValue::Number(n) => Some(*n),
            _ => None,
        })
        .sum();
    Ok(FormulaValue::scalar(sum))
}

/// COUNTIF(range, criterion)
pub fn fn_countif(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let range = as_matrix(args, 0).unwrap_or_default();
    let criterion = Criterion::new(scalar_arg(args, 1), &ctx.locale)?;
    let count = range
        .iter()
        .flatten()
        .filter(|cell| criterion.matches(&cell.value))
        .count();
    Ok(FormulaValue::scalar(count as f64))
}

/// AVERAGEIF(criteria_range, criterion, [average_range])
pub fn fn_averageif(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers: Vec<f64> = matching_values(args, ctx)?
        .iter()
        .filter_map(|v| match v {
            CellValue::Number(n) => Some(*n),
            _ => None,
        })
        .collect();
    if numbers.is_empty() {
        return Err(FormulaError::Evaluation(
            "Evaluation of function AVERAGEIF caused a divide by zero error.".into(),
        ));
    }
    Ok(FormulaValue::scalar(numbers.iter().sum::<f64>() / numbers.len() as f64))
}
