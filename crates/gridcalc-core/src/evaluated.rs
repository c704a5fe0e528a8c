//! Display-ready evaluated cells

use crate::cell::{CellError, CellValue};
use crate::format::{format_number, is_date_format};
use crate::locale::Locale;
use crate::result::FunctionResult;
use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\(([^)]+)\)$").expect("link regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValueType {
    Empty,
    Number,
    Text,
    Boolean,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A `[label](url)` text value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// The typed, formatted result of evaluating one cell.
///
/// Built only through [`EvaluatedCell::from_result`], so `value_type`
/// always agrees with `value` and numbers are always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedCell {
    pub value: CellValue,
    pub value_type: CellValueType,
    pub format: Option<String>,
    pub formatted_value: String,
    pub is_auto_summable: bool,
    pub default_align: Align,
    pub link: Option<Link>,
    pub message: Option<String>,
}

impl EvaluatedCell {
    pub fn empty() -> Self {
        Self::from_result(FunctionResult::empty(), &Locale::default(), None)
    }

    /// Type a result. `forced_format`, when set, overrides the format the
    /// result carries.
    pub fn from_result(result: FunctionResult, locale: &Locale, forced_format: Option<&str>) -> Self {
        let FunctionResult {
            value,
            format,
            message,
        } = result;
        let format = forced_format.map(str::to_string).or(format);

        let (value, message) = match value {
            CellValue::Number(n) if !n.is_finite() => (
                CellValue::Error(CellError::Generic),
                Some("The result is not a finite number".to_string()),
            ),
            CellValue::Number(n) if n == 0.0 => (CellValue::Number(0.0), message),
            other => (other, message),
        };

        let mut link = None;
        let value = match value {
            CellValue::String(s) => match MARKDOWN_LINK_RE.captures(s.as_str()) {
                Some(caps) => {
                    let label = caps[1].to_string();
                    link = Some(Link {
                        label: label.clone(),
                        url: caps[2].to_string(),
                    });
                    CellValue::string(label)
                }
                None => CellValue::String(s),
            },
            other => other,
        };

        let (value_type, default_align) = match &value {
            CellValue::Empty => (CellValueType::Empty, Align::Left),
            CellValue::Number(_) => (CellValueType::Number, Align::Right),
            CellValue::String(_) => (CellValueType::Text, Align::Left),
            CellValue::Boolean(_) => (CellValueType::Boolean, Align::Center),
            CellValue::Error(_) => (CellValueType::Error, Align::Center),
        };

        let formatted_value = match &value {
            CellValue::Number(n) => format_number(*n, format.as_deref(), locale),
            other => other.to_string(),
        };

        let is_auto_summable = value_type == CellValueType::Number
            && !format.as_deref().is_some_and(is_date_format);

        Self {
            value,
            value_type,
            format,
            formatted_value,
            is_auto_summable,
            default_align,
            link,
            message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.value_type == CellValueType::Error
    }
}

impl Default for EvaluatedCell {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn typed(value: impl Into<CellValue>) -> EvaluatedCell {
        EvaluatedCell::from_result(FunctionResult::new(value), &Locale::en_us(), None)
    }

    #[test]
    fn test_number_noise_is_normalized() {
        let cell = typed(-0.0);
        assert_eq!(cell.value, CellValue::Number(0.0));
        assert!(cell.value.as_number().is_some_and(|n| n.is_sign_positive()));
        assert_eq!(cell.formatted_value, "0");

        let cell = typed(f64::NAN);
        assert_eq!(cell.value_type, CellValueType::Error);
        assert_eq!(cell.value, CellValue::Error(CellError::Generic));
        assert_eq!(typed(f64::INFINITY).value_type, CellValueType::Error);
    }

    #[test]
    fn test_alignment_and_types() {
        assert_eq!(typed(3.0).default_align, Align::Right);
        assert_eq!(typed(true).default_align, Align::Center);
        assert_eq!(typed(CellError::Cycle).formatted_value, "#CYCLE");
        assert_eq!(typed("hi").value_type, CellValueType::Text);
        assert_eq!(typed(CellValue::Empty).value_type, CellValueType::Empty);
    }

    #[test]
    fn test_auto_summable() {
        assert!(typed(3.0).is_auto_summable);
        let date = EvaluatedCell::from_result(
            FunctionResult::new(45306.0).with_format(Some("m/d/yyyy".into())),
            &Locale::en_us(),
            None,
        );
        assert!(!date.is_auto_summable);
        assert_eq!(date.formatted_value, "1/15/2024");
    }

    #[test]
    fn test_forced_format_wins() {
        let cell = EvaluatedCell::from_result(
            FunctionResult::new(0.5).with_format(Some("0%".into())),
            &Locale::en_us(),
            Some("0.00"),
        );
        assert_eq!(cell.formatted_value, "0.50");
        assert_eq!(cell.format.as_deref(), Some("0.00"));
    }

    #[test]
    fn test_markdown_link() {
        let cell = typed("[docs](https://example.com)");
        assert_eq!(cell.value, CellValue::string("docs"));
        assert_eq!(cell.link.unwrap().url, "https://example.com");
    }
}
