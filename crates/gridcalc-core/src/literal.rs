//! Typing of raw (non-formula) cell content

use crate::cell::CellValue;
use crate::date::{date_to_serial, time_to_serial};
use crate::locale::{DateOrder, Locale};
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical numeral, after locale separators have been normalized.
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("number regex"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,4})([/.-])(\d{1,2})([/.-])(\d{1,4})(?:\s+(.+))?$").expect("date regex")
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*([AaPp][Mm]))?$").expect("time regex")
});

/// Type raw content. Never fails: anything unrecognized is text, kept verbatim.
pub fn parse_literal(content: &str, locale: &Locale) -> CellValue {
    parse_literal_with_format(content, locale).0
}

/// Like [`parse_literal`], also returning the display format the literal
/// implies (`0%` for `40%`, a date pattern for `1/2/2024`).
///
/// ```
/// use gridcalc_core::{parse_literal_with_format, CellValue, Locale};
///
/// let (value, format) = parse_literal_with_format("40%", &Locale::en_us());
/// assert_eq!(value, CellValue::Number(0.4));
/// assert_eq!(format.as_deref(), Some("0%"));
/// ```
pub fn parse_literal_with_format(content: &str, locale: &Locale) -> (CellValue, Option<String>) {
    if content.is_empty() {
        return (CellValue::Empty, None);
    }
    let text = content.trim();
    if text.eq_ignore_ascii_case("true") {
        return (CellValue::Boolean(true), None);
    }
    if text.eq_ignore_ascii_case("false") {
        return (CellValue::Boolean(false), None);
    }
    if let Some((n, format)) = parse_number(text, locale) {
        return (CellValue::Number(n), format);
    }
    if let Some((serial, format)) = parse_date_time(text, locale) {
        return (CellValue::Number(serial), Some(format));
    }
    (CellValue::string(content), None)
}

/// Read a locale numeral, with an optional `%` directly before or after it.
/// Returns the value and, for percents, a matching percent format.
pub fn parse_number(text: &str, locale: &Locale) -> Option<(f64, Option<String>)> {
    let (body, percent) = match text.strip_suffix('%').or_else(|| text.strip_prefix('%')) {
        Some(body) => (body, true),
        None => (text, false),
    };
    let separator = locale.thousands_separator;
    if body.is_empty() || body.chars().any(|c| c.is_whitespace() && Some(c) != separator) {
        return None;
    }
    let numeral = canonical_numeral(body, locale)?;
    if !NUMBER_RE.is_match(&numeral) {
        return None;
    }
    let value: f64 = numeral.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if !percent {
        return Some((value, None));
    }
    let decimals = numeral
        .split_once('.')
        .map_or(0, |(_, frac)| frac.bytes().take_while(u8::is_ascii_digit).count());
    Some((value / 100.0, Some(percent_format(decimals))))
}

fn percent_format(decimals: usize) -> String {
    if decimals == 0 {
        "0%".to_string()
    } else {
        format!("0.{}%", "0".repeat(decimals))
    }
}

/// Rewrite a locale numeral with `.` as decimal point and no grouping.
fn canonical_numeral(body: &str, locale: &Locale) -> Option<String> {
    let (int_part, frac_part) = match body.split_once(locale.decimal_separator) {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let int_part = match locale.thousands_separator {
        Some(sep) if int_part.contains(sep) => ungroup(int_part, sep)?,
        _ => int_part.to_string(),
    };
    if let (Some(sep), Some(frac)) = (locale.thousands_separator, frac_part) {
        if frac.contains(sep) {
            return None;
        }
    }
    if locale.decimal_separator != '.'
        && (int_part.contains('.') || frac_part.is_some_and(|f| f.contains('.')))
    {
        return None;
    }
    Some(match frac_part {
        Some(frac) => format!("{}.{}", int_part, frac),
        None => int_part,
    })
}

/// `1,234,567` → `1234567`; rejects irregular groups like `1,23`.
fn ungroup(int_part: &str, sep: char) -> Option<String> {
    let digits = int_part.trim_start_matches(['+', '-']);
    let sign = &int_part[..int_part.len() - digits.len()];
    let mut groups = digits.split(sep);
    let first = groups.next()?;
    let is_digits = |g: &str| g.bytes().all(|b| b.is_ascii_digit());
    if first.is_empty() || first.len() > 3 || !is_digits(first) {
        return None;
    }
    let mut out = format!("{}{}", sign, first);
    for group in groups {
        if group.len() != 3 || !is_digits(group) {
            return None;
        }
        out.push_str(group);
    }
    Some(out)
}

/// Dates like `1/2/2024`, `2024-01-02`, optionally followed by a time, or a
/// bare time like `14:30` / `2:30 PM`. Returns a serial and a display format.
pub fn parse_date_time(text: &str, locale: &Locale) -> Option<(f64, String)> {
    if let Some(time) = parse_time(text) {
        return Some(time);
    }
    let caps = DATE_RE.captures(text)?;
    let sep = &caps[2];
    if sep != &caps[4] {
        return None;
    }
    let parts = [&caps[1], &caps[3], &caps[5]];
    let order = if parts[0].len() == 4 {
        DateOrder::YMD
    } else {
        locale.date_order
    };
    let (y, m, d) = match order {
        DateOrder::YMD => (parts[0], parts[1], parts[2]),
        DateOrder::MDY => (parts[2], parts[0], parts[1]),
        DateOrder::DMY => (parts[2], parts[1], parts[0]),
    };
    let date = NaiveDate::from_ymd_opt(expand_year(y)?, m.parse().ok()?, d.parse().ok()?)?;
    let mut format = match order {
        DateOrder::YMD => format!("yyyy{0}mm{0}dd", sep),
        DateOrder::MDY => format!("m{0}d{0}yyyy", sep),
        DateOrder::DMY => format!("d{0}m{0}yyyy", sep),
    };
    let mut serial = date_to_serial(date);
    if let Some(time_text) = caps.get(6) {
        let (fraction, time_format) = parse_time(time_text.as_str())?;
        serial += fraction;
        format.push(' ');
        format.push_str(&time_format);
    }
    Some((serial, format))
}

fn expand_year(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    match text.len() {
        4 => Some(year),
        2 if year < 30 => Some(2000 + year),
        2 => Some(1900 + year),
        _ => None,
    }
}

fn parse_time(text: &str) -> Option<(f64, String)> {
    let caps = TIME_RE.captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps.get(3).map_or(Some(0), |s| s.as_str().parse().ok())?;
    let meridiem = caps.get(4).map(|m| m.as_str().to_ascii_uppercase());
    if let Some(meridiem) = &meridiem {
        if hour == 0 || hour > 12 {
            return None;
        }
        hour = match (meridiem.as_str(), hour) {
            ("AM", 12) => 0,
            ("PM", h) if h < 12 => h + 12,
            (_, h) => h,
        };
    }
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    let mut format = String::from(if caps.get(3).is_some() { "hh:mm:ss" } else { "hh:mm" });
    if meridiem.is_some() {
        format.push_str(" a");
    }
    Some((time_to_serial(time), format))
}
