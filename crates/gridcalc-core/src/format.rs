//! Rendering numbers through display formats

use crate::date::serial_to_datetime;
use crate::locale::Locale;
use chrono::{Datelike, NaiveDateTime, Timelike};

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Whether a format renders dates or times rather than plain numbers.
pub fn is_date_format(format: &str) -> bool {
    let lower = format.to_ascii_lowercase();
    if lower.contains(['y', 'd', 'h', 's']) {
        return true;
    }
    lower.contains('m') && !lower.contains(['0', '#'])
}

/// Render `value` through `format` (`None` or `General` for the default).
///
/// ```
/// use gridcalc_core::{format_number, Locale};
///
/// assert_eq!(format_number(1234.5, Some("#,##0.00"), &Locale::de_de()), "1.234,50");
/// assert_eq!(format_number(0.125, Some("0.0%"), &Locale::en_us()), "12.5%");
/// ```
pub fn format_number(value: f64, format: Option<&str>, locale: &Locale) -> String {
    match format {
        None => format_general(value, locale),
        Some(f) if f.is_empty() || f.eq_ignore_ascii_case("general") => {
            format_general(value, locale)
        }
        Some(f) if is_date_format(f) => match serial_to_datetime(value) {
            Some(dt) => format_date_time(&dt, f),
            None => format_general(value, locale),
        },
        Some(f) => format_decimal(value, f, locale),
    }
}

fn format_general(value: f64, locale: &Locale) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let abs = value.abs();
    let text = if !(1e-10..1e21).contains(&abs) {
        format!("{:e}", value)
    } else if value.fract() == 0.0 && abs < 1e15 {
        format!("{}", value as i64)
    } else {
        let fixed = format!("{:.10}", value);
        let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
        if trimmed == "-0" { "0".to_string() } else { trimmed.to_string() }
    };
    localize_decimal(&text, locale)
}

fn localize_decimal(text: &str, locale: &Locale) -> String {
    if locale.decimal_separator == '.' {
        text.to_string()
    } else {
        text.replace('.', &locale.decimal_separator.to_string())
    }
}

/// Fixed-decimal formats: `0`, `0.00`, `#,##0.0`, `0%`, `0.00%`.
fn format_decimal(value: f64, format: &str, locale: &Locale) -> String {
    let percent = format.contains('%');
    let grouping = format.contains(',');
    let decimals = format
        .split_once('.')
        .map_or(0, |(_, frac)| frac.chars().filter(|c| matches!(c, '0' | '#')).count());

    let scaled = if percent { value * 100.0 } else { value };
    let fixed = format!("{:.*}", decimals, scaled.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed.clone(), None),
    };
    let negative = scaled < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9'));

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    match locale.thousands_separator {
        Some(sep) if grouping => out.push_str(&group_digits(&int_part, sep)),
        _ => out.push_str(&int_part),
    }
    if let Some(frac) = frac_part {
        out.push(locale.decimal_separator);
        out.push_str(&frac);
    }
    if percent {
        out.push('%');
    }
    out
}

fn group_digits(digits: &str, sep: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DateToken<'a> {
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    Meridiem,
    Literal(&'a str),
}

fn tokenize_date_format(format: &str) -> Vec<DateToken<'_>> {
    let mut tokens = Vec::new();
    let bytes = format.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i].to_ascii_lowercase();
        if format[i..].to_ascii_uppercase().starts_with("AM/PM") {
            tokens.push(DateToken::Meridiem);
            i += 5;
            continue;
        }
        if matches!(c, b'y' | b'm' | b'd' | b'h' | b's' | b'a') {
            let run = bytes[i..]
                .iter()
                .take_while(|b| b.to_ascii_lowercase() == c)
                .count();
            tokens.push(match c {
                b'y' => DateToken::Year(run),
                b'm' => DateToken::Month(run),
                b'd' => DateToken::Day(run),
                b'h' => DateToken::Hour(run),
                b's' => DateToken::Second(run),
                _ => DateToken::Meridiem,
            });
            i += run;
            continue;
        }
        let start = i;
        while i < bytes.len()
            && !matches!(bytes[i].to_ascii_lowercase(), b'y' | b'm' | b'd' | b'h' | b's' | b'a')
        {
            i += 1;
        }
        tokens.push(DateToken::Literal(&format[start..i]));
    }
    resolve_minutes(&mut tokens);
    tokens
}

/// `m`/`mm` means minutes right after an hour or right before a second.
fn resolve_minutes(tokens: &mut [DateToken<'_>]) {
    let fields: Vec<usize> = (0..tokens.len())
        .filter(|&i| !matches!(tokens[i], DateToken::Literal(_)))
        .collect();
    for (k, &i) in fields.iter().enumerate() {
        let DateToken::Month(run) = tokens[i] else {
            continue;
        };
        if run > 2 {
            continue;
        }
        let after_hour = k > 0 && matches!(tokens[fields[k - 1]], DateToken::Hour(_));
        let before_second = fields
            .get(k + 1)
            .is_some_and(|&j| matches!(tokens[j], DateToken::Second(_)));
        if after_hour || before_second {
            tokens[i] = DateToken::Minute(run);
        }
    }
}

fn pad(n: u32, width: usize) -> String {
    format!("{:0width$}", n, width = width)
}

fn format_date_time(dt: &NaiveDateTime, format: &str) -> String {
    let tokens = tokenize_date_format(format);
    let twelve_hour = tokens.contains(&DateToken::Meridiem);
    let mut out = String::new();
    for token in tokens {
        match token {
            DateToken::Year(n) if n <= 2 => out.push_str(&pad(dt.year().rem_euclid(100) as u32, 2)),
            DateToken::Year(_) => out.push_str(&format!("{:04}", dt.year())),
            DateToken::Month(n) => {
                let name = MONTHS[dt.month0() as usize];
                match n {
                    1 | 2 => out.push_str(&pad(dt.month(), n)),
                    3 => out.push_str(&name[..3]),
                    _ => out.push_str(name),
                }
            }
            DateToken::Day(n) => {
                let name = WEEKDAYS[dt.weekday().num_days_from_monday() as usize];
                match n {
                    1 | 2 => out.push_str(&pad(dt.day(), n)),
                    3 => out.push_str(&name[..3]),
                    _ => out.push_str(name),
                }
            }
            DateToken::Hour(n) => {
                let hour = if twelve_hour {
                    match dt.hour() % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    dt.hour()
                };
                out.push_str(&pad(hour, n.min(2)));
            }
            DateToken::Minute(n) => out.push_str(&pad(dt.minute(), n)),
            DateToken::Second(n) => out.push_str(&pad(dt.second(), n.min(2))),
            DateToken::Meridiem => out.push_str(if dt.hour() < 12 { "AM" } else { "PM" }),
            DateToken::Literal(text) => out.push_str(text),
        }
    }
    out
}
