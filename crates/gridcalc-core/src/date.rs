//! Date serial numbers (days since 1899-12-30, time as the fraction)

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// `num_days_from_ce` of 1899-12-30
const EPOCH_DAYS_FROM_CE: i32 = 693_594;

pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date.num_days_from_ce() - EPOCH_DAYS_FROM_CE) as f64
}

pub fn datetime_to_serial(dt: NaiveDateTime) -> f64 {
    date_to_serial(dt.date()) + time_to_serial(dt.time())
}

pub fn time_to_serial(time: NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 / SECONDS_PER_DAY
}

/// Build a date from year/month/day, letting month and day overflow into
/// the next unit the way spreadsheet `DATE` does (`DATE(2024, 14, 1)` is
/// February 2025).
pub fn date_from_parts(year: i32, month: i32, day: i32) -> Option<NaiveDate> {
    let months = year.checked_mul(12)?.checked_add(month - 1)?;
    let first = NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)?;
    first.checked_add_signed(Duration::days(day as i64 - 1))
}

/// Rounded to the nearest second so `0.5` reads back as exactly noon.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial.abs() > 3_000_000.0 {
        return None;
    }
    let days = serial.floor();
    let seconds = ((serial - days) * SECONDS_PER_DAY).round() as i64;
    let date = NaiveDate::from_num_days_from_ce_opt(days as i32 + EPOCH_DAYS_FROM_CE)?;
    Some(date.and_hms_opt(0, 0, 0)? + Duration::seconds(seconds))
}

/// `(year, month, day)` of a serial.
pub fn serial_to_ymd(serial: f64) -> Option<(i32, u32, u32)> {
    serial_to_datetime(serial).map(|dt| (dt.year(), dt.month(), dt.day()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_serials() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(date_to_serial(d), 45306.0);
        assert_eq!(date_to_serial(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()), 2.0);
        assert_eq!(serial_to_ymd(45306.0), Some((2024, 1, 15)));
    }

    #[test]
    fn test_overflowing_parts() {
        assert_eq!(date_from_parts(2024, 14, 1), NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(date_from_parts(2024, 3, 0), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(date_from_parts(2024, 0, 1), NaiveDate::from_ymd_opt(2023, 12, 1));
    }

    #[test]
    fn test_time_fraction() {
        let noon = serial_to_datetime(45306.5).unwrap();
        assert_eq!(noon.hour(), 12);
        assert_eq!(time_to_serial(NaiveTime::from_hms_opt(6, 0, 0).unwrap()), 0.25);
    }
}
