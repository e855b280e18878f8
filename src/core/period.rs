//! Month-granularity period arithmetic.
//!
//! Every period in the crate is a `NaiveDate` normalised to the first day of
//! its month.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{ForecastError, Result};

/// Normalise a date to the first day of its month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whether the date is already a month start.
pub fn is_month_start(date: NaiveDate) -> bool {
    date.day() == 1
}

/// Shift a month-start period by `months` (may be negative).
pub fn add_months(period: NaiveDate, months: i32) -> Result<NaiveDate> {
    let shifted = if months >= 0 {
        period.checked_add_months(Months::new(months as u32))
    } else {
        period.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.ok_or_else(|| {
        ForecastError::InvalidPeriod(format!("{period} shifted by {months} months is out of range"))
    })
}

/// The month following `period`.
pub fn next_month(period: NaiveDate) -> Result<NaiveDate> {
    add_months(period, 1)
}

/// Signed number of whole months from `start` to `end`.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end.year() as i64 - start.year() as i64) * 12 + (end.month() as i64 - start.month() as i64)
}

/// All month starts in the inclusive range `[start, end]`.
///
/// Returns an empty vector when `start > end`.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let start = month_start(start);
    let end = month_start(end);
    let count = months_between(start, end);
    if count < 0 {
        return Vec::new();
    }
    (0..=count)
        .filter_map(|i| start.checked_add_months(Months::new(i as u32)))
        .collect()
}

/// `horizon` consecutive month starts beginning at `first`.
pub fn months_from(first: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (0..horizon)
        .filter_map(|i| first.checked_add_months(Months::new(i as u32)))
        .collect()
}

/// Calendar quarter (1-4) of a period.
pub fn quarter(period: NaiveDate) -> u32 {
    (period.month() - 1) / 3 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_start_normalises_day() {
        assert_eq!(month_start(ymd(2024, 2, 29)), ymd(2024, 2, 1));
        assert!(is_month_start(ymd(2024, 3, 1)));
        assert!(!is_month_start(ymd(2024, 3, 2)));
    }

    #[test]
    fn add_months_crosses_years() {
        assert_eq!(add_months(ymd(2023, 11, 1), 3).unwrap(), ymd(2024, 2, 1));
        assert_eq!(add_months(ymd(2024, 1, 1), -1).unwrap(), ymd(2023, 12, 1));
        assert_eq!(next_month(ymd(2024, 12, 1)).unwrap(), ymd(2025, 1, 1));
    }

    #[test]
    fn months_between_is_signed() {
        assert_eq!(months_between(ymd(2023, 1, 1), ymd(2024, 3, 1)), 14);
        assert_eq!(months_between(ymd(2024, 3, 1), ymd(2023, 1, 1)), -14);
    }

    #[test]
    fn month_range_is_inclusive() {
        let range = month_range(ymd(2023, 11, 15), ymd(2024, 2, 1));
        assert_eq!(
            range,
            vec![ymd(2023, 11, 1), ymd(2023, 12, 1), ymd(2024, 1, 1), ymd(2024, 2, 1)]
        );
        assert!(month_range(ymd(2024, 2, 1), ymd(2024, 1, 1)).is_empty());
    }

    #[test]
    fn quarters() {
        assert_eq!(quarter(ymd(2024, 1, 1)), 1);
        assert_eq!(quarter(ymd(2024, 6, 1)), 2);
        assert_eq!(quarter(ymd(2024, 12, 1)), 4);
    }
}
