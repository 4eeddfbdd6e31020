use crate::error::{FiscalLedgerError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Shifts `date` by whole calendar years. A Feb 29 that lands in a common
/// year is clamped to Feb 28.
pub fn shift_years(date: NaiveDate, years: i32) -> Result<NaiveDate> {
    let months = Months::new(years.unsigned_abs() * 12);
    let shifted = if years >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };

    shifted.ok_or_else(|| {
        FiscalLedgerError::Configuration(format!(
            "Shifting {} by {} years leaves the supported date range",
            date, years
        ))
    })
}

pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };

    shifted.ok_or_else(|| {
        FiscalLedgerError::Configuration(format!(
            "Shifting {} by {} days leaves the supported date range",
            date, days
        ))
    })
}

/// The last day of a one-year period starting on `start`.
pub fn year_end_from_start(start: NaiveDate) -> Result<NaiveDate> {
    add_days(shift_years(start, 1)?, -1)
}

/// The first day of a one-year period ending on `end`.
pub fn year_start_from_end(end: NaiveDate) -> Result<NaiveDate> {
    add_days(shift_years(end, -1)?, 1)
}

pub fn is_feb_28_of_leap_year(date: NaiveDate) -> bool {
    date.month() == 2 && date.day() == 28 && is_leap_year(date.year())
}

pub fn is_feb_29(date: NaiveDate) -> bool {
    date.month() == 2 && date.day() == 29
}

/// Inclusive number of days covered by `[start, end]`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
