//! Calendar-safe month arithmetic shared by the installment expander and
//! the recurring matcher.
//!
//! Advancing a date by whole months must never roll over into the
//! following month: Jan 31 plus one month is Feb 28 (or 29), not Mar 3.

use chrono::{Datelike, Months, NaiveDate};

/// Advance a date by `months` calendar months, clamping the day to the
/// last day of the target month when needed. `None` only when the result
/// would leave chrono's representable range.
pub fn add_months_clamped(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Number of days in a calendar month. `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (_, last) = month_bounds(year, month)?;
    Some(last.day())
}

/// Build a date from a due day, clamping the day into the month.
/// `None` for an invalid year/month.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.min(last))
}

/// First and last day of a calendar month, both inclusive.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}
