//! Calendar month helpers for the aggregation queries.
//!
//! Dates are stored as ISO-8601 text, so month windows can be expressed as
//! half-open `[start, next_start)` ranges and compared lexicographically.

use time::{Date, Month};

/// The first day of the month `months` before the month containing `date`.
/// Passing zero months gives the start of the current month.
pub fn months_back(date: Date, months: u32) -> Date {
    let mut year = date.year();
    let mut month = date.month();

    for _ in 0..months {
        month = month.previous();
        if month == Month::December {
            year -= 1;
        }
    }

    Date::from_calendar_date(year, month, 1).expect("day 1 is valid for every month")
}

/// The first day of the month after the month containing `date`.
pub fn next_month_start(date: Date) -> Date {
    let mut year = date.year();
    let month = date.month().next();

    if month == Month::January {
        year += 1;
    }

    Date::from_calendar_date(year, month, 1).expect("day 1 is valid for every month")
}

/// The month key used by the dashboard trend, formatted `"M/YYYY"` without
/// zero padding.
pub fn month_key(date: Date) -> String {
    format!("{}/{}", date.month() as u8, date.year())
}
