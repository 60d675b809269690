//! Month listing for the month picker.

use chrono::{Datelike, Months, NaiveDate};

/// First day of every month from `start`'s month through `end`'s month, inclusive.
///
/// Empty when `end` falls in an earlier month than `start`.
pub fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let (Some(mut cursor), Some(last)) = (first_of_month(start), first_of_month(end)) else {
        return Vec::new();
    };

    let mut months = Vec::new();
    while cursor <= last {
        months.push(cursor);
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    months
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}
