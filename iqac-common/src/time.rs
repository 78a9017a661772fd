//! Timestamp and academic-calendar utilities

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

/// First month of the academic year (June)
pub const ACADEMIC_YEAR_START_MONTH: u32 = 6;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Academic year label ("2024-25") containing the given date
pub fn academic_year_of(date: NaiveDate) -> String {
    let start = if date.month() >= ACADEMIC_YEAR_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{:02}", start, (start + 1) % 100)
}

/// Academic year label for today
pub fn current_academic_year() -> String {
    academic_year_of(now().date_naive())
}

/// Check an academic year label of the form `YYYY-YY` where the second
/// part is the year following the first
pub fn is_valid_academic_year(label: &str) -> bool {
    let Some((first, second)) = label.split_once('-') else {
        return false;
    };
    if first.len() != 4 || second.len() != 2 {
        return false;
    }
    match (first.parse::<i32>(), second.parse::<i32>()) {
        (Ok(start), Ok(end)) => (start + 1) % 100 == end,
        _ => false,
    }
}

/// Parse a wall-clock time written as `HH:MM`
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}
