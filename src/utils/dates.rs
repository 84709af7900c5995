use chrono::{Datelike, Duration, NaiveDate, Weekday};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Month number (1..=12) of an English month name or its abbreviation
/// ("Aug", "Sept", "December").
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    if lower == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .position(|full| full.starts_with(&lower))
        .map(|idx| idx as u32 + 1)
}

/// Date from textual parts such as `("9", "Aug", "2025")`.
pub fn date_from_parts(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let day: u32 = day.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month_number(month)?, day)
}

/// First `weekday` on or after `date`.
pub fn next_weekday_on_or_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - date.weekday().num_days_from_monday() as i64)
        % 7;
    date + Duration::days(ahead)
}

/// ISO weekday number, Monday = 1.
pub fn iso_weekday(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}
