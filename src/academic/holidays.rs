//! Public holiday extraction from academic calendar text.
//!
//! Only the canonical titles below are ever emitted. Lines are matched either
//! as `<Title>  <date or range>` or as a bare title with its date on one of the
//! following lines.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::utils::dates::date_from_parts;

pub const KNOWN_HOLIDAYS: [&str; 10] = [
    "National Day",
    "Deepavali",
    "Christmas Day",
    "New Year's Day",
    "Chinese New Year",
    "Hari Raya Puasa",
    "Good Friday",
    "Labour Day",
    "Hari Raya Haji",
    "Vesak Day",
];

/// Spellings seen in the wild, mapped onto a canonical title.
const HOLIDAY_VARIANTS: [(&str, &str); 3] = [
    ("diwali", "Deepavali"),
    ("labor day", "Labour Day"),
    ("new years day", "New Year's Day"),
];

const REGION_HEADING: &str = "SINGAPORE PUBLIC HOLIDAYS";

lazy_static! {
    static ref RANGE_RE: Regex =
        Regex::new(r"(\d{1,2})\s*[-–—]\s*(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})").unwrap();
    static ref DATE_RE: Regex = Regex::new(r"\b(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})\b").unwrap();
    static ref REGION_ENTRY_RE: Regex = Regex::new(
        r"([A-Za-z'/&.\-\s]+?)\s+(\d{1,2})(?:\s*[-–]\s*(\d{1,2}))?\s+([A-Za-z]{3,9})\s+(20\d{2})"
    )
    .unwrap();
    static ref BRACKETED_RE: Regex = Regex::new(r"\([^)]*\)|\*+").unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHoliday {
    pub title: String,
    pub date: NaiveDate,
}

fn normalize_line(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .replace('\u{2019}', "'")
        .trim()
        .to_string()
}

fn day_span(first: &str, last: &str, month: &str, year: &str) -> Option<Vec<NaiveDate>> {
    let start = date_from_parts(first, month, year)?;
    let end = date_from_parts(last, month, year)?;
    if end < start {
        return None;
    }
    let days = (end - start).num_days();
    Some((0..=days).map(|offset| start + Duration::days(offset)).collect())
}

/// Dates named by a token: a `d1-d2 Mon YYYY` range first, else one
/// `d Mon YYYY` date.
pub fn dates_from_token(token: &str) -> Option<Vec<NaiveDate>> {
    if let Some(caps) = RANGE_RE.captures(token) {
        if let Some(days) = day_span(&caps[1], &caps[2], &caps[3], &caps[4]) {
            return Some(days);
        }
    }
    let caps = DATE_RE.captures(token)?;
    date_from_parts(&caps[1], &caps[2], &caps[3]).map(|date| vec![date])
}

/// Text after `title` when the line opens with it (case-insensitive) and the
/// title is followed by whitespace.
fn same_line_tail<'a>(line: &'a str, title: &str) -> Option<&'a str> {
    let head = line.get(..title.len())?;
    if !head.eq_ignore_ascii_case(title) {
        return None;
    }
    let rest = &line[title.len()..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn is_title_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    KNOWN_HOLIDAYS.iter().any(|title| {
        let title = title.to_lowercase();
        lower == title || lower.starts_with(&format!("{title} "))
    })
}

struct HolidaySink {
    seen: HashSet<(&'static str, NaiveDate)>,
    holidays: Vec<ParsedHoliday>,
}

impl HolidaySink {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            holidays: Vec::new(),
        }
    }

    fn push_all(&mut self, title: &'static str, dates: Vec<NaiveDate>) {
        for date in dates {
            if self.seen.insert((title, date)) {
                self.holidays.push(ParsedHoliday {
                    title: title.to_string(),
                    date,
                });
            }
        }
    }
}

/// Title-anchored pass. A bare title looks at most `lookahead` non-empty lines
/// ahead and gives up on reaching another title line.
pub fn holidays_by_title(text: &str, lookahead: usize) -> Vec<ParsedHoliday> {
    let lines: Vec<String> = text
        .lines()
        .map(normalize_line)
        .filter(|line| !line.is_empty())
        .collect();
    let mut sink = HolidaySink::new();

    for (idx, line) in lines.iter().enumerate() {
        for title in KNOWN_HOLIDAYS {
            if let Some(dates) = same_line_tail(line, title).and_then(dates_from_token) {
                sink.push_all(title, dates);
                continue;
            }

            if !line.eq_ignore_ascii_case(title) {
                continue;
            }
            for next in lines.iter().skip(idx + 1).take(lookahead) {
                if is_title_line(next) {
                    break;
                }
                if let Some(dates) = dates_from_token(next) {
                    sink.push_all(title, dates);
                    break;
                }
            }
        }
    }

    sink.holidays
}

/// Canonical title for a raw label, tolerating leading noise picked up from
/// previous lines.
fn canonical_title(raw: &str) -> Option<&'static str> {
    let cleaned = BRACKETED_RE.replace_all(raw, " ");
    let lower = SPACES_RE
        .replace_all(cleaned.trim(), " ")
        .to_lowercase()
        .replace('\u{2019}', "'");

    let names = KNOWN_HOLIDAYS
        .iter()
        .map(|title| (title.to_lowercase(), *title))
        .chain(
            HOLIDAY_VARIANTS
                .iter()
                .map(|(variant, title)| (variant.to_string(), *title)),
        );
    for (name, title) in names {
        if lower == name || lower.ends_with(&format!(" {name}")) {
            return Some(title);
        }
    }
    None
}

/// Region-scan pass used when no title-anchored holiday was found. Scans from
/// the public-holiday heading when there is one.
pub fn holidays_by_region(text: &str) -> Vec<ParsedHoliday> {
    let text = text.replace('\u{a0}', " ");
    let region = text
        .find(REGION_HEADING)
        .map(|at| &text[at + REGION_HEADING.len()..])
        .unwrap_or(&text);
    let mut sink = HolidaySink::new();

    for caps in REGION_ENTRY_RE.captures_iter(region) {
        let Some(title) = canonical_title(&caps[1]) else {
            continue;
        };
        let last = caps.get(3).map(|m| m.as_str()).unwrap_or(&caps[2]);
        if let Some(dates) = day_span(&caps[2], last, &caps[4], &caps[5]) {
            sink.push_all(title, dates);
        }
    }

    sink.holidays
}

/// Title-anchored extraction with the region scan as fallback.
pub fn extract_holidays(text: &str, lookahead: usize) -> Vec<ParsedHoliday> {
    let anchored = holidays_by_title(text, lookahead);
    if !anchored.is_empty() {
        return anchored;
    }
    holidays_by_region(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_line_title_with_trailing_marks() {
        let holidays = holidays_by_title("National Day   9 Aug 2025 (Sat)*", 3);
        assert_eq!(
            holidays,
            vec![ParsedHoliday {
                title: "National Day".into(),
                date: day(2025, 8, 9),
            }]
        );
    }

    #[test]
    fn unknown_titles_are_ignored() {
        let text = "Founders Day   3 Sep 2025\nTeachers' Day   5 Sep 2025";
        assert!(extract_holidays(text, 3).is_empty());
    }

    #[test]
    fn bare_title_reads_following_lines() {
        let text = "Chinese New Year\n(Tue & Wed)\n17 - 18 Feb 2026\nGood Friday\n3 Apr 2026";
        let holidays = holidays_by_title(text, 3);
        let dates: Vec<_> = holidays.iter().map(|h| (h.title.as_str(), h.date)).collect();
        assert_eq!(
            dates,
            vec![
                ("Chinese New Year", day(2026, 2, 17)),
                ("Chinese New Year", day(2026, 2, 18)),
                ("Good Friday", day(2026, 4, 3)),
            ]
        );
    }

    #[test]
    fn bare_title_stops_at_next_title() {
        let text = "Deepavali\nVesak Day\n31 May 2026";
        let holidays = holidays_by_title(text, 3);
        assert_eq!(holidays.len(), 1);
        assert_eq!(holidays[0].title, "Vesak Day");
    }

    #[test]
    fn lookahead_is_bounded() {
        let text = "Labour Day\na\nb\nc\n1 May 2026";
        assert!(holidays_by_title(text, 3).is_empty());
        assert_eq!(holidays_by_title(text, 4).len(), 1);
    }

    #[test]
    fn region_scan_maps_variants() {
        let text = "Calendar notes 1 Jan 2025\n\
                    SINGAPORE PUBLIC HOLIDAYS\n\
                    Diwali 20 Oct 2025 (Mon)\n\
                    Labor Day 1 May 2026\n\
                    Sports Day 4 Jun 2026";
        let holidays = holidays_by_region(text);
        let titles: Vec<_> = holidays.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Deepavali", "Labour Day"]);
        assert_eq!(holidays[0].date, day(2025, 10, 20));
    }

    #[test]
    fn ranges_expand_inclusively() {
        assert_eq!(
            dates_from_token("30 - 31 Mar 2026"),
            Some(vec![day(2026, 3, 30), day(2026, 3, 31)])
        );
        assert_eq!(dates_from_token("1 Oct 2025 (Wed)"), Some(vec![day(2025, 10, 1)]));
        assert_eq!(dates_from_token("no date here"), None);
    }
}
