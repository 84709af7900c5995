//! Teaching, recess, study and exam week blocks: explicit rows and the
//! canonical 17-week layout used when a calendar lists none.

use chrono::{Duration, NaiveDate, Weekday};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::db::models::AcademicKind;
use crate::utils::dates::{date_from_parts, next_weekday_on_or_after};

lazy_static! {
    static ref WEEK_ROW_RE: Regex = Regex::new(
        r"(?i)^\s*((?:teaching\s+)?week\s*(\d{1,2})|(recess)\s+week|(study)\s+week|revision\s*(?:&|and)\s*exam(?:ination)?s?|exam(?:ination)?\s+weeks?)\b\D*?(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})(?:\s*(?:-|–|—|to)\s*(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4}))?"
    )
    .unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBlock {
    pub kind: AcademicKind,
    pub week_no: Option<u32>,
    pub label: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

impl WeekBlock {
    fn spanning(
        kind: AcademicKind,
        week_no: Option<u32>,
        label: Option<&str>,
        starts_on: NaiveDate,
    ) -> Self {
        Self {
            kind,
            week_no,
            label: label.map(str::to_string),
            starts_on,
            ends_on: starts_on + Duration::days(6),
        }
    }

    /// Display title: `Teaching Week N` for teaching weeks, else the label.
    pub fn title(&self) -> String {
        match (self.kind, self.week_no) {
            (AcademicKind::TeachingWeek, Some(week)) => format!("Teaching Week {week}"),
            _ => self
                .label
                .clone()
                .unwrap_or_else(|| self.kind.default_title().to_string()),
        }
    }
}

/// Week rows that carry their own start date, e.g.
/// `Teaching Week 1   11 Aug 2025 - 17 Aug 2025` or `Recess Week 29 Sep 2025`.
/// A row without an end date spans seven days.
pub fn explicit_weeks(text: &str) -> Vec<WeekBlock> {
    let mut blocks = Vec::new();

    for line in text.lines() {
        let line = line.replace('\u{a0}', " ");
        let Some(caps) = WEEK_ROW_RE.captures(&line) else {
            continue;
        };
        let Some(starts_on) = date_from_parts(&caps[5], &caps[6], &caps[7]) else {
            continue;
        };

        let (kind, week_no) = if let Some(week) = caps.get(2) {
            (AcademicKind::TeachingWeek, week.as_str().parse().ok())
        } else if caps.get(3).is_some() {
            (AcademicKind::RecessWeek, None)
        } else if caps.get(4).is_some() {
            (AcademicKind::StudyWeek, None)
        } else {
            (AcademicKind::ExamWeek, None)
        };
        let label = match kind {
            AcademicKind::TeachingWeek => None,
            _ => Some(SPACES_RE.replace_all(caps[1].trim(), " ").into_owned()),
        };

        let mut block = WeekBlock::spanning(kind, week_no, label.as_deref(), starts_on);
        if let (Some(day), Some(month), Some(year)) = (caps.get(8), caps.get(9), caps.get(10)) {
            match date_from_parts(day.as_str(), month.as_str(), year.as_str()) {
                Some(ends_on) if ends_on >= starts_on => block.ends_on = ends_on,
                _ => {}
            }
        }
        blocks.push(block);
    }

    blocks
}

/// Canonical semester layout from the Monday of teaching week 1:
/// weeks 1-7, recess, weeks 8-13, study week, two exam weeks.
pub fn synthesize_weeks(week_one: NaiveDate) -> Vec<WeekBlock> {
    let at = |weeks: i64| week_one + Duration::weeks(weeks);
    let mut blocks = Vec::with_capacity(17);

    for week in 1..=7u32 {
        blocks.push(WeekBlock::spanning(
            AcademicKind::TeachingWeek,
            Some(week),
            None,
            at(i64::from(week) - 1),
        ));
    }
    blocks.push(WeekBlock::spanning(
        AcademicKind::RecessWeek,
        None,
        Some("Recess Week"),
        at(7),
    ));
    for week in 8..=13u32 {
        blocks.push(WeekBlock::spanning(
            AcademicKind::TeachingWeek,
            Some(week),
            None,
            at(i64::from(week)),
        ));
    }
    blocks.push(WeekBlock::spanning(
        AcademicKind::StudyWeek,
        None,
        Some("Study Week"),
        at(14),
    ));
    for offset in [15, 16] {
        blocks.push(WeekBlock::spanning(
            AcademicKind::ExamWeek,
            None,
            Some("Revision & Examination"),
            at(offset),
        ));
    }

    blocks
}

/// Week-1 Mondays of both semesters for an academic year given as `yy/yy`:
/// semester 1 starts on the first Monday on or after 11 August, semester 2 on
/// the second Monday of January.
pub fn semester_starts(academic_year_short: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (first, second) = academic_year_short.split_once('/')?;
    let first: i32 = first.trim().parse().ok()?;
    let second: i32 = second.trim().parse().ok()?;

    let sem1 = next_weekday_on_or_after(
        NaiveDate::from_ymd_opt(2000 + first, 8, 11)?,
        Weekday::Mon,
    );
    let sem2 = next_weekday_on_or_after(
        NaiveDate::from_ymd_opt(2000 + second, 1, 1)?,
        Weekday::Mon,
    ) + Duration::weeks(1);
    Some((sem1, sem2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn synthesized_layout_skips_recess() {
        let blocks = synthesize_weeks(day(2025, 8, 11));
        assert_eq!(blocks.len(), 17);

        assert_eq!(blocks[0].title(), "Teaching Week 1");
        assert_eq!(blocks[6].starts_on, day(2025, 9, 22));
        assert_eq!(blocks[7].kind, AcademicKind::RecessWeek);
        assert_eq!(blocks[7].starts_on, day(2025, 9, 29));
        assert_eq!(blocks[8].week_no, Some(8));
        assert_eq!(blocks[8].starts_on, day(2025, 10, 6));
        assert_eq!(blocks[14].kind, AcademicKind::StudyWeek);
        assert_eq!(blocks[16].title(), "Revision & Examination");
        assert_eq!(blocks[16].ends_on, day(2025, 12, 7));
    }

    #[test]
    fn explicit_rows_with_and_without_end_dates() {
        let text = "Teaching Week 1   11 Aug 2025 - 17 Aug 2025\n\
                    Recess Week: 29 Sep 2025\n\
                    Revision & Examination 24 Nov 2025 to 7 Dec 2025\n\
                    Exam results released 5 Jan 2026\n\
                    Week 14 is not a row";
        let blocks = explicit_weeks(text);
        assert_eq!(blocks.len(), 3);

        assert_eq!(blocks[0].week_no, Some(1));
        assert_eq!(blocks[0].ends_on, day(2025, 8, 17));
        assert_eq!(blocks[1].kind, AcademicKind::RecessWeek);
        assert_eq!(blocks[1].ends_on, day(2025, 10, 5));
        assert_eq!(blocks[2].kind, AcademicKind::ExamWeek);
        assert_eq!(blocks[2].label.as_deref(), Some("Revision & Examination"));
        assert_eq!(blocks[2].ends_on, day(2025, 12, 7));
    }

    #[test]
    fn academic_year_semester_starts() {
        assert_eq!(
            semester_starts("25/26"),
            Some((day(2025, 8, 11), day(2026, 1, 12)))
        );
        assert_eq!(semester_starts("2025"), None);
    }
}
