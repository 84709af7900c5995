//! Academic calendar parsing over plain text: public holidays, week blocks
//! and the academic year the document covers.

pub mod holidays;
pub mod materialize;
pub mod weeks;

pub use holidays::{extract_holidays, ParsedHoliday, KNOWN_HOLIDAYS};
pub use materialize::AcademicMaterializeReport;
pub use weeks::{explicit_weeks, semester_starts, synthesize_weeks, WeekBlock};

use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::db::models::SemesterInput;
use crate::settings::IngestSettings;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

lazy_static! {
    static ref AY_RE: Regex = Regex::new(r"(?i)\bAY\s*(?:20)?(\d{2})\s*[-/]\s*(?:20)?(\d{2})").unwrap();
    static ref ACADEMIC_YEAR_RE: Regex =
        Regex::new(r"(?i)Academic\s*Year\s*(?:20)?(\d{2})\s*[-/]\s*(?:20)?(\d{2})").unwrap();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicCalendar {
    /// `yy/yy` when the text names its academic year.
    pub academic_year_short: Option<String>,
    pub weeks: Vec<WeekBlock>,
    pub holidays: Vec<ParsedHoliday>,
    /// Weeks came from the canonical layout rather than the document.
    pub weeks_synthesized: bool,
}

impl AcademicCalendar {
    /// Fills in the canonical week layout when the document listed no weeks.
    pub fn ensure_weeks(&mut self, week_one: NaiveDate) {
        if !self.weeks.is_empty() {
            return;
        }
        self.weeks = synthesize_weeks(week_one);
        self.weeks_synthesized = true;
        log_debug!("Synthesized {} week blocks from {}", self.weeks.len(), week_one);
    }
}

/// Academic year in short form (`25/26`) from an `AY2025/26` or
/// `Academic Year 2025-2026` token.
pub fn academic_year_short(text: &str) -> Option<String> {
    let caps = AY_RE
        .captures(text)
        .or_else(|| ACADEMIC_YEAR_RE.captures(text))?;
    Some(format!("{}/{}", &caps[1], &caps[2]))
}

/// Semester 1 or 2 by where the week starts fall: August to December counts
/// for semester 1, January to May for semester 2. Ties go to semester 1.
pub fn pick_semester_bucket(weeks: &[WeekBlock]) -> u8 {
    let (mut first, mut second) = (0usize, 0usize);
    for week in weeks {
        match week.starts_on.month() {
            8..=12 => first += 1,
            1..=5 => second += 1,
            _ => {}
        }
    }
    if second > first {
        2
    } else {
        1
    }
}

/// Both semesters of an academic year, named `AYyy/yy Sem N`, each ending with
/// its last synthesized exam week.
pub fn semester_inputs_for_year(academic_year_short: &str) -> Option<[SemesterInput; 2]> {
    let (sem1, sem2) = semester_starts(academic_year_short)?;
    let academic_year = format!("AY{academic_year_short}");
    let input = |semester_no: u8, starts_on: NaiveDate| SemesterInput {
        name: format!("{academic_year} Sem {semester_no}"),
        academic_year: academic_year.clone(),
        academic_year_short: academic_year_short.to_string(),
        semester_no,
        starts_on,
        ends_on: starts_on + Duration::weeks(17) - Duration::days(1),
    };
    Some([input(1, sem1), input(2, sem2)])
}

/// Parses holidays, explicit week rows and the academic year. Week synthesis
/// is left to the caller, which knows the semester anchor.
pub fn parse_academic_calendar(text: &str, settings: &IngestSettings) -> AcademicCalendar {
    let calendar = AcademicCalendar {
        academic_year_short: academic_year_short(text),
        weeks: explicit_weeks(text),
        holidays: extract_holidays(text, settings.holiday_lookahead_lines),
        weeks_synthesized: false,
    };
    log_info!(
        "Academic calendar: {} holidays, {} explicit weeks, year {:?}",
        calendar.holidays.len(),
        calendar.weeks.len(),
        calendar.academic_year_short
    );
    calendar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn academic_year_forms() {
        assert_eq!(academic_year_short("NTU AY2025/26 Calendar").as_deref(), Some("25/26"));
        assert_eq!(academic_year_short("AY 2025-2026").as_deref(), Some("25/26"));
        assert_eq!(
            academic_year_short("Academic Year 2024-2025").as_deref(),
            Some("24/25")
        );
        // "Day 17 - 18" must not read as a year
        assert_eq!(academic_year_short("Chinese New Year Day 17 - 18 Feb"), None);
    }

    #[test]
    fn bucket_follows_week_months() {
        let spring = synthesize_weeks(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());
        assert_eq!(pick_semester_bucket(&spring), 2);
        let autumn = synthesize_weeks(NaiveDate::from_ymd_opt(2025, 8, 11).unwrap());
        assert_eq!(pick_semester_bucket(&autumn), 1);
        assert_eq!(pick_semester_bucket(&[]), 1);
    }

    #[test]
    fn year_creates_both_semesters() {
        let [sem1, sem2] = semester_inputs_for_year("25/26").unwrap();
        assert_eq!(sem1.name, "AY25/26 Sem 1");
        assert_eq!(sem1.ends_on, NaiveDate::from_ymd_opt(2025, 12, 7).unwrap());
        assert_eq!(sem2.academic_year, "AY25/26");
        assert_eq!(sem2.starts_on, NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());
    }

    #[test]
    fn parse_leaves_weeks_empty_until_anchored() {
        let text = "AY2025/26\nNational Day   9 Aug 2025 (Sat)*";
        let mut calendar = parse_academic_calendar(text, &IngestSettings::default());
        assert_eq!(calendar.holidays.len(), 1);
        assert!(calendar.weeks.is_empty());

        calendar.ensure_weeks(NaiveDate::from_ymd_opt(2025, 8, 11).unwrap());
        assert!(calendar.weeks_synthesized);
        assert_eq!(calendar.weeks.len(), 17);
    }
}
