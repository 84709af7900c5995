//! The registration table printed under a timetable: one row per course with
//! its title and, when scheduled, the exam slot.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use super::normalize::{NormalizedCourse, NormalizedExam, NormalizedTimetable};
use crate::utils::dates::month_number;

lazy_static! {
    static ref TABLE_ROW_RE: Regex = Regex::new(
        r"\b\d{3,}\s+([A-Z]{2,}\d{4})\s+(.+?)\s+\d+\s+Registered\s+(Not Applicable|(\d{1,2})-([A-Za-z]{3})-(\d{4})\s+(\d{4})\s*to\s*(\d{4})\s*hrs)"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseMeta {
    pub code: String,
    pub name: String,
    pub exam: Option<NormalizedExam>,
}

/// Whether the text carries a registration table header.
pub fn has_course_table(text: &str) -> bool {
    text.contains("Index") && text.contains("Course") && text.contains("Title")
}

fn exam_slot(day: &str, month: &str, year: &str, start: &str, end: &str) -> Option<NormalizedExam> {
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month)?, day.parse().ok()?)?;
    let at = |hhmm: &str| {
        let time = NaiveTime::from_hms_opt(hhmm[..2].parse().ok()?, hhmm[2..].parse().ok()?, 0)?;
        Some(Utc.from_utc_datetime(&date.and_time(time)))
    };

    Some(NormalizedExam {
        starts_at: at(start)?,
        ends_at: at(end)?,
        location: None,
    })
}

pub fn extract_course_table(text: &str) -> Vec<CourseMeta> {
    TABLE_ROW_RE
        .captures_iter(text)
        .map(|caps| {
            let exam = match (caps.get(4), caps.get(5), caps.get(6), caps.get(7), caps.get(8)) {
                (Some(day), Some(month), Some(year), Some(start), Some(end)) => exam_slot(
                    day.as_str(),
                    month.as_str(),
                    year.as_str(),
                    start.as_str(),
                    end.as_str(),
                ),
                _ => None,
            };
            CourseMeta {
                code: caps[1].trim().to_string(),
                name: caps[2].split_whitespace().collect::<Vec<_>>().join(" "),
                exam,
            }
        })
        .collect()
}

/// Fills names and exams the timetable is missing; adds courses it never
/// mentioned. Classes are left alone.
pub fn merge_course_meta(timetable: &mut NormalizedTimetable, meta: Vec<CourseMeta>) {
    let mut by_code: HashMap<String, usize> = timetable
        .courses
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.code.clone(), idx))
        .collect();

    for row in meta {
        if row.code.is_empty() {
            continue;
        }
        match by_code.get(&row.code) {
            Some(&idx) => {
                let course = &mut timetable.courses[idx];
                if course.has_placeholder_name() && !row.name.is_empty() {
                    course.name = row.name;
                }
                if course.exam.is_none() {
                    course.exam = row.exam;
                }
            }
            None => {
                by_code.insert(row.code.clone(), timetable.courses.len());
                let name = if row.name.is_empty() {
                    row.code.clone()
                } else {
                    row.name
                };
                timetable.courses.push(NormalizedCourse {
                    code: row.code,
                    name,
                    exam: row.exam,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timetable::normalize::ParseStrategy;

    const TABLE: &str = "Index Course Title AU Status Exam Schedule\n\
        10234 SC2006 SOFTWARE ENGINEERING 3 Registered 25-Nov-2025 0900to1100 hrs\n\
        10567 SC2005 OPERATING  SYSTEMS 3 Registered Not Applicable";

    #[test]
    fn rows_yield_titles_and_exam_slots() {
        assert!(has_course_table(TABLE));
        let rows = extract_course_table(TABLE);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].code, "SC2006");
        assert_eq!(rows[0].name, "SOFTWARE ENGINEERING");
        let exam = rows[0].exam.as_ref().unwrap();
        assert_eq!(exam.starts_at.to_rfc3339(), "2025-11-25T09:00:00+00:00");
        assert_eq!(exam.ends_at.to_rfc3339(), "2025-11-25T11:00:00+00:00");

        assert_eq!(rows[1].name, "OPERATING SYSTEMS");
        assert!(rows[1].exam.is_none());
    }

    #[test]
    fn merge_only_fills_gaps() {
        let mut timetable = NormalizedTimetable {
            strategy: ParseStrategy::Structured,
            courses: vec![
                NormalizedCourse {
                    code: "SC2006".into(),
                    name: "SC2006".into(),
                    exam: None,
                },
                NormalizedCourse {
                    code: "SC2005".into(),
                    name: "Operating Systems (Custom)".into(),
                    exam: None,
                },
            ],
            classes: Vec::new(),
            day_columns: 0,
            weekdays_resolved: false,
            forced_clashes: 0,
        };

        let mut rows = extract_course_table(TABLE);
        rows.push(CourseMeta {
            code: "MH1810".into(),
            name: String::new(),
            exam: None,
        });
        merge_course_meta(&mut timetable, rows);

        assert_eq!(timetable.courses.len(), 3);
        assert_eq!(timetable.courses[0].name, "SOFTWARE ENGINEERING");
        assert!(timetable.courses[0].exam.is_some());
        assert_eq!(timetable.courses[1].name, "Operating Systems (Custom)");
        assert_eq!(timetable.courses[2].name, "MH1810");
    }
}
