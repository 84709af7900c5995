//! Idempotent persistence of a normalized timetable and its expansion into
//! dated calendar events.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rusqlite::Connection;
use serde::Serialize;

use super::normalize::{NormalizedClass, NormalizedTimetable};
use crate::db::models::{CourseClass, DeliveryMode, EventSource, Semester};
use crate::db::repositories::{
    calendar_events::{upsert_calendar_event, upsert_unified_entry},
    courses::{
        enroll, find_class_by_key, find_course_by_code, insert_class, insert_course,
        list_enrolled_classes, rename_course, update_class, upsert_exam,
    },
    CalendarEventDraft, ClassSlotKey, UpsertOutcome,
};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaUpsertReport {
    pub courses_created: usize,
    pub courses_renamed: usize,
    pub classes_created: usize,
    pub classes_updated: usize,
    /// Classes stored under a `base#variant` index because their slot was
    /// already held by a different offering.
    pub classes_namespaced: usize,
    pub exams_upserted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeReport {
    pub classes_processed: usize,
    pub events_created: usize,
    pub events_updated: usize,
    pub mirror_created: usize,
    pub mirror_updated: usize,
    /// Weeks whose date could not be computed.
    pub sessions_skipped: usize,
}

/// `delivery_location_weeks`, spaces in the location turned into
/// underscores, weeks joined with dots, capped at `max_chars`.
pub fn variant_suffix(
    delivery: DeliveryMode,
    location: Option<&str>,
    weeks: &[u32],
    max_chars: usize,
) -> String {
    let weeks = weeks
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".");
    let location = location.unwrap_or("").trim().replace(' ', "_");

    [delivery.as_str().to_string(), location, weeks]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(max_chars)
        .collect()
}

fn same_variant(existing: &CourseClass, course_id: &str, class: &NormalizedClass) -> bool {
    existing.course_id == course_id
        && existing.location.as_deref() == class.location.as_deref()
        && existing.delivery == class.delivery
        && existing.weeks == class.weeks
}

fn ensure_course(
    conn: &Connection,
    code: &str,
    name: &str,
    report: &mut SchemaUpsertReport,
) -> Result<String> {
    match find_course_by_code(conn, code)? {
        None => {
            report.courses_created += 1;
            Ok(insert_course(conn, code, name)?.id)
        }
        Some(course) => {
            if !name.is_empty() && name != code && course.name != name {
                rename_course(conn, &course.id, name)?;
                report.courses_renamed += 1;
            }
            Ok(course.id)
        }
    }
}

/// Writes courses, exams, classes and the student's enrollments.
///
/// A class whose natural key is already held by an identical variant is
/// updated in place. If the holder differs in location, delivery, weeks or
/// course, the class is stored under `index#suffix` instead so neither
/// offering overwrites the other.
pub(crate) fn upsert_timetable(
    conn: &Connection,
    student_id: &str,
    semester_id: &str,
    timetable: &NormalizedTimetable,
    suffix_max: usize,
) -> Result<SchemaUpsertReport> {
    let mut report = SchemaUpsertReport::default();
    let mut course_ids: HashMap<String, String> = HashMap::new();

    for course in &timetable.courses {
        let code = course.code.trim();
        if code.is_empty() {
            continue;
        }
        let course_id = ensure_course(conn, code, course.name.trim(), &mut report)
            .with_context(|| format!("failed to upsert course {code}"))?;

        if let Some(exam) = &course.exam {
            upsert_exam(
                conn,
                &course_id,
                semester_id,
                &exam.starts_at,
                &exam.ends_at,
                exam.location.as_deref(),
            )
            .with_context(|| format!("failed to upsert exam of {code}"))?;
            report.exams_upserted += 1;
        }
        course_ids.insert(code.to_string(), course_id);
    }

    for class in &timetable.classes {
        let code = class.course_code.trim();
        if code.is_empty() {
            continue;
        }
        let course_id = match course_ids.get(code) {
            Some(id) => id.clone(),
            None => {
                let id = ensure_course(conn, code, code, &mut report)?;
                course_ids.insert(code.to_string(), id.clone());
                id
            }
        };

        let mut key = ClassSlotKey {
            semester_id: semester_id.to_string(),
            index: class.index.clone(),
            component: class.component,
            day_of_week: class.day_of_week,
            start_time: class.start_time.clone(),
            end_time: class.end_time.clone(),
        };

        let stored = match find_class_by_key(conn, &key)? {
            Some(existing) if same_variant(&existing, &course_id, class) => {
                update_class(
                    conn,
                    &existing.id,
                    &course_id,
                    &class.weeks,
                    class.location.as_deref(),
                    class.delivery,
                )?;
                report.classes_updated += 1;
                existing
            }
            Some(existing) => {
                let mut suffix = variant_suffix(
                    class.delivery,
                    class.location.as_deref(),
                    &class.weeks,
                    suffix_max,
                );
                if existing.course_id != course_id {
                    suffix = format!("{code}_{suffix}");
                }
                key.index = format!("{}#{}", class.index, suffix);
                log_debug!(
                    "Slot {} {} day {} {} held by another variant; storing as {}",
                    class.index,
                    class.component.as_str(),
                    class.day_of_week,
                    class.start_time,
                    key.index
                );
                report.classes_namespaced += 1;

                match find_class_by_key(conn, &key)? {
                    Some(namespaced) => {
                        update_class(
                            conn,
                            &namespaced.id,
                            &course_id,
                            &class.weeks,
                            class.location.as_deref(),
                            class.delivery,
                        )?;
                        report.classes_updated += 1;
                        namespaced
                    }
                    None => {
                        report.classes_created += 1;
                        insert_class(
                            conn,
                            &key,
                            &course_id,
                            &class.weeks,
                            class.location.as_deref(),
                            class.delivery,
                        )?
                    }
                }
            }
            None => {
                report.classes_created += 1;
                insert_class(
                    conn,
                    &key,
                    &course_id,
                    &class.weeks,
                    class.location.as_deref(),
                    class.delivery,
                )?
            }
        };

        enroll(conn, student_id, &stored)
            .with_context(|| format!("failed to enroll student in class {}", stored.id))?;
    }

    Ok(report)
}

fn at_clock(date: NaiveDate, clock: &str) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(clock, "%H:%M").ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Date of a class in teaching week `week` on weekday `day_of_week`, or
/// `None` when it falls outside the calendar.
pub fn session_date(semester_start: NaiveDate, week: u32, day_of_week: u8) -> Option<NaiveDate> {
    let offset = (i64::from(week) - 1) * 7 + (i64::from(day_of_week) - 1);
    semester_start.checked_add_signed(Duration::try_days(offset)?)
}

/// Expands the student's enrolled classes into one locked `TIMETABLE` event
/// per week, mirrored into the unified calendar.
pub(crate) fn materialize_classes(
    conn: &Connection,
    student_id: &str,
    semester: &Semester,
) -> Result<MaterializeReport> {
    let mut report = MaterializeReport::default();

    for enrolled in list_enrolled_classes(conn, student_id, &semester.id)? {
        let class = &enrolled.class;
        if class.weeks.is_empty() {
            continue;
        }
        report.classes_processed += 1;

        let title = format!(
            "{} {} ({})",
            enrolled.course_code,
            class.component.as_str(),
            class.index
        );

        for &week in &class.weeks {
            let Some(date) = session_date(semester.starts_on, week, class.day_of_week) else {
                log_warn!("Week {} of class {} has no valid date", week, class.id);
                report.sessions_skipped += 1;
                continue;
            };
            let (Some(starts_at), Some(ends_at)) = (
                at_clock(date, &class.start_time),
                at_clock(date, &class.end_time),
            ) else {
                report.sessions_skipped += 1;
                continue;
            };

            let draft = CalendarEventDraft {
                student_id: student_id.to_string(),
                semester_id: Some(semester.id.clone()),
                source: EventSource::Timetable,
                external_id: class.id.clone(),
                title: title.clone(),
                starts_at,
                ends_at,
                location: class.location.clone(),
                notes: Some(enrolled.course_name.clone()),
                is_locked: true,
            };

            match upsert_calendar_event(conn, &draft)? {
                UpsertOutcome::Created => report.events_created += 1,
                UpsertOutcome::Updated => report.events_updated += 1,
            }
            match upsert_unified_entry(conn, &draft)? {
                UpsertOutcome::Created => report.mirror_created += 1,
                UpsertOutcome::Updated => report.mirror_updated += 1,
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_joins_variant_attributes() {
        assert_eq!(
            variant_suffix(DeliveryMode::Physical, Some("LT 19A"), &[1, 2, 3], 64),
            "PHYSICAL_LT_19A_1.2.3"
        );
        assert_eq!(variant_suffix(DeliveryMode::Online, None, &[], 64), "ONLINE");
        assert_eq!(
            variant_suffix(DeliveryMode::Physical, Some("LT19A"), &(1..=40).collect::<Vec<_>>(), 64)
                .chars()
                .count(),
            64
        );
    }

    #[test]
    fn session_dates_follow_week_and_day() {
        let start = NaiveDate::from_ymd_opt(2025, 8, 11).unwrap();
        assert_eq!(session_date(start, 1, 1), Some(start));
        assert_eq!(session_date(start, 2, 3), NaiveDate::from_ymd_opt(2025, 8, 20));
        assert_eq!(session_date(start, 11, 1), NaiveDate::from_ymd_opt(2025, 10, 20));
    }

    #[test]
    fn session_date_past_the_calendar_is_none() {
        let start = NaiveDate::from_ymd_opt(2025, 8, 11).unwrap();
        assert_eq!(session_date(start, u32::MAX, 6), None);
        assert_eq!(session_date(NaiveDate::MAX, 2, 1), None);
    }
}
