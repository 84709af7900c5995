//! Persists parsed academic calendars and mirrors them onto a student's
//! calendar.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rusqlite::Connection;
use serde::Serialize;

use super::AcademicCalendar;
use crate::db::helpers::new_id;
use crate::db::models::{AcademicCalEvent, AcademicKind, EventSource};
use crate::db::repositories::{
    academic_events::upsert_academic_event,
    calendar_events::{upsert_calendar_event, upsert_unified_entry},
    CalendarEventDraft, UpsertOutcome,
};
use crate::settings::IngestSettings;
use crate::utils::dates::iso_weekday;
use crate::log_debug;

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicMaterializeReport {
    pub weeks: usize,
    pub holidays: usize,
    pub events_created: usize,
    pub events_updated: usize,
    pub mirror_created: usize,
    pub mirror_updated: usize,
}

/// Title capped at `title_max` chars (ellipsis included) and, when it had to
/// be cut, the full text kept as notes capped at `notes_max`.
fn clip_title(raw: &str, title_max: usize, notes_max: usize) -> (String, Option<String>) {
    let ellipsize = |text: &str, max: usize| -> String {
        if text.chars().count() <= max {
            return text.to_string();
        }
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    };

    if raw.chars().count() <= title_max {
        return (raw.to_string(), None);
    }
    (ellipsize(raw, title_max), Some(ellipsize(raw, notes_max)))
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|at| Utc.from_utc_datetime(&at))
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|at| Utc.from_utc_datetime(&at))
}

fn mirror_event(
    conn: &Connection,
    student_id: &str,
    event: &AcademicCalEvent,
    report: &mut AcademicMaterializeReport,
) -> Result<()> {
    let (Some(starts_at), Some(ends_at)) =
        (start_of_day(event.starts_on), end_of_day(event.ends_on))
    else {
        return Ok(());
    };
    let draft = CalendarEventDraft {
        student_id: student_id.to_string(),
        semester_id: Some(event.semester_id.clone()),
        source: EventSource::Academic,
        external_id: event.id.clone(),
        title: event.title.clone(),
        starts_at,
        ends_at,
        location: None,
        notes: None,
        is_locked: false,
    };

    match upsert_calendar_event(conn, &draft)? {
        UpsertOutcome::Created => report.mirror_created += 1,
        UpsertOutcome::Updated => report.mirror_updated += 1,
    }
    upsert_unified_entry(conn, &draft)?;
    Ok(())
}

fn store_event(
    conn: &Connection,
    student_id: &str,
    event: AcademicCalEvent,
    report: &mut AcademicMaterializeReport,
) -> Result<()> {
    let (stored, outcome) = upsert_academic_event(conn, &event)
        .with_context(|| format!("failed to upsert academic event {}", event.title))?;
    match outcome {
        UpsertOutcome::Created => report.events_created += 1,
        UpsertOutcome::Updated => report.events_updated += 1,
    }
    mirror_event(conn, student_id, &stored, report)
}

/// Upserts every week block and holiday of `calendar` into the semester and
/// mirrors each row onto the student's calendar. Safe to re-run.
pub(crate) fn materialize_academic(
    conn: &Connection,
    student_id: &str,
    semester_id: &str,
    calendar: &AcademicCalendar,
    settings: &IngestSettings,
) -> Result<AcademicMaterializeReport> {
    let mut report = AcademicMaterializeReport::default();

    for week in &calendar.weeks {
        let (title, notes) = clip_title(
            &week.title(),
            settings.title_max_chars,
            settings.notes_max_chars,
        );
        let event = AcademicCalEvent {
            id: new_id(),
            semester_id: semester_id.to_string(),
            kind: week.kind,
            title,
            notes,
            week_no: week.week_no,
            starts_on: week.starts_on,
            ends_on: week.ends_on,
            month: week.starts_on.month(),
            weekday: 1,
        };
        store_event(conn, student_id, event, &mut report)?;
        report.weeks += 1;
    }

    for holiday in &calendar.holidays {
        let (title, notes) = clip_title(
            &holiday.title,
            settings.title_max_chars,
            settings.notes_max_chars,
        );
        let event = AcademicCalEvent {
            id: new_id(),
            semester_id: semester_id.to_string(),
            kind: AcademicKind::PublicHoliday,
            title,
            notes,
            week_no: None,
            starts_on: holiday.date,
            ends_on: holiday.date,
            month: holiday.date.month(),
            weekday: iso_weekday(holiday.date),
        };
        store_event(conn, student_id, event, &mut report)?;
        report.holidays += 1;
    }

    log_debug!(
        "Academic materialize for {}: {} created, {} updated",
        semester_id,
        report.events_created,
        report.events_updated
    );
    Ok(report)
}
