use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, new_id, parse_datetime, parse_source},
    models::{CalendarEvent, EventSource, UnifiedCalendarEntry},
};

/// Values written for one materialized occurrence. The same draft feeds both
/// `calendar_events` and the `unified_calendar` mirror.
#[derive(Debug, Clone)]
pub struct CalendarEventDraft {
    pub student_id: String,
    pub semester_id: Option<String>,
    pub source: EventSource,
    pub external_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

fn row_to_event(row: &Row) -> Result<CalendarEvent> {
    let source: String = row.get("source")?;
    let starts_at: String = row.get("starts_at")?;
    let ends_at: String = row.get("ends_at")?;
    let is_locked: i64 = row.get("is_locked")?;

    Ok(CalendarEvent {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        title: row.get("title")?,
        starts_at: parse_datetime(&starts_at, "starts_at")?,
        ends_at: parse_datetime(&ends_at, "ends_at")?,
        source: parse_source(&source)?,
        external_id: row.get("external_id")?,
        is_locked: is_locked != 0,
        semester_id: row.get("semester_id")?,
        location: row.get("location")?,
        notes: row.get("notes")?,
    })
}

fn row_to_unified(row: &Row) -> Result<UnifiedCalendarEntry> {
    let source: String = row.get("source")?;
    let starts_at: String = row.get("starts_at")?;
    let ends_at: String = row.get("ends_at")?;
    let is_synced: i64 = row.get("is_synced")?;

    Ok(UnifiedCalendarEntry {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        semester_id: row.get("semester_id")?,
        title: row.get("title")?,
        starts_at: parse_datetime(&starts_at, "starts_at")?,
        ends_at: parse_datetime(&ends_at, "ends_at")?,
        location: row.get("location")?,
        description: row.get("description")?,
        source: parse_source(&source)?,
        external_id: row.get("external_id")?,
        is_synced: is_synced != 0,
    })
}

/// Upserts by `(student_id, source, external_id, starts_at)`.
pub(crate) fn upsert_calendar_event(
    conn: &Connection,
    draft: &CalendarEventDraft,
) -> Result<UpsertOutcome> {
    let starts_text = format_datetime(&draft.starts_at);
    let existing_id: Option<String> = conn
        .query_row(
            "SELECT id FROM calendar_events
             WHERE student_id = ?1 AND source = ?2 AND external_id = ?3 AND starts_at = ?4",
            params![
                draft.student_id,
                draft.source.as_str(),
                draft.external_id,
                starts_text
            ],
            |row| row.get(0),
        )
        .optional()?;

    match existing_id {
        Some(id) => {
            conn.execute(
                "UPDATE calendar_events
                 SET title = ?1,
                     ends_at = ?2,
                     is_locked = ?3,
                     semester_id = ?4,
                     location = ?5,
                     notes = ?6
                 WHERE id = ?7",
                params![
                    draft.title,
                    format_datetime(&draft.ends_at),
                    draft.is_locked as i64,
                    draft.semester_id,
                    draft.location,
                    draft.notes,
                    id,
                ],
            )?;
            Ok(UpsertOutcome::Updated)
        }
        None => {
            conn.execute(
                "INSERT INTO calendar_events (
                    id,
                    student_id,
                    title,
                    starts_at,
                    ends_at,
                    source,
                    external_id,
                    is_locked,
                    semester_id,
                    location,
                    notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    new_id(),
                    draft.student_id,
                    draft.title,
                    starts_text,
                    format_datetime(&draft.ends_at),
                    draft.source.as_str(),
                    draft.external_id,
                    draft.is_locked as i64,
                    draft.semester_id,
                    draft.location,
                    draft.notes,
                ],
            )?;
            Ok(UpsertOutcome::Created)
        }
    }
}

/// Mirrors a draft into `unified_calendar`. `is_synced` is left untouched on
/// update.
pub(crate) fn upsert_unified_entry(
    conn: &Connection,
    draft: &CalendarEventDraft,
) -> Result<UpsertOutcome> {
    let starts_text = format_datetime(&draft.starts_at);
    let existing_id: Option<String> = conn
        .query_row(
            "SELECT id FROM unified_calendar
             WHERE student_id = ?1 AND source = ?2 AND external_id = ?3 AND starts_at = ?4",
            params![
                draft.student_id,
                draft.source.as_str(),
                draft.external_id,
                starts_text
            ],
            |row| row.get(0),
        )
        .optional()?;

    match existing_id {
        Some(id) => {
            conn.execute(
                "UPDATE unified_calendar
                 SET semester_id = ?1,
                     title = ?2,
                     ends_at = ?3,
                     location = ?4,
                     description = ?5
                 WHERE id = ?6",
                params![
                    draft.semester_id,
                    draft.title,
                    format_datetime(&draft.ends_at),
                    draft.location,
                    draft.notes,
                    id,
                ],
            )?;
            Ok(UpsertOutcome::Updated)
        }
        None => {
            conn.execute(
                "INSERT INTO unified_calendar (
                    id,
                    student_id,
                    semester_id,
                    title,
                    starts_at,
                    ends_at,
                    location,
                    description,
                    source,
                    external_id,
                    is_synced
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)",
                params![
                    new_id(),
                    draft.student_id,
                    draft.semester_id,
                    draft.title,
                    starts_text,
                    format_datetime(&draft.ends_at),
                    draft.location,
                    draft.notes,
                    draft.source.as_str(),
                    draft.external_id,
                ],
            )?;
            Ok(UpsertOutcome::Created)
        }
    }
}

impl Database {
    /// Events overlapping `[from, to)` for one student, ordered by start.
    pub async fn list_calendar_events(
        &self,
        student_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_id, title, starts_at, ends_at, source, external_id,
                        is_locked, semester_id, location, notes
                 FROM calendar_events
                 WHERE student_id = ?1 AND starts_at < ?3 AND ends_at > ?2
                 ORDER BY starts_at ASC, id ASC",
            )?;
            let mut rows = stmt.query(params![
                student_id,
                format_datetime(&from),
                format_datetime(&to)
            ])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_event(row)?);
            }
            Ok(events)
        })
        .await
    }

    pub async fn list_unified_calendar(
        &self,
        student_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UnifiedCalendarEntry>> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_id, semester_id, title, starts_at, ends_at, location,
                        description, source, external_id, is_synced
                 FROM unified_calendar
                 WHERE student_id = ?1 AND starts_at < ?3 AND ends_at > ?2
                 ORDER BY starts_at ASC, id ASC",
            )?;
            let mut rows = stmt.query(params![
                student_id,
                format_datetime(&from),
                format_datetime(&to)
            ])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_unified(row)?);
            }
            Ok(entries)
        })
        .await
    }

    /// Flags a mirror row as pushed to an external calendar.
    pub async fn mark_unified_synced(&self, entry_id: &str) -> Result<()> {
        let entry_id = entry_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE unified_calendar SET is_synced = 1 WHERE id = ?1",
                params![entry_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn count_calendar_events(&self, student_id: &str, source: EventSource) -> Result<usize> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM calendar_events WHERE student_id = ?1 AND source = ?2",
                params![student_id, source.as_str()],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn draft(student_id: &str) -> CalendarEventDraft {
        let starts_at = Utc.with_ymd_and_hms(2025, 8, 11, 8, 30, 0).unwrap();
        CalendarEventDraft {
            student_id: student_id.to_string(),
            semester_id: None,
            source: EventSource::Timetable,
            external_id: "class-1".into(),
            title: "SC2006 LEC (SCL2)".into(),
            starts_at,
            ends_at: starts_at + Duration::minutes(50),
            location: Some("LT19A".into()),
            notes: None,
            is_locked: true,
        }
    }

    #[tokio::test]
    async fn mirror_keeps_sync_flag_across_upserts() {
        let db = Database::open_in_memory().unwrap();
        let student = db.create_student(None, None).await.unwrap();
        let first = draft(&student.id);

        let inserted = first.clone();
        let outcomes = db
            .execute(move |conn| {
                Ok((
                    upsert_calendar_event(conn, &inserted)?,
                    upsert_unified_entry(conn, &inserted)?,
                ))
            })
            .await
            .unwrap();
        assert_eq!(outcomes, (UpsertOutcome::Created, UpsertOutcome::Created));

        let window_start = first.starts_at - Duration::days(1);
        let window_end = first.starts_at + Duration::days(1);
        let mirror = db
            .list_unified_calendar(&student.id, window_start, window_end)
            .await
            .unwrap();
        db.mark_unified_synced(&mirror[0].id).await.unwrap();

        let mut renamed = first.clone();
        renamed.title = "SC2006 LEC (SCL2) moved".into();
        let outcomes = db
            .execute(move |conn| {
                Ok((
                    upsert_calendar_event(conn, &renamed)?,
                    upsert_unified_entry(conn, &renamed)?,
                ))
            })
            .await
            .unwrap();
        assert_eq!(outcomes, (UpsertOutcome::Updated, UpsertOutcome::Updated));

        let mirror = db
            .list_unified_calendar(&student.id, window_start, window_end)
            .await
            .unwrap();
        assert_eq!(mirror.len(), 1);
        assert!(mirror[0].is_synced);
        assert_eq!(mirror[0].title, "SC2006 LEC (SCL2) moved");

        let events = db
            .list_calendar_events(&student.id, window_start, window_end)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_locked);
    }
}
