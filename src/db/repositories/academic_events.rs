use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, new_id, parse_academic_kind, parse_date},
    models::AcademicCalEvent,
};

use super::UpsertOutcome;

fn row_to_academic_event(row: &Row) -> Result<AcademicCalEvent> {
    let kind: String = row.get("kind")?;
    let starts_on: String = row.get("starts_on")?;
    let ends_on: String = row.get("ends_on")?;
    let week_no: Option<i64> = row.get("week_no")?;
    let month: i64 = row.get("month")?;
    let weekday: i64 = row.get("weekday")?;

    Ok(AcademicCalEvent {
        id: row.get("id")?,
        semester_id: row.get("semester_id")?,
        kind: parse_academic_kind(&kind)?,
        title: row.get("title")?,
        notes: row.get("notes")?,
        week_no: week_no
            .map(|value| u32::try_from(value).map_err(|_| anyhow!("invalid week_no {value}")))
            .transpose()?,
        starts_on: parse_date(&starts_on, "starts_on")?,
        ends_on: parse_date(&ends_on, "ends_on")?,
        month: u32::try_from(month).map_err(|_| anyhow!("invalid month {month}"))?,
        weekday: u32::try_from(weekday).map_err(|_| anyhow!("invalid weekday {weekday}"))?,
    })
}

/// Upserts by `(semester_id, starts_on, kind)`. The `id` of `event` is ignored
/// on update; the stored row keeps its own and the returned record carries it.
pub(crate) fn upsert_academic_event(
    conn: &Connection,
    event: &AcademicCalEvent,
) -> Result<(AcademicCalEvent, UpsertOutcome)> {
    let starts_text = format_date(&event.starts_on);
    let existing_id: Option<String> = conn
        .query_row(
            "SELECT id FROM academic_cal_events
             WHERE semester_id = ?1 AND starts_on = ?2 AND kind = ?3",
            params![event.semester_id, starts_text, event.kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    let (id, outcome) = match existing_id {
        Some(id) => {
            conn.execute(
                "UPDATE academic_cal_events
                 SET title = ?1,
                     notes = ?2,
                     week_no = ?3,
                     ends_on = ?4,
                     month = ?5,
                     weekday = ?6
                 WHERE id = ?7",
                params![
                    event.title,
                    event.notes,
                    event.week_no,
                    format_date(&event.ends_on),
                    event.month,
                    event.weekday,
                    id,
                ],
            )?;
            (id, UpsertOutcome::Updated)
        }
        None => {
            let id = new_id();
            conn.execute(
                "INSERT INTO academic_cal_events (
                    id,
                    semester_id,
                    kind,
                    title,
                    notes,
                    week_no,
                    starts_on,
                    ends_on,
                    month,
                    weekday
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    event.semester_id,
                    event.kind.as_str(),
                    event.title,
                    event.notes,
                    event.week_no,
                    starts_text,
                    format_date(&event.ends_on),
                    event.month,
                    event.weekday,
                ],
            )?;
            (id, UpsertOutcome::Created)
        }
    };

    Ok((AcademicCalEvent { id, ..event.clone() }, outcome))
}

impl Database {
    pub async fn list_academic_events(&self, semester_id: &str) -> Result<Vec<AcademicCalEvent>> {
        let semester_id = semester_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, semester_id, kind, title, notes, week_no, starts_on, ends_on, month, weekday
                 FROM academic_cal_events
                 WHERE semester_id = ?1
                 ORDER BY starts_on ASC, kind ASC",
            )?;
            let mut rows = stmt.query(params![semester_id])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_academic_event(row)?);
            }
            Ok(events)
        })
        .await
    }
}
