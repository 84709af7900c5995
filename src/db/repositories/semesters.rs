use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, new_id, parse_date},
    models::{Semester, SemesterInput},
};

lazy_static! {
    // "AY25S1" -> academic year 25/26, semester 1
    static ref SHORT_KEY_RE: Regex = Regex::new(r"(?i)^AY(\d{2})S([12])$").unwrap();
}

const SEMESTER_COLUMNS: &str =
    "id, name, academic_year, academic_year_short, semester_no, starts_on, ends_on";

fn row_to_semester(row: &Row) -> Result<Semester> {
    let starts_on: String = row.get("starts_on")?;
    let ends_on: String = row.get("ends_on")?;
    let semester_no: i64 = row.get("semester_no")?;

    Ok(Semester {
        id: row.get("id")?,
        name: row.get("name")?,
        academic_year: row.get("academic_year")?,
        academic_year_short: row.get("academic_year_short")?,
        semester_no: u8::try_from(semester_no)
            .map_err(|_| anyhow!("semester_no {semester_no} out of range"))?,
        starts_on: parse_date(&starts_on, "starts_on")?,
        ends_on: parse_date(&ends_on, "ends_on")?,
    })
}

pub(crate) fn find_semester(conn: &Connection, semester_id: &str) -> Result<Option<Semester>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SEMESTER_COLUMNS} FROM semesters WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![semester_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_semester(row)?)),
        None => Ok(None),
    }
}

/// Resolves a semester by id, by exact name, or by the short `AYyySn` form.
pub(crate) fn resolve_semester_key(conn: &Connection, key: &str) -> Result<Option<Semester>> {
    let key = key.trim();
    if key.is_empty() {
        return Ok(None);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {SEMESTER_COLUMNS} FROM semesters WHERE id = ?1 OR name = ?1 LIMIT 1"
    ))?;
    let mut rows = stmt.query(params![key])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(row_to_semester(row)?));
    }

    let Some(caps) = SHORT_KEY_RE.captures(key) else {
        return Ok(None);
    };
    let yy: u32 = caps[1].parse()?;
    let semester_no: u8 = caps[2].parse()?;
    let short = format!("{:02}/{:02}", yy, (yy + 1) % 100);

    let mut stmt = conn.prepare(&format!(
        "SELECT {SEMESTER_COLUMNS} FROM semesters
         WHERE academic_year_short = ?1 AND semester_no = ?2
         LIMIT 1"
    ))?;
    let mut rows = stmt.query(params![short, semester_no])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_semester(row)?)),
        None => Ok(None),
    }
}

/// Creates the semester named `input.name` or refreshes its dates.
pub(crate) fn upsert_semester(conn: &Connection, input: &SemesterInput) -> Result<Semester> {
    let existing_id: Option<String> = conn
        .query_row(
            "SELECT id FROM semesters WHERE name = ?1",
            params![input.name],
            |row| row.get(0),
        )
        .optional()?;

    let id = match existing_id {
        Some(id) => {
            conn.execute(
                "UPDATE semesters
                 SET academic_year = ?1,
                     academic_year_short = ?2,
                     semester_no = ?3,
                     starts_on = ?4,
                     ends_on = ?5
                 WHERE id = ?6",
                params![
                    input.academic_year,
                    input.academic_year_short,
                    input.semester_no,
                    format_date(&input.starts_on),
                    format_date(&input.ends_on),
                    id,
                ],
            )?;
            id
        }
        None => {
            let id = new_id();
            conn.execute(
                "INSERT INTO semesters (id, name, academic_year, academic_year_short, semester_no, starts_on, ends_on)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    input.name,
                    input.academic_year,
                    input.academic_year_short,
                    input.semester_no,
                    format_date(&input.starts_on),
                    format_date(&input.ends_on),
                ],
            )?;
            id
        }
    };

    find_semester(conn, &id)?.ok_or_else(|| anyhow!("Semester not found after upsert"))
}

impl Database {
    pub async fn get_semester(&self, semester_id: &str) -> Result<Option<Semester>> {
        let semester_id = semester_id.to_string();
        self.execute(move |conn| find_semester(conn, &semester_id))
            .await
    }

    pub async fn resolve_semester(&self, key: &str) -> Result<Option<Semester>> {
        let key = key.to_string();
        self.execute(move |conn| resolve_semester_key(conn, &key))
            .await
    }

    pub async fn upsert_semester(&self, input: SemesterInput) -> Result<Semester> {
        self.execute(move |conn| upsert_semester(conn, &input))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sem1() -> SemesterInput {
        SemesterInput {
            name: "AY25/26 Sem 1".into(),
            academic_year: "AY25/26".into(),
            academic_year_short: "25/26".into(),
            semester_no: 1,
            starts_on: NaiveDate::from_ymd_opt(2025, 8, 11).unwrap(),
            ends_on: NaiveDate::from_ymd_opt(2025, 12, 7).unwrap(),
        }
    }

    #[tokio::test]
    async fn resolves_by_id_name_and_short_key() {
        let db = Database::open_in_memory().unwrap();
        let created = db.upsert_semester(sem1()).await.unwrap();

        let by_id = db.resolve_semester(&created.id).await.unwrap().unwrap();
        let by_name = db.resolve_semester("AY25/26 Sem 1").await.unwrap().unwrap();
        let by_short = db.resolve_semester("ay25s1").await.unwrap().unwrap();

        assert_eq!(by_id, created);
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_short.id, created.id);
        assert!(db.resolve_semester("AY25S2").await.unwrap().is_none());
        assert!(db.resolve_semester("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_by_name_keeps_id() {
        let db = Database::open_in_memory().unwrap();
        let first = db.upsert_semester(sem1()).await.unwrap();

        let mut moved = sem1();
        moved.starts_on = NaiveDate::from_ymd_opt(2025, 8, 18).unwrap();
        let second = db.upsert_semester(moved).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.starts_on, NaiveDate::from_ymd_opt(2025, 8, 18).unwrap());
    }
}
