use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{connection::Database, helpers::new_id, models::Student};

pub(crate) fn find_student(conn: &Connection, student_id: &str) -> Result<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, email, display_name FROM students WHERE id = ?1",
            params![student_id],
            |row| {
                Ok(Student {
                    id: row.get("id")?,
                    email: row.get("email")?,
                    display_name: row.get("display_name")?,
                })
            },
        )
        .optional()?;
    Ok(student)
}

impl Database {
    pub async fn create_student(
        &self,
        email: Option<String>,
        display_name: Option<String>,
    ) -> Result<Student> {
        self.execute(move |conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO students (id, email, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, email, display_name, Utc::now().to_rfc3339()],
            )?;
            find_student(conn, &id)?.ok_or_else(|| anyhow!("Student not found after insert"))
        })
        .await
    }

    pub async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let student_id = student_id.to_string();
        self.execute(move |conn| find_student(conn, &student_id))
            .await
    }
}
