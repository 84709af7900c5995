use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{parse_file_kind, to_i64, to_u64},
    models::IngestedFile,
};

pub(crate) fn insert_ingested_file(conn: &Connection, file: &IngestedFile) -> Result<()> {
    let extracted_json = file
        .extracted_json
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("failed to serialize extracted_json")?;

    conn.execute(
        "INSERT INTO ingested_files (
            id,
            kind,
            semester_id,
            student_id,
            file_name,
            mime_type,
            size_bytes,
            text_content,
            extracted_json,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            file.id,
            file.kind.as_str(),
            file.semester_id,
            file.student_id,
            file.file_name,
            file.mime_type,
            to_i64(file.size_bytes)?,
            file.text_content,
            extracted_json,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Database {
    pub async fn get_ingested_file(&self, file_id: &str) -> Result<Option<IngestedFile>> {
        let file_id = file_id.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, kind, semester_id, student_id, file_name, mime_type, size_bytes,
                            text_content, extracted_json
                     FROM ingested_files
                     WHERE id = ?1",
                    params![file_id],
                    |row| {
                        Ok((
                            row.get::<_, String>("id")?,
                            row.get::<_, String>("kind")?,
                            row.get::<_, String>("semester_id")?,
                            row.get::<_, String>("student_id")?,
                            row.get::<_, String>("file_name")?,
                            row.get::<_, String>("mime_type")?,
                            row.get::<_, i64>("size_bytes")?,
                            row.get::<_, Option<String>>("text_content")?,
                            row.get::<_, Option<String>>("extracted_json")?,
                        ))
                    },
                )
                .optional()?;

            let Some((
                id,
                kind,
                semester_id,
                student_id,
                file_name,
                mime_type,
                size_bytes,
                text_content,
                extracted_json,
            )) = row
            else {
                return Ok(None);
            };

            let extracted_json = extracted_json
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("invalid extracted_json")?;

            Ok(Some(IngestedFile {
                id,
                kind: parse_file_kind(&kind)?,
                semester_id,
                student_id,
                file_name,
                mime_type,
                size_bytes: to_u64(size_bytes, "size_bytes")?,
                text_content,
                extracted_json,
            }))
        })
        .await
    }
}
