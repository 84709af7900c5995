//! Ingestion entry points: one uploaded document in, persisted schedule out.
//!
//! Parsing runs before any lock is taken. The persistence phase of each call
//! holds the semester's lock and runs in a single transaction, so concurrent
//! uploads for one semester are serialized and a failed call leaves nothing
//! behind.

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::academic::{
    materialize::materialize_academic, parse_academic_calendar, pick_semester_bucket,
    semester_inputs_for_year, AcademicMaterializeReport,
};
use crate::conflicts::{detect_conflicts, Conflict, EventWindow};
use crate::db::models::{FileKind, IngestedFile, Semester};
use crate::db::repositories::{files::insert_ingested_file, semesters::upsert_semester};
use crate::db::{helpers::new_id, Database};
use crate::error::{IngestError, IngestResult};
use crate::extract::{extract_document, ExtractedDocument};
use crate::settings::{IngestSettings, SettingsStore};
use crate::timetable::{
    materialize::{materialize_classes, upsert_timetable},
    parse_timetable, MaterializeReport, ParseStrategy, SchemaUpsertReport,
};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Shared handles for every ingestion call. Cheap to clone.
#[derive(Clone)]
pub struct IngestContext {
    db: Database,
    settings: Arc<SettingsStore>,
    semester_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl IngestContext {
    pub fn new(db: Database, settings: SettingsStore) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            semester_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> IngestSettings {
        self.settings.current()
    }

    async fn lock_semester(&self, semester_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.semester_locks.lock().await;
            locks.entry(semester_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// An uploaded document.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub student_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSummary {
    pub classes: usize,
    pub courses: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedSummary {
    pub ok: bool,
    pub schema: SchemaUpsertReport,
    pub events: MaterializeReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableOutcome {
    pub file_id: String,
    pub semester_id: String,
    pub strategy: ParseStrategy,
    pub parsed_summary: ParsedSummary,
    pub materialized: MaterializedSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicOutcome {
    pub file_id: String,
    pub semester_id: String,
    /// Extraction path that produced the text: `pdf` or `text`.
    pub used: &'static str,
    pub weeks_synthesized: bool,
    pub report: AcademicMaterializeReport,
}

async fn require_student(ctx: &IngestContext, student_id: &str) -> IngestResult<()> {
    match ctx.db.get_student(student_id).await? {
        Some(_) => Ok(()),
        None => Err(IngestError::not_found("student", student_id)),
    }
}

async fn require_semester(ctx: &IngestContext, key: &str) -> IngestResult<Semester> {
    ctx.db
        .resolve_semester(key)
        .await?
        .ok_or_else(|| IngestError::not_found("semester", key))
}

fn file_record(
    kind: FileKind,
    upload: &Upload,
    semester_id: &str,
    document: &ExtractedDocument,
    extracted: serde_json::Value,
) -> IngestedFile {
    IngestedFile {
        id: new_id(),
        kind,
        semester_id: semester_id.to_string(),
        student_id: upload.student_id.clone(),
        file_name: upload.file_name.clone(),
        mime_type: upload.mime_type.clone(),
        size_bytes: upload.bytes.len() as u64,
        text_content: Some(document.text.clone()),
        extracted_json: Some(extracted),
    }
}

/// Parses a timetable export and materializes it for one student.
///
/// Step 1: resolve the semester and student (`NotFound` otherwise).
/// Step 2: extract and parse the document.
/// Step 3: under the semester lock, record the file, upsert courses, classes
/// and exams, then expand the student's classes into calendar events.
pub async fn ingest_timetable(
    ctx: &IngestContext,
    upload: Upload,
    semester_key: &str,
) -> IngestResult<TimetableOutcome> {
    let semester = require_semester(ctx, semester_key).await?;
    require_student(ctx, &upload.student_id).await?;

    let settings = ctx.settings();
    let document = extract_document(&upload.bytes, &upload.mime_type)?;
    let timetable = parse_timetable(&document, &settings);
    if timetable.classes.is_empty() {
        log_warn!("No classes parsed from {}", upload.file_name);
    }

    let extracted = serde_json::to_value(&timetable).context("failed to serialize timetable")?;
    let record = file_record(FileKind::Timetable, &upload, &semester.id, &document, extracted);
    let file_id = record.id.clone();
    let parsed_summary = ParsedSummary {
        classes: timetable.classes.len(),
        courses: timetable.courses.len(),
    };
    let strategy = timetable.strategy;

    let _guard = ctx.lock_semester(&semester.id).await;
    let student_id = upload.student_id.clone();
    let semester_for_db = semester.clone();
    let (schema, events) = ctx
        .db
        .execute(move |conn| {
            let tx = conn.transaction()?;
            insert_ingested_file(&tx, &record)?;
            let schema = upsert_timetable(
                &tx,
                &student_id,
                &semester_for_db.id,
                &timetable,
                settings.variant_suffix_max,
            )?;
            let events = materialize_classes(&tx, &student_id, &semester_for_db)?;
            tx.commit()?;
            Ok((schema, events))
        })
        .await
        .context("failed to persist timetable")?;

    log_info!(
        "Timetable {} for semester {}: {} classes, {} events created, {} updated",
        file_id,
        semester.name,
        parsed_summary.classes,
        events.events_created,
        events.events_updated
    );

    Ok(TimetableOutcome {
        file_id,
        semester_id: semester.id,
        strategy,
        parsed_summary,
        materialized: MaterializedSummary {
            ok: true,
            schema,
            events,
        },
    })
}

/// Parses an academic calendar and materializes its weeks and holidays.
///
/// With a semester key the events land in that semester and synthesized
/// weeks start at its `starts_on`. Without one, both semesters of the
/// academic year named in the document are created or refreshed and the
/// events go to the one whose months the parsed weeks fall in.
pub async fn ingest_academic_calendar(
    ctx: &IngestContext,
    upload: Upload,
    semester_key: Option<&str>,
) -> IngestResult<AcademicOutcome> {
    let known_semester = match semester_key {
        Some(key) => Some(require_semester(ctx, key).await?),
        None => None,
    };
    require_student(ctx, &upload.student_id).await?;

    let settings = ctx.settings();
    let document = extract_document(&upload.bytes, &upload.mime_type)?;
    let mut calendar = parse_academic_calendar(&document.text, &settings);

    let semester = match known_semester {
        Some(semester) => semester,
        None => {
            let short = calendar.academic_year_short.clone().ok_or_else(|| {
                IngestError::not_found("academic year", upload.file_name.clone())
            })?;
            let inputs = semester_inputs_for_year(&short)
                .ok_or_else(|| IngestError::not_found("academic year", short.clone()))?;
            let bucket = pick_semester_bucket(&calendar.weeks);
            let semesters = ctx
                .db
                .execute(move |conn| {
                    let tx = conn.transaction()?;
                    let mut stored = Vec::with_capacity(inputs.len());
                    for input in &inputs {
                        stored.push(upsert_semester(&tx, input)?);
                    }
                    tx.commit()?;
                    Ok(stored)
                })
                .await
                .context("failed to create academic year semesters")?;
            log_info!("Academic year {} resolved to semester {}", short, bucket);
            semesters
                .into_iter()
                .find(|semester| semester.semester_no == bucket)
                .ok_or_else(|| {
                    IngestError::not_found("semester", format!("AY{short} Sem {bucket}"))
                })?
        }
    };

    calendar.ensure_weeks(semester.starts_on);

    let extracted = serde_json::to_value(&calendar).context("failed to serialize calendar")?;
    let record = file_record(FileKind::Academic, &upload, &semester.id, &document, extracted);
    let file_id = record.id.clone();
    let weeks_synthesized = calendar.weeks_synthesized;

    let _guard = ctx.lock_semester(&semester.id).await;
    let student_id = upload.student_id.clone();
    let semester_id = semester.id.clone();
    let report = ctx
        .db
        .execute(move |conn| {
            let tx = conn.transaction()?;
            insert_ingested_file(&tx, &record)?;
            let report =
                materialize_academic(&tx, &student_id, &semester_id, &calendar, &settings)?;
            tx.commit()?;
            Ok(report)
        })
        .await
        .context("failed to persist academic calendar")?;

    log_info!(
        "Academic calendar {} for semester {}: {} weeks, {} holidays",
        file_id,
        semester.name,
        report.weeks,
        report.holidays
    );

    Ok(AcademicOutcome {
        file_id,
        semester_id: semester.id,
        used: document.format.as_str(),
        weeks_synthesized,
        report,
    })
}

/// Overlapping pairs among a student's stored events in `[from, to)`.
pub async fn student_conflicts(
    ctx: &IngestContext,
    student_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> IngestResult<Vec<Conflict>> {
    require_student(ctx, student_id).await?;
    let events = ctx.db.list_calendar_events(student_id, from, to).await?;
    let windows: Vec<EventWindow> = events.iter().map(EventWindow::from).collect();
    Ok(detect_conflicts(&windows))
}
