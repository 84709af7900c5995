//! timetable-ingest - batch front end for the ingestion pipeline.
//!
//! Usage:
//!   timetable-ingest timetable <file> --semester <key> --student <id>
//!   timetable-ingest academic <file> [--semester <key>] --student <id>
//!   timetable-ingest conflicts --student <id> --from <rfc3339> --to <rfc3339>
//!   timetable-ingest seed-semester --name "AY25/26 Sem 1" --year-short 25/26 ...
//!   timetable-ingest seed-student [--email <email>]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use timetable_ingest::{
    db::models::SemesterInput, ingest_academic_calendar, ingest_timetable, student_conflicts,
    Database, IngestContext, SettingsStore, Upload,
};

#[derive(Parser)]
#[command(name = "timetable-ingest", version, about = "Ingest timetables and academic calendars")]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "TIMETABLE_INGEST_DB", default_value = "timetable.sqlite3")]
    db: PathBuf,

    /// JSON settings file; defaults apply when it does not exist.
    #[arg(long, global = true, env = "TIMETABLE_INGEST_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a timetable export and materialize it for a student.
    Timetable {
        file: PathBuf,
        #[arg(long)]
        semester: String,
        #[arg(long)]
        student: String,
        /// Overrides the type guessed from the file extension.
        #[arg(long)]
        mime: Option<String>,
    },
    /// Parse an academic calendar; without --semester the academic year is
    /// read from the document.
    Academic {
        file: PathBuf,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long)]
        student: String,
        #[arg(long)]
        mime: Option<String>,
    },
    /// List overlapping events for a student.
    Conflicts {
        #[arg(long)]
        student: String,
        #[arg(long)]
        from: DateTime<Utc>,
        #[arg(long)]
        to: DateTime<Utc>,
    },
    /// Create or refresh a semester by name.
    SeedSemester {
        #[arg(long)]
        name: String,
        #[arg(long)]
        year_short: String,
        #[arg(long)]
        semester_no: u8,
        /// Monday of teaching week 1 (YYYY-MM-DD).
        #[arg(long)]
        starts_on: NaiveDate,
        /// Defaults to the end of the seventeenth week.
        #[arg(long)]
        ends_on: Option<NaiveDate>,
    },
    /// Create a student and print its id.
    SeedStudent {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("text") => "text/plain",
        _ => "application/octet-stream",
    }
}

fn read_upload(path: &Path, mime: Option<String>, student_id: String) -> Result<Upload> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(Upload {
        bytes,
        mime_type: mime.unwrap_or_else(|| guess_mime(path).to_string()),
        file_name,
        student_id,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let database = Database::new(cli.db.clone())?;
    let settings = match &cli.settings {
        Some(path) => SettingsStore::new(path.clone())?,
        None => SettingsStore::in_memory(Default::default()),
    };
    let ctx = IngestContext::new(database, settings);

    match cli.command {
        Command::Timetable {
            file,
            semester,
            student,
            mime,
        } => {
            let upload = read_upload(&file, mime, student)?;
            let outcome = ingest_timetable(&ctx, upload, &semester).await?;
            print_json(&outcome)
        }
        Command::Academic {
            file,
            semester,
            student,
            mime,
        } => {
            let upload = read_upload(&file, mime, student)?;
            let outcome = ingest_academic_calendar(&ctx, upload, semester.as_deref()).await?;
            print_json(&outcome)
        }
        Command::Conflicts { student, from, to } => {
            if to <= from {
                return Err(anyhow!("--to must be after --from"));
            }
            let conflicts = student_conflicts(&ctx, &student, from, to).await?;
            print_json(&conflicts)
        }
        Command::SeedSemester {
            name,
            year_short,
            semester_no,
            starts_on,
            ends_on,
        } => {
            let input = SemesterInput {
                name,
                academic_year: format!("AY{year_short}"),
                academic_year_short: year_short,
                semester_no,
                starts_on,
                ends_on: ends_on
                    .unwrap_or_else(|| starts_on + Duration::weeks(17) - Duration::days(1)),
            };
            let semester = ctx.db().upsert_semester(input).await?;
            print_json(&semester)
        }
        Command::SeedStudent { email, name } => {
            let student = ctx.db().create_student(email, name).await?;
            print_json(&student)
        }
    }
}
