pub mod academic;
pub mod conflicts;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod layout;
pub mod settings;
pub mod timetable;
pub mod utils;

pub use db::Database;
pub use error::{IngestError, IngestResult};
pub use ingest::{
    ingest_academic_calendar, ingest_timetable, student_conflicts, AcademicOutcome,
    IngestContext, TimetableOutcome, Upload,
};
pub use settings::{IngestSettings, SettingsStore};
