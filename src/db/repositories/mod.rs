pub mod academic_events;
pub mod calendar_events;
pub mod courses;
pub mod files;
pub mod semesters;
pub mod students;

pub use calendar_events::{CalendarEventDraft, UpsertOutcome};
pub use courses::{ClassSlotKey, EnrolledClass};
