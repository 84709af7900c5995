//! Student-scoped calendar rows and their unified read mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSource {
    User,
    Academic,
    Timetable,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::User => "USER",
            EventSource::Academic => "ACADEMIC",
            EventSource::Timetable => "TIMETABLE",
        }
    }
}

/// Natural key: `(student_id, source, external_id, starts_at)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub student_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub source: EventSource,
    pub external_id: String,
    pub is_locked: bool,
    pub semester_id: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Denormalized listing row. Same natural key as `CalendarEvent`; `is_synced`
/// belongs to external sync and is never reset by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedCalendarEntry {
    pub id: String,
    pub student_id: String,
    pub semester_id: Option<String>,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub source: EventSource,
    pub external_id: String,
    pub is_synced: bool,
}
