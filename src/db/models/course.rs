//! Course, class and exam records produced by timetable ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassComponent {
    Lec,
    Tut,
    Lab,
    Sem,
    Other,
}

impl ClassComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassComponent::Lec => "LEC",
            ClassComponent::Tut => "TUT",
            ClassComponent::Lab => "LAB",
            ClassComponent::Sem => "SEM",
            ClassComponent::Other => "OTHER",
        }
    }

    /// Maps a raw timetable label ("LEC/STU", "tut", "LAB") onto a component.
    pub fn from_label(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.contains("LEC") {
            ClassComponent::Lec
        } else if upper.contains("TUT") {
            ClassComponent::Tut
        } else if upper.contains("LAB") {
            ClassComponent::Lab
        } else if upper.contains("SEM") {
            ClassComponent::Sem
        } else {
            ClassComponent::Other
        }
    }
}

impl Default for ClassComponent {
    fn default() -> Self {
        ClassComponent::Other
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMode {
    Physical,
    Online,
    Hybrid,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Physical => "PHYSICAL",
            DeliveryMode::Online => "ONLINE",
            DeliveryMode::Hybrid => "HYBRID",
        }
    }

    /// ONLINE iff the venue is exactly "ONLINE" (any case).
    pub fn from_venue(venue: &str) -> Self {
        if venue.trim().eq_ignore_ascii_case("ONLINE") {
            DeliveryMode::Online
        } else {
            DeliveryMode::Physical
        }
    }
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::Physical
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseClass {
    pub id: String,
    pub course_id: String,
    pub semester_id: String,
    /// Group label, possibly namespaced as `base#variant`.
    pub index: String,
    pub component: ClassComponent,
    /// 1 = Monday .. 7 = Sunday.
    pub day_of_week: u8,
    pub start_time: String, // "HH:MM"
    pub end_time: String,   // "HH:MM"
    pub weeks: Vec<u32>,
    pub location: Option<String>,
    pub delivery: DeliveryMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseExam {
    pub id: String,
    pub course_id: String,
    pub semester_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
}
