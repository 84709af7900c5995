//! Academic calendar rows: week blocks and public holidays.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcademicKind {
    TeachingWeek,
    RecessWeek,
    StudyWeek,
    ExamWeek,
    PublicHoliday,
}

impl AcademicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicKind::TeachingWeek => "TEACHING_WEEK",
            AcademicKind::RecessWeek => "RECESS_WEEK",
            AcademicKind::StudyWeek => "STUDY_WEEK",
            AcademicKind::ExamWeek => "EXAM_WEEK",
            AcademicKind::PublicHoliday => "PUBLIC_HOLIDAY",
        }
    }

    /// Human title for week blocks that carry no label of their own.
    pub fn default_title(&self) -> &'static str {
        match self {
            AcademicKind::TeachingWeek => "Teaching Week",
            AcademicKind::RecessWeek => "Recess Week",
            AcademicKind::StudyWeek => "Study Week",
            AcademicKind::ExamWeek => "Exam Week",
            AcademicKind::PublicHoliday => "Public Holiday",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcademicCalEvent {
    pub id: String,
    pub semester_id: String,
    pub kind: AcademicKind,
    pub title: String,
    pub notes: Option<String>,
    pub week_no: Option<u32>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    /// 1..12
    pub month: u32,
    /// ISO weekday, Monday = 1.
    pub weekday: u32,
}
