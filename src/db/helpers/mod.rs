use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::db::models::{AcademicKind, ClassComponent, DeliveryMode, EventSource, FileKind};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Canonical timestamp text. Natural keys compare these strings, so every
/// write must go through here.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("failed to parse {field}"))
}

pub fn weeks_to_json(weeks: &[u32]) -> Result<String> {
    serde_json::to_string(weeks).context("failed to serialize weeks")
}

pub fn weeks_from_json(value: &str) -> Result<Vec<u32>> {
    serde_json::from_str(value).with_context(|| format!("invalid weeks_json '{value}'"))
}

pub fn parse_component(value: &str) -> Result<ClassComponent> {
    match value {
        "LEC" => Ok(ClassComponent::Lec),
        "TUT" => Ok(ClassComponent::Tut),
        "LAB" => Ok(ClassComponent::Lab),
        "SEM" => Ok(ClassComponent::Sem),
        "OTHER" => Ok(ClassComponent::Other),
        other => Err(anyhow!("unknown class component {other}")),
    }
}

pub fn parse_delivery(value: &str) -> Result<DeliveryMode> {
    match value {
        "PHYSICAL" => Ok(DeliveryMode::Physical),
        "ONLINE" => Ok(DeliveryMode::Online),
        "HYBRID" => Ok(DeliveryMode::Hybrid),
        other => Err(anyhow!("unknown delivery mode {other}")),
    }
}

pub fn parse_academic_kind(value: &str) -> Result<AcademicKind> {
    match value {
        "TEACHING_WEEK" => Ok(AcademicKind::TeachingWeek),
        "RECESS_WEEK" => Ok(AcademicKind::RecessWeek),
        "STUDY_WEEK" => Ok(AcademicKind::StudyWeek),
        "EXAM_WEEK" => Ok(AcademicKind::ExamWeek),
        "PUBLIC_HOLIDAY" => Ok(AcademicKind::PublicHoliday),
        other => Err(anyhow!("unknown academic event kind {other}")),
    }
}

pub fn parse_source(value: &str) -> Result<EventSource> {
    match value {
        "USER" => Ok(EventSource::User),
        "ACADEMIC" => Ok(EventSource::Academic),
        "TIMETABLE" => Ok(EventSource::Timetable),
        other => Err(anyhow!("unknown event source {other}")),
    }
}

pub fn parse_file_kind(value: &str) -> Result<FileKind> {
    match value {
        "TIMETABLE" => Ok(FileKind::Timetable),
        "ACADEMIC" => Ok(FileKind::Academic),
        other => Err(anyhow!("unknown file kind {other}")),
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn datetime_text_is_canonical() {
        let at = Utc.with_ymd_and_hms(2025, 8, 11, 8, 30, 0).unwrap();
        let text = format_datetime(&at);
        assert_eq!(text, "2025-08-11T08:30:00.000Z");
        assert_eq!(parse_datetime(&text, "starts_at").unwrap(), at);
    }

    #[test]
    fn weeks_round_trip_as_json_array() {
        let json = weeks_to_json(&[1, 2, 11]).unwrap();
        assert_eq!(json, "[1,2,11]");
        assert_eq!(weeks_from_json(&json).unwrap(), vec![1, 2, 11]);
    }
}
