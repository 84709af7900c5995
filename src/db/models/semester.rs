//! Semester and student records.
//!
//! `Semester::starts_on` is the Monday of teaching week 1; every week/day
//! offset in the crate is computed from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub id: String,
    /// Display name, e.g. "AY25/26 Sem 1".
    pub name: String,
    /// Long form, e.g. "AY25/26".
    pub academic_year: String,
    /// Short form used by semester keys, e.g. "25/26".
    pub academic_year_short: String,
    pub semester_no: u8,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

/// Input for creating or refreshing a semester keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterInput {
    pub name: String,
    pub academic_year: String,
    pub academic_year_short: String,
    pub semester_no: u8,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}
