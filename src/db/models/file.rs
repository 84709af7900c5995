use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileKind {
    Timetable,
    Academic,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Timetable => "TIMETABLE",
            FileKind::Academic => "ACADEMIC",
        }
    }
}

/// Record of one uploaded document and what was extracted from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedFile {
    pub id: String,
    pub kind: FileKind,
    pub semester_id: String,
    pub student_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub text_content: Option<String>,
    pub extracted_json: Option<serde_json::Value>,
}
