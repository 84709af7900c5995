//! Raw document bytes to plain text plus positioned tokens.

mod pdf;
mod text;

use serde::Serialize;

use crate::error::{IngestError, IngestResult};
use crate::log_warn;

pub use pdf::{extract_pdf_text, extract_pdf_tokens};
pub use text::{clean_text, tokens_from_text};

const ENABLE_LOGS: bool = true;

/// One visually distinct run of text on a page. `y` grows upwards, as in PDF
/// user space, so reading order is `y` descending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfToken {
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Text => "text",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub format: DocumentFormat,
    pub text: String,
    /// Empty when layout extraction failed; callers fall back to `text`.
    pub tokens: Vec<PdfToken>,
}

pub fn detect_format(bytes: &[u8], mime_type: &str) -> Option<DocumentFormat> {
    let mime = mime_type.trim().to_ascii_lowercase();
    if mime == "application/pdf" || bytes.starts_with(b"%PDF") {
        Some(DocumentFormat::Pdf)
    } else if mime.starts_with("text/plain") {
        Some(DocumentFormat::Text)
    } else {
        None
    }
}

pub fn extract_document(bytes: &[u8], mime_type: &str) -> IngestResult<ExtractedDocument> {
    let format = detect_format(bytes, mime_type)
        .ok_or_else(|| IngestError::UnsupportedMedia(mime_type.to_string()))?;

    match format {
        DocumentFormat::Pdf => {
            let text = extract_pdf_text(bytes)?;
            let tokens = match extract_pdf_tokens(bytes) {
                Ok(tokens) => tokens,
                Err(err) => {
                    log_warn!("Layout extraction failed, continuing on plain text: {err:#}");
                    Vec::new()
                }
            };
            Ok(ExtractedDocument {
                format,
                text,
                tokens,
            })
        }
        DocumentFormat::Text => {
            let raw = String::from_utf8_lossy(bytes);
            let text = clean_text(&raw);
            let tokens = tokens_from_text(&text);
            Ok(ExtractedDocument {
                format,
                text,
                tokens,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_media() {
        let err = extract_document(b"BEGIN:VCALENDAR", "text/calendar").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedMedia(mime) if mime == "text/calendar"));
    }

    #[test]
    fn pdf_magic_wins_over_mime() {
        assert_eq!(
            detect_format(b"%PDF-1.7\n", "application/octet-stream"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            detect_format(b"hello", "text/plain; charset=utf-8"),
            Some(DocumentFormat::Text)
        );
    }

    #[test]
    fn plain_text_produces_tokens() {
        let doc = extract_document(b"SC2006 LEC SCL2 LT19A\r\n0830to0920-\n", "text/plain").unwrap();
        assert_eq!(doc.format, DocumentFormat::Text);
        assert_eq!(doc.text, "SC2006 LEC SCL2 LT19A\n0830to0920-");
        assert_eq!(doc.tokens.len(), 5);
    }
}
