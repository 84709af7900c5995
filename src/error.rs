use thiserror::Error;

/// Failure surface of the ingestion entry points.
///
/// `NotFound` is the only condition callers are expected to branch on; every
/// other failure is opaque and wrapped in `Internal`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{entity} not found for key \"{key}\"")]
    NotFound { entity: &'static str, key: String },

    #[error("unsupported file type \"{0}\"; upload a PDF or plain-text export")]
    UnsupportedMedia(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IngestError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        IngestError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, IngestError::NotFound { .. })
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
