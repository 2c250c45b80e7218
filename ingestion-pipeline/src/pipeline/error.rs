use common::{error::AppError, status::StatusMessage, utils::embedding::EmbeddingError};
use thiserror::Error;

/// Why a single video run stopped before reaching the store.
#[derive(Debug, Error)]
pub enum VideoIngestError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,
    #[error("Video already exists: video:{0}")]
    AlreadyExists(String),
    #[error("Empty transcript. Skipping.")]
    EmptyTranscript,
    #[error("Phase 1 failed: {0}")]
    Tagging(String),
    #[error("Processed JSON is invalid or incomplete.")]
    InvalidArtifact,
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Unexpected error: {0}")]
    Store(#[from] AppError),
}

impl VideoIngestError {
    /// Whether files written for the video must be removed. Runs that never
    /// started, or that stopped because the video is already stored, leave
    /// everything in place.
    pub fn requires_cleanup(&self) -> bool {
        !matches!(self, Self::InvalidUrl | Self::AlreadyExists(_))
    }

    pub fn status_message(&self) -> StatusMessage {
        match self {
            Self::AlreadyExists(_) | Self::EmptyTranscript => StatusMessage::warning(self.to_string()),
            _ => StatusMessage::error(self.to_string()),
        }
    }
}

impl From<object_store::Error> for VideoIngestError {
    fn from(err: object_store::Error) -> Self {
        Self::Store(AppError::from(err))
    }
}

impl From<surrealdb::Error> for VideoIngestError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Store(AppError::from(err))
    }
}

impl From<serde_json::Error> for VideoIngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(AppError::from(err))
    }
}
