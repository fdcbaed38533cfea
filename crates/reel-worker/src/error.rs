//! Worker error types.

use reel_models::{ModelError, Stage};
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },

    #[error("Job cancelled")]
    Cancelled,

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Content source error: {0}")]
    Source(#[from] reel_sources::SourceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn stage(stage: Stage, msg: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: msg.into(),
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Generation(_) | WorkerError::Io(_) => true,
            WorkerError::Source(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled | WorkerError::Media(reel_media::MediaError::Cancelled))
    }
}

impl From<ModelError> for WorkerError {
    fn from(e: ModelError) -> Self {
        WorkerError::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_message() {
        let err = WorkerError::stage(Stage::Videos, "no video segments were created successfully");
        assert_eq!(
            err.to_string(),
            "videos stage failed: no video segments were created successfully"
        );
    }

    #[test]
    fn test_model_errors_are_invalid_input() {
        let err: WorkerError = ModelError::UnknownNiche("cooking".into()).into();
        assert!(matches!(err, WorkerError::InvalidInput(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cancellation_detection() {
        assert!(WorkerError::Cancelled.is_cancelled());
        assert!(WorkerError::from(reel_media::MediaError::Cancelled).is_cancelled());
        assert!(!WorkerError::generation("boom").is_cancelled());
    }
}
