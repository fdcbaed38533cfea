//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown niche: {0}")]
    UnknownNiche(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown content source: {0}")]
    UnknownSource(String),

    #[error("Invalid script: {}", .0.join("; "))]
    InvalidScript(Vec<String>),
}

impl ModelError {
    /// Create a script validation error from a single message.
    pub fn invalid_script(msg: impl Into<String>) -> Self {
        Self::InvalidScript(vec![msg.into()])
    }
}
