//! Content source errors.

use reel_models::{ContentSourceType, ModelError, Niche};
use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_type} API error: HTTP {status}")]
    Http {
        source_type: ContentSourceType,
        status: u16,
    },

    #[error("{source_type} rate limited the request (retry after {retry_after_secs}s)")]
    RateLimited {
        source_type: ContentSourceType,
        retry_after_secs: u64,
    },

    #[error("{source_type} request failed: {message}")]
    Request {
        source_type: ContentSourceType,
        message: String,
    },

    #[error("{source_type} returned an unexpected payload: {message}")]
    Parse {
        source_type: ContentSourceType,
        message: String,
    },

    #[error("No available content sources for niche: {0}")]
    NoSources(Niche),

    #[error("Source {0} is not registered")]
    NotRegistered(ContentSourceType),

    #[error("Content cannot be turned into a script: {0}")]
    Script(#[from] ModelError),
}

impl SourceError {
    pub fn request(source_type: ContentSourceType, err: impl std::fmt::Display) -> Self {
        Self::Request {
            source_type,
            message: err.to_string(),
        }
    }

    pub fn parse(source_type: ContentSourceType, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            source_type,
            message: err.to_string(),
        }
    }

    /// Check if retrying later could help.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::RateLimited { .. } | SourceError::Request { .. } => true,
            SourceError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let server = SourceError::Http {
            source_type: ContentSourceType::Reddit,
            status: 503,
        };
        let client = SourceError::Http {
            source_type: ContentSourceType::Reddit,
            status: 404,
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!SourceError::NoSources(Niche::Finance).is_retryable());
    }

    #[test]
    fn test_messages_name_the_source() {
        let err = SourceError::request(ContentSourceType::HackerNews, "connection reset");
        assert_eq!(err.to_string(), "hacker_news request failed: connection reset");
    }
}
