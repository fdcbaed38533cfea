//! Shared HTTP plumbing for the source adapters.

use reel_models::ContentSourceType;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{SourceError, SourceResult};
use crate::source::SourceSettings;

pub const DEFAULT_USER_AGENT: &str = "reelforge/0.1 (content pipeline)";

/// Fallback wait when a 429 carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Build a client with the settings' user agent and per-request timeout.
pub fn build_client(source_type: ContentSourceType, settings: &SourceSettings) -> SourceResult<Client> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .build()
        .map_err(|e| SourceError::request(source_type, e))
}

/// GET a JSON document, mapping transport and status failures to
/// [`SourceError`].
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    source_type: ContentSourceType,
    url: &str,
    query: &[(&str, String)],
) -> SourceResult<T> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| SourceError::request(source_type, e))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(SourceError::RateLimited {
            source_type,
            retry_after_secs,
        });
    }
    if !status.is_success() {
        return Err(SourceError::Http {
            source_type,
            status: status.as_u16(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::parse(source_type, e))
}

/// Map a raw engagement count onto 0..=100 with a log scale.
pub fn log_score(raw: i64, factor: f64) -> f64 {
    if raw <= 0 {
        return 0.0;
    }
    ((raw as f64 + 1.0).log10() * factor).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_score() {
        assert_eq!(log_score(0, 25.0), 0.0);
        assert_eq!(log_score(-5, 25.0), 0.0);
        assert!((log_score(99, 25.0) - 50.0).abs() < 1e-9);
        assert_eq!(log_score(1_000_000, 30.0), 100.0);
    }
}
