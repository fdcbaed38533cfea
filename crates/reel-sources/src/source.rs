//! The content source abstraction.

use std::time::Duration;

use async_trait::async_trait;
use reel_models::{ContentSourceType, Niche, RawContent};

use crate::error::SourceResult;
use crate::http::DEFAULT_USER_AGENT;

/// Connection settings shared by the HTTP adapters.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// API root, without a trailing slash. Overridable for tests.
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub requests_per_minute: u32,
}

impl SourceSettings {
    pub fn new(base_url: impl Into<String>, requests_per_minute: u32) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            requests_per_minute,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join a path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// What a source can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCapabilities {
    pub supports_search: bool,
    pub supports_trending: bool,
    pub requires_api_key: bool,
    pub rate_limit_per_minute: u32,
    pub max_results_per_request: usize,
}

impl Default for SourceCapabilities {
    fn default() -> Self {
        Self {
            supports_search: true,
            supports_trending: false,
            requires_api_key: false,
            rate_limit_per_minute: 60,
            max_results_per_request: 100,
        }
    }
}

/// An external content provider.
///
/// Implementations own their rate limiter and pace their own requests;
/// callers may invoke them concurrently.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn source_type(&self) -> ContentSourceType;

    fn capabilities(&self) -> SourceCapabilities;

    fn supports_niche(&self, niche: Niche) -> bool;

    /// Whether the source is configured (credentials present and so on).
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch up to `limit` items for a niche, optionally filtered by a query.
    async fn fetch_content(
        &self,
        niche: Niche,
        query: Option<&str>,
        limit: usize,
    ) -> SourceResult<Vec<RawContent>>;

    /// Fetch what is currently popular for a niche.
    async fn fetch_trending(&self, niche: Niche, limit: usize) -> SourceResult<Vec<RawContent>> {
        self.fetch_content(niche, None, limit).await
    }
}
