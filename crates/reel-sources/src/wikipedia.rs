//! Wikipedia search plus REST page summaries.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use reel_models::{ContentSourceType, Niche, RawContent, MIN_CONTENT_WORDS};

use crate::error::{SourceError, SourceResult};
use crate::http::{build_client, get_json};
use crate::rate_limit::RateLimiter;
use crate::source::{ContentSource, SourceCapabilities, SourceSettings};

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";
const ARTICLE_SCORE: f64 = 75.0;
const FEATURED_SCORE: f64 = 95.0;

static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static HATNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(For other uses|This article is about).*?\.").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Search terms used when no query is given. Niches without an entry are
/// not served by Wikipedia.
pub fn niche_search_terms(niche: Niche) -> &'static [&'static str] {
    match niche {
        Niche::History => &["historical event", "ancient civilization", "world war", "historical figure"],
        Niche::PsychologyFacts => &[
            "psychology",
            "cognitive bias",
            "mental health",
            "psychological phenomenon",
        ],
        Niche::SpaceAstronomy => &["astronomy", "planet", "galaxy", "space exploration"],
        Niche::AnimalFacts => &["animal behavior", "endangered species", "marine life"],
        Niche::MythologyFolklore => &["mythology", "folklore", "legend", "ancient deity"],
        Niche::GeographyFacts => &["geography", "natural wonder", "country", "geographical feature"],
        Niche::Philosophy => &["philosophy", "philosopher", "ethics", "metaphysics"],
        Niche::TrueCrime => &["murder case", "serial killer", "crime", "criminal case"],
        Niche::UnsolvedMysteries => &["unsolved mystery", "disappearance", "unexplained"],
        Niche::ConspiracyMysteries => &["conspiracy theory", "mystery", "unexplained event"],
        Niche::TechGadgets => &["technology", "invention", "computer science"],
        Niche::AiFutureTech => &["artificial intelligence", "robotics", "future technology"],
        Niche::HealthWellness => &["health", "medicine", "disease", "nutrition"],
        _ => &[],
    }
}

/// Strip citation markers and hatnotes from an extract.
pub fn clean_wikipedia_text(text: &str) -> String {
    let text = CITATION.replace_all(text, "");
    let text = HATNOTE.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Summary {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    extract: String,
    description: Option<String>,
    pageid: Option<u64>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

#[derive(Debug, Deserialize)]
struct FeaturedFeed {
    #[serde(default)]
    tfa: Option<Summary>,
}

pub struct WikipediaSource {
    settings: SourceSettings,
    client: Client,
    limiter: Arc<RateLimiter>,
    min_words: usize,
}

impl WikipediaSource {
    pub fn new(settings: SourceSettings) -> SourceResult<Self> {
        let client = build_client(ContentSourceType::Wikipedia, &settings)?;
        let limiter = RateLimiter::per_minute("wikipedia", settings.requests_per_minute).shared();
        Ok(Self {
            settings,
            client,
            limiter,
            min_words: MIN_CONTENT_WORDS,
        })
    }

    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = min_words;
        self
    }

    async fn search(&self, term: &str, limit: usize) -> SourceResult<Vec<String>> {
        self.limiter.acquire().await;
        let query = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("list", "search".to_string()),
            ("srsearch", term.to_string()),
            ("srlimit", limit.to_string()),
            ("srprop", "snippet|titlesnippet".to_string()),
        ];
        let response: SearchResponse = get_json(
            &self.client,
            ContentSourceType::Wikipedia,
            &self.settings.url("w/api.php"),
            &query,
        )
        .await?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    fn rest_url(&self, segments: &[&str]) -> SourceResult<Url> {
        let mut url = Url::parse(&self.settings.url("api/rest_v1"))
            .map_err(|e| SourceError::request(ContentSourceType::Wikipedia, e))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::request(ContentSourceType::Wikipedia, "base URL cannot hold a path"))?
            .extend(segments);
        Ok(url)
    }

    /// Summary of one article; `None` for missing and disambiguation pages.
    pub async fn article_summary(&self, title: &str, niche: Niche) -> SourceResult<Option<RawContent>> {
        let page = title.replace(' ', "_");
        let url = self.rest_url(&["page", "summary", &page])?;

        self.limiter.acquire().await;
        let summary: Summary =
            match get_json(&self.client, ContentSourceType::Wikipedia, url.as_str(), &[]).await {
                Ok(summary) => summary,
                Err(SourceError::Http { status: 404, .. }) => return Ok(None),
                Err(e) => return Err(e),
            };

        if summary.kind == "disambiguation" {
            debug!(title, "Skipping disambiguation page");
            return Ok(None);
        }
        Ok(Some(summary_to_raw_content(summary, title, niche, ARTICLE_SCORE)))
    }

    async fn featured_article(&self, niche: Niche) -> SourceResult<Option<RawContent>> {
        let today = Utc::now().date_naive();
        let url = self.rest_url(&[
            "feed",
            "featured",
            &today.format("%Y").to_string(),
            &today.format("%m").to_string(),
            &today.format("%d").to_string(),
        ])?;

        self.limiter.acquire().await;
        let feed: FeaturedFeed = get_json(&self.client, ContentSourceType::Wikipedia, url.as_str(), &[]).await?;
        Ok(feed
            .tfa
            .map(|summary| summary_to_raw_content(summary, "", niche, FEATURED_SCORE)))
    }
}

fn summary_to_raw_content(summary: Summary, fallback_title: &str, niche: Niche, score: f64) -> RawContent {
    let title = if summary.title.is_empty() {
        fallback_title.to_string()
    } else {
        summary.title
    };
    let source_url = summary
        .content_urls
        .and_then(|urls| urls.desktop)
        .map(|desktop| desktop.page)
        .unwrap_or_default();

    let mut item = RawContent::new(
        title,
        clean_wikipedia_text(&summary.extract),
        ContentSourceType::Wikipedia,
        source_url,
    )
    .with_score(score);
    item.source_id = summary.pageid.map(|id| id.to_string()).unwrap_or_default();
    item.metadata.insert("niche".into(), json!(niche.as_str()));
    item.metadata
        .insert("description".into(), json!(summary.description.unwrap_or_default()));
    item
}

#[async_trait]
impl ContentSource for WikipediaSource {
    fn source_type(&self) -> ContentSourceType {
        ContentSourceType::Wikipedia
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            supports_search: true,
            supports_trending: true,
            requires_api_key: false,
            rate_limit_per_minute: self.settings.requests_per_minute,
            max_results_per_request: 50,
        }
    }

    fn supports_niche(&self, niche: Niche) -> bool {
        !niche_search_terms(niche).is_empty()
    }

    async fn fetch_content(
        &self,
        niche: Niche,
        query: Option<&str>,
        limit: usize,
    ) -> SourceResult<Vec<RawContent>> {
        info!(niche = %niche, query, limit, "Fetching Wikipedia content");

        let terms: Vec<&str> = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => vec![q],
            None if niche_search_terms(niche).is_empty() => vec![niche.display_name()],
            None => niche_search_terms(niche).to_vec(),
        };
        let per_term = (limit / terms.len() + 1).max(1);
        let mut items: Vec<RawContent> = Vec::new();

        'terms: for term in terms {
            let titles = match self.search(term, per_term).await {
                Ok(titles) => titles,
                Err(e) => {
                    warn!(term, error = %e, "Wikipedia search failed");
                    continue;
                }
            };

            for title in titles {
                match self.article_summary(&title, niche).await {
                    Ok(Some(item)) if item.has_sufficient_content(self.min_words) => {
                        items.push(item);
                        if items.len() >= limit {
                            break 'terms;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!(title, error = %e, "Wikipedia summary failed"),
                }
            }
        }

        info!(niche = %niche, count = items.len(), "Wikipedia fetch complete");
        Ok(items)
    }

    async fn fetch_trending(&self, niche: Niche, limit: usize) -> SourceResult<Vec<RawContent>> {
        let mut items = Vec::new();
        match self.featured_article(niche).await {
            Ok(Some(featured)) => items.push(featured),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Featured article unavailable"),
        }

        let remaining = limit.saturating_sub(items.len());
        if remaining > 0 {
            let first_term = niche_search_terms(niche)
                .first()
                .copied()
                .unwrap_or_else(|| niche.display_name());
            items.extend(self.fetch_content(niche, Some(first_term), remaining).await?);
        }
        items.truncate(limit);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summary(title: &str, extract: &str, kind: &str) -> serde_json::Value {
        json!({
            "type": kind,
            "title": title,
            "extract": extract,
            "pageid": 42,
            "description": "a thing",
            "content_urls": { "desktop": { "page": format!("https://en.wikipedia.org/wiki/{}", title) } }
        })
    }

    #[test]
    fn test_clean_wikipedia_text() {
        assert_eq!(
            clean_wikipedia_text("Rome[1] was  founded[citation needed] long ago."),
            "Rome was founded long ago."
        );
    }

    #[test]
    fn test_supported_niches() {
        let source = WikipediaSource::new(SourceSettings::new(DEFAULT_BASE_URL, 100)).unwrap();
        assert!(source.supports_niche(Niche::History));
        assert!(!source.supports_niche(Niche::ScaryStories));
    }

    #[tokio::test]
    async fn test_query_search_skips_disambiguation_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("srsearch", "roman empire"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "search": [
                    { "title": "Roman Empire" },
                    { "title": "Rome" },
                    { "title": "Gone Page" }
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Roman_Empire"))
            .respond_with(ResponseTemplate::new(200).set_body_json(summary(
                "Roman Empire",
                "The Roman Empire[2] ruled the Mediterranean world for centuries.",
                "standard",
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Rome"))
            .respond_with(ResponseTemplate::new(200).set_body_json(summary(
                "Rome",
                "Rome may refer to many places.",
                "disambiguation",
            )))
            .mount(&server)
            .await;

        let source = WikipediaSource::new(SourceSettings::new(server.uri(), 6000))
            .unwrap()
            .with_min_words(5);
        let items = source
            .fetch_content(Niche::History, Some("roman empire"), 5)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.title, "Roman Empire");
        assert_eq!(item.content, "The Roman Empire ruled the Mediterranean world for centuries.");
        assert_eq!(item.score, 75.0);
        assert_eq!(item.source_id, "42");
        assert_eq!(item.source_url, "https://en.wikipedia.org/wiki/Roman Empire");
    }

    #[tokio::test]
    async fn test_short_extracts_are_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "search": [ { "title": "Stub" } ] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Stub"))
            .respond_with(ResponseTemplate::new(200).set_body_json(summary("Stub", "Too short.", "standard")))
            .mount(&server)
            .await;

        let source = WikipediaSource::new(SourceSettings::new(server.uri(), 6000)).unwrap();
        let items = source.fetch_content(Niche::Philosophy, None, 3).await.unwrap();
        assert!(items.is_empty());
    }
}
