//! Open Library subjects, search and work descriptions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use reel_models::{ContentSourceType, Niche, RawContent};

use crate::error::{SourceError, SourceResult};
use crate::http::{build_client, get_json};
use crate::rate_limit::RateLimiter;
use crate::source::{ContentSource, SourceCapabilities, SourceSettings};

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
const DESCRIBED_SCORE: f64 = 70.0;
const METADATA_SCORE: f64 = 60.0;
/// Shorter metadata summaries say nothing useful.
const MIN_SUMMARY_CHARS: usize = 50;
const SEARCH_FIELDS: &str = "key,title,author_name,first_publish_year,subject,cover_i";

/// Library subjects browsed per niche. Niches without an entry are not
/// served by Open Library.
pub fn niche_subjects(niche: Niche) -> &'static [&'static str] {
    match niche {
        Niche::BookSummaries => &["bestseller", "popular_science", "self_help", "business"],
        Niche::Philosophy => &["philosophy", "ethics", "stoicism", "existentialism", "metaphysics"],
        Niche::PsychologyFacts => &["psychology", "cognitive_science", "behavioral_science", "neuroscience"],
        Niche::History => &["history", "world_history", "biography", "historical_events"],
        Niche::Motivation => &["self_improvement", "success", "motivation", "leadership"],
        Niche::Finance => &["finance", "investing", "economics", "money"],
        _ => &[],
    }
}

/// A book as listed by `/subjects/*.json` or `/search.json`.
#[derive(Debug, Deserialize)]
struct Book {
    #[serde(default)]
    key: String,
    #[serde(default)]
    title: String,
    /// Search results.
    #[serde(default)]
    author_name: Vec<String>,
    /// Subject listings.
    #[serde(default)]
    authors: Vec<ListedAuthor>,
    #[serde(default)]
    first_publish_year: Option<i32>,
    #[serde(default)]
    subject: Vec<String>,
    #[serde(default, alias = "cover_id")]
    cover_i: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListedAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SubjectListing {
    #[serde(default)]
    works: Vec<Book>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    docs: Vec<Book>,
}

/// Descriptions come either as a bare string or as `{"type", "value"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    Plain(String),
    Typed { value: String },
}

impl Description {
    fn into_text(self) -> String {
        match self {
            Description::Plain(text) | Description::Typed { value: text } => text.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<Description>,
    #[serde(default)]
    authors: Vec<WorkAuthor>,
    #[serde(default)]
    subjects: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WorkAuthor {
    author: AuthorKey,
}

#[derive(Debug, Deserialize)]
struct AuthorKey {
    key: String,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: Option<String>,
}

/// `/works/OL1W` for both listing formats.
fn work_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else if raw.starts_with("/works/") {
        Some(raw.to_string())
    } else {
        Some(format!("/works/{}", raw.trim_start_matches('/')))
    }
}

/// One-paragraph summary built from listing metadata only.
fn metadata_summary(book: &Book, authors: &[String]) -> String {
    let mut parts = vec![format!("'{}' is a book", book.title)];
    if !authors.is_empty() {
        parts.push(format!("by {}", authors.join(", ")));
    }
    if let Some(year) = book.first_publish_year {
        parts.push(format!("first published in {}", year));
    }
    let mut summary = parts.join(" ");
    if !book.subject.is_empty() {
        let topics: Vec<_> = book.subject.iter().take(5).map(String::as_str).collect();
        summary.push_str(&format!(". Topics covered include: {}", topics.join(", ")));
    }
    summary.push('.');
    summary
}

pub struct OpenLibrarySource {
    settings: SourceSettings,
    client: Client,
    limiter: Arc<RateLimiter>,
}

impl OpenLibrarySource {
    pub fn new(settings: SourceSettings) -> SourceResult<Self> {
        let client = build_client(ContentSourceType::OpenLibrary, &settings)?;
        let limiter = RateLimiter::per_minute("open_library", settings.requests_per_minute).shared();
        Ok(Self {
            settings,
            client,
            limiter,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> SourceResult<T> {
        self.limiter.acquire().await;
        get_json(&self.client, ContentSourceType::OpenLibrary, &self.settings.url(path), query).await
    }

    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<Book>> {
        let results: SearchResults = self
            .get(
                "search.json",
                &[
                    ("q", query.to_string()),
                    ("limit", limit.to_string()),
                    ("fields", SEARCH_FIELDS.to_string()),
                ],
            )
            .await?;
        Ok(results.docs)
    }

    /// Books listed under several subjects. A failing subject is skipped.
    async fn browse(&self, subjects: &[&str], limit: usize) -> Vec<Book> {
        let per_subject = (limit / subjects.len().max(1) + 1).max(1);
        let mut books = Vec::new();
        for subject in subjects {
            let path = format!("subjects/{}.json", subject);
            match self
                .get::<SubjectListing>(&path, &[("limit", per_subject.to_string())])
                .await
            {
                Ok(listing) => books.extend(listing.works),
                Err(e) => debug!(subject, error = %e, "Skipping Open Library subject"),
            }
            if books.len() >= limit {
                break;
            }
        }
        books.truncate(limit);
        books
    }

    /// Work record for a key; `None` when the work does not exist.
    async fn work(&self, key: &str) -> SourceResult<Option<Work>> {
        match self.get::<Work>(&format!("{}.json", key), &[]).await {
            Ok(work) => Ok(Some(work)),
            Err(SourceError::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn author_name(&self, key: &str) -> Option<String> {
        match self.get::<Author>(&format!("{}.json", key), &[]).await {
            Ok(author) => author.name.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                debug!(key, error = %e, "Author lookup failed");
                None
            }
        }
    }

    /// Prefer the work's own description; fall back to a summary of the
    /// listing metadata.
    async fn to_raw_content(&self, book: Book, niche: Niche) -> Option<RawContent> {
        let key = work_key(&book.key);
        let mut authors: Vec<String> = if book.author_name.is_empty() {
            book.authors
                .iter()
                .map(|a| a.name.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect()
        } else {
            book.author_name.clone()
        };

        let work = match &key {
            Some(key) => match self.work(key).await {
                Ok(work) => work,
                Err(e) => {
                    debug!(key = %key, error = %e, "Work lookup failed; using listing metadata");
                    None
                }
            },
            None => None,
        };

        let (title, content, score, subjects) = match work {
            Some(work) if work.description.is_some() => {
                if authors.is_empty() {
                    for author in &work.authors {
                        if let Some(name) = self.author_name(&author.author.key).await {
                            authors.push(name);
                        }
                    }
                }
                let description = work.description.map(Description::into_text).unwrap_or_default();
                let title = work.title.unwrap_or_else(|| book.title.clone());
                (title, description, DESCRIBED_SCORE, work.subjects)
            }
            _ => {
                let summary = metadata_summary(&book, &authors);
                (book.title.clone(), summary, METADATA_SCORE, book.subject.clone())
            }
        };

        if title.trim().is_empty() || content.chars().count() < MIN_SUMMARY_CHARS {
            return None;
        }

        let source_url = key
            .as_deref()
            .map(|k| self.settings.url(k))
            .unwrap_or_default();
        let mut item = RawContent::new(title, content, ContentSourceType::OpenLibrary, source_url)
            .with_score(score);
        item.source_id = key.unwrap_or_else(|| book.key.clone());
        item.author = (!authors.is_empty()).then(|| authors.join(", "));
        item.published_at = book
            .first_publish_year
            .and_then(|year| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single());
        item.metadata.insert("niche".into(), json!(niche.as_str()));
        item.metadata
            .insert("subjects".into(), json!(subjects.into_iter().take(5).collect::<Vec<_>>()));
        item.metadata
            .insert("first_publish_year".into(), json!(book.first_publish_year));
        if let Some(cover) = book.cover_i {
            item.metadata.insert("cover_id".into(), json!(cover));
        }
        Some(item)
    }

    async fn convert_all(&self, books: Vec<Book>, niche: Niche, limit: usize) -> Vec<RawContent> {
        let mut items = Vec::new();
        for book in books {
            if let Some(item) = self.to_raw_content(book, niche).await {
                items.push(item);
                if items.len() >= limit {
                    break;
                }
            }
        }
        items
    }
}

#[async_trait]
impl ContentSource for OpenLibrarySource {
    fn source_type(&self) -> ContentSourceType {
        ContentSourceType::OpenLibrary
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            supports_search: true,
            supports_trending: true,
            requires_api_key: false,
            rate_limit_per_minute: self.settings.requests_per_minute,
            max_results_per_request: 100,
        }
    }

    fn supports_niche(&self, niche: Niche) -> bool {
        !niche_subjects(niche).is_empty()
    }

    async fn fetch_content(
        &self,
        niche: Niche,
        query: Option<&str>,
        limit: usize,
    ) -> SourceResult<Vec<RawContent>> {
        info!(niche = %niche, query = ?query, limit, "Fetching Open Library content");

        let books = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => self.search(query, limit).await?,
            None => self.browse(niche_subjects(niche), limit).await,
        };
        let items = self.convert_all(books, niche, limit).await;

        info!(niche = %niche, count = items.len(), "Open Library fetch complete");
        Ok(items)
    }

    /// Only the first two subjects of a niche.
    async fn fetch_trending(&self, niche: Niche, limit: usize) -> SourceResult<Vec<RawContent>> {
        let subjects = niche_subjects(niche);
        let books = self.browse(&subjects[..subjects.len().min(2)], limit).await;
        Ok(self.convert_all(books, niche, limit).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn long_description(topic: &str) -> String {
        format!("{} explores how habits form and why small changes compound over many years.", topic)
    }

    fn source(server: &MockServer) -> OpenLibrarySource {
        OpenLibrarySource::new(SourceSettings::new(server.uri(), 6000)).unwrap()
    }

    #[test]
    fn test_work_key_normalization() {
        assert_eq!(work_key("/works/OL1W").as_deref(), Some("/works/OL1W"));
        assert_eq!(work_key("OL2W").as_deref(), Some("/works/OL2W"));
        assert_eq!(work_key("  "), None);
    }

    #[test]
    fn test_supported_niches() {
        let source = OpenLibrarySource::new(SourceSettings::new(DEFAULT_BASE_URL, 100)).unwrap();
        assert!(source.supports_niche(Niche::BookSummaries));
        assert!(source.supports_niche(Niche::Philosophy));
        assert!(!source.supports_niche(Niche::ScaryStories));
        assert!(source.capabilities().supports_trending);
    }

    #[tokio::test]
    async fn test_subject_listing_uses_descriptions_and_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subjects/philosophy.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "works": [
                    {"key": "/works/OL1W", "title": "Meditations", "authors": [{"key": "/authors/OL1A", "name": "Marcus Aurelius"}], "first_publish_year": 180},
                    {"key": "/works/OL2W", "title": "Letters", "first_publish_year": 65, "subject": ["Stoicism", "Ethics"]}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/works/OL1W.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Meditations",
                "description": {"type": "/type/text", "value": long_description("Meditations")},
                "subjects": ["Stoicism"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/works/OL2W.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let items = source(&server)
            .fetch_trending(Niche::Philosophy, 5)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Meditations");
        assert_eq!(items[0].content, long_description("Meditations"));
        assert_eq!(items[0].author.as_deref(), Some("Marcus Aurelius"));
        assert_eq!(items[0].source_url, format!("{}/works/OL1W", server.uri()));
        assert_eq!(items[0].score, DESCRIBED_SCORE);

        assert_eq!(items[1].score, METADATA_SCORE);
        assert_eq!(
            items[1].content,
            "'Letters' is a book first published in 65. Topics covered include: Stoicism, Ethics."
        );
    }

    #[tokio::test]
    async fn test_query_searches_and_resolves_authors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "atomic habits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [{"key": "/works/OL9W", "title": "Atomic Habits", "first_publish_year": 2018, "cover_i": 42}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/works/OL9W.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Atomic Habits",
                "description": long_description("Atomic Habits"),
                "authors": [{"author": {"key": "/authors/OL7A"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/authors/OL7A.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "James Clear"})))
            .mount(&server)
            .await;

        let items = source(&server)
            .fetch_content(Niche::BookSummaries, Some("atomic habits"), 3)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].author.as_deref(), Some("James Clear"));
        assert_eq!(items[0].source_id, "/works/OL9W");
        assert_eq!(items[0].metadata["cover_id"], json!(42));
        assert_eq!(
            items[0].published_at.map(|d| d.format("%Y").to_string()).as_deref(),
            Some("2018")
        );
    }

    #[tokio::test]
    async fn test_failing_subjects_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subjects/finance.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subjects/investing.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "works": [{"key": "OL5W", "title": "The Intelligent Investor", "authors": [{"name": "Benjamin Graham"}], "first_publish_year": 1949}]
            })))
            .mount(&server)
            .await;

        let items = source(&server).fetch_trending(Niche::Finance, 2).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_id, "/works/OL5W");
        assert!(items[0].content.starts_with("'The Intelligent Investor' is a book by Benjamin Graham"));
    }
}
