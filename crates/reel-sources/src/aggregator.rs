//! Multi-source fetch with deduplication and ranking.
//!
//! Sources are chosen per niche from a static priority table, queried
//! concurrently or one after another, and merged. A failing source only
//! loses its own contribution.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use reel_models::{ContentSourceType, Niche, RawContent};

use crate::error::{SourceError, SourceResult};
use crate::source::ContentSource;

/// Preferred sources per niche, highest priority first.
///
/// News and YouTube have no adapter; entries for unregistered sources are
/// passed over, and a niche left with none uses the configured fallback.
pub fn source_priority(niche: Niche) -> &'static [ContentSourceType] {
    use ContentSourceType::*;
    match niche {
        Niche::ScaryStories | Niche::RelationshipAdvice => &[Reddit],
        Niche::TrueCrime => &[Reddit, News, Wikipedia],
        Niche::ConspiracyMysteries | Niche::UnsolvedMysteries => &[Reddit, Wikipedia],
        Niche::History
        | Niche::PsychologyFacts
        | Niche::MythologyFolklore
        | Niche::GeographyFacts
        | Niche::AnimalFacts => &[Wikipedia, Reddit],
        Niche::SpaceAstronomy => &[Wikipedia, Reddit, News],
        Niche::Philosophy => &[Wikipedia, Reddit, OpenLibrary],
        Niche::TechGadgets => &[HackerNews, Reddit, Youtube, News],
        Niche::AiFutureTech => &[HackerNews, News, Reddit, Youtube],
        Niche::Finance => &[Reddit, News, Youtube],
        Niche::Luxury => &[Reddit, Youtube, News],
        Niche::CelebrityNetWorth => &[News, Reddit, Youtube],
        Niche::BookSummaries => &[OpenLibrary, Reddit],
        Niche::HealthWellness => &[Reddit, News],
        Niche::Motivation
        | Niche::LifeHacks
        | Niche::SurvivalTips
        | Niche::SleepRelaxation
        | Niche::NetflixRecommendations
        | Niche::MockumentaryHowmade => &[Reddit, Youtube],
    }
}

/// Keep the first item per normalized title, then stable-sort by score and
/// word count (both descending) and truncate to `limit`.
pub fn dedup_and_rank(items: Vec<RawContent>, limit: usize) -> Vec<RawContent> {
    let mut seen = HashSet::new();
    let mut unique: Vec<RawContent> = items
        .into_iter()
        .filter(|item| seen.insert(item.normalized_title()))
        .collect();

    unique.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.word_count().cmp(&a.word_count()))
    });
    unique.truncate(limit);
    unique
}

/// Number of items requested from each source; slightly more than an even
/// share to absorb filtering and duplicates.
pub fn items_per_source(limit: usize, source_count: usize) -> usize {
    (limit / source_count.max(1) + 2).max(1)
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Query selected sources concurrently.
    pub parallel: bool,
    /// Used when no prioritized source qualifies for a niche.
    pub fallback: ContentSourceType,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            fallback: ContentSourceType::Reddit,
        }
    }
}

#[derive(Clone, Copy)]
enum FetchMode<'a> {
    Content(Option<&'a str>),
    Trending,
}

pub struct ContentAggregator {
    sources: BTreeMap<ContentSourceType, Arc<dyn ContentSource>>,
    config: AggregatorConfig,
}

impl ContentAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            sources: BTreeMap::new(),
            config,
        }
    }

    /// Register a source, replacing any previous source of the same type.
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        self.sources.insert(source.source_type(), source);
    }

    pub fn with_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.register(source);
        self
    }

    pub fn source(&self, source_type: ContentSourceType) -> SourceResult<&Arc<dyn ContentSource>> {
        self.sources
            .get(&source_type)
            .ok_or(SourceError::NotRegistered(source_type))
    }

    /// Registered sources that report themselves available.
    pub fn available_sources(&self) -> Vec<ContentSourceType> {
        self.sources
            .iter()
            .filter(|(_, source)| source.is_available())
            .map(|(source_type, _)| *source_type)
            .collect()
    }

    /// Prioritized sources usable for a niche, or the fallback source.
    pub fn sources_for_niche(&self, niche: Niche) -> Vec<ContentSourceType> {
        let selected: Vec<ContentSourceType> = source_priority(niche)
            .iter()
            .copied()
            .filter(|source_type| {
                self.sources
                    .get(source_type)
                    .is_some_and(|s| s.is_available() && s.supports_niche(niche))
            })
            .collect();

        if !selected.is_empty() {
            return selected;
        }

        match self.sources.get(&self.config.fallback) {
            Some(source) if source.is_available() => vec![self.config.fallback],
            _ => Vec::new(),
        }
    }

    fn resolve(&self, niche: Niche, requested: Option<&[ContentSourceType]>) -> SourceResult<Vec<ContentSourceType>> {
        let selected = match requested {
            Some(list) => list
                .iter()
                .copied()
                .filter(|source_type| match self.sources.get(source_type) {
                    Some(source) => source.is_available(),
                    None => {
                        warn!(source = %source_type, "Requested source is not registered");
                        false
                    }
                })
                .collect(),
            None => self.sources_for_niche(niche),
        };

        if selected.is_empty() {
            return Err(SourceError::NoSources(niche));
        }
        Ok(selected)
    }

    async fn fetch_one(
        &self,
        source_type: ContentSourceType,
        niche: Niche,
        mode: FetchMode<'_>,
        limit: usize,
    ) -> Vec<RawContent> {
        let Some(source) = self.sources.get(&source_type) else {
            return Vec::new();
        };

        let result = match mode {
            FetchMode::Content(query) => source.fetch_content(niche, query, limit).await,
            FetchMode::Trending => source.fetch_trending(niche, limit).await,
        };

        match result {
            Ok(items) => {
                debug!(source = %source_type, count = items.len(), "Source fetch complete");
                items
            }
            Err(e) => {
                warn!(source = %source_type, error = %e, "Source fetch failed");
                metrics::counter!("reel_source_failures_total", "source" => source_type.as_str())
                    .increment(1);
                Vec::new()
            }
        }
    }

    async fn gather(
        &self,
        niche: Niche,
        sources: &[ContentSourceType],
        mode: FetchMode<'_>,
        per_source: usize,
        parallel: bool,
    ) -> Vec<RawContent> {
        if parallel && sources.len() > 1 {
            join_all(
                sources
                    .iter()
                    .map(|source_type| self.fetch_one(*source_type, niche, mode, per_source)),
            )
            .await
            .into_iter()
            .flatten()
            .collect()
        } else {
            let mut all = Vec::new();
            for source_type in sources {
                all.extend(self.fetch_one(*source_type, niche, mode, per_source).await);
            }
            all
        }
    }

    /// Fetch, deduplicate and rank content for a niche.
    ///
    /// `sources` overrides the niche's priority table. Individual source
    /// failures are logged and skipped; only an empty selection is an error.
    pub async fn fetch(
        &self,
        niche: Niche,
        query: Option<&str>,
        limit: usize,
        sources: Option<&[ContentSourceType]>,
    ) -> SourceResult<Vec<RawContent>> {
        let selected = self.resolve(niche, sources)?;
        let per_source = items_per_source(limit, selected.len());

        info!(
            niche = %niche,
            sources = ?selected,
            limit,
            per_source,
            "Fetching content"
        );

        let all = self
            .gather(niche, &selected, FetchMode::Content(query), per_source, self.config.parallel)
            .await;
        if all.is_empty() {
            warn!(niche = %niche, "No content fetched");
            return Ok(Vec::new());
        }

        let total = all.len();
        let ranked = dedup_and_rank(all, limit);
        info!(niche = %niche, total, returned = ranked.len(), "Content fetch complete");
        Ok(ranked)
    }

    /// Trending content across the niche's sources, fetched sequentially.
    pub async fn fetch_trending(
        &self,
        niche: Niche,
        limit: usize,
        sources: Option<&[ContentSourceType]>,
    ) -> SourceResult<Vec<RawContent>> {
        let selected = self.resolve(niche, sources)?;
        let per_source = items_per_source(limit, selected.len());
        let all = self
            .gather(niche, &selected, FetchMode::Trending, per_source, false)
            .await;
        Ok(dedup_and_rank(all, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceCapabilities;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeSource {
        kind: ContentSourceType,
        items: Vec<RawContent>,
        fail: bool,
        available: bool,
        niches: Option<Vec<Niche>>,
        delay: Duration,
        calls: AtomicUsize,
        limits: Mutex<Vec<usize>>,
    }

    impl FakeSource {
        fn new(kind: ContentSourceType, items: Vec<RawContent>) -> Self {
            Self {
                kind,
                items,
                fail: false,
                available: true,
                niches: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                limits: Mutex::new(Vec::new()),
            }
        }

        fn failing(kind: ContentSourceType) -> Self {
            Self {
                fail: true,
                ..Self::new(kind, Vec::new())
            }
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        fn source_type(&self) -> ContentSourceType {
            self.kind
        }

        fn capabilities(&self) -> SourceCapabilities {
            SourceCapabilities::default()
        }

        fn supports_niche(&self, niche: Niche) -> bool {
            self.niches.as_ref().map_or(true, |n| n.contains(&niche))
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn fetch_content(
            &self,
            _niche: Niche,
            _query: Option<&str>,
            limit: usize,
        ) -> SourceResult<Vec<RawContent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.limits.lock().unwrap().push(limit);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(SourceError::Http {
                    source_type: self.kind,
                    status: 503,
                });
            }
            Ok(self.items.iter().take(limit).cloned().collect())
        }
    }

    fn item(title: &str, score: f64, words: usize, kind: ContentSourceType) -> RawContent {
        RawContent::new(title, vec!["w"; words].join(" "), kind, format!("https://x/{}", title))
            .with_score(score)
    }

    #[test]
    fn test_dedup_and_rank() {
        let items = vec![
            item("Alpha!", 50.0, 10, ContentSourceType::Reddit),
            item("beta", 90.0, 10, ContentSourceType::Reddit),
            item("alpha", 99.0, 10, ContentSourceType::Wikipedia),
            item("Gamma", 70.0, 10, ContentSourceType::Wikipedia),
            item("BETA?", 10.0, 10, ContentSourceType::HackerNews),
        ];
        let ranked = dedup_and_rank(items, 10);

        let titles: Vec<&str> = ranked.iter().map(|i| i.title.as_str()).collect();
        // First occurrence wins, even when a later duplicate scores higher.
        assert_eq!(titles, vec!["beta", "Gamma", "Alpha!"]);
        assert_eq!(dedup_and_rank(ranked, 2).len(), 2);
    }

    #[test]
    fn test_rank_ties_break_on_word_count() {
        let items = vec![
            item("short", 80.0, 5, ContentSourceType::Reddit),
            item("long", 80.0, 50, ContentSourceType::Reddit),
            item("first", 80.0, 5, ContentSourceType::Reddit),
        ];
        let titles: Vec<String> = dedup_and_rank(items, 3).into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["long", "short", "first"]);
    }

    #[test]
    fn test_items_per_source() {
        assert_eq!(items_per_source(10, 2), 7);
        assert_eq!(items_per_source(1, 3), 2);
        assert_eq!(items_per_source(0, 0), 2);
    }

    #[test]
    fn test_sources_for_niche_follows_priority() {
        let mut hn = FakeSource::new(ContentSourceType::HackerNews, Vec::new());
        hn.niches = Some(vec![Niche::AiFutureTech]);
        let mut wiki = FakeSource::new(ContentSourceType::Wikipedia, Vec::new());
        wiki.available = false;

        let aggregator = ContentAggregator::new(AggregatorConfig::default())
            .with_source(Arc::new(FakeSource::new(ContentSourceType::Reddit, Vec::new())))
            .with_source(Arc::new(hn))
            .with_source(Arc::new(wiki));

        assert_eq!(
            aggregator.sources_for_niche(Niche::AiFutureTech),
            vec![ContentSourceType::HackerNews, ContentSourceType::Reddit]
        );
        // Wikipedia is first for history but unavailable.
        assert_eq!(aggregator.sources_for_niche(Niche::History), vec![ContentSourceType::Reddit]);
        assert_eq!(
            aggregator.available_sources(),
            vec![ContentSourceType::Reddit, ContentSourceType::HackerNews]
        );
    }

    #[test]
    fn test_fallback_source() {
        let mut reddit = FakeSource::new(ContentSourceType::Reddit, Vec::new());
        reddit.niches = Some(Vec::new());
        let aggregator = ContentAggregator::new(AggregatorConfig::default()).with_source(Arc::new(reddit));

        // Reddit declines the niche, but it is the fallback.
        assert_eq!(
            aggregator.sources_for_niche(Niche::BookSummaries),
            vec![ContentSourceType::Reddit]
        );

        let empty = ContentAggregator::new(AggregatorConfig::default());
        assert!(empty.sources_for_niche(Niche::BookSummaries).is_empty());
        assert!(matches!(
            empty.source(ContentSourceType::Reddit),
            Err(SourceError::NotRegistered(ContentSourceType::Reddit))
        ));
    }

    #[tokio::test]
    async fn test_no_sources_is_an_error() {
        let aggregator = ContentAggregator::new(AggregatorConfig::default());
        let err = aggregator.fetch(Niche::History, None, 5, None).await.unwrap_err();
        assert!(matches!(err, SourceError::NoSources(Niche::History)));
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let wiki = Arc::new(FakeSource::new(
            ContentSourceType::Wikipedia,
            vec![
                item("Rome", 75.0, 120, ContentSourceType::Wikipedia),
                item("Carthage", 75.0, 200, ContentSourceType::Wikipedia),
            ],
        ));
        let reddit = Arc::new(FakeSource::failing(ContentSourceType::Reddit));

        let aggregator = ContentAggregator::new(AggregatorConfig::default())
            .with_source(wiki.clone())
            .with_source(reddit.clone());

        let items = aggregator.fetch(Niche::History, None, 10, None).await.unwrap();
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Carthage", "Rome"]);
        assert_eq!(reddit.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*wiki.limits.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_explicit_sources_override_priority() {
        let reddit = Arc::new(FakeSource::new(
            ContentSourceType::Reddit,
            vec![item("Post", 40.0, 150, ContentSourceType::Reddit)],
        ));
        let wiki = Arc::new(FakeSource::new(ContentSourceType::Wikipedia, Vec::new()));
        let aggregator = ContentAggregator::new(AggregatorConfig::default())
            .with_source(reddit.clone())
            .with_source(wiki.clone());

        let items = aggregator
            .fetch(Niche::History, None, 3, Some(&[ContentSourceType::Reddit, ContentSourceType::News]))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(wiki.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_fetch_overlaps_sources() {
        let build = |parallel: bool| {
            let mut wiki = FakeSource::new(
                ContentSourceType::Wikipedia,
                vec![item("A", 1.0, 1, ContentSourceType::Wikipedia)],
            );
            wiki.delay = Duration::from_millis(100);
            let mut reddit = FakeSource::new(
                ContentSourceType::Reddit,
                vec![item("B", 2.0, 1, ContentSourceType::Reddit)],
            );
            reddit.delay = Duration::from_millis(100);
            ContentAggregator::new(AggregatorConfig {
                parallel,
                ..AggregatorConfig::default()
            })
            .with_source(Arc::new(wiki))
            .with_source(Arc::new(reddit))
        };

        let start = tokio::time::Instant::now();
        let items = build(true).fetch(Niche::History, None, 5, None).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(start.elapsed() < Duration::from_millis(150));

        let start = tokio::time::Instant::now();
        build(false).fetch(Niche::History, None, 5, None).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_trending_uses_default_delegation() {
        let reddit = Arc::new(FakeSource::new(
            ContentSourceType::Reddit,
            vec![item("Hot", 10.0, 3, ContentSourceType::Reddit)],
        ));
        let aggregator = ContentAggregator::new(AggregatorConfig::default()).with_source(reddit.clone());
        let items = aggregator.fetch_trending(Niche::Motivation, 1, None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(reddit.calls.load(Ordering::SeqCst), 1);
    }
}
