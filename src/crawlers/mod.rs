pub mod company;
pub mod search;

use crate::filter::KeywordFilter;
use crate::results::{PostRecord, ResultTable, SourceDescriptor};
use std::time::Duration;
use thiserror::Error;

/// Failures while collecting from one source or one post
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    #[error("could not start a WebDriver session: {0}")]
    Connect(String),

    #[error("login failed: {0}")]
    Login(String),

    #[error("timed out after {waited:?} waiting for posts on {label}")]
    Timeout { label: String, waited: Duration },

    #[error("search request failed: {0}")]
    Search(#[from] search::SearchError),

    #[error("{collector} cannot collect from {label}")]
    Unsupported {
        collector: &'static str,
        label: String,
    },

    #[error("malformed post: {0}")]
    Malformed(String),
}

/// Random delay drawn uniformly from `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingPolicy {
    pub min: Duration,
    pub max: Duration,
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

impl PacingPolicy {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Out-of-range seconds saturate; NaN and negatives become zero
    pub fn from_secs_f64(min: f64, max: f64) -> Self {
        Self::new(secs_to_duration(min), secs_to_duration(max))
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    /// Zero-delay policy
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        self.min + (self.max - self.min).mul_f64(fastrand::f64())
    }

    /// Sleep for one sampled delay
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            ::log::trace!("Pausing for {:.1}s", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}

/// All pacing knobs of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub between_sources: PacingPolicy,
    pub after_navigation: PacingPolicy,
    pub between_scrolls: PacingPolicy,
    pub between_keystrokes: PacingPolicy,
    pub after_login: PacingPolicy,
    pub scroll_count: usize,
}

impl Pacing {
    /// No delays at all; scrolling still happens `scroll_count` times
    pub fn none(scroll_count: usize) -> Self {
        Self {
            between_sources: PacingPolicy::none(),
            after_navigation: PacingPolicy::none(),
            between_scrolls: PacingPolicy::none(),
            between_keystrokes: PacingPolicy::none(),
            after_login: PacingPolicy::none(),
            scroll_count,
        }
    }
}

/// A platform-specific source of posts
#[allow(async_fn_in_trait)]
pub trait Collector {
    /// Handle for one visible post
    type Post;

    /// Navigate to a source and return every post currently visible there
    async fn open_source(
        &mut self,
        source: &SourceDescriptor,
    ) -> Result<Vec<Self::Post>, CollectError>;

    /// Turn one post handle into a record
    fn extract(&self, post: &Self::Post) -> Result<PostRecord, CollectError>;
}

/// Records with empty text are always dropped; otherwise the filter decides
fn passes(filter: Option<&KeywordFilter>, text: &str) -> bool {
    match filter {
        Some(filter) => filter.is_relevant(text),
        None => !text.trim().is_empty(),
    }
}

/// Collects relevant, tagged records from a single source
///
/// Source-level failures yield zero records and per-post failures skip the
/// post; neither is returned to the caller.
pub async fn collect_source<C: Collector>(
    collector: &mut C,
    source: &SourceDescriptor,
    filter: Option<&KeywordFilter>,
) -> Vec<PostRecord> {
    ::log::info!("Collecting from: {}", source.label());

    let posts = match collector.open_source(source).await {
        Ok(posts) => posts,
        Err(e) => {
            ::log::warn!("No posts collected for {}: {}", source.label(), e);
            return Vec::new();
        }
    };

    if posts.is_empty() {
        ::log::warn!("No posts found for {}", source.label());
        return Vec::new();
    }

    let mut kept = Vec::new();
    for (index, post) in posts.iter().enumerate() {
        let mut record = match collector.extract(post) {
            Ok(record) => record,
            Err(e) => {
                ::log::error!(
                    "Error processing post {} from {}: {}",
                    index,
                    source.label(),
                    e
                );
                continue;
            }
        };

        if !passes(filter, &record.text) {
            ::log::trace!("Dropping irrelevant post {} from {}", index, source.label());
            continue;
        }
        if let Some(filter) = filter {
            ::log::debug!(
                "Post {} matched {:?}",
                index,
                filter.matched_keywords(&record.text)
            );
        }

        record.tag(source);
        kept.push(record);
    }

    ::log::info!(
        "Collected {} relevant posts from {} ({} visible)",
        kept.len(),
        source.label(),
        posts.len()
    );
    kept
}

/// Runs the collection loop over every source in order
pub async fn collect_all<C: Collector>(
    collector: &mut C,
    sources: &[SourceDescriptor],
    filter: Option<&KeywordFilter>,
    between_sources: &PacingPolicy,
) -> ResultTable {
    let mut table = ResultTable::new();

    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            between_sources.pause().await;
        }
        let records = collect_source(collector, source, filter).await;
        table.extend(records);
    }

    ::log::info!(
        "Collection complete - {} records from {} sources",
        table.len(),
        sources.len()
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::PostFragment;
    use crate::parsers::{FieldExtractor, SelectorTable};
    use std::collections::HashMap;

    /// Serves canned fragments per source; unknown sources fail like a navigation timeout
    struct FakeCollector {
        pages: HashMap<String, Vec<Option<PostFragment>>>,
        extractor: FieldExtractor,
        opened: Vec<String>,
    }

    impl FakeCollector {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                extractor: FieldExtractor::new(&SelectorTable::default()).unwrap(),
                opened: Vec::new(),
            }
        }

        fn with_page(mut self, label: &str, posts: Vec<Option<PostFragment>>) -> Self {
            self.pages.insert(label.to_string(), posts);
            self
        }
    }

    impl Collector for FakeCollector {
        // `None` stands for a post whose handle went stale
        type Post = Option<PostFragment>;

        async fn open_source(
            &mut self,
            source: &SourceDescriptor,
        ) -> Result<Vec<Self::Post>, CollectError> {
            self.opened.push(source.label().to_string());
            self.pages
                .get(source.label())
                .cloned()
                .ok_or_else(|| CollectError::Timeout {
                    label: source.label().to_string(),
                    waited: Duration::from_secs(10),
                })
        }

        fn extract(&self, post: &Self::Post) -> Result<PostRecord, CollectError> {
            match post {
                Some(fragment) => Ok(self.extractor.extract(&fragment.document())),
                None => Err(CollectError::Malformed("stale element".to_string())),
            }
        }
    }

    fn post(text: &str, likes: &str) -> Option<PostFragment> {
        Some(PostFragment::new(format!(
            r#"<div class="feed-shared-update-v2">
                 <div class="feed-shared-update-v2__description"><span class="break-words">{text}</span></div>
                 <button class="social-details-social-counts__reactions-count">{likes}</button>
               </div>"#
        )))
    }

    fn company(handle: &str) -> SourceDescriptor {
        SourceDescriptor::Company {
            handle: handle.to_string(),
            name: handle.to_uppercase(),
            sector: "Technology".to_string(),
        }
    }

    #[tokio::test]
    async fn test_filters_and_tags_records() {
        let mut collector = FakeCollector::new().with_page(
            "safaricom",
            vec![
                post("AI in Kenya", "5"),
                post("AI in Kenya", "9"),
                post("weather today", "2"),
            ],
        );
        let filter = KeywordFilter::new(["AI"]);

        let table = collect_all(
            &mut collector,
            &[company("safaricom")],
            Some(&filter),
            &PacingPolicy::none(),
        )
        .await;

        assert_eq!(table.len(), 2);
        let first = &table.records()[0];
        assert_eq!(first.likes, 5);
        assert_eq!(first.company.as_deref(), Some("SAFARICOM"));
        assert_eq!(first.company_handle.as_deref(), Some("safaricom"));
        assert_eq!(first.sector.as_deref(), Some("Technology"));
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort_run() {
        let mut collector = FakeCollector::new()
            .with_page("kcb-bank-kenya", vec![post("Digital transformation at KCB", "3")]);
        let filter = KeywordFilter::default();

        let sources = [company("missing"), company("kcb-bank-kenya")];
        let table = collect_all(&mut collector, &sources, Some(&filter), &PacingPolicy::none()).await;

        assert_eq!(collector.opened, vec!["missing", "kcb-bank-kenya"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].company_handle.as_deref(), Some("kcb-bank-kenya"));
    }

    #[tokio::test]
    async fn test_failed_post_is_skipped() {
        let mut collector = FakeCollector::new().with_page(
            "ushahidi",
            vec![None, post("Open source AI for crisis mapping", ""), None],
        );
        let filter = KeywordFilter::default();

        let records = collect_source(&mut collector, &company("ushahidi"), Some(&filter)).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].likes, 0);
    }

    #[tokio::test]
    async fn test_without_filter_only_empty_text_is_dropped() {
        let mut collector = FakeCollector::new().with_page(
            "AI Kenya",
            vec![post("weather today", "1"), post("", "4")],
        );
        let source = SourceDescriptor::Query("AI Kenya".to_string());

        let records = collect_source(&mut collector, &source, None).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "weather today");
        assert_eq!(records[0].query.as_deref(), Some("AI Kenya"));
    }

    #[tokio::test]
    async fn test_empty_source_yields_nothing() {
        let mut collector = FakeCollector::new().with_page("sendy", Vec::new());
        let records = collect_source(&mut collector, &company("sendy"), None).await;
        assert!(records.is_empty());
    }

    #[test]
    fn test_pacing_sample_within_range() {
        let policy = PacingPolicy::from_secs_f64(2.0, 4.0);
        for _ in 0..100 {
            let delay = policy.sample();
            assert!(delay >= Duration::from_secs(2) && delay <= Duration::from_secs(4));
        }
    }

    #[test]
    fn test_pacing_normalizes_reversed_bounds() {
        let policy = PacingPolicy::from_secs_f64(30.0, 20.0);
        assert_eq!(policy.min, Duration::from_secs(20));
        assert_eq!(policy.max, Duration::from_secs(30));
        assert_eq!(PacingPolicy::none().sample(), Duration::ZERO);
    }

    #[test]
    fn test_pacing_out_of_range_seconds_saturate() {
        let policy = PacingPolicy::from_secs_f64(1e20, f64::INFINITY);
        assert_eq!(policy.min, Duration::MAX);
        assert_eq!(policy.max, Duration::MAX);

        let policy = PacingPolicy::from_secs_f64(f64::NAN, -3.0);
        assert_eq!(policy.sample(), Duration::ZERO);
    }
}
