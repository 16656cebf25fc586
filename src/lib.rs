#![allow(clippy::too_many_arguments)]

// Re-export modules
pub mod config;
pub mod crawlers;
pub mod filter;
pub mod parsers;
pub mod persist;
pub mod results;
pub mod utils;
pub mod visuals;

// Re-export commonly used types for convenience
pub use config::{ConfigError, Credentials, PulseConfig};
pub use crawlers::CollectError;
pub use crawlers::search::SearchError;
pub use parsers::ExtractError;
pub use persist::PersistedRun;
pub use results::{PostRecord, SourceDescriptor};
pub use visuals::{RenderReport, VisualError};

use crawlers::company::CompanyCollector;
use crawlers::search::{SearchClient, SearchCollector};
use crawlers::{Pacing, PacingPolicy, collect_all};
use filter::KeywordFilter;
use parsers::FieldExtractor;
use persist::OutputNaming;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Setup failures that abort a run
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("selector error: {0}")]
    Extract(#[from] ExtractError),

    #[error("collection error: {0}")]
    Collect(#[from] CollectError),

    #[error("search API error: {0}")]
    Search(#[from] SearchError),

    #[error("visualization error: {0}")]
    Visual(#[from] VisualError),
}

/// Platforms that posts can be collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Company pages of the professional network, through a browser
    LinkedIn,
    /// Recent search of the microblogging API
    Twitter,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::LinkedIn => write!(f, "linkedin"),
            Platform::Twitter => write!(f, "twitter"),
        }
    }
}

impl Platform {
    pub fn naming(&self) -> OutputNaming {
        match self {
            Platform::LinkedIn => OutputNaming::linkedin(),
            Platform::Twitter => OutputNaming::twitter(),
        }
    }
}

/// Outcome of one collection run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub platform: Platform,
    pub sources: usize,
    /// Records kept after filtering, before de-duplication
    pub collected: usize,
    /// `None` when nothing was collected or the snapshot could not be written
    pub persisted: Option<PersistedRun>,
}

/// Main builder for a collection run on one platform
pub struct Harvest {
    platform: Platform,
    config: PulseConfig,
    credentials: Credentials,
    limit: Option<usize>,
    webdriver_url: Option<String>,
    pacing_enabled: bool,
}

impl Harvest {
    /// Create a new Harvest builder with the default configuration
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            config: PulseConfig::default(),
            credentials: Credentials::default(),
            limit: None,
            webdriver_url: None,
            pacing_enabled: true,
        }
    }

    pub fn with_config(mut self, config: PulseConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self, PulseError> {
        let config = PulseConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Only visit the first `limit` sources
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Use this WebDriver endpoint, ignoring config and `WEBDRIVER_URL`
    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = Some(url.into());
        self
    }

    /// Skip every human-pacing delay
    pub fn without_pacing(mut self) -> Self {
        self.pacing_enabled = false;
        self
    }

    pub fn with_scroll_count(mut self, scroll_count: usize) -> Self {
        self.config.pacing.scroll_count = scroll_count;
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.config.max_results = max_results;
        self
    }

    /// Apply the keyword filter to search results too
    pub fn with_search_filter(mut self, enabled: bool) -> Self {
        self.config.filter_search_results = enabled;
        self
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Sources for the platform, truncated to the limit
    pub fn sources(&self) -> Vec<SourceDescriptor> {
        let mut sources = match self.platform {
            Platform::LinkedIn => self.config.company_sources(),
            Platform::Twitter => self.config.query_sources(),
        };
        if let Some(limit) = self.limit {
            sources.truncate(limit);
        }
        sources
    }

    pub fn pacing(&self) -> Pacing {
        if self.pacing_enabled {
            self.config.pacing.to_pacing()
        } else {
            Pacing::none(self.config.pacing.scroll_count)
        }
    }

    /// Resolve the WebDriver endpoint: builder override, then `WEBDRIVER_URL`, then config
    pub fn webdriver_url(&self) -> String {
        if let Some(url) = &self.webdriver_url {
            return url.clone();
        }
        match std::env::var("WEBDRIVER_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => self.config.webdriver_url.clone(),
        }
    }

    /// Collect, filter, de-duplicate and persist posts for the platform
    pub async fn run(self) -> Result<RunSummary, PulseError> {
        self.config.validate()?;
        let sources = self.sources();
        ::log::info!(
            "Starting {} collection over {} sources",
            self.platform,
            sources.len()
        );

        let records = match self.platform {
            Platform::LinkedIn => self.collect_company_posts(&sources).await?,
            Platform::Twitter => self.collect_search_results(&sources).await?,
        };

        let persisted = persist::finalize(&records, &self.platform.naming(), &self.config.output_dir);
        Ok(RunSummary {
            platform: self.platform,
            sources: sources.len(),
            collected: records.len(),
            persisted,
        })
    }

    async fn collect_company_posts(
        &self,
        sources: &[SourceDescriptor],
    ) -> Result<Vec<PostRecord>, PulseError> {
        let credentials = self.credentials.linkedin()?;
        let extractor = FieldExtractor::new(&self.config.selectors)?;
        let filter = KeywordFilter::new(self.config.keywords.iter().cloned());
        let pacing = self.pacing();

        let webdriver_url = self.webdriver_url();
        ::log::info!("Using WebDriver at {}", webdriver_url);
        let mut collector = CompanyCollector::connect(
            &webdriver_url,
            extractor,
            &self.config.selectors.post_container,
            pacing,
            self.config.wait_timeout(),
        )
        .await?;

        // the session is closed whether or not login succeeds
        let outcome = match collector.login(&credentials).await {
            Ok(()) => {
                Ok(collect_all(&mut collector, sources, Some(&filter), &pacing.between_sources).await)
            }
            Err(e) => Err(e),
        };
        collector.close().await;

        Ok(outcome?.into_records())
    }

    async fn collect_search_results(
        &self,
        sources: &[SourceDescriptor],
    ) -> Result<Vec<PostRecord>, PulseError> {
        let bearer_token = self.credentials.bearer_token()?;
        let client = SearchClient::new(&self.config.search_base_url, bearer_token)?
            .with_wait_on_rate_limit(self.config.wait_on_rate_limit);
        let mut collector = SearchCollector::new(client, self.config.max_results);

        let filter = self
            .config
            .filter_search_results
            .then(|| KeywordFilter::new(self.config.keywords.iter().cloned()));
        let table = collect_all(&mut collector, sources, filter.as_ref(), &PacingPolicy::none()).await;
        Ok(table.into_records())
    }
}

/// Render the charts for a CSV conversation table, or the built-in one
pub fn visualize(input: Option<&Path>, output_dir: &Path) -> Result<RenderReport, PulseError> {
    let rows = match input {
        Some(path) => {
            ::log::info!("Loading conversations from {}", path.display());
            visuals::load_csv(path)?
        }
        None => visuals::default_dataset(),
    };
    Ok(visuals::render_all(&rows, output_dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(pairs: &[(&str, &str)]) -> Credentials {
        Credentials::from_lookup(|name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_sources_respect_limit() {
        let harvest = Harvest::new(Platform::LinkedIn).with_limit(3);
        let sources = harvest.sources();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].label(), "safaricom");

        let twitter = Harvest::new(Platform::Twitter);
        assert_eq!(twitter.sources().len(), 5);
    }

    #[test]
    fn test_without_pacing_keeps_scrolls() {
        let pacing = Harvest::new(Platform::LinkedIn)
            .with_scroll_count(2)
            .without_pacing()
            .pacing();
        assert_eq!(pacing, Pacing::none(2));
    }

    #[test]
    fn test_explicit_webdriver_url_wins() {
        let harvest = Harvest::new(Platform::LinkedIn).with_webdriver_url("http://remote:9515");
        assert_eq!(harvest.webdriver_url(), "http://remote:9515");
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_running() {
        let mut config = PulseConfig::default();
        config.pacing.between_sources = [1e20, 1e20];
        let result = Harvest::new(Platform::Twitter)
            .with_config(config)
            .with_credentials(credentials(&[("TWITTER_BEARER_TOKEN", "token")]))
            .run()
            .await;

        assert!(matches!(result, Err(PulseError::Config(ConfigError::Invalid(_)))));
    }

    #[tokio::test]
    async fn test_linkedin_without_credentials_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let result = Harvest::new(Platform::LinkedIn)
            .with_output_dir(dir.path())
            .with_webdriver_url("http://127.0.0.1:1")
            .run()
            .await;

        assert!(matches!(
            result,
            Err(PulseError::Config(ConfigError::MissingCredential("LINKEDIN_EMAIL")))
        ));
        assert_eq!(fs_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_twitter_run_persists_tagged_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "1", "text": "AI hub opens in Nairobi", "author_id": "u1"},
                    {"id": "2", "text": "AI hub opens in Nairobi", "author_id": "u1"},
                ],
                "includes": {"users": [{"id": "u1", "username": "techke"}]}
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = PulseConfig {
            search_base_url: server.uri(),
            queries: vec!["AI Kenya".to_string()],
            ..PulseConfig::default()
        };
        let summary = Harvest::new(Platform::Twitter)
            .with_config(config)
            .with_credentials(credentials(&[("TWITTER_BEARER_TOKEN", "token")]))
            .with_output_dir(dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.sources, 1);
        assert_eq!(summary.collected, 2);
        let persisted = summary.persisted.unwrap();
        assert_eq!(persisted.unique_count, 1);

        let mut reader = csv::Reader::from_path(&persisted.table_path).unwrap();
        let rows: Vec<PostRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].query.as_deref(), Some("AI Kenya"));
        assert_eq!(rows[0].author_name.as_deref(), Some("techke"));
    }

    #[tokio::test]
    async fn test_twitter_filter_drops_irrelevant_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "1", "text": "Machine learning meetup"},
                    {"id": "2", "text": "Matatu traffic update"},
                ]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = PulseConfig {
            search_base_url: server.uri(),
            queries: vec!["Kenya".to_string()],
            ..PulseConfig::default()
        };
        let summary = Harvest::new(Platform::Twitter)
            .with_config(config)
            .with_search_filter(true)
            .with_credentials(credentials(&[("TWITTER_BEARER_TOKEN", "token")]))
            .with_output_dir(dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.collected, 1);
    }

    #[test]
    fn test_visualize_default_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let report = visualize(None, dir.path()).unwrap();
        assert_eq!(report.files.len(), 7);
        assert_eq!(report.insights.total_posts, 10);
    }

    fn fs_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }
}
