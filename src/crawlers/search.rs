use crate::crawlers::{CollectError, Collector};
use crate::parsers::text;
use crate::results::{PostRecord, SourceDescriptor};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const SEARCH_PATH: &str = "/2/tweets/search/recent";
const TWEET_FIELDS: &str = "created_at,public_metrics,author_id";
const USER_FIELDS: &str = "username,public_metrics,verified";

/// Longest we are willing to sleep for a rate-limit window
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// Errors from the recent-search endpoint
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited")]
    RateLimited,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<TweetMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetrics {
    #[serde(default)]
    pub followers_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub public_metrics: Option<UserMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Tweet>>,
    #[serde(default)]
    includes: Option<Includes>,
}

/// A tweet joined with its expanded author
#[derive(Debug, Clone)]
pub struct TweetWithAuthor {
    pub tweet: Tweet,
    pub author: Option<User>,
}

/// Client for the recent-search endpoint (app-only bearer auth)
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
    wait_on_rate_limit: bool,
}

impl SearchClient {
    pub fn new(base_url: &str, bearer_token: &str) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
            wait_on_rate_limit: true,
        })
    }

    /// Sleep out a 429 and retry once instead of failing
    pub fn with_wait_on_rate_limit(mut self, wait: bool) -> Self {
        self.wait_on_rate_limit = wait;
        self
    }

    /// Search recent posts; results come back joined with their authors
    pub async fn search_recent(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<TweetWithAuthor>, SearchError> {
        let max_results = max_results.clamp(10, 100).to_string();
        let mut attempt = 0;

        loop {
            let response = self
                .http
                .get(format!("{}{}", self.base_url, SEARCH_PATH))
                .bearer_auth(&self.bearer_token)
                .query(&[
                    ("query", query),
                    ("max_results", max_results.as_str()),
                    ("tweet.fields", TWEET_FIELDS),
                    ("user.fields", USER_FIELDS),
                    ("expansions", "author_id"),
                ])
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if !self.wait_on_rate_limit || attempt > 0 {
                    return Err(SearchError::RateLimited);
                }
                let wait = rate_limit_wait(response.headers());
                ::log::warn!(
                    "Rate limit exceeded. Sleeping for {} seconds.",
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SearchError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let parsed: SearchResponse = response.json().await?;
            return Ok(join_authors(parsed));
        }
    }
}

/// Time until the window in `x-rate-limit-reset` (epoch seconds) reopens
fn rate_limit_wait(headers: &reqwest::header::HeaderMap) -> Duration {
    let reset = headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    match reset {
        Some(reset) => {
            let secs = reset.saturating_sub(chrono::Utc::now().timestamp()).max(0) as u64 + 1;
            Duration::from_secs(secs).min(MAX_RATE_LIMIT_WAIT)
        }
        None => Duration::from_secs(1),
    }
}

fn join_authors(response: SearchResponse) -> Vec<TweetWithAuthor> {
    let users: HashMap<String, User> = response
        .includes
        .unwrap_or_default()
        .users
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    response
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|tweet| {
            let author = tweet
                .author_id
                .as_ref()
                .and_then(|id| users.get(id))
                .cloned();
            TweetWithAuthor { tweet, author }
        })
        .collect()
}

/// Maps one search hit into a record
pub fn tweet_to_record(hit: &TweetWithAuthor) -> Result<PostRecord, CollectError> {
    let tweet = &hit.tweet;
    let text = tweet
        .text
        .as_deref()
        .ok_or_else(|| CollectError::Malformed(format!("tweet {} has no text", tweet.id)))?;

    let mut record = PostRecord::with_text(text);
    if let Some(created) = tweet.created_at.as_deref().and_then(text::parse_timestamp) {
        record.created_at = created;
    }

    let metrics = tweet.public_metrics.clone().unwrap_or_default();
    record.likes = metrics.like_count;
    record.comments = metrics.reply_count;
    record.reposts = metrics.retweet_count;
    record.quotes = metrics.quote_count;

    if let Some(author) = &hit.author {
        record.author_name = Some(author.username.clone());
        record.author_followers = author.public_metrics.as_ref().map(|m| m.followers_count);
        record.author_verified = author.verified;
    }

    Ok(record)
}

/// Runs one search per query source
pub struct SearchCollector {
    client: SearchClient,
    max_results: u32,
}

impl SearchCollector {
    pub fn new(client: SearchClient, max_results: u32) -> Self {
        Self {
            client,
            max_results,
        }
    }
}

impl Collector for SearchCollector {
    type Post = TweetWithAuthor;

    async fn open_source(
        &mut self,
        source: &SourceDescriptor,
    ) -> Result<Vec<TweetWithAuthor>, CollectError> {
        let SourceDescriptor::Query(query) = source else {
            return Err(CollectError::Unsupported {
                collector: "search collector",
                label: source.label().to_string(),
            });
        };
        Ok(self.client.search_recent(query, self.max_results).await?)
    }

    fn extract(&self, post: &TweetWithAuthor) -> Result<PostRecord, CollectError> {
        tweet_to_record(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_body() -> serde_json::Value {
        json!({
            "data": [
                {
                    "id": "1",
                    "text": "AI  startups in Nairobi",
                    "author_id": "u1",
                    "created_at": "2025-01-10T08:30:00.000Z",
                    "public_metrics": {
                        "retweet_count": 3, "reply_count": 2, "like_count": 10, "quote_count": 1
                    }
                },
                {
                    "id": "2",
                    "text": "Machine learning meetup tonight",
                    "author_id": "unknown",
                    "public_metrics": {
                        "retweet_count": 0, "reply_count": 0, "like_count": 4, "quote_count": 0
                    }
                },
                { "id": "3", "author_id": "u1" }
            ],
            "includes": {
                "users": [
                    {
                        "id": "u1",
                        "username": "nairobi_dev",
                        "verified": true,
                        "public_metrics": { "followers_count": 5200 }
                    }
                ]
            },
            "meta": { "result_count": 3 }
        })
    }

    #[tokio::test]
    async fn test_search_joins_authors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(header("authorization", "Bearer secret"))
            .and(query_param("query", "AI Kenya"))
            .and(query_param("max_results", "100"))
            .and(query_param("expansions", "author_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let client = SearchClient::new(&server.uri(), "secret").unwrap();
        let hits = client.search_recent("AI Kenya", 100).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].author.as_ref().unwrap().username, "nairobi_dev");
        assert!(hits[1].author.is_none());
    }

    #[tokio::test]
    async fn test_collector_maps_and_skips_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let client = SearchClient::new(&server.uri(), "secret").unwrap();
        let mut collector = SearchCollector::new(client, 50);
        let source = SourceDescriptor::Query("AI Kenya".to_string());

        let records = crate::crawlers::collect_source(&mut collector, &source, None).await;

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.text, "AI  startups in Nairobi");
        assert_eq!(first.likes, 10);
        assert_eq!(first.comments, 2);
        assert_eq!(first.reposts, 3);
        assert_eq!(first.quotes, 1);
        assert_eq!(first.author_name.as_deref(), Some("nairobi_dev"));
        assert_eq!(first.author_followers, Some(5200));
        assert_eq!(first.author_verified, Some(true));
        assert_eq!(first.created_at, "2025-01-10T08:30:00Z");
        assert_eq!(first.query.as_deref(), Some("AI Kenya"));

        assert_eq!(records[1].author_name, None);
    }

    #[tokio::test]
    async fn test_empty_result_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "meta": { "result_count": 0 } })),
            )
            .mount(&server)
            .await;

        let client = SearchClient::new(&server.uri(), "secret").unwrap();
        let hits = client.search_recent("nothing", 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let client = SearchClient::new(&server.uri(), "bad").unwrap();
        match client.search_recent("AI", 10).await {
            Err(SearchError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "Unauthorized");
            }
            other => panic!("unexpected result: {:?}", other.map(|h| h.len())),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_without_waiting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::new(&server.uri(), "secret")
            .unwrap()
            .with_wait_on_rate_limit(false);
        assert!(matches!(
            client.search_recent("AI", 10).await,
            Err(SearchError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_waits_and_retries_once() {
        let server = MockServer::start().await;
        let reset = chrono::Utc::now().timestamp() - 10;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(
                ResponseTemplate::new(429).insert_header("x-rate-limit-reset", reset.to_string().as_str()),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let client = SearchClient::new(&server.uri(), "secret").unwrap();
        let hits = client.search_recent("AI", 10).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_rate_limit_wait_is_capped() {
        let mut headers = reqwest::header::HeaderMap::new();
        let far = chrono::Utc::now().timestamp() + 24 * 3600;
        headers.insert("x-rate-limit-reset", far.to_string().parse().unwrap());
        assert_eq!(rate_limit_wait(&headers), MAX_RATE_LIMIT_WAIT);

        headers.insert("x-rate-limit-reset", i64::MAX.to_string().parse().unwrap());
        assert_eq!(rate_limit_wait(&headers), MAX_RATE_LIMIT_WAIT);

        // a reset in the past waits the minimum
        headers.insert("x-rate-limit-reset", i64::MIN.to_string().parse().unwrap());
        assert_eq!(rate_limit_wait(&headers), Duration::from_secs(1));

        assert_eq!(
            rate_limit_wait(&reqwest::header::HeaderMap::new()),
            Duration::from_secs(1)
        );
    }
}
