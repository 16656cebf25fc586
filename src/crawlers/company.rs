use crate::config::LinkedInCredentials;
use crate::crawlers::{CollectError, Collector, Pacing};
use crate::parsers::FieldExtractor;
use crate::parsers::html::{PostFragment, split_posts};
use crate::results::{PostRecord, SourceDescriptor};
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;

const LOGIN_URL: &str = "https://www.linkedin.com/login";

const USER_AGENTS: [&str; 2] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
];

/// Posts page of a company on the professional network
pub fn company_posts_url(handle: &str) -> String {
    format!("https://www.linkedin.com/company/{}/posts/", handle)
}

/// Chrome capabilities for the session, with a randomly chosen user agent
fn chrome_capabilities() -> serde_json::Map<String, serde_json::Value> {
    let user_agent = USER_AGENTS[fastrand::usize(..USER_AGENTS.len())];
    let mut caps = serde_json::Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": [
                "--start-maximized",
                "--disable-notifications",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                format!("--user-agent={}", user_agent),
            ]
        }),
    );
    caps
}

/// Connects to the WebDriver instance, trying common local ports after the configured URL
async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client, CollectError> {
    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://127.0.0.1:4444",
    ];

    let candidates = std::iter::once(webdriver_url)
        .chain(fallback_urls.into_iter().filter(|url| *url != webdriver_url));

    let mut last_error = None;
    for url in candidates {
        let mut builder = ClientBuilder::native();
        builder.capabilities(chrome_capabilities());
        match builder.connect(url).await {
            Ok(client) => {
                ::log::info!("Connected to WebDriver at {}", url);
                return Ok(client);
            }
            Err(e) => {
                ::log::debug!("WebDriver not reachable at {}: {}", url, e);
                last_error = Some(format!("{}: {}", url, e));
            }
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(CollectError::Connect(
        last_error.unwrap_or_else(|| webdriver_url.to_string()),
    ))
}

/// Collects posts from company pages through a single browser session
pub struct CompanyCollector {
    client: Client,
    extractor: FieldExtractor,
    container_css: String,
    pacing: Pacing,
    wait_timeout: Duration,
}

impl CompanyCollector {
    /// Start the browser session
    pub async fn connect(
        webdriver_url: &str,
        extractor: FieldExtractor,
        container_css: &str,
        pacing: Pacing,
        wait_timeout: Duration,
    ) -> Result<Self, CollectError> {
        let client = connect_to_webdriver(webdriver_url).await?;
        Ok(Self {
            client,
            extractor,
            container_css: container_css.to_string(),
            pacing,
            wait_timeout,
        })
    }

    /// Log in with the configured account
    pub async fn login(&mut self, credentials: &LinkedInCredentials) -> Result<(), CollectError> {
        ::log::info!("Attempting to log in...");
        self.client.goto(LOGIN_URL).await?;
        self.pacing.after_navigation.pause().await;

        let username = self
            .wait_for(Locator::Id("username"))
            .await
            .map_err(|e| CollectError::Login(format!("username field: {}", e)))?;
        let password = self
            .wait_for(Locator::Id("password"))
            .await
            .map_err(|e| CollectError::Login(format!("password field: {}", e)))?;

        username.send_keys(&credentials.email).await?;
        self.pacing.between_keystrokes.pause().await;
        password.send_keys(&credentials.password).await?;
        self.pacing.between_keystrokes.pause().await;

        self.wait_for(Locator::XPath("//button[@type='submit']"))
            .await
            .map_err(|e| CollectError::Login(format!("submit button: {}", e)))?
            .click()
            .await?;

        self.pacing.after_login.pause().await;
        ::log::info!("Logged in");
        Ok(())
    }

    /// Wait up to the configured timeout for an element to appear
    async fn wait_for(&self, locator: Locator<'_>) -> Result<Element, CmdError> {
        self.client
            .wait()
            .at_most(self.wait_timeout)
            .for_element(locator)
            .await
    }

    /// Scroll to the bottom a fixed number of times to load more posts
    async fn scroll_page(&self) {
        for i in 0..self.pacing.scroll_count {
            if let Err(e) = self
                .client
                .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
                .await
            {
                ::log::error!("Error during scrolling: {}", e);
                return;
            }
            self.pacing.between_scrolls.pause().await;
            ::log::debug!("Completed scroll {}/{}", i + 1, self.pacing.scroll_count);
        }
    }

    /// End the browser session
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        } else {
            ::log::info!("WebDriver session closed");
        }
    }
}

impl Collector for CompanyCollector {
    type Post = PostFragment;

    async fn open_source(
        &mut self,
        source: &SourceDescriptor,
    ) -> Result<Vec<PostFragment>, CollectError> {
        let SourceDescriptor::Company { handle, .. } = source else {
            return Err(CollectError::Unsupported {
                collector: "company collector",
                label: source.label().to_string(),
            });
        };

        let url = company_posts_url(handle);
        ::log::info!("Scraping company page: {}", url);
        self.client.goto(&url).await?;
        self.pacing.after_navigation.pause().await;

        if let Err(e) = self.wait_for(Locator::Css(&self.container_css)).await {
            ::log::debug!("Waiting for posts on {} failed: {}", handle, e);
            return Err(CollectError::Timeout {
                label: handle.clone(),
                waited: self.wait_timeout,
            });
        }

        self.scroll_page().await;

        let html = self.client.source().await?;
        Ok(split_posts(&html, self.extractor.container()))
    }

    fn extract(&self, post: &PostFragment) -> Result<PostRecord, CollectError> {
        Ok(self.extractor.extract(&post.document()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_posts_url() {
        assert_eq!(
            company_posts_url("safaricom"),
            "https://www.linkedin.com/company/safaricom/posts/"
        );
    }

    #[test]
    fn test_capabilities_carry_a_known_user_agent() {
        let caps = chrome_capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        let agent = args
            .iter()
            .filter_map(|a| a.as_str())
            .find(|a| a.starts_with("--user-agent="))
            .unwrap();
        assert!(USER_AGENTS.iter().any(|ua| agent.ends_with(ua)));
        assert!(args.iter().any(|a| a == "--no-sandbox"));
    }
}
