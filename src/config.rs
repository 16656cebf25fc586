use crate::crawlers::{Pacing, PacingPolicy};
use crate::filter::default_keywords;
use crate::parsers::SelectorTable;
use crate::results::SourceDescriptor;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading configuration or credentials
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),
}

/// One company page to collect from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEntry {
    pub handle: String,
    pub name: String,
    pub sector: String,
}

impl CompanyEntry {
    fn new(handle: &str, name: &str, sector: &str) -> Self {
        Self {
            handle: handle.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
        }
    }

    pub fn to_source(&self) -> SourceDescriptor {
        SourceDescriptor::Company {
            handle: self.handle.clone(),
            name: self.name.clone(),
            sector: self.sector.clone(),
        }
    }
}

/// Delay ranges in seconds, as `[min, max]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_between_sources")]
    pub between_sources: [f64; 2],
    #[serde(default = "default_after_navigation")]
    pub after_navigation: [f64; 2],
    #[serde(default = "default_between_scrolls")]
    pub between_scrolls: [f64; 2],
    #[serde(default = "default_between_keystrokes")]
    pub between_keystrokes: [f64; 2],
    #[serde(default = "default_after_login")]
    pub after_login: [f64; 2],
    #[serde(default = "default_scroll_count")]
    pub scroll_count: usize,
}

fn default_between_sources() -> [f64; 2] {
    [20.0, 30.0]
}

fn default_after_navigation() -> [f64; 2] {
    [3.0, 5.0]
}

fn default_between_scrolls() -> [f64; 2] {
    [2.0, 4.0]
}

fn default_between_keystrokes() -> [f64; 2] {
    [1.0, 2.0]
}

fn default_after_login() -> [f64; 2] {
    [5.0, 5.0]
}

fn default_scroll_count() -> usize {
    5
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            between_sources: default_between_sources(),
            after_navigation: default_after_navigation(),
            between_scrolls: default_between_scrolls(),
            between_keystrokes: default_between_keystrokes(),
            after_login: default_after_login(),
            scroll_count: default_scroll_count(),
        }
    }
}

impl PacingConfig {
    pub fn to_pacing(&self) -> Pacing {
        let policy = |range: [f64; 2]| PacingPolicy::from_secs_f64(range[0], range[1]);
        Pacing {
            between_sources: policy(self.between_sources),
            after_navigation: policy(self.after_navigation),
            between_scrolls: policy(self.between_scrolls),
            between_keystrokes: policy(self.between_keystrokes),
            after_login: policy(self.after_login),
            scroll_count: self.scroll_count,
        }
    }
}

/// Immutable configuration for a collection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Relevance keywords (case-insensitive substrings)
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// CSS selectors for company-page posts
    #[serde(default)]
    pub selectors: SelectorTable,

    /// Company pages to visit, in order
    #[serde(default = "default_companies")]
    pub companies: Vec<CompanyEntry>,

    /// Recent-search queries, in order
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    /// Results requested per query (the API accepts 10..=100)
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Apply the keyword filter to search results as well
    #[serde(default)]
    pub filter_search_results: bool,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Base URL of the microblogging API
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    /// Directory for CSV and JSON snapshots
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// How long to wait for page elements, in seconds
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Sleep out rate-limit windows instead of failing the query
    #[serde(default = "default_wait_on_rate_limit")]
    pub wait_on_rate_limit: bool,

    #[serde(default)]
    pub pacing: PacingConfig,
}

fn default_companies() -> Vec<CompanyEntry> {
    vec![
        // Financial services
        CompanyEntry::new("safaricom", "Safaricom PLC", "Telecommunications"),
        CompanyEntry::new("kcb-bank-kenya", "KCB Bank Kenya", "Banking"),
        CompanyEntry::new("equity-bank-kenya", "Equity Bank Kenya", "Banking"),
        CompanyEntry::new("co-operative-bank-of-kenya", "Co-operative Bank of Kenya", "Banking"),
        CompanyEntry::new(
            "standard-chartered-bank-kenya",
            "Standard Chartered Bank Kenya",
            "Banking",
        ),
        CompanyEntry::new("absa-bank-kenya", "Absa Bank Kenya", "Banking"),
        CompanyEntry::new("ncba-bank-kenya", "NCBA Bank Kenya", "Banking"),
        CompanyEntry::new("i&m-bank-kenya", "I&M Bank Kenya", "Banking"),
        // Insurance
        CompanyEntry::new("jubilee-insurance", "Jubilee Insurance", "Insurance"),
        CompanyEntry::new("britam", "Britam Holdings", "Insurance"),
        CompanyEntry::new("cic-insurance-group", "CIC Insurance Group", "Insurance"),
        CompanyEntry::new("liberty-kenya-holdings", "Liberty Kenya Holdings", "Insurance"),
        CompanyEntry::new("apa-insurance", "APA Insurance", "Insurance"),
        // Technology
        CompanyEntry::new("microsoft-africa-development-center", "Microsoft ADC", "Technology"),
        CompanyEntry::new("google-kenya", "Google Kenya", "Technology"),
        CompanyEntry::new("ibm-kenya", "IBM Kenya", "Technology"),
        CompanyEntry::new("oracle-kenya", "Oracle Kenya", "Technology"),
        CompanyEntry::new("cisco-kenya", "Cisco Kenya", "Technology"),
        // Telecommunications
        CompanyEntry::new("airtel-kenya", "Airtel Kenya", "Telecommunications"),
        CompanyEntry::new("telkom-kenya", "Telkom Kenya", "Telecommunications"),
        // Manufacturing and energy
        CompanyEntry::new("east-african-breweries", "East African Breweries", "Manufacturing"),
        CompanyEntry::new("bamburi-cement", "Bamburi Cement", "Manufacturing"),
        CompanyEntry::new("kenya-electricity-generating-company-kengen", "KenGen", "Energy"),
        CompanyEntry::new("kenya-power", "Kenya Power", "Energy"),
        // Startups
        CompanyEntry::new("twiga-foods", "Twiga Foods", "AgriTech"),
        CompanyEntry::new("sendy", "Sendy", "Logistics"),
        CompanyEntry::new("cellulant", "Cellulant", "FinTech"),
        CompanyEntry::new("ushahidi", "Ushahidi", "Technology"),
        CompanyEntry::new("africa-talking", "Africa's Talking", "Technology"),
        CompanyEntry::new("andela-kenya", "Andela Kenya", "Technology"),
        CompanyEntry::new("m-kopa", "M-KOPA", "FinTech"),
        CompanyEntry::new("kopokopo", "KopoKopo", "FinTech"),
        // Consulting
        CompanyEntry::new("deloitte-east-africa", "Deloitte East Africa", "Consulting"),
        CompanyEntry::new("pwc-kenya", "PwC Kenya", "Consulting"),
        CompanyEntry::new("kpmg-east-africa", "KPMG East Africa", "Consulting"),
        CompanyEntry::new("ernst-young-kenya", "EY Kenya", "Consulting"),
    ]
}

fn default_queries() -> Vec<String> {
    [
        r#"(AI OR "artificial intelligence") (Kenya OR Nairobi) -is:retweet"#,
        r#""digital transformation" (Kenya OR Nairobi) -is:retweet"#,
        r#""machine learning" (Kenya OR Nairobi) -is:retweet"#,
        r#"(tech OR technology) (upskilling OR reskilling) (Kenya OR Nairobi) -is:retweet"#,
        r#"AI (startup OR innovation) (Kenya OR Nairobi) -is:retweet"#,
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

fn default_max_results() -> u32 {
    100
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_search_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_wait_timeout_secs() -> u64 {
    10
}

fn default_wait_on_rate_limit() -> bool {
    true
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            selectors: SelectorTable::default(),
            companies: default_companies(),
            queries: default_queries(),
            max_results: default_max_results(),
            filter_search_results: false,
            webdriver_url: default_webdriver_url(),
            search_base_url: default_search_base_url(),
            output_dir: default_output_dir(),
            wait_timeout_secs: default_wait_timeout_secs(),
            wait_on_rate_limit: default_wait_on_rate_limit(),
            pacing: PacingConfig::default(),
        }
    }
}

impl PulseConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string; missing keys take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid("keywords must not be empty".into()));
        }
        for (name, value) in [
            ("webdriver_url", &self.webdriver_url),
            ("search_base_url", &self.search_base_url),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{} {:?}: {}", name, value, e)))?;
        }
        if self.wait_timeout_secs == 0 {
            return Err(ConfigError::Invalid("wait_timeout_secs must be positive".into()));
        }
        let ranges = [
            ("between_sources", self.pacing.between_sources),
            ("after_navigation", self.pacing.after_navigation),
            ("between_scrolls", self.pacing.between_scrolls),
            ("between_keystrokes", self.pacing.between_keystrokes),
            ("after_login", self.pacing.after_login),
        ];
        for (name, [min, max]) in ranges {
            if !(min.is_finite() && max.is_finite()) || min < 0.0 || max < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "pacing.{} must be two non-negative numbers",
                    name
                )));
            }
            if Duration::try_from_secs_f64(min).is_err() || Duration::try_from_secs_f64(max).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "pacing.{} is too large",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn company_sources(&self) -> Vec<SourceDescriptor> {
        self.companies.iter().map(CompanyEntry::to_source).collect()
    }

    pub fn query_sources(&self) -> Vec<SourceDescriptor> {
        self.queries
            .iter()
            .map(|q| SourceDescriptor::Query(q.clone()))
            .collect()
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct LinkedInCredentials {
    pub email: String,
    pub password: String,
}

/// App credentials for the microblogging API
///
/// Only the bearer token is needed for recent search; the user-context keys
/// are read for completeness and reported when absent.
#[derive(Debug, Clone, Default)]
pub struct TwitterCredentials {
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

/// Secrets read once from the environment at startup
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub linkedin_email: Option<String>,
    pub linkedin_password: Option<String>,
    pub twitter: TwitterCredentials,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name -> value lookup; empty values count as missing
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            linkedin_email: get("LINKEDIN_EMAIL"),
            linkedin_password: get("LINKEDIN_PASSWORD"),
            twitter: TwitterCredentials {
                bearer_token: get("TWITTER_BEARER_TOKEN"),
                api_key: get("TWITTER_API_KEY"),
                api_secret: get("TWITTER_API_SECRET"),
                access_token: get("TWITTER_ACCESS_TOKEN"),
                access_token_secret: get("TWITTER_ACCESS_TOKEN_SECRET"),
            },
        }
    }

    pub fn linkedin(&self) -> Result<LinkedInCredentials, ConfigError> {
        Ok(LinkedInCredentials {
            email: require("LINKEDIN_EMAIL", &self.linkedin_email)?.to_string(),
            password: require("LINKEDIN_PASSWORD", &self.linkedin_password)?.to_string(),
        })
    }

    pub fn bearer_token(&self) -> Result<&str, ConfigError> {
        let twitter = &self.twitter;
        for (name, value) in [
            ("TWITTER_API_KEY", &twitter.api_key),
            ("TWITTER_API_SECRET", &twitter.api_secret),
            ("TWITTER_ACCESS_TOKEN", &twitter.access_token),
            ("TWITTER_ACCESS_TOKEN_SECRET", &twitter.access_token_secret),
        ] {
            if value.is_none() {
                ::log::debug!("{} is not set", name);
            }
        }
        require("TWITTER_BEARER_TOKEN", &twitter.bearer_token)
    }
}

fn require<'a>(name: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::MissingCredential(name))
}
