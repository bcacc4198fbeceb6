use crate::page::KindTag;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Desktop browser user agent sent by default, to avoid trivial bot-blocking
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for sitegraph
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub shortened: ShortenedConfig,
    pub output: OutputConfig,
}

/// The site under crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Origin of the site, e.g. "https://example.com"
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Sitemap feed that seeds the frontier
    #[serde(rename = "sitemap-url")]
    pub sitemap_url: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages waiting in the frontier before the producer suspends
    #[serde(rename = "frontier-max-size", default = "default_frontier_max_size")]
    pub frontier_max_size: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Retries for timeouts and connection errors
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whether fair-use blocked pages are queued for the alternate fetcher
    #[serde(rename = "alternate-fetch", default = "default_true")]
    pub alternate_fetch: bool,

    /// Skip TLS certificate verification
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            frontier_max_size: default_frontier_max_size(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_retries: 0,
            user_agent: default_user_agent(),
            alternate_fetch: true,
            accept_invalid_certs: false,
        }
    }
}

/// HTTP response cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Path to the SQLite cache database
    pub path: String,

    /// Age in seconds after which a cached response is refetched; never expires if absent
    #[serde(rename = "expire-after-secs", default)]
    pub expire_after_secs: Option<u64>,
}

/// Path policy tables applied to internal links
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    /// Known path aliases, alias -> canonical path
    #[serde(default)]
    pub rewrites: BTreeMap<String, String>,

    /// Paths dropped on exact match
    #[serde(rename = "ignored-exact", default)]
    pub ignored_exact: BTreeSet<String>,

    /// Paths dropped when they start with any of these prefixes
    #[serde(rename = "ignored-prefixes", default)]
    pub ignored_prefixes: Vec<String>,
}

/// Shortened URL sources
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenedConfig {
    /// Optional JSON file mapping short ids to expanded targets
    pub file: Option<String>,

    /// Prefix turning a short id from `file` into a link key
    #[serde(default = "default_shortened_prefix")]
    pub prefix: String,

    /// Inline entries keyed by the full short link
    #[serde(default)]
    pub entries: BTreeMap<String, ShortenedEntry>,
}

impl Default for ShortenedConfig {
    fn default() -> Self {
        Self {
            file: None,
            prefix: default_shortened_prefix(),
            entries: BTreeMap::new(),
        }
    }
}

/// One inline shortened URL
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenedEntry {
    /// Expanded target
    pub target: String,

    /// Declared kind of the target
    pub kind: KindTag,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON report
    #[serde(rename = "report-path")]
    pub report_path: String,

    /// Path of the JSON list of pages needing the alternate fetcher
    #[serde(rename = "alternate-fetch-path", default)]
    pub alternate_fetch_path: Option<String>,
}

fn default_frontier_max_size() -> usize {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_shortened_prefix() -> String {
    "/s/".to_string()
}
