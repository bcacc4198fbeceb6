//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with a browser-like user agent
//! - Serving and filling the response cache
//! - Retry logic for timeouts and connection errors
//! - Classifying responses as fetched or fair-use blocked

use crate::config::CrawlerConfig;
use crate::page::FetchTarget;
use crate::storage::{CachedResponse, ResponseStore};
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Status codes returned by sites that reject automated clients
///
/// 999 is a nonstandard code used by at least one large social network.
pub const FAIR_USE_BLOCKED: [u16; 4] = [403, 500, 503, 999];

/// Pause between retries of a transport failure
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// A response received from the network or the cache
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResponse {
    /// URL that was requested
    pub url: String,
    /// Final URL after redirects
    pub final_url: String,
    pub status: u16,
    /// MIME type without parameters, lowercased
    pub content_type: Option<String>,
    pub body: String,
    /// True if served from the response cache
    pub from_cache: bool,
}

impl FetchedResponse {
    /// Final URL, if it differs from the requested one
    pub fn redirect(&self) -> Option<String> {
        (self.final_url != self.url).then(|| self.final_url.clone())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_html(&self) -> bool {
        self.content_type.as_deref() == Some("text/html")
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A response arrived (any status other than a fair-use block)
    Fetched(FetchedResponse),

    /// The site rejected the crawler
    Blocked(FetchedResponse),

    /// The request (or every retry) timed out
    TimedOut,

    /// Any other transport failure
    Failed(String),
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed with reqwest's default policy (up to 10 hops).
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sitegraph::config::CrawlerConfig;
/// use sitegraph::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .connect_timeout(Duration::from_secs(config.fetch_timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrieves page content over HTTP, backed by an optional response cache
pub struct Fetcher {
    client: Client,
    cache: Option<Box<dyn ResponseStore>>,
    max_retries: u32,
}

impl Fetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `cache` - Response cache, or `None` to always hit the network
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Ready to fetch
    /// * `Err(reqwest::Error)` - The HTTP client could not be built
    pub fn new(
        config: &CrawlerConfig,
        cache: Option<Box<dyn ResponseStore>>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            cache,
            max_retries: config.max_retries,
        })
    }

    /// Fetches a page
    ///
    /// Only internal and external pages produce a `FetchTarget`, so URN
    /// pages cannot reach this method.
    pub async fn fetch(&self, target: &FetchTarget) -> FetchOutcome {
        self.fetch_url(target.uri()).await
    }

    /// Fetches a URL with cache lookup and retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Cached 2xx response, not expired | Served from cache |
    /// | Timeout | Retry up to `max-retries`, then TimedOut |
    /// | Connection error | Retry up to `max-retries`, then Failed |
    /// | 403, 500, 503, 999 | Immediate → Blocked |
    /// | Any other status | Immediate → Fetched |
    /// | Other transport error | Immediate → Failed |
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// A FetchOutcome indicating the response or the type of failure
    pub async fn fetch_url(&self, url: &str) -> FetchOutcome {
        if let Some(cached) = self.cached(url) {
            tracing::debug!("Cache hit for {}", url);
            return classify(cached);
        }

        let mut attempt = 0;
        loop {
            match self.request(url).await {
                Ok(response) => {
                    self.store(&response);
                    return classify(response);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} ({}/{}) after error: {}",
                        url,
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!("Timeout fetching {}", url);
                    return FetchOutcome::TimedOut;
                }
                Err(e) => {
                    tracing::error!("Failed to fetch {}: {}", url, e);
                    return FetchOutcome::Failed(e.to_string());
                }
            }
        }
    }

    /// Fetches a document as text, for feeds such as the sitemap
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Body of a 2xx response
    /// * `Err(String)` - Transport failure or non-success status
    pub async fn get_text(&self, url: &str) -> Result<String, String> {
        match self.fetch_url(url).await {
            FetchOutcome::Fetched(response) if response.is_success() => Ok(response.body),
            FetchOutcome::Fetched(response) | FetchOutcome::Blocked(response) => {
                Err(format!("HTTP status {}", response.status))
            }
            FetchOutcome::TimedOut => Err("request timed out".to_string()),
            FetchOutcome::Failed(message) => Err(message),
        }
    }

    async fn request(&self, url: &str) -> Result<FetchedResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(mime_type);

        // Images and other binaries are recorded but never parsed
        let body = if reads_body(content_type.as_deref()) {
            response.text().await?
        } else {
            String::new()
        };

        tracing::debug!("Fetched {} -> {} ({} bytes)", url, status, body.len());

        Ok(FetchedResponse {
            url: url.to_string(),
            final_url,
            status,
            content_type,
            body,
            from_cache: false,
        })
    }

    fn cached(&self, url: &str) -> Option<FetchedResponse> {
        let cache = self.cache.as_ref()?;

        match cache.get(url) {
            Ok(hit) => hit.map(|cached| FetchedResponse {
                url: url.to_string(),
                final_url: cached.final_url,
                status: cached.status,
                content_type: cached.content_type,
                body: cached.body,
                from_cache: true,
            }),
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", url, e);
                None
            }
        }
    }

    fn store(&self, response: &FetchedResponse) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };

        if !response.is_success() {
            return;
        }

        let cached = CachedResponse {
            final_url: response.final_url.clone(),
            status: response.status,
            content_type: response.content_type.clone(),
            body: response.body.clone(),
            fetched_at: Utc::now(),
        };

        if let Err(e) = cache.put(&response.url, &cached) {
            tracing::warn!("Cache write failed for {}: {}", response.url, e);
        }
    }
}

/// Maps a response to Fetched or Blocked by status code
fn classify(response: FetchedResponse) -> FetchOutcome {
    if FAIR_USE_BLOCKED.contains(&response.status) {
        tracing::info!("Fair-use blocked ({}) at {}", response.status, response.url);
        FetchOutcome::Blocked(response)
    } else {
        FetchOutcome::Fetched(response)
    }
}

/// Whether a body of this MIME type is parsed: HTML pages and XML feeds
///
/// A missing content type is read, since feeds are often served without one.
fn reads_body(mime: Option<&str>) -> bool {
    match mime {
        None => true,
        Some(mime) => {
            mime == "text/html"
                || mime == "text/xml"
                || mime == "application/xml"
                || mime.ends_with("+xml")
        }
    }
}

/// Extracts the MIME type portion of a Content-Type header value
fn mime_type(header: &str) -> Option<String> {
    let mime = header.split(';').next().unwrap_or("").trim();
    (!mime.is_empty()).then(|| mime.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteCache;

    fn response(status: u16) -> FetchedResponse {
        FetchedResponse {
            url: "https://example.com/x".to_string(),
            final_url: "https://example.com/x".to_string(),
            status,
            content_type: Some("text/html".to_string()),
            body: String::new(),
            from_cache: false,
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&CrawlerConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(
            mime_type("text/html; charset=utf-8").as_deref(),
            Some("text/html")
        );
        assert_eq!(mime_type("Text/HTML").as_deref(), Some("text/html"));
        assert_eq!(mime_type("application/json").as_deref(), Some("application/json"));
        assert_eq!(mime_type(" ; charset=utf-8"), None);
    }

    #[test]
    fn test_reads_body() {
        assert!(reads_body(Some("text/html")));
        assert!(reads_body(Some("application/xml")));
        assert!(reads_body(Some("text/xml")));
        assert!(reads_body(Some("application/rss+xml")));
        assert!(reads_body(None));
        assert!(!reads_body(Some("image/png")));
        assert!(!reads_body(Some("application/pdf")));
    }

    #[test]
    fn test_blocked_statuses() {
        for status in FAIR_USE_BLOCKED {
            assert!(matches!(classify(response(status)), FetchOutcome::Blocked(_)));
        }
        assert!(matches!(classify(response(200)), FetchOutcome::Fetched(_)));
        assert!(matches!(classify(response(404)), FetchOutcome::Fetched(_)));
        assert!(matches!(classify(response(502)), FetchOutcome::Fetched(_)));
    }

    #[test]
    fn test_redirect_only_when_url_changed() {
        let mut r = response(200);
        assert_eq!(r.redirect(), None);

        r.final_url = "https://example.com/y".to_string();
        assert_eq!(r.redirect().as_deref(), Some("https://example.com/y"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let cache = SqliteCache::open_in_memory(None).unwrap();
        cache
            .put(
                "http://unreachable.invalid/page",
                &CachedResponse {
                    final_url: "http://unreachable.invalid/page".to_string(),
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: "<title>cached</title>".to_string(),
                    fetched_at: Utc::now(),
                },
            )
            .unwrap();

        let fetcher = Fetcher::new(&CrawlerConfig::default(), Some(Box::new(cache))).unwrap();

        match fetcher.fetch_url("http://unreachable.invalid/page").await {
            FetchOutcome::Fetched(response) => {
                assert!(response.from_cache);
                assert_eq!(response.body, "<title>cached</title>");
            }
            other => panic!("expected cached response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_errors_are_retried() {
        // Bind then drop a listener so the port refuses connections
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let config = CrawlerConfig {
            fetch_timeout_secs: 2,
            max_retries: 2,
            ..CrawlerConfig::default()
        };
        let fetcher = Fetcher::new(&config, None).unwrap();

        let started = std::time::Instant::now();
        let outcome = fetcher.fetch_url(&format!("http://127.0.0.1:{}/", port)).await;

        assert!(matches!(outcome, FetchOutcome::Failed(_)), "got {:?}", outcome);
        assert!(started.elapsed() >= RETRY_DELAY * 2);
    }

    #[tokio::test]
    async fn test_no_retries_by_default() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let fetcher = Fetcher::new(&CrawlerConfig::default(), None).unwrap();

        let started = std::time::Instant::now();
        let outcome = fetcher.fetch_url(&format!("http://127.0.0.1:{}/", port)).await;

        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert!(started.elapsed() < RETRY_DELAY);
    }
}
