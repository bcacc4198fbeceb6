//! Crawler coordinator - main crawl orchestration logic
//!
//! The crawl runs exactly two cooperative tasks joined on one task:
//! - The producer reads the sitemap and feeds each location through the
//!   classifier and registry onto the frontier, then closes it
//! - The consumer pops pages, fetches them, extracts metadata and links, and
//!   feeds the links back the same way
//!
//! All shared state is owned by [`Crawler`]. Locks are only held between
//! suspension points, never across an `.await`.

use crate::config::Config;
use crate::crawler::fetcher::{FetchOutcome, FetchedResponse, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::extract;
use crate::crawler::sitemap::fetch_sitemap;
use crate::output::{build_report, CrawlStatistics, FetchCounters, PageReport};
use crate::page::{Page, Registry};
use crate::storage::{open_cache, ResponseStore};
use crate::url::{Classification, Classifier};
use crate::CrawlError;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Main crawler structure
pub struct Crawler {
    sitemap_url: String,
    alternate_fetch: bool,
    classifier: Classifier,
    fetcher: Fetcher,
    frontier: Frontier,
    registry: Mutex<Registry>,
    alternate: Mutex<Vec<String>>,
    counters: Mutex<FetchCounters>,
}

impl Crawler {
    /// Creates a crawler, opening the on-disk response cache
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(CrawlError)` - Rule tables, cache or HTTP client could not be set up
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        let cache = open_cache(
            Path::new(&config.cache.path),
            config.cache.expire_after_secs,
        )?;
        tracing::debug!("Opened response cache at {}", config.cache.path);

        Self::with_cache(config, Some(Box::new(cache)))
    }

    /// Creates a crawler with the given response cache, or none
    pub fn with_cache(
        config: &Config,
        cache: Option<Box<dyn ResponseStore>>,
    ) -> Result<Self, CrawlError> {
        Ok(Self {
            sitemap_url: config.site.sitemap_url.clone(),
            alternate_fetch: config.crawler.alternate_fetch,
            classifier: Classifier::from_config(config)?,
            fetcher: Fetcher::new(&config.crawler, cache)?,
            frontier: Frontier::new(config.crawler.frontier_max_size),
            registry: Mutex::new(Registry::new()),
            alternate: Mutex::new(Vec::new()),
            counters: Mutex::new(FetchCounters::default()),
        })
    }

    /// Runs the crawl to completion
    ///
    /// Returns once the sitemap is exhausted and every discovered page has
    /// been visited. Per-page failures are recorded, never returned.
    pub async fn crawl(&self) {
        tracing::info!(
            "Starting crawl of {} from {}",
            self.classifier.origin(),
            self.sitemap_url
        );

        tokio::join!(self.produce(), self.consume());

        tracing::info!(
            "Crawl finished: {} pages, {} queued for alternate fetch",
            self.lock(&self.registry).len(),
            self.lock(&self.alternate).len()
        );
    }

    /// Seeds the frontier from the sitemap, then closes it
    async fn produce(&self) {
        let seeds = fetch_sitemap(&self.fetcher, &self.sitemap_url).await;

        for seed in &seeds {
            if let Some(key) = self.admit(seed, None) {
                self.frontier.push(key).await;
            }
        }

        tracing::debug!("Producer done after {} seeds", seeds.len());
        self.frontier.close();
    }

    /// Drains the frontier until it is closed and empty
    async fn consume(&self) {
        while let Some(key) = self.frontier.pop().await {
            self.visit(&key).await;
        }

        tracing::debug!("Consumer drained the frontier");
    }

    /// Fetches one page and feeds the links found on it back into the crawl
    async fn visit(&self, key: &str) {
        let target = self
            .lock(&self.registry)
            .get(key)
            .and_then(Page::fetch_target);

        let Some(target) = target else {
            tracing::debug!("Nothing to fetch for {}", key);
            return;
        };

        let outcome = self.fetcher.fetch(&target).await;
        let links = self.record(key, outcome);

        for link in &links {
            if let Some(new_key) = self.admit(link, Some(key)) {
                self.frontier.push_discovered(new_key);
            }
        }
    }

    /// Classifies a raw link and resolves it against the registry
    ///
    /// # Returns
    ///
    /// The key to enqueue if a new fetchable page was created
    fn admit(&self, raw: &str, referrer: Option<&str>) -> Option<String> {
        match self.classifier.classify(raw) {
            Classification::Dropped(reason) => {
                tracing::trace!("Dropped link {:?} ({:?})", raw, reason);
                self.lock(&self.counters).links_dropped += 1;
                None
            }
            Classification::Target(target) => self
                .lock(&self.registry)
                .resolve_or_create(target, referrer)
                .into_frontier_key(),
        }
    }

    /// Stores a fetch outcome on the page
    ///
    /// # Returns
    ///
    /// Raw links to follow; empty unless the page is internal and the
    /// response was a successful HTML document
    fn record(&self, key: &str, outcome: FetchOutcome) -> Vec<String> {
        let mut counters = self.lock(&self.counters);

        match outcome {
            FetchOutcome::Fetched(response) => {
                counters.fetched += 1;
                if response.from_cache {
                    counters.from_cache += 1;
                }
                if response.is_success() && response.is_html() {
                    counters.html_documents += 1;
                }
                drop(counters);

                self.store_response(key, &response, true)
            }
            FetchOutcome::Blocked(response) => {
                counters.blocked += 1;
                drop(counters);

                self.store_response(key, &response, false);

                if self.alternate_fetch {
                    let mut alternate = self.lock(&self.alternate);
                    if !alternate.contains(&response.url) {
                        alternate.push(response.url.clone());
                    }
                }
                Vec::new()
            }
            FetchOutcome::TimedOut => {
                counters.timed_out += 1;
                Vec::new()
            }
            FetchOutcome::Failed(_) => {
                counters.failed += 1;
                Vec::new()
            }
        }
    }

    fn store_response(&self, key: &str, response: &FetchedResponse, extract_content: bool) -> Vec<String> {
        let mut registry = self.lock(&self.registry);
        let Some(page) = registry.get_mut(key) else {
            tracing::warn!("Fetched {} but it is not in the registry", key);
            return Vec::new();
        };

        page.record_response(
            response.status,
            response.content_type.clone(),
            response.redirect(),
        );

        if extract_content && response.is_success() && response.is_html() {
            extract(page, &response.body)
        } else {
            Vec::new()
        }
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshots every known page, sorted by canonical key
    pub fn report(&self) -> Vec<PageReport> {
        build_report(&self.lock(&self.registry))
    }

    /// Returns a copy of the page stored under `key`
    pub fn page(&self, key: &str) -> Option<Page> {
        self.lock(&self.registry).get(key).cloned()
    }

    /// URIs of fair-use blocked pages, in the order they were fetched
    pub fn alternate_fetch_queue(&self) -> Vec<String> {
        self.lock(&self.alternate).clone()
    }

    pub fn statistics(&self) -> CrawlStatistics {
        let counters = self.lock(&self.counters).clone();
        let alternate = self.lock(&self.alternate).len();

        CrawlStatistics::collect(
            &self.lock(&self.registry),
            &counters,
            self.frontier.peak(),
            alternate,
        )
    }
}
