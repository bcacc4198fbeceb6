//! Crawl statistics
//!
//! This module provides the counters the crawler keeps while running and
//! the summary printed once a crawl is over.

use crate::page::{KindTag, Registry};
use std::collections::HashMap;

/// Running counters updated by the consumer as pages are fetched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchCounters {
    /// Responses received, from the network or the cache
    pub fetched: u64,

    /// Responses served from the cache
    pub from_cache: u64,

    /// Successful HTML documents passed to the extractor
    pub html_documents: u64,

    /// Fair-use blocked responses
    pub blocked: u64,

    pub timed_out: u64,
    pub failed: u64,

    /// Links dropped by the classifier (anchors, ignored paths, bad schemes)
    pub links_dropped: u64,
}

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of pages in the registry
    pub total_pages: u64,

    /// Count of pages by kind
    pub pages_by_kind: HashMap<KindTag, u64>,

    /// Total number of outbound links recorded
    pub total_links: u64,

    pub counters: FetchCounters,

    /// Largest number of pages waiting in the frontier at once
    pub frontier_peak: usize,

    /// Pages queued for the alternate fetcher
    pub alternate_fetch: usize,
}

impl CrawlStatistics {
    /// Builds statistics from the registry and the crawl counters
    ///
    /// # Arguments
    ///
    /// * `registry` - Pages known at the end of the crawl
    /// * `counters` - Fetch counters kept by the consumer
    /// * `frontier_peak` - Largest frontier length observed
    /// * `alternate_fetch` - Length of the alternate-fetch list
    pub fn collect(
        registry: &Registry,
        counters: &FetchCounters,
        frontier_peak: usize,
        alternate_fetch: usize,
    ) -> Self {
        let mut pages_by_kind = HashMap::new();
        let mut total_links = 0;

        for page in registry.pages() {
            *pages_by_kind.entry(page.tag()).or_insert(0) += 1;
            total_links += page.outbound.len() as u64;
        }

        Self {
            total_pages: registry.len() as u64,
            pages_by_kind,
            total_links,
            counters: counters.clone(),
            frontier_peak,
            alternate_fetch,
        }
    }

    pub fn pages_of_kind(&self, kind: KindTag) -> u64 {
        self.pages_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Total links found: {}", stats.total_links);
    println!("  Links dropped: {}", stats.counters.links_dropped);
    println!("  Frontier peak: {}", stats.frontier_peak);
    println!();

    println!("Pages by Kind:");
    for kind in [KindTag::Internal, KindTag::External, KindTag::Urn] {
        let count = stats.pages_of_kind(kind);
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind, count, percentage);
    }
    println!();

    let counters = &stats.counters;
    println!("Fetches:");
    println!(
        "  Responses: {} ({} from cache)",
        counters.fetched, counters.from_cache
    );
    println!("  HTML documents: {}", counters.html_documents);
    println!("  Fair-use blocked: {}", counters.blocked);
    println!("  Timed out: {}", counters.timed_out);
    println!("  Failed: {}", counters.failed);
    println!();

    if stats.alternate_fetch > 0 {
        println!(
            "Queued for alternate fetch: {}",
            stats.alternate_fetch
        );
        println!();
    }
}
