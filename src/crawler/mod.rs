//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with caching and retry logic
//! - HTML parsing and link extraction
//! - The bounded frontier shared by producer and consumer
//! - Sitemap seeding and overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod sitemap;

pub use coordinator::Crawler;
pub use fetcher::{build_http_client, FetchOutcome, FetchedResponse, Fetcher, FAIR_USE_BLOCKED};
pub use frontier::Frontier;
pub use parser::{extract, extract_links, extract_metadata, parse_html, PageMetadata, ParsedPage};
pub use sitemap::{fetch_sitemap, parse_sitemap};

use crate::config::Config;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the response cache and build the HTTP client
/// 2. Seed the frontier from the sitemap
/// 3. Fetch pages and follow the links they contain
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Crawler)` - Crawl completed; query it for the report and statistics
/// * `Err(CrawlError)` - The crawler could not be set up
pub async fn crawl(config: &Config) -> Result<Crawler, CrawlError> {
    let crawler = Crawler::new(config)?;
    crawler.crawl().await;
    Ok(crawler)
}
