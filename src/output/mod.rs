//! Output module for crawl results
//!
//! This module handles:
//! - Serializing the registry into the ordered JSON report
//! - Writing the list of pages that need the alternate fetcher
//! - Recording and printing crawl statistics

mod report;
pub mod stats;

pub use report::{build_report, write_alternate_list, write_report, PageReport};
pub use stats::{print_statistics, CrawlStatistics, FetchCounters};
