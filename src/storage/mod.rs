//! Storage module for the response cache
//!
//! Successful responses are persisted so that repeated runs against the same
//! site can skip the network. The cache is keyed by requested URL and honors
//! an optional expiry age.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCache;
pub use traits::{ResponseStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

/// A response as stored in the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// URL after redirects
    pub final_url: String,
    pub status: u16,
    /// MIME type without parameters, lowercased
    pub content_type: Option<String>,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Opens the on-disk response cache
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `expire_after_secs` - Maximum age of a usable entry, or `None` for no expiry
///
/// # Returns
///
/// * `Ok(SqliteCache)` - Successfully opened cache
/// * `Err(StorageError)` - Failed to open the database
pub fn open_cache(path: &Path, expire_after_secs: Option<u64>) -> StorageResult<SqliteCache> {
    SqliteCache::open(path, expire_after_secs)
}
