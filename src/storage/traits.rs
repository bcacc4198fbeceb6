//! Response cache trait and error types

use crate::storage::CachedResponse;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timestamp '{0}'")]
    Timestamp(String),

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Result type for cache operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend for persisting fetched responses between runs
///
/// Implementations must be safe to share between the producer and consumer
/// of a crawl.
pub trait ResponseStore: Send + Sync {
    /// Looks up a fresh response for `url`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(CachedResponse))` - A stored response that has not expired
    /// * `Ok(None)` - Nothing stored, or the stored response is stale
    /// * `Err(StorageError)` - The backend failed
    fn get(&self, url: &str) -> StorageResult<Option<CachedResponse>>;

    /// Stores (or replaces) the response for `url`
    fn put(&self, url: &str, response: &CachedResponse) -> StorageResult<()>;

    /// Number of stored responses, fresh or not
    fn len(&self) -> StorageResult<usize>;
}
