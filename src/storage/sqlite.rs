//! SQLite response cache
//!
//! This module provides a SQLite-based implementation of the ResponseStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResponseStore, StorageError, StorageResult};
use crate::storage::CachedResponse;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;

/// SQLite cache backend
pub struct SqliteCache {
    conn: Mutex<Connection>,
    expire_after_secs: Option<u64>,
}

impl SqliteCache {
    /// Opens (or creates) the cache database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `expire_after_secs` - Age after which stored responses are ignored;
    ///   `None` keeps them forever
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCache)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path, expire_after_secs: Option<u64>) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::with_connection(conn, expire_after_secs))
    }

    /// Creates an in-memory cache
    pub fn open_in_memory(expire_after_secs: Option<u64>) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::with_connection(conn, expire_after_secs))
    }

    fn with_connection(conn: Connection, expire_after_secs: Option<u64>) -> Self {
        Self {
            conn: Mutex::new(conn),
            expire_after_secs,
        }
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        let Some(max_age) = self.expire_after_secs else {
            return true;
        };

        // Entries stamped in the future count as fresh
        let age = Utc::now().signed_duration_since(fetched_at).num_seconds();
        u64::try_from(age).map_or(true, |age| age <= max_age)
    }
}

impl ResponseStore for SqliteCache {
    fn get(&self, url: &str) -> StorageResult<Option<CachedResponse>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

        let row = conn
            .query_row(
                "SELECT final_url, status, content_type, body, fetched_at
                 FROM responses WHERE key = ?1",
                params![cache_key(url)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((final_url, status, content_type, body, fetched_at)) = row else {
            return Ok(None);
        };

        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|_| StorageError::Timestamp(fetched_at.clone()))?
            .with_timezone(&Utc);

        if !self.is_fresh(fetched_at) {
            tracing::trace!("Cached response for {} is stale", url);
            return Ok(None);
        }

        Ok(Some(CachedResponse {
            final_url,
            status,
            content_type,
            body,
            fetched_at,
        }))
    }

    fn put(&self, url: &str, response: &CachedResponse) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

        conn.execute(
            "INSERT OR REPLACE INTO responses
             (key, url, final_url, status, content_type, body, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                cache_key(url),
                url,
                response.final_url,
                response.status,
                response.content_type,
                response.body,
                response.fetched_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Hex SHA-256 of the requested URL
fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
