//! Shortened URL table
//!
//! Short links (e.g. `/s/42`) are expanded through a lookup table before
//! classification. Each entry carries the kind of its target, decided once
//! when the table is loaded.

use crate::config::ShortenedConfig;
use crate::page::KindTag;
use crate::url::normalize::canonicalize_external;
use crate::ConfigError;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One short link and its expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenedUrl {
    /// The short link as it appears in documents
    pub key: String,

    /// Expanded target
    pub target: String,

    pub kind: KindTag,
}

/// Immutable lookup table of short links
#[derive(Debug, Clone, Default)]
pub struct ShortenedTable {
    entries: HashMap<String, ShortenedUrl>,
}

impl ShortenedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from configuration
    ///
    /// Inline entries keep their declared kind. Ids loaded from the JSON file
    /// get `prefix` prepended and their kind inferred from the target.
    /// External targets are stored canonicalized.
    ///
    /// # Arguments
    ///
    /// * `config` - Shortened URL configuration
    /// * `site_base` - Origin of the site under crawl
    ///
    /// # Returns
    ///
    /// * `Ok(ShortenedTable)` - The loaded table
    /// * `Err(ConfigError)` - The file could not be read or parsed, or an
    ///   inline external target is not a valid URL
    pub fn from_config(config: &ShortenedConfig, site_base: &str) -> Result<Self, ConfigError> {
        let mut table = Self::new();

        if let Some(file) = &config.file {
            let loaded = load_shortened_file(Path::new(file))?;
            table.extend_inferred(&loaded, &config.prefix, site_base);
        }

        for (key, entry) in &config.entries {
            let target = match entry.kind {
                KindTag::External => canonicalize_external(&entry.target).map_err(|e| {
                    ConfigError::InvalidUrl(format!(
                        "Shortened entry '{}' target '{}': {}",
                        key, entry.target, e
                    ))
                })?,
                _ => entry.target.trim().to_string(),
            };
            table.insert(ShortenedUrl {
                key: key.clone(),
                target,
                kind: entry.kind,
            });
        }

        tracing::debug!("Loaded {} shortened URLs", table.len());
        Ok(table)
    }

    /// Adds short ids whose kind is inferred from the target
    ///
    /// Ids that are already absolute http(s) URLs are skipped, as are external
    /// targets that cannot be canonicalized.
    pub fn extend_inferred(&mut self, ids: &BTreeMap<String, String>, prefix: &str, site_base: &str) {
        for (id, target) in ids {
            if id.starts_with("http://") || id.starts_with("https://") {
                continue;
            }

            let key = format!("{}{}", prefix, id);
            let target = target.trim();

            let (kind, target) = if target.starts_with("urn:") {
                (KindTag::Urn, target.to_string())
            } else if target.starts_with(site_base) {
                (KindTag::Internal, target.to_string())
            } else {
                match canonicalize_external(target) {
                    Ok(canonical) => (KindTag::External, canonical),
                    Err(e) => {
                        tracing::warn!("Skipping shortened URL {} -> {}: {}", key, target, e);
                        continue;
                    }
                }
            };

            self.insert(ShortenedUrl { key, target, kind });
        }
    }

    pub fn insert(&mut self, entry: ShortenedUrl) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&ShortenedUrl> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads a JSON object mapping short ids to expanded targets
fn load_shortened_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
