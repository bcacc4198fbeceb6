//! Registry of known pages
//!
//! The registry owns the create-or-append decision: a page is created exactly
//! once, at the first encounter of its canonical key, and every later
//! encounter only adds back-references.

use crate::page::record::Page;
use crate::url::LinkTarget;
use std::collections::BTreeMap;

/// Outcome of resolving a link target against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A new page was inserted under `key`
    Created { key: String, fetchable: bool },

    /// `key` was already known
    Existing { key: String },
}

impl Resolution {
    pub fn key(&self) -> &str {
        match self {
            Self::Created { key, .. } | Self::Existing { key } => key,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// Returns the key to put on the frontier, if the page is new and fetchable
    pub fn into_frontier_key(self) -> Option<String> {
        match self {
            Self::Created {
                key,
                fetchable: true,
            } => Some(key),
            _ => None,
        }
    }
}

/// Identity-keyed map of every page seen during a crawl run
///
/// Keys are ordered, so iteration yields pages sorted by canonical key.
#[derive(Debug, Default)]
pub struct Registry {
    pages: BTreeMap<String, Page>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the page for `target`, creating it on first encounter
    ///
    /// When `referrer` is given, the referrer's key is added to the page's
    /// `refs` (if the link came through a shortened URL) or `raw_refs`, and
    /// the page's key is added to the referrer's `outbound`. Both happen
    /// whether or not the page was just created.
    ///
    /// # Arguments
    ///
    /// * `target` - Classified link target
    /// * `referrer` - Canonical key of the page the link was found on
    ///
    /// # Returns
    ///
    /// `Resolution::Created` if the key was new, so the caller can enqueue it;
    /// `Resolution::Existing` otherwise.
    pub fn resolve_or_create(&mut self, target: LinkTarget, referrer: Option<&str>) -> Resolution {
        let LinkTarget {
            key,
            kind,
            uri,
            slug,
        } = target;
        let via_shortened = slug.is_some();

        let resolution = if self.pages.contains_key(&key) {
            Resolution::Existing { key }
        } else {
            let fetchable = kind.is_fetchable();
            tracing::debug!("New page {} ({})", key, kind.tag());
            self.pages.insert(key.clone(), Page::new(uri, kind, slug));
            Resolution::Created { key, fetchable }
        };

        if let Some(referrer) = referrer {
            self.link(referrer, resolution.key(), via_shortened);
        }

        resolution
    }

    /// Records a reference from `referrer` to the page at `key`
    fn link(&mut self, referrer: &str, key: &str, via_shortened: bool) {
        if let Some(page) = self.pages.get_mut(key) {
            page.add_ref(referrer, via_shortened);
        }

        match self.pages.get_mut(referrer) {
            Some(page) => {
                page.outbound.insert(key.to_string());
            }
            None => tracing::debug!("Referrer {} is not a known page", referrer),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Page> {
        self.pages.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Page> {
        self.pages.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pages.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Iterates over pages in canonical key order
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }
}
