//! URL handling module for sitegraph
//!
//! This module turns raw link strings into canonical identities: shortened
//! URL expansion, internal path normalization, rewrite and ignore rules, and
//! external URL canonicalization.

mod normalize;
mod rules;
mod shortened;

use crate::config::Config;
use crate::page::{KindTag, PageKind};
use crate::{ConfigError, UrlError};
use url::Url;

// Re-export main functions
pub use normalize::{canonicalize_external, internal_path, normalize_path};
pub use rules::PathRules;
pub use shortened::{ShortenedTable, ShortenedUrl};

/// A classified link, ready for the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Canonical identity: internal path or canonical external URL
    pub key: String,

    pub kind: PageKind,

    /// Location used for fetching
    pub uri: String,

    /// Short link that expanded to this target, if any
    pub slug: Option<String>,
}

/// Why a link never becomes a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Blank href/src
    Empty,
    /// In-page anchor (`#...`)
    Anchor,
    /// Inline `data:` URI
    DataUri,
    /// Internal path matched an ignore rule
    Ignored,
    /// Scheme other than http(s) or urn
    UnsupportedScheme,
    /// Could not be parsed or resolved
    Malformed,
}

/// Result of classifying a raw link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Dropped(DropReason),
    Target(LinkTarget),
}

impl Classification {
    pub fn target(self) -> Option<LinkTarget> {
        match self {
            Self::Target(target) => Some(target),
            Self::Dropped(_) => None,
        }
    }
}

/// Classifies and normalizes links for one site
///
/// # Classification Order
///
/// 1. Expand shortened URLs, adopting the declared kind and remembering the slug
/// 2. Drop anchors and data URIs
/// 3. Links under the site origin or starting with `/` are internal: resolve,
///    strip query and fragment, normalize the path
/// 4. Apply path rewrites
/// 5. Drop ignored paths (before any registry access)
/// 6. Everything else is external and canonicalized
#[derive(Debug, Clone)]
pub struct Classifier {
    base: Url,
    origin: String,
    rules: PathRules,
    shortened: ShortenedTable,
}

impl Classifier {
    /// Creates a classifier for the site at `site_base`
    ///
    /// # Returns
    ///
    /// * `Ok(Classifier)` - Ready to classify links
    /// * `Err(UrlError)` - `site_base` is not an absolute http(s) URL
    pub fn new(
        site_base: &str,
        rules: PathRules,
        shortened: ShortenedTable,
    ) -> Result<Self, UrlError> {
        let parsed = Url::parse(site_base).map_err(|e| UrlError::Parse(e.to_string()))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        if parsed.host_str().is_none() {
            return Err(UrlError::MissingHost);
        }

        let origin = parsed.origin().ascii_serialization();
        let base = Url::parse(&format!("{}/", origin)).map_err(|e| UrlError::Parse(e.to_string()))?;

        Ok(Self {
            base,
            origin,
            rules,
            shortened,
        })
    }

    /// Builds the classifier, rule tables and shortened table from configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let rules = PathRules::from_config(&config.rules);
        let shortened = ShortenedTable::from_config(&config.shortened, &config.site.base_url)?;

        Self::new(&config.site.base_url, rules, shortened)
            .map_err(|e| ConfigError::InvalidUrl(format!("base-url: {}", e)))
    }

    /// Origin of the site under crawl, without trailing slash
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Classifies a raw link string
    ///
    /// # Examples
    ///
    /// ```
    /// use sitegraph::url::{Classifier, PathRules, ShortenedTable};
    ///
    /// let classifier = Classifier::new(
    ///     "https://example.com",
    ///     PathRules::default(),
    ///     ShortenedTable::new(),
    /// )
    /// .unwrap();
    ///
    /// let target = classifier.classify("/blog/?page=2#top").target().unwrap();
    /// assert_eq!(target.key, "/blog");
    /// assert_eq!(target.uri, "https://example.com/blog");
    /// ```
    pub fn classify(&self, raw: &str) -> Classification {
        let raw = raw.trim();

        let (link, declared, slug) = match self.lookup_shortened(raw) {
            Some(short) => (short.target.as_str(), Some(short.kind), Some(short.key.clone())),
            None => (raw, None, None),
        };

        if link.is_empty() {
            return Classification::Dropped(DropReason::Empty);
        }

        if link.starts_with('#') {
            return Classification::Dropped(DropReason::Anchor);
        }

        if has_scheme(link, "data") {
            return Classification::Dropped(DropReason::DataUri);
        }

        match declared {
            Some(KindTag::Urn) => return self.urn(link, slug),
            Some(KindTag::Internal) => return self.internal(link, slug),
            Some(KindTag::External) => return self.external(link, slug),
            None => {}
        }

        // Protocol-relative links take the site's own scheme
        let protocol_relative;
        let link = if link.starts_with("//") {
            match self.base.join(link) {
                Ok(url) => {
                    protocol_relative = url.to_string();
                    protocol_relative.as_str()
                }
                Err(e) => {
                    tracing::warn!("Dropping malformed link {}: {}", link, e);
                    return Classification::Dropped(DropReason::Malformed);
                }
            }
        } else {
            link
        };

        if link.starts_with('/') || self.is_same_origin(link) {
            return self.internal(link, slug);
        }

        if has_scheme(link, "urn") {
            return self.urn(link, slug);
        }

        self.external(link, slug)
    }

    /// Checks if an absolute link points at the site under crawl
    fn is_same_origin(&self, link: &str) -> bool {
        if link.starts_with(&self.origin) {
            return true;
        }

        Url::parse(link)
            .map(|url| url.origin() == self.base.origin())
            .unwrap_or(false)
    }

    /// Finds a shortened entry by the raw link or by its site-relative form
    fn lookup_shortened(&self, raw: &str) -> Option<&ShortenedUrl> {
        if self.shortened.is_empty() {
            return None;
        }

        self.shortened.get(raw).or_else(|| {
            raw.strip_prefix(&self.origin)
                .filter(|rest| rest.starts_with('/'))
                .and_then(|rest| self.shortened.get(rest))
        })
    }

    fn internal(&self, link: &str, slug: Option<String>) -> Classification {
        let resolved = match self.base.join(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Dropping unresolvable internal link {}: {}", link, e);
                return Classification::Dropped(DropReason::Malformed);
            }
        };

        // Shares the origin string prefix but is another host, e.g. example.com.evil.test
        if resolved.origin() != self.base.origin() {
            return self.external(link, slug);
        }

        let normalized = internal_path(&resolved);
        let path = self.rules.rewrite(&normalized).to_string();

        if self.rules.is_ignored(&path) {
            tracing::trace!("Ignoring internal path {}", path);
            return Classification::Dropped(DropReason::Ignored);
        }

        Classification::Target(LinkTarget {
            key: path.clone(),
            uri: format!("{}{}", self.origin, path),
            kind: PageKind::Internal { path },
            slug,
        })
    }

    fn external(&self, link: &str, slug: Option<String>) -> Classification {
        match canonicalize_external(link) {
            Ok(uri) => Classification::Target(LinkTarget {
                key: uri.clone(),
                kind: PageKind::External,
                uri,
                slug,
            }),
            Err(UrlError::UnsupportedScheme(scheme)) => {
                tracing::warn!("Dropping link with unsupported scheme '{}': {}", scheme, link);
                Classification::Dropped(DropReason::UnsupportedScheme)
            }
            Err(e) => {
                tracing::warn!("Dropping malformed link {}: {}", link, e);
                Classification::Dropped(DropReason::Malformed)
            }
        }
    }

    fn urn(&self, link: &str, slug: Option<String>) -> Classification {
        let key = link.trim().to_string();
        Classification::Target(LinkTarget {
            uri: key.clone(),
            key,
            kind: PageKind::Urn,
            slug,
        })
    }
}

/// Checks for a case-insensitive `<scheme>:` prefix
fn has_scheme(link: &str, scheme: &str) -> bool {
    link.len() > scheme.len()
        && link.as_bytes()[scheme.len()] == b':'
        && link[..scheme.len()].eq_ignore_ascii_case(scheme)
}
