//! The page record kept for every canonical identity

use crate::page::kind::{KindTag, PageKind};
use std::collections::BTreeSet;

/// One canonical web resource found during the crawl
///
/// Fetch fields (`content_type`, `status_code`, `redirect`) are filled in by
/// the fetcher; metadata fields (`title`, `summary`, `thumbnail`, `keywords`)
/// by the extractor. Reference sets only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Fully-resolved location used for fetching
    pub uri: String,

    pub kind: PageKind,

    /// Shortened-URL key that resolved to this page at first encounter
    pub slug: Option<String>,

    /// MIME type without parameters
    pub content_type: Option<String>,

    pub status_code: Option<u16>,

    /// Final URL, if the response went through redirects
    pub redirect: Option<String>,

    pub title: Option<String>,
    pub summary: Option<String>,
    pub thumbnail: Option<String>,
    pub keywords: BTreeSet<String>,

    /// Canonical keys of the pages this page links to
    pub outbound: BTreeSet<String>,

    /// Referrers that reached this page through a shortened URL
    pub refs: BTreeSet<String>,

    /// Referrers that reached this page through a direct link
    pub raw_refs: BTreeSet<String>,
}

impl Page {
    /// Creates a page with no fetch results, metadata or references
    pub fn new(uri: impl Into<String>, kind: PageKind, slug: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            kind,
            slug,
            content_type: None,
            status_code: None,
            redirect: None,
            title: None,
            summary: None,
            thumbnail: None,
            keywords: BTreeSet::new(),
            outbound: BTreeSet::new(),
            refs: BTreeSet::new(),
            raw_refs: BTreeSet::new(),
        }
    }

    /// Canonical identity: the path for internal pages, the URI otherwise
    pub fn key(&self) -> &str {
        self.kind.path().unwrap_or(&self.uri)
    }

    pub fn path(&self) -> Option<&str> {
        self.kind.path()
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    /// Records a back-reference from `referrer`
    ///
    /// Referrers that came through a shortened URL go to `refs`, direct
    /// links to `raw_refs`.
    pub fn add_ref(&mut self, referrer: &str, via_shortened: bool) {
        if via_shortened {
            self.refs.insert(referrer.to_string());
        } else {
            self.raw_refs.insert(referrer.to_string());
        }
    }

    /// Returns what the fetcher needs to retrieve this page
    ///
    /// URN pages have no fetch target, so they can never reach the network.
    pub fn fetch_target(&self) -> Option<FetchTarget> {
        match &self.kind {
            PageKind::Urn => None,
            PageKind::Internal { .. } => Some(FetchTarget {
                uri: self.uri.clone(),
                expand: true,
            }),
            PageKind::External => Some(FetchTarget {
                uri: self.uri.clone(),
                expand: false,
            }),
        }
    }

    /// Stores the response facts reported by the fetcher
    pub fn record_response(
        &mut self,
        status_code: u16,
        content_type: Option<String>,
        redirect: Option<String>,
    ) {
        self.status_code = Some(status_code);
        self.content_type = content_type;
        self.redirect = redirect;
    }

    /// Returns true if the recorded content type is HTML
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref() == Some("text/html")
    }
}

/// A fetchable location, only obtainable from an internal or external page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    uri: String,
    expand: bool,
}

impl FetchTarget {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns true if links found on the fetched document should be followed
    pub fn expands(&self) -> bool {
        self.expand
    }
}
