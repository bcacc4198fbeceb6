//! Page kind definitions
//!
//! A page's kind decides which identity it is keyed under and whether it is
//! ever fetched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a page, carrying the data that only exists for that kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// Page on the site under crawl; keyed by its canonical site-relative path
    Internal { path: String },

    /// Off-site page; keyed by its canonicalized URL
    External,

    /// Non-fetchable identifier such as an ISBN, kept only for the reference trail
    Urn,
}

impl PageKind {
    /// Returns the plain tag for this kind
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Internal { .. } => KindTag::Internal,
            Self::External => KindTag::External,
            Self::Urn => KindTag::Urn,
        }
    }

    /// Returns the canonical path of an internal page
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Internal { path } => Some(path),
            _ => None,
        }
    }

    /// Returns true if pages of this kind are retrieved over HTTP
    pub fn is_fetchable(&self) -> bool {
        !matches!(self, Self::Urn)
    }
}

/// Payload-free kind tag, as it appears in configuration and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    Internal,
    External,
    Urn,
}

impl KindTag {
    /// Converts the tag to its report string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Urn => "urn",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
