//! HTML parser for extracting links and metadata
//!
//! This module handles parsing fetched documents to extract:
//! - Link targets (from anchor, image and frame elements)
//! - Page title, description, keywords and `og:image` thumbnail

use crate::page::Page;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

/// Elements scanned for link targets, with the attribute holding the target
const LINK_SOURCES: [(&str, &str); 4] = [
    ("a[href]", "href"),
    ("img[src]", "src"),
    ("iframe[src]", "src"),
    ("frame[src]", "src"),
];

/// Metadata read from a document's head
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub thumbnail: Option<String>,
    pub keywords: BTreeSet<String>,
}

impl PageMetadata {
    /// Copies the metadata onto a page, keeping existing values where this has none
    pub fn apply_to(self, page: &mut Page) {
        if self.title.is_some() {
            page.title = self.title;
        }
        if self.summary.is_some() {
            page.summary = self.summary;
        }
        if self.thumbnail.is_some() {
            page.thumbnail = self.thumbnail;
        }
        page.keywords.extend(self.keywords);
    }
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub metadata: PageMetadata,

    /// Raw link strings, in document order, for the classifier
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// Targets are read from `<a href>`, `<img src>`, `<iframe src>` and
/// `<frame src>`.
///
/// - A bare anchor (`#...`) or the literal `.` is discarded
/// - A target with a scheme, a data URI, or a root-relative target (`/...`)
///   is returned verbatim
/// - Anything else is joined onto `page_path` with a `/` separator
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_path` - Canonical path of the page the document came from, or
///   `None` to extract metadata only
///
/// # Returns
///
/// The extracted metadata and raw links
///
/// # Example
///
/// ```
/// use sitegraph::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="child">Link</a></body></html>"#;
/// let parsed = parse_html(html, Some("/blog"));
/// assert_eq!(parsed.metadata.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["/blog/child".to_string()]);
/// ```
pub fn parse_html(html: &str, page_path: Option<&str>) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        metadata: extract_metadata(&document),
        links: page_path
            .map(|path| extract_links(&document, path))
            .unwrap_or_default(),
    }
}

/// Parses a document fetched for `page`, fills in the page's metadata and
/// returns the raw links to follow
///
/// Links are only returned for internal pages; external pages contribute
/// metadata only.
pub fn extract(page: &mut Page, html: &str) -> Vec<String> {
    let parsed = parse_html(html, page.path());
    parsed.metadata.apply_to(page);
    parsed.links
}

/// Extracts title, description, keywords and thumbnail
pub fn extract_metadata(document: &Html) -> PageMetadata {
    let keywords: BTreeSet<String> = meta_content(document, r#"meta[name="keywords"][content]"#)
        .map(|content| {
            content
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    PageMetadata {
        title: extract_title(document),
        summary: meta_content(document, r#"meta[name="description"][content]"#),
        thumbnail: meta_content(document, r#"meta[property="og:image"][content]"#),
        keywords,
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns the trimmed `content` attribute of the first element matching `selector`
fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .find_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all link targets from the HTML document
pub fn extract_links(document: &Html, page_path: &str) -> Vec<String> {
    let mut links = Vec::new();

    for (selector, attr) in LINK_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for element in document.select(&selector) {
            if let Some(link) = element
                .value()
                .attr(attr)
                .and_then(|target| validate_link(target, page_path))
            {
                links.push(link);
            }
        }
    }

    links
}

/// Filters a raw target and resolves it against the current page's path
///
/// Returns None for bare anchors and `.`.
fn validate_link(target: &str, page_path: &str) -> Option<String> {
    let target = target.trim();

    if target.is_empty() || target.starts_with('#') || target == "." {
        return None;
    }

    if target.starts_with('/') || target.starts_with("data:") || has_scheme(target) {
        return Some(target.to_string());
    }

    if page_path.ends_with('/') {
        Some(format!("{}{}", page_path, target))
    } else {
        Some(format!("{}/{}", page_path, target))
    }
}

/// Checks for a URL scheme (`letter *( letter / digit / "+" / "-" / "." ) ":"`)
fn has_scheme(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once(':') else {
        return false;
    };

    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
