//! JSON report of every known page
//!
//! The report is the contract consumed by downstream graph loading: one
//! record per page, sorted by canonical key, with set fields as sorted lists.

use crate::page::{KindTag, Page, Registry};
use crate::CrawlError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Snapshot of one page as written to the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub uri: String,
    pub kind: KindTag,
    pub path: Option<String>,
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub status: Option<u16>,
    pub redirect: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub thumbnail: Option<String>,
    pub keywords: Vec<String>,
    pub outbound: Vec<String>,
    pub refs: Vec<String>,
    #[serde(rename = "raw")]
    pub raw_refs: Vec<String>,
}

impl From<&Page> for PageReport {
    fn from(page: &Page) -> Self {
        Self {
            uri: page.uri.clone(),
            kind: page.tag(),
            path: page.path().map(str::to_string),
            slug: page.slug.clone(),
            content_type: page.content_type.clone(),
            status: page.status_code,
            redirect: page.redirect.clone(),
            title: page.title.clone(),
            summary: page.summary.clone(),
            thumbnail: page.thumbnail.clone(),
            keywords: page.keywords.iter().cloned().collect(),
            outbound: page.outbound.iter().cloned().collect(),
            refs: page.refs.iter().cloned().collect(),
            raw_refs: page.raw_refs.iter().cloned().collect(),
        }
    }
}

/// Snapshots the registry, sorted by canonical key
pub fn build_report(registry: &Registry) -> Vec<PageReport> {
    registry.pages().map(PageReport::from).collect()
}

/// Writes the report as a pretty-printed JSON array
///
/// # Arguments
///
/// * `path` - Destination file, replaced if it exists
/// * `reports` - Page snapshots in report order
///
/// # Returns
///
/// * `Ok(())` - The report was written
/// * `Err(CrawlError)` - The file could not be created or written
pub fn write_report(path: &Path, reports: &[PageReport]) -> Result<(), CrawlError> {
    write_json(path, &reports)?;
    tracing::info!("Wrote {} pages to {}", reports.len(), path.display());
    Ok(())
}

/// Writes the URIs that need the alternate fetcher as a JSON array
pub fn write_alternate_list(path: &Path, uris: &[String]) -> Result<(), CrawlError> {
    write_json(path, &uris)?;
    tracing::info!(
        "Wrote {} alternate-fetch URIs to {}",
        uris.len(),
        path.display()
    );
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CrawlError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
