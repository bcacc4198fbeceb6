//! Sitemap feed for seeding the crawl
//!
//! A sitemap is an XML document whose top-level entries each hold one
//! location child:
//!
//! ```xml
//! <urlset>
//!   <url><loc>https://example.com/x</loc></url>
//! </urlset>
//! ```

use crate::crawler::fetcher::Fetcher;
use crate::CrawlError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parses sitemap XML into its location entries, in document order
///
/// The location of an entry is the text of its first child element, so the
/// namespace prefix (or lack of one) does not matter. Entries without a
/// non-empty location are skipped.
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The seed locations
/// * `Err(CrawlError::Sitemap)` - The document is not well-formed XML
pub fn parse_sitemap(url: &str, xml: &str) -> Result<Vec<String>, CrawlError> {
    let malformed = |message: String| CrawlError::Sitemap {
        url: url.to_string(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut seeds = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    // Depth 1 is the root, 2 an entry, 3 the entry's children
    let mut entry_has_location = false;
    let mut location: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                match depth {
                    1 => saw_root = true,
                    2 => entry_has_location = false,
                    3 if !entry_has_location => {
                        entry_has_location = true;
                        location = Some(String::new());
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(_)) => match depth {
                0 => saw_root = true,
                2 => entry_has_location = true,
                _ => {}
            },
            Ok(Event::Text(text)) if depth == 3 => {
                if let Some(buffer) = location.as_mut() {
                    let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                    buffer.push_str(&text);
                }
            }
            Ok(Event::CData(data)) if depth == 3 => {
                if let Some(buffer) = location.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(_)) => {
                if depth == 3 {
                    if let Some(found) = location.take() {
                        let found = found.trim();
                        if !found.is_empty() {
                            seeds.push(found.to_string());
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(malformed(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !saw_root {
        return Err(malformed("no root element".to_string()));
    }

    if depth != 0 {
        return Err(malformed("unexpected end of document".to_string()));
    }

    Ok(seeds)
}

/// Fetches and parses the sitemap
///
/// Any fetch or parse failure is logged and yields no seeds; the crawl
/// carries on with whatever else it discovers.
pub async fn fetch_sitemap(fetcher: &Fetcher, url: &str) -> Vec<String> {
    let xml = match fetcher.get_text(url).await {
        Ok(xml) => xml,
        Err(e) => {
            tracing::error!("Failed to fetch sitemap {}: {}", url, e);
            return Vec::new();
        }
    };

    match parse_sitemap(url, &xml) {
        Ok(seeds) => {
            tracing::info!("Sitemap {} lists {} locations", url, seeds.len());
            seeds
        }
        Err(e) => {
            tracing::error!("{}", e);
            Vec::new()
        }
    }
}
