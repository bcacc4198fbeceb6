use crate::UrlError;
use url::Url;

/// Canonicalizes an external URL into a stable identity key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme and a host
/// 3. Lowercase scheme and host, drop default ports (done by the parser)
/// 4. Empty path becomes `/`
/// 5. Remove fragment (everything after #)
/// 6. Sort query parameters; remove an empty query string (trailing ?)
///
/// Unlike internal paths, a non-root trailing slash is kept: off-site
/// servers may treat `/a` and `/a/` as different resources.
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
///
/// # Returns
///
/// * `Ok(String)` - Canonical URL
/// * `Err(UrlError)` - Failed to parse, or the scheme is not http(s)
///
/// # Examples
///
/// ```
/// use sitegraph::url::canonicalize_external;
///
/// let url = canonicalize_external("HTTP://Example.com/a?").unwrap();
/// assert_eq!(url, "http://example.com/a");
/// ```
pub fn canonicalize_external(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url.to_string())
}

/// Returns the canonical site-relative path of an already-resolved internal URL
///
/// Query string and fragment are not part of the path, so they never reach
/// the identity key.
pub fn internal_path(url: &Url) -> String {
    normalize_path(url.path())
}

/// Normalizes a URL path by removing dot segments, redundant separators and
/// trailing slashes
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Empty segments come from repeated slashes
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Collects query parameters sorted by key, then value
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}
