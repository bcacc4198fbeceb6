use crate::config::RulesConfig;
use std::collections::{BTreeMap, BTreeSet};

/// Path policy applied to internal links: aliases and ignore lists
#[derive(Debug, Clone, Default)]
pub struct PathRules {
    rewrites: BTreeMap<String, String>,
    ignored_exact: BTreeSet<String>,
    ignored_prefixes: Vec<String>,
}

impl PathRules {
    pub fn new(
        rewrites: BTreeMap<String, String>,
        ignored_exact: BTreeSet<String>,
        ignored_prefixes: Vec<String>,
    ) -> Self {
        Self {
            rewrites,
            ignored_exact,
            ignored_prefixes,
        }
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        Self::new(
            config.rewrites.clone(),
            config.ignored_exact.clone(),
            config.ignored_prefixes.clone(),
        )
    }

    /// Maps a known alias to its canonical path; other paths pass through
    ///
    /// A single lookup: rewrite targets are not rewritten again.
    pub fn rewrite<'a>(&'a self, path: &'a str) -> &'a str {
        self.rewrites.get(path).map(String::as_str).unwrap_or(path)
    }

    /// Checks if a canonical path is excluded from the crawl
    ///
    /// # Returns
    ///
    /// * `true` - The path is in the exact set or starts with an ignored prefix
    /// * `false` - Otherwise
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignored_exact.contains(path)
            || self
                .ignored_prefixes
                .iter()
                .any(|prefix| matches_prefix(prefix, path))
    }
}

/// Checks if `candidate` falls under `prefix`
///
/// A prefix without a trailing slash also matches the bare path itself, so
/// `/docs/` matches `/docs/api` and the canonical `/docs`.
fn matches_prefix(prefix: &str, candidate: &str) -> bool {
    if candidate.starts_with(prefix) {
        return true;
    }

    prefix
        .strip_suffix('/')
        .map(|bare| !bare.is_empty() && candidate == bare)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PathRules {
        PathRules::new(
            BTreeMap::from([
                ("/rates".to_string(), "/flywheel".to_string()),
                ("/watchlist".to_string(), "/events".to_string()),
            ]),
            BTreeSet::from(["/merch".to_string(), "/sitemap.xml".to_string()]),
            vec!["/docs/".to_string(), "/auth/".to_string()],
        )
    }

    #[test]
    fn test_rewrite_alias() {
        let rules = rules();
        assert_eq!(rules.rewrite("/rates"), "/flywheel");
        assert_eq!(rules.rewrite("/watchlist"), "/events");
    }

    #[test]
    fn test_rewrite_passthrough() {
        let rules = rules();
        assert_eq!(rules.rewrite("/about"), "/about");
        assert_eq!(rules.rewrite("/flywheel"), "/flywheel");
    }

    #[test]
    fn test_exact_ignore() {
        let rules = rules();
        assert!(rules.is_ignored("/merch"));
        assert!(!rules.is_ignored("/merch/shirt"));
        assert!(!rules.is_ignored("/merchandise"));
    }

    #[test]
    fn test_prefix_ignore() {
        let rules = rules();
        assert!(rules.is_ignored("/docs/api"));
        assert!(rules.is_ignored("/docs/api/v2"));
        assert!(rules.is_ignored("/auth/login"));
        assert!(!rules.is_ignored("/documents"));
    }

    #[test]
    fn test_prefix_matches_bare_directory() {
        assert!(matches_prefix("/docs/", "/docs"));
        assert!(matches_prefix("/", "/anything-else"));
        assert!(!matches_prefix("/docs/", "/documents"));
    }

    #[test]
    fn test_empty_rules_ignore_nothing() {
        let rules = PathRules::default();
        assert!(!rules.is_ignored("/"));
        assert_eq!(rules.rewrite("/x"), "/x");
    }
}
