use crate::config::types::{
    CacheConfig, Config, CrawlerConfig, OutputConfig, RulesConfig, ShortenedConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_cache_config(&config.cache)?;
    validate_rules(&config.rules)?;
    validate_shortened(&config.shortened)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site origin and sitemap location
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("sitemap-url", &config.sitemap_url)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.frontier_max_size < 1 {
        return Err(ConfigError::Validation(format!(
            "frontier-max-size must be >= 1, got {}",
            config.frontier_max_size
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-timeout-secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "cache path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the rewrite and ignore tables
///
/// Every entry is a site-relative path, so it must start with `/`.
fn validate_rules(rules: &RulesConfig) -> Result<(), ConfigError> {
    for (alias, target) in &rules.rewrites {
        validate_site_path("rewrites", alias)?;
        validate_site_path("rewrites", target)?;
    }

    for path in &rules.ignored_exact {
        validate_site_path("ignored-exact", path)?;
    }

    for prefix in &rules.ignored_prefixes {
        validate_site_path("ignored-prefixes", prefix)?;
    }

    Ok(())
}

fn validate_shortened(config: &ShortenedConfig) -> Result<(), ConfigError> {
    if config.prefix.is_empty() {
        return Err(ConfigError::Validation(
            "shortened prefix cannot be empty".to_string(),
        ));
    }

    for (key, entry) in &config.entries {
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "shortened entry key cannot be empty".to_string(),
            ));
        }

        if entry.target.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "shortened entry '{}' has an empty target",
                key
            )));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report-path cannot be empty".to_string(),
        ));
    }

    if matches!(config.alternate_fetch_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "alternate-fetch-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Parses `value` and requires an http(s) scheme with a host
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}

fn validate_site_path(table: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{} entry '{}' must start with '/'",
            table, path
        )));
    }
    Ok(())
}
