//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end. A second mock server stands in for
//! off-site pages: a different port is a different origin.

use sitegraph::config::{
    CacheConfig, Config, CrawlerConfig, OutputConfig, RulesConfig, ShortenedConfig,
    ShortenedEntry, SiteConfig,
};
use sitegraph::crawler::{crawl, Crawler, FetchOutcome, Fetcher};
use sitegraph::page::KindTag;
use sitegraph::storage::{ResponseStore, SqliteCache};
use std::collections::BTreeMap;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the site served at `base_url`
fn create_test_config(base_url: &str) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            sitemap_url: format!("{}/sitemap.xml", base_url),
        },
        crawler: CrawlerConfig {
            fetch_timeout_secs: 2,
            ..CrawlerConfig::default()
        },
        cache: CacheConfig {
            path: "unused.sqlite".to_string(),
            expire_after_secs: None,
        },
        rules: RulesConfig::default(),
        shortened: ShortenedConfig::default(),
        output: OutputConfig {
            report_path: "report.json".to_string(),
            alternate_fetch_path: None,
        },
    }
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

fn sitemap(base_url: &str, paths: &[&str]) -> ResponseTemplate {
    let entries: String = paths
        .iter()
        .map(|p| format!("<url><loc>{}{}</loc></url>", base_url, p))
        .collect();

    ResponseTemplate::new(200).set_body_raw(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        ),
        "application/xml",
    )
}

async fn mount(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts a page that must never be requested
async fn mount_never(server: &MockServer, at: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html("<title>should not be fetched</title>"))
        .expect(0)
        .mount(server)
        .await;
}

async fn run(config: &Config) -> Crawler {
    let crawler = Crawler::with_cache(config, None).expect("Failed to build crawler");
    crawler.crawl().await;
    crawler
}

#[tokio::test]
async fn test_full_crawl_with_external_page() {
    let site = MockServer::start().await;
    let ext = MockServer::start().await;
    let base = site.uri();
    let ext_page = format!("{}/p", ext.uri());

    mount(&site, "/sitemap.xml", sitemap(&base, &["/x", "/y", "/z"])).await;
    mount(
        &site,
        "/x",
        html(format!(
            r#"<html><head><title>X</title></head><body>
            <a href="/y">Y</a>
            <a href="{}">External</a>
            </body></html>"#,
            ext_page
        )),
    )
    .await;
    mount(&site, "/y", html(r#"<title>Y</title><a href="/x/">back</a>"#)).await;
    mount(&site, "/z", html("<title>Z</title>")).await;

    mount(
        &ext,
        "/p",
        html(
            r#"<html><head><title>Elsewhere</title>
            <meta name="description" content="An external page">
            </head><body><a href="/q">not followed</a></body></html>"#,
        ),
    )
    .await;
    mount_never(&ext, "/q").await;

    let crawler = run(&create_test_config(&base)).await;
    let report = crawler.report();

    let keys: Vec<String> = report
        .iter()
        .map(|r| r.path.clone().unwrap_or_else(|| r.uri.clone()))
        .collect();
    assert_eq!(keys, vec!["/x", "/y", "/z", ext_page.as_str()]);

    let x = crawler.page("/x").unwrap();
    assert_eq!(x.title.as_deref(), Some("X"));
    assert_eq!(x.status_code, Some(200));
    assert_eq!(x.content_type.as_deref(), Some("text/html"));
    assert!(x.outbound.contains("/y"));
    assert!(x.outbound.contains(&ext_page));

    let y = crawler.page("/y").unwrap();
    assert!(y.raw_refs.contains("/x"));
    assert!(y.outbound.contains("/x"));

    let external = crawler.page(&ext_page).unwrap();
    assert_eq!(external.tag(), KindTag::External);
    assert_eq!(external.title.as_deref(), Some("Elsewhere"));
    assert_eq!(external.summary.as_deref(), Some("An external page"));
    assert!(external.outbound.is_empty());
    assert!(external.raw_refs.contains("/x"));
}

#[tokio::test]
async fn test_follows_links_discovered_after_sitemap() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(&site, "/sitemap.xml", sitemap(&base, &["/a"])).await;
    mount(&site, "/a", html(r#"<a href="b">b</a>"#)).await;
    mount(&site, "/a/b", html(r#"<a href="/c?ref=b#top">c</a>"#)).await;
    mount(&site, "/c", html("<title>C</title>")).await;

    let crawler = run(&create_test_config(&base)).await;

    assert_eq!(crawler.report().len(), 3);
    assert_eq!(crawler.page("/c").unwrap().title.as_deref(), Some("C"));
    assert!(crawler.page("/c").unwrap().raw_refs.contains("/a/b"));
}

#[tokio::test]
async fn test_rewrite_and_ignore_rules() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(&site, "/sitemap.xml", sitemap(&base, &["/x", "/y"])).await;
    mount(
        &site,
        "/x",
        html(r#"<a href="/docs/api">docs</a><a href="/rates">rates</a>"#),
    )
    .await;
    mount(&site, "/y", html(r#"<a href="/docs/api/v2">docs</a>"#)).await;
    mount(&site, "/flywheel", html("<title>Flywheel</title>")).await;
    mount_never(&site, "/docs/api").await;
    mount_never(&site, "/docs/api/v2").await;
    mount_never(&site, "/rates").await;

    let mut config = create_test_config(&base);
    config.rules.ignored_prefixes = vec!["/docs/".to_string()];
    config.rules.rewrites = BTreeMap::from([("/rates".to_string(), "/flywheel".to_string())]);

    let crawler = run(&config).await;
    let report = crawler.report();

    assert!(report
        .iter()
        .all(|r| !r.path.as_deref().unwrap_or("").starts_with("/docs")));
    assert!(crawler.page("/rates").is_none());

    let flywheel = crawler.page("/flywheel").unwrap();
    assert_eq!(flywheel.title.as_deref(), Some("Flywheel"));
    assert!(flywheel.raw_refs.contains("/x"));
    assert_eq!(report.len(), 3);
}

#[tokio::test]
async fn test_shortened_urn_is_never_fetched() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(&site, "/sitemap.xml", sitemap(&base, &["/x"])).await;
    mount(&site, "/x", html(r#"<a href="/s/42">book</a>"#)).await;
    mount_never(&site, "/s/42").await;

    let mut config = create_test_config(&base);
    config.shortened.entries = BTreeMap::from([(
        "/s/42".to_string(),
        ShortenedEntry {
            target: "urn:isbn:000".to_string(),
            kind: KindTag::Urn,
        },
    )]);

    let crawler = run(&config).await;

    let urn = crawler.page("urn:isbn:000").unwrap();
    assert_eq!(urn.tag(), KindTag::Urn);
    assert_eq!(urn.slug.as_deref(), Some("/s/42"));
    assert!(urn.refs.contains("/x"));
    assert!(urn.raw_refs.is_empty());
    assert!(urn.outbound.is_empty());
    assert_eq!(urn.status_code, None);

    assert!(crawler.page("/x").unwrap().outbound.contains("urn:isbn:000"));
}

#[tokio::test]
async fn test_blocked_page_goes_to_alternate_list() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(&site, "/sitemap.xml", sitemap(&base, &["/ok", "/blocked"])).await;
    mount(&site, "/ok", html("<title>OK</title>")).await;
    mount(&site, "/blocked", ResponseTemplate::new(403)).await;

    let crawler = run(&create_test_config(&base)).await;

    assert_eq!(
        crawler.alternate_fetch_queue(),
        vec![format!("{}/blocked", base)]
    );

    let blocked = crawler.page("/blocked").unwrap();
    assert_eq!(blocked.status_code, Some(403));
    assert_eq!(blocked.title, None);
    assert_eq!(crawler.statistics().counters.blocked, 1);
}

#[tokio::test]
async fn test_redirect_is_recorded() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(&site, "/sitemap.xml", sitemap(&base, &["/old"])).await;
    mount(
        &site,
        "/old",
        ResponseTemplate::new(301).insert_header("Location", format!("{}/new", base).as_str()),
    )
    .await;
    mount(&site, "/new", html("<title>New</title>")).await;

    let crawler = run(&create_test_config(&base)).await;

    let old = crawler.page("/old").unwrap();
    assert_eq!(old.redirect, Some(format!("{}/new", base)));
    assert_eq!(old.status_code, Some(200));
    assert_eq!(old.title.as_deref(), Some("New"));
}

#[tokio::test]
async fn test_malformed_sitemap_yields_no_pages() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(
        &site,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_raw("<urlset><url><loc>", "application/xml"),
    )
    .await;

    let crawler = run(&create_test_config(&base)).await;

    assert!(crawler.report().is_empty());
}

#[tokio::test]
async fn test_missing_sitemap_yields_no_pages() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(&site, "/sitemap.xml", ResponseTemplate::new(404)).await;

    let crawler = run(&create_test_config(&base)).await;

    assert!(crawler.report().is_empty());
}

#[tokio::test]
async fn test_timeout_keeps_page_without_content() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount(&site, "/sitemap.xml", sitemap(&base, &["/slow", "/fast"])).await;
    mount(
        &site,
        "/slow",
        html("<title>Slow</title>").set_delay(Duration::from_secs(3)),
    )
    .await;
    mount(&site, "/fast", html("<title>Fast</title>")).await;

    let mut config = create_test_config(&base);
    config.crawler.fetch_timeout_secs = 1;

    let crawler = run(&config).await;

    let slow = crawler.page("/slow").unwrap();
    assert_eq!(slow.status_code, None);
    assert_eq!(slow.title, None);
    assert_eq!(
        crawler.page("/fast").unwrap().title.as_deref(),
        Some("Fast")
    );
    assert_eq!(crawler.statistics().counters.timed_out, 1);
}

#[tokio::test]
async fn test_backpressure_with_frontier_of_one() {
    let site = MockServer::start().await;
    let base = site.uri();

    let paths = ["/p1", "/p2", "/p3", "/p4", "/p5"];
    mount(&site, "/sitemap.xml", sitemap(&base, &paths)).await;
    for p in paths {
        mount(&site, p, html(r#"<a href="/shared">shared</a>"#)).await;
    }
    mount(&site, "/shared", html("<title>Shared</title>")).await;

    let mut config = create_test_config(&base);
    config.crawler.frontier_max_size = 1;

    let crawler = run(&config).await;

    assert_eq!(crawler.report().len(), 6);
    assert_eq!(crawler.page("/shared").unwrap().raw_refs.len(), 5);
}

#[tokio::test]
async fn test_second_run_served_from_cache() {
    let site = MockServer::start().await;
    let base = site.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(sitemap(&base, &["/x"]))
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html("<title>Cached X</title>"))
        .expect(1)
        .mount(&site)
        .await;

    let mut config = create_test_config(&base);
    config.cache.path = dir.path().join("cache.sqlite").to_string_lossy().to_string();

    let first = crawl(&config).await.expect("first crawl");
    assert_eq!(first.statistics().counters.from_cache, 0);
    drop(first);

    let second = crawl(&config).await.expect("second crawl");
    assert_eq!(
        second.page("/x").unwrap().title.as_deref(),
        Some("Cached X")
    );
    assert_eq!(second.statistics().counters.from_cache, 1);
}

#[tokio::test]
async fn test_error_statuses_are_not_retried() {
    let site = MockServer::start().await;

    for (at, status) in [("/bad-gateway", 502), ("/unavailable", 503), ("/missing", 404)] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&site)
            .await;
    }

    let config = CrawlerConfig {
        max_retries: 2,
        ..CrawlerConfig::default()
    };
    let fetcher = Fetcher::new(&config, None).unwrap();

    match fetcher.fetch_url(&format!("{}/bad-gateway", site.uri())).await {
        FetchOutcome::Fetched(response) => assert_eq!(response.status, 502),
        other => panic!("expected a 502 response, got {:?}", other),
    }
    assert!(matches!(
        fetcher.fetch_url(&format!("{}/unavailable", site.uri())).await,
        FetchOutcome::Blocked(_)
    ));
    match fetcher.fetch_url(&format!("{}/missing", site.uri())).await {
        FetchOutcome::Fetched(response) => assert_eq!(response.status, 404),
        other => panic!("expected a 404 response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_binary_bodies_are_not_kept() {
    let site = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.sqlite");

    mount(
        &site,
        "/logo.png",
        ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G', 0, 0xff], "image/png"),
    )
    .await;

    let cache = SqliteCache::open(&cache_path, None).unwrap();
    let fetcher = Fetcher::new(&CrawlerConfig::default(), Some(Box::new(cache))).unwrap();
    let url = format!("{}/logo.png", site.uri());

    match fetcher.fetch_url(&url).await {
        FetchOutcome::Fetched(response) => {
            assert_eq!(response.status, 200);
            assert_eq!(response.content_type.as_deref(), Some("image/png"));
            assert!(response.body.is_empty());
        }
        other => panic!("expected image response, got {:?}", other),
    }
    drop(fetcher);

    let cache = SqliteCache::open(&cache_path, None).unwrap();
    let stored = cache.get(&url).unwrap().expect("image response is cached");
    assert_eq!(stored.status, 200);
    assert!(stored.body.is_empty());
}
