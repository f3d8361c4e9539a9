//! Fetch-level behavior against a mock search endpoint: cache hits,
//! transport retries, rate-limit waits, attempt exhaustion, and
//! defensive body mapping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

use reposcout::cache::PageCache;
use reposcout::error::{FetchError, TransportError};
use reposcout::github::{
    FetchConfig, Fetcher, SearchKey, SearchSort, SearchTerms, Transport, TransportConfig,
};

fn repo_item(name: &str) -> Value {
    json!({
        "name": name,
        "html_url": format!("https://github.com/example/{}", name),
        "description": format!("{} description", name),
        "stargazers_count": 42,
        "language": "Rust",
        "owner": { "login": "example" },
        "created_at": "2020-01-02T03:04:05Z",
        "watchers": 7,
    })
}

fn page_body(count: usize, total: u64) -> Value {
    let items: Vec<Value> = (0..count).map(|i| repo_item(&format!("repo-{}", i))).collect();
    json!({ "total_count": total, "items": items })
}

/// Transport aimed at the mock server, with millisecond retry delays.
fn test_transport(server: &MockServer) -> Arc<Transport> {
    let transport = Transport::new(TransportConfig {
        base_url: server.uri(),
        retry_min_delay: Duration::from_millis(10),
        retry_max_delay: Duration::from_millis(40),
        ..TransportConfig::default()
    })
    .expect("transport builds");
    Arc::new(transport)
}

/// Fetcher with a millisecond backoff base so retry paths run fast.
fn fast_fetcher(transport: Arc<Transport>, cache: Arc<PageCache>) -> Fetcher {
    Fetcher::with_config(
        transport,
        cache,
        FetchConfig {
            backoff_base: Duration::from_millis(20),
            ..FetchConfig::default()
        },
    )
}

fn search_key(query: &str, page: u32) -> SearchKey {
    SearchTerms::new(query, SearchSort::Relevance, None).key(page)
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .len()
}

#[tokio::test]
async fn test_cache_hit_skips_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(30, 120)))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(PageCache::default());
    let fetcher = fast_fetcher(test_transport(&server), Arc::clone(&cache));

    let first = fetcher.fetch(&search_key("raft", 1)).await.expect("first fetch");
    let second = fetcher.fetch(&search_key("raft", 1)).await.expect("second fetch");

    assert_eq!(first, second);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_pages_are_cached_under_distinct_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(30, 42)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(12, 42)))
        .mount(&server)
        .await;

    let cache = Arc::new(PageCache::default());
    let fetcher = fast_fetcher(test_transport(&server), Arc::clone(&cache));

    let first = fetcher.fetch(&search_key("raft", 1)).await.expect("page 1");
    let second = fetcher.fetch(&search_key("raft", 2)).await.expect("page 2");

    assert_eq!(first.records.len(), 30);
    assert!(!first.is_last_page);
    assert_eq!(second.records.len(), 12);
    assert!(second.is_last_page);
    assert_eq!(cache.stats().len, 2);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_query_parameters_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("q", "raft language:Go"))
        .and(query_param("sort", "stars"))
        .and(query_param("order", "desc"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));
    let key = SearchTerms::new("raft", SearchSort::Stars, Some("Go")).key(1);

    let page = fetcher.fetch(&key).await.expect("parameters match");
    assert_eq!(page.records.len(), 1);
}

#[tokio::test]
async fn test_transient_server_errors_retry_within_one_attempt() {
    let server = MockServer::start().await;
    // Two 500s, then success. Mount order matters: once the failing
    // mock is used up, requests fall through to the one below it.
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(30, 100)))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));
    let page = fetcher.fetch(&search_key("raft", 1)).await.expect("retries recover");

    assert_eq!(page.records.len(), 30);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_rate_limited_requests_wait_without_burning_attempts() {
    let server = MockServer::start().await;
    // Three rate-limited rounds with a reset already in the past, then
    // success. The attempt budget is also three: if waits consumed
    // attempts, the budget would be gone before the success arrives.
    let reset = Utc::now().timestamp().to_string();
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.as_str()),
        )
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(12, 12)))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));
    let page = fetcher.fetch(&search_key("raft", 1)).await.expect("waits then succeeds");

    assert_eq!(page.records.len(), 12);
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn test_rate_limit_wait_follows_the_reset_timestamp() {
    let server = MockServer::start().await;
    let reset = (Utc::now().timestamp() + 2).to_string();
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.as_str()),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(12, 12)))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));

    let started = Instant::now();
    let page = fetcher.fetch(&search_key("raft", 1)).await.expect("waits out the reset");
    let elapsed = started.elapsed();

    assert_eq!(page.records.len(), 12);
    assert_eq!(request_count(&server).await, 2);
    // The reset is 1-2 seconds out; a plain failed-attempt backoff
    // would have retried within tens of milliseconds.
    assert!(elapsed >= Duration::from_secs(1), "waited only {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(10), "waited too long: {:?}", elapsed);
}

#[tokio::test]
async fn test_nonretryable_failures_exhaust_the_attempt_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));
    let err = fetcher
        .fetch(&search_key("raft", 1))
        .await
        .expect_err("every attempt fails");

    let FetchError::Exhausted { attempts, source } = err;
    assert_eq!(attempts, 3);
    assert!(matches!(
        source,
        TransportError::Protocol {
            status: Some(404),
            ..
        }
    ));
    // 404 is not transient, so the transport never retried it.
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_persistent_5xx_burns_both_retry_layers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));
    let err = fetcher
        .fetch(&search_key("raft", 1))
        .await
        .expect_err("server never recovers");

    let FetchError::Exhausted { attempts, source } = err;
    assert_eq!(attempts, 3);
    assert!(source.is_transient());
    // Each of the three attempts made one call plus three transport
    // retries before giving up.
    assert_eq!(request_count(&server).await, 12);
}

#[tokio::test]
async fn test_timeouts_are_classified_and_burn_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(1, 1))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let transport = Transport::new(TransportConfig {
        base_url: server.uri(),
        timeout: Duration::from_millis(50),
        retry_min_delay: Duration::from_millis(10),
        retry_max_delay: Duration::from_millis(40),
        ..TransportConfig::default()
    })
    .expect("transport builds");
    let fetcher = fast_fetcher(Arc::new(transport), Arc::new(PageCache::default()));

    let err = fetcher
        .fetch(&search_key("raft", 1))
        .await
        .expect_err("responses outlast the client timeout");

    let FetchError::Exhausted { attempts, source } = err;
    assert_eq!(attempts, 3);
    assert!(matches!(source, TransportError::Timeout { .. }));
}

#[tokio::test]
async fn test_missing_items_reads_as_an_empty_final_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total_count": 250 })))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));
    let page = fetcher.fetch(&search_key("raft", 1)).await.expect("empty page is fine");

    assert!(page.records.is_empty());
    assert_eq!(page.total_count, 250);
    assert!(page.is_last_page);
}

#[tokio::test]
async fn test_deep_page_cutoff_ends_the_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let cache = Arc::new(PageCache::default());
    let fetcher = fast_fetcher(test_transport(&server), Arc::clone(&cache));

    let page = fetcher.fetch(&search_key("raft", 35)).await.expect("cutoff is not an error");
    assert!(page.records.is_empty());
    assert!(page.is_last_page);

    // The cutoff marker is not a fetched page, so it is not cached.
    let again = fetcher.fetch(&search_key("raft", 35)).await.expect("cutoff repeats");
    assert!(again.is_last_page);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_absent_fields_resolve_to_placeholders() {
    let server = MockServer::start().await;
    let body = json!({
        "total_count": 2,
        "items": [
            {},
            { "name": "bare", "description": "" },
        ],
    });
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(test_transport(&server), Arc::new(PageCache::default()));
    let page = fetcher.fetch(&search_key("raft", 1)).await.expect("partial items map");

    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].description, "No description provided.");
    assert_eq!(page.records[0].owner_login, "Unknown");
    assert_eq!(page.records[0].star_count, 0);
    assert_eq!(page.records[1].name, "bare");
    assert_eq!(page.records[1].description, "No description provided.");
}
