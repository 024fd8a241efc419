//! DuckDuckGo backend tests against a local stub server

use std::time::{Duration, Instant};

use websearch_mcp::backends::{duckduckgo::DuckDuckGoBackend, SearchBackend};
use websearch_mcp::config::{DuckDuckGoConfig, HttpConfig};
use websearch_mcp::types::RelatedTopic;
use websearch_mcp::{SearchError, SearchQuery};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULTS_PAGE: &str = include_str!("fixtures/search_results.html");
const EMPTY_PAGE: &str = include_str!("fixtures/search_results_empty.html");
const INSTANT_ANSWER: &str = include_str!("fixtures/instant_answer.json");

fn http_config() -> HttpConfig {
    HttpConfig {
        timeout_seconds: 2,
        user_agent: "websearch-mcp-test/1.0".to_string(),
        rate_limit_ms: 0,
    }
}

fn backend_for(server: &MockServer, region: &str, http: HttpConfig) -> DuckDuckGoBackend {
    let config = DuckDuckGoConfig {
        html_base_url: server.uri(),
        api_base_url: server.uri(),
        region: region.to_string(),
    };
    DuckDuckGoBackend::new(config, &http).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_search_returns_results_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "rust programming"))
        .and(query_param_is_missing("kl"))
        .and(header("user-agent", "websearch-mcp-test/1.0"))
        .respond_with(html(RESULTS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, "", http_config());
    let query = SearchQuery::new("rust programming", 10).unwrap();
    let results = backend.search(&query).await.unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(results[0].url, "https://www.rust-lang.org/");
    assert_eq!(
        results[1].url,
        "https://en.wikipedia.org/wiki/Rust_(programming_language)"
    );
    for result in &results {
        assert!(!result.title.is_empty());
        assert!(result.url.starts_with("https://") || result.url.starts_with("http://"));
    }
}

#[tokio::test]
async fn test_search_truncates_to_max_results() {
    let server = MockServer::start().await;
    Mock::given(path("/html/"))
        .respond_with(html(RESULTS_PAGE))
        .mount(&server)
        .await;

    let backend = backend_for(&server, "", http_config());
    let query = SearchQuery::new("example", 3).unwrap();
    let results = backend.search(&query).await.unwrap();

    let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        [
            "The Rust Programming Language",
            "Rust (programming language) - Wikipedia",
            "The Rust Programming Language - Rust Book",
        ]
    );
}

#[tokio::test]
async fn test_search_sends_region() {
    let server = MockServer::start().await;
    Mock::given(path("/html/"))
        .and(query_param("kl", "uk-en"))
        .respond_with(html(EMPTY_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, "uk-en", http_config());
    let query = SearchQuery::new("xyzzy12345noresult", 10).unwrap();
    assert!(backend.search(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_too_many_requests_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(path("/html/"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let backend = backend_for(&server, "", http_config());
    let query = SearchQuery::new("rust", 5).unwrap();
    let err = backend.search(&query).await.unwrap_err();

    assert_eq!(err, SearchError::RateLimited { retry_after: Some(30) });
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(path("/html/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = backend_for(&server, "", http_config());
    let query = SearchQuery::new("rust", 5).unwrap();
    let err = backend.search(&query).await.unwrap_err();

    assert_eq!(err.kind(), "network");
    assert!(err.to_string().contains("503"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unrecognised_page_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(path("/html/"))
        .respond_with(html("<html><body><h1>Maintenance</h1></body></html>"))
        .mount(&server)
        .await;

    let backend = backend_for(&server, "", http_config());
    let query = SearchQuery::new("rust", 5).unwrap();
    let err = backend.search(&query).await.unwrap_err();

    assert_eq!(err.kind(), "parse");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unresponsive_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(path("/html/"))
        .respond_with(html(RESULTS_PAGE).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let mut http = http_config();
    http.timeout_seconds = 1;
    let backend = backend_for(&server, "", http);
    let query = SearchQuery::new("rust", 5).unwrap();

    let start = Instant::now();
    let err = backend.search(&query).await.unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(4));
    assert_eq!(err.kind(), "network");
    assert!(err.to_string().contains("timed out after 1s"), "{err}");
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let config = DuckDuckGoConfig {
        html_base_url: "http://127.0.0.1:9".to_string(),
        api_base_url: "http://127.0.0.1:9".to_string(),
        region: String::new(),
    };
    let backend = DuckDuckGoBackend::new(config, &http_config()).unwrap();

    let query = SearchQuery::new("rust", 5).unwrap();
    let err = backend.search(&query).await.unwrap_err();
    assert_eq!(err.kind(), "network");
}

#[tokio::test]
async fn test_rate_limit_spaces_requests() {
    let server = MockServer::start().await;
    Mock::given(path("/html/"))
        .respond_with(html(EMPTY_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let mut http = http_config();
    http.rate_limit_ms = 300;
    let backend = backend_for(&server, "", http);
    let query = SearchQuery::new("rust", 5).unwrap();

    let start = Instant::now();
    backend.search(&query).await.unwrap();
    backend.search(&query).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_instant_answer_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "rust programming language"))
        .and(query_param("format", "json"))
        .and(query_param("no_html", "1"))
        .and(query_param("skip_disambig", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(INSTANT_ANSWER, "application/x-javascript"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, "", http_config());
    let answer = backend
        .instant_answer("rust programming language")
        .await
        .unwrap();

    assert_eq!(answer.abstract_source, "Wikipedia");
    assert_eq!(answer.related.len(), 2);
    assert!(matches!(answer.related[1], RelatedTopic::Topic(ref t) if t.text.starts_with("Servo")));
}

#[tokio::test]
async fn test_instant_answer_bad_payload_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(html("<html>not json</html>"))
        .mount(&server)
        .await;

    let backend = backend_for(&server, "", http_config());
    let err = backend.instant_answer("rust").await.unwrap_err();
    assert_eq!(err.kind(), "parse");
}
