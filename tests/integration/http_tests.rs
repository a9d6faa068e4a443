//! End-to-end tests of the reqwest-backed transport
//!
//! These tests use wiremock to create mock HTTP servers.

use std::time::Duration;
use sumi_crawler::config::AuthConfig;
use sumi_crawler::crawler::{fetch_bytes, FetchRequest, HttpTransport, Transport};
use sumi_crawler::{Config, Crawler, FetchStatus};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

fn test_config(seed: &str) -> Config {
    let mut config = Config::for_seed(seed);
    config.crawler.interval = 1;
    config.crawler.user_agent = "TestBot/1.0".to_string();
    config
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin\n"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body>
            <a href="{}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/admin">Admin</a>
            <a href="/old">Old</a>
            </body></html>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(r#"<a href="/">Home</a> <a href="/missing">Missing</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(html("<p>No links</p>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/page2"))
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", base_url);
    let mut crawler = Crawler::with_http(test_config(&seed)).expect("valid config");

    tokio::time::timeout(Duration::from_secs(10), crawler.start())
        .await
        .expect("crawl did not finish in time")
        .expect("crawl failed");

    let queue = crawler.queue();
    let status = |p: &str| {
        let url = format!("{}{}", base_url, p);
        queue.iter().find(|item| item.url == url).map(|item| item.status)
    };

    assert_eq!(status("/"), Some(FetchStatus::Downloaded));
    assert_eq!(status("/page1"), Some(FetchStatus::Downloaded));
    assert_eq!(status("/page2"), Some(FetchStatus::Downloaded));
    assert_eq!(status("/old"), Some(FetchStatus::Redirected));
    assert_eq!(status("/missing"), Some(FetchStatus::NotFound));
    assert_eq!(status("/admin"), None);
    assert!(queue.iter().all(|item| item.fetched));

    let seed_item = queue.get(0).unwrap();
    assert_eq!(seed_item.state_data.code, Some(200));
    assert_eq!(
        seed_item.state_data.content_type.as_deref(),
        Some("text/html")
    );
    assert!(seed_item.state_data.actual_data_size.unwrap() > 0);
}

#[tokio::test]
async fn test_transport_does_not_follow_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/from"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/to"))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new(&test_config(&mock_server.uri())).unwrap();
    let response = transport
        .fetch(FetchRequest::new(format!("{}/from", mock_server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status, 302);
    assert_eq!(response.headers.get("location").map(String::as_str), Some("/to"));
}

#[tokio::test]
async fn test_transport_sends_basic_auth_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .and(header_exists("authorization"))
        .and(header("if-none-match", "\"abc\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new(&test_config(&mock_server.uri())).unwrap();
    let request = FetchRequest::new(format!("{}/secret", mock_server.uri()))
        .header("If-None-Match", "\"abc\"")
        .auth(Some(AuthConfig {
            username: "user".to_string(),
            password: "pass".to_string(),
        }));

    let (status, body) = fetch_bytes(&transport, request, 1024).await.unwrap();
    assert_eq!(status, 304);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Nothing listens on the discard port of localhost in the test environment
    let transport = HttpTransport::new(&test_config("http://127.0.0.1:9/")).unwrap();
    let result = transport
        .fetch(FetchRequest::new("http://127.0.0.1:9/"))
        .await;
    assert!(result.is_err());
}
