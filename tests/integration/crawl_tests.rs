//! Integration tests for the crawl runloop
//!
//! These tests drive complete crawls against a scripted transport and check
//! the queue and the emitted signals afterwards.

use crate::support::{config, crawler, drain, names, run, Route, ScriptedTransport, SEED};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sumi_crawler::cache::{CacheStore, MemoryCache};
use sumi_crawler::crawler::{
    DownloadCondition, FetchCondition, ResponseInfo, TIMEOUT_CODE, TRANSPORT_ERROR_CODE,
};
use sumi_crawler::{
    ConditionError, CrawlEvent, FetchStatus, FrontierQueue, ItemFilter, QueueItem, ResolvedUrl,
    SignalKind,
};
use tempfile::TempDir;

fn status_of(queue: &FrontierQueue, url: &str) -> Option<FetchStatus> {
    queue.iter().find(|item| item.url == url).map(|item| item.status)
}

#[tokio::test]
async fn test_chain_is_crawled_to_completion() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/a">A</a>"#))
            .route("http://example.com/a", Route::html(r#"<a href="b">B</a>"#))
            .route("http://example.com/b", Route::html("<p>leaf</p>")),
    );
    let mut crawler = crawler(config(), &transport);
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    let queue = crawler.queue();
    assert_eq!(queue.len(), 3);
    let depths: Vec<u32> = queue.iter().map(|item| item.depth).collect();
    assert_eq!(depths, vec![1, 2, 3]);
    assert!(queue
        .iter()
        .all(|item| item.fetched && item.status == FetchStatus::Downloaded));
    assert_eq!(queue.get(1).unwrap().referrer, SEED);
    assert_eq!(queue.get(2).unwrap().referrer, "http://example.com/a");

    let events = drain(&mut events);
    let names = names(&events);
    assert_eq!(names.first(), Some(&"crawlstart"));
    assert_eq!(names.last(), Some(&"complete"));
    assert_eq!(names.iter().filter(|n| **n == "complete").count(), 1);
    assert_eq!(names.iter().filter(|n| **n == "fetchcomplete").count(), 3);
    assert_eq!(names.iter().filter(|n| **n == "discoverycomplete").count(), 3);
}

#[tokio::test]
async fn test_max_depth_limits_discovery() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/a">A</a>"#))
            .route("http://example.com/a", Route::html("")),
    );
    let mut config = config();
    config.crawler.max_depth = 1;
    let mut crawler = crawler(config, &transport);

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 1);
    assert_eq!(transport.request_count("http://example.com/a"), 0);
}

#[tokio::test]
async fn test_cycles_are_fetched_once() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/a">A</a> <a href="/">home</a>"#))
            .route(
                "http://example.com/a",
                Route::html(r#"<a href="/">home</a> <a href="http://EXAMPLE.com:80/a">self</a>"#),
            ),
    );
    let mut crawler = crawler(config(), &transport);
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 2);
    assert_eq!(transport.request_count(SEED), 1);
    assert_eq!(transport.request_count("http://example.com/a"), 1);

    let duplicates = drain(&mut events)
        .into_iter()
        .filter(|e| e.kind() == SignalKind::QueueDuplicate)
        .count();
    assert!(duplicates >= 2);
}

#[tokio::test]
async fn test_encoded_and_raw_links_share_one_item() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(
                SEED,
                Route::html(r#"<a href="café">raw</a> <a href="http://example.com/café">abs</a> <a href="/caf%C3%A9">enc</a>"#),
            )
            .route("http://example.com/caf%C3%A9", Route::html("")),
    );
    let mut crawler = crawler(config(), &transport);

    run(&mut crawler).await;

    let urls: Vec<&str> = crawler.queue().iter().map(|item| item.url.as_str()).collect();
    assert_eq!(urls, vec![SEED, "http://example.com/caf%C3%A9"]);
    assert_eq!(transport.request_count("http://example.com/caf%C3%A9"), 1);
}

#[tokio::test]
async fn test_foreign_hosts_are_not_queued() {
    let transport = Arc::new(ScriptedTransport::new().route(
        SEED,
        Route::html(
            r#"<a href="http://other.org/">x</a> <a href="http://www.example.com/w">w</a>
               <a href="mailto:someone@example.com">mail</a>"#,
        ),
    ));
    let mut crawler = crawler(config(), &transport);

    run(&mut crawler).await;

    let urls: Vec<&str> = crawler.queue().iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, vec![SEED, "http://www.example.com/w"]);
}

#[tokio::test]
async fn test_http_outcomes() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(
                SEED,
                Route::html(
                    r#"<a href="/missing">m</a> <a href="/gone">g</a> <a href="/old">o</a>
                       <a href="/broken">b</a> <a href="/offline">x</a>"#,
                ),
            )
            .route("http://example.com/missing", Route::status(404))
            .route("http://example.com/gone", Route::status(410))
            .route("http://example.com/old", Route::redirect("/new"))
            .route("http://example.com/new", Route::html("moved"))
            .route("http://example.com/broken", Route::status(500)),
    );
    let mut crawler = crawler(config(), &transport);
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    let queue = crawler.queue();
    assert_eq!(status_of(queue, "http://example.com/missing"), Some(FetchStatus::NotFound));
    assert_eq!(status_of(queue, "http://example.com/gone"), Some(FetchStatus::NotFound));
    assert_eq!(status_of(queue, "http://example.com/old"), Some(FetchStatus::Redirected));
    assert_eq!(status_of(queue, "http://example.com/new"), Some(FetchStatus::Downloaded));
    assert_eq!(status_of(queue, "http://example.com/broken"), Some(FetchStatus::Failed));
    assert_eq!(status_of(queue, "http://example.com/offline"), Some(FetchStatus::Failed));

    let new = queue
        .iter()
        .find(|i| i.url == "http://example.com/new")
        .unwrap();
    assert_eq!(new.referrer, "http://example.com/old");
    assert_eq!(new.depth, 3);

    let offline = queue
        .iter()
        .find(|i| i.url == "http://example.com/offline")
        .unwrap();
    assert_eq!(offline.state_data.code, Some(TRANSPORT_ERROR_CODE));

    let names = names(&drain(&mut events));
    assert_eq!(names.iter().filter(|n| **n == "fetch404").count(), 2);
    assert!(names.contains(&"fetchredirect"));
    assert!(names.contains(&"fetcherror"));
    assert!(names.contains(&"fetchclienterror"));
    assert_eq!(names.last(), Some(&"complete"));
}

#[tokio::test]
async fn test_timeout_releases_slot() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/slow">s</a> <a href="/fast">f</a>"#))
            .route(
                "http://example.com/slow",
                Route::html("late").delay(Duration::from_secs(30)),
            )
            .route("http://example.com/fast", Route::html("ok")),
    );
    let mut config = config();
    config.crawler.timeout = 100;
    config.crawler.max_concurrency = 1;
    let mut crawler = crawler(config, &transport);
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    let slow = crawler
        .queue()
        .iter()
        .find(|i| i.url == "http://example.com/slow")
        .unwrap();
    assert_eq!(slow.status, FetchStatus::Timeout);
    assert_eq!(slow.state_data.code, Some(TIMEOUT_CODE));
    assert_eq!(
        status_of(crawler.queue(), "http://example.com/fast"),
        Some(FetchStatus::Downloaded)
    );
    assert_eq!(crawler.open_fetches(), 0);

    let timeouts = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, CrawlEvent::FetchTimeout { timeout_ms: 100, .. }))
        .count();
    assert_eq!(timeouts, 1);
}

#[tokio::test]
async fn test_concurrency_bound() {
    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    let mut transport = ScriptedTransport::new().route(SEED, Route::html(&links));
    for i in 0..10 {
        transport = transport.route(
            &format!("http://example.com/p{}", i),
            Route::html("page").delay(Duration::from_millis(20)),
        );
    }
    let transport = Arc::new(transport);

    let mut config = config();
    config.crawler.max_concurrency = 2;
    let mut crawler = crawler(config, &transport);

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 11);
    assert_eq!(
        crawler
            .queue()
            .count_items(&ItemFilter::new().status(FetchStatus::Downloaded)),
        11
    );
    assert!(transport.peak_concurrency() <= 2);
    assert!(transport.peak_concurrency() >= 1);
}

struct Counting {
    calls: Arc<AtomicUsize>,
    result: Result<bool, ConditionError>,
}

#[async_trait]
impl FetchCondition for Counting {
    async fn allow(&self, _: &ResolvedUrl, _: &QueueItem) -> Result<bool, ConditionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[tokio::test]
async fn test_fetch_condition_veto_short_circuits() {
    let transport = Arc::new(
        ScriptedTransport::new().route(SEED, Route::html(r#"<a href="/a.pdf">pdf</a>"#)),
    );
    let mut crawler = crawler(config(), &transport);

    let calls = Arc::new(AtomicUsize::new(0));
    crawler.add_fetch_condition(Arc::new(|_: &ResolvedUrl, _: &QueueItem| false));
    crawler.add_fetch_condition(Arc::new(Counting {
        calls: Arc::clone(&calls),
        result: Err(ConditionError::Failed("boom".to_string())),
    }));
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!names(&drain(&mut events)).contains(&"fetchconditionerror"));
}

#[tokio::test]
async fn test_removed_condition_is_not_consulted() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/a.pdf">pdf</a> <a href="/b">b</a>"#))
            .route("http://example.com/b", Route::html("")),
    );
    let mut crawler = crawler(config(), &transport);

    let calls = Arc::new(AtomicUsize::new(0));
    let no_pdfs: Arc<dyn FetchCondition> = Arc::new(|url: &ResolvedUrl, _: &QueueItem| {
        !url.path.ends_with(".pdf")
    });
    crawler.add_fetch_condition(Arc::clone(&no_pdfs));
    let failing: Arc<dyn FetchCondition> = Arc::new(Counting {
        calls: Arc::clone(&calls),
        result: Err(ConditionError::Failed("boom".to_string())),
    });
    crawler.add_fetch_condition(Arc::clone(&failing));
    crawler.remove_fetch_condition_ref(&failing).unwrap();
    assert!(crawler.remove_fetch_condition_ref(&failing).is_err());

    run(&mut crawler).await;

    let urls: Vec<&str> = crawler.queue().iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, vec![SEED, "http://example.com/b"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_condition_error_fails_closed() {
    let transport = Arc::new(
        ScriptedTransport::new().route(SEED, Route::html(r#"<a href="/a">a</a>"#)),
    );
    let mut crawler = crawler(config(), &transport);
    let id = crawler.add_fetch_condition(Arc::new(Counting {
        calls: Arc::new(AtomicUsize::new(0)),
        result: Err(ConditionError::Failed("boom".to_string())),
    }));
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 1);
    let errors: Vec<CrawlEvent> = drain(&mut events)
        .into_iter()
        .filter(|e| e.kind() == SignalKind::FetchConditionError)
        .collect();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        CrawlEvent::FetchConditionError { url, referrer, .. } => {
            assert_eq!(url, "http://example.com/a");
            assert_eq!(referrer.id, 0);
        }
        other => panic!("unexpected event {:?}", other),
    }

    crawler.remove_fetch_condition(id).unwrap();
    assert!(crawler.remove_fetch_condition(id).is_err());
}

#[tokio::test]
async fn test_download_condition_prevents_discovery() {
    let transport = Arc::new(
        ScriptedTransport::new().route(SEED, Route::html(r#"<a href="/a">a</a>"#)),
    );
    let mut crawler = crawler(config(), &transport);
    crawler.add_download_condition(Arc::new(|_: &QueueItem, response: &ResponseInfo| {
        response.status != 200
    }));
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 1);
    assert_eq!(
        crawler.queue().get(0).unwrap().status,
        FetchStatus::DownloadPrevented
    );
    let names = names(&drain(&mut events));
    assert!(names.contains(&"downloadprevented"));
    assert!(!names.contains(&"fetchcomplete"));
}

struct BrokenDownload;

#[async_trait]
impl DownloadCondition for BrokenDownload {
    async fn allow(&self, _: &QueueItem, _: &ResponseInfo) -> Result<bool, ConditionError> {
        Err(ConditionError::Failed("unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_download_condition_error_prevents_download() {
    let transport = Arc::new(ScriptedTransport::new().route(SEED, Route::html("hi")));
    let mut crawler = crawler(config(), &transport);
    crawler.add_download_condition(Arc::new(BrokenDownload));
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    assert_eq!(
        crawler.queue().get(0).unwrap().status,
        FetchStatus::DownloadPrevented
    );
    assert!(names(&drain(&mut events)).contains(&"downloadconditionerror"));
}

#[tokio::test]
async fn test_oversized_body_is_truncated() {
    let body = vec![b'x'; 100];
    let transport = Arc::new(ScriptedTransport::new().route(
        SEED,
        Route::html("")
            .body(&body)
            .header("content-length", "100"),
    ));
    let mut config = config();
    config.crawler.max_resource_size = 10;
    let mut crawler = crawler(config, &transport);
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    let seed = crawler.queue().get(0).unwrap();
    assert_eq!(seed.status, FetchStatus::Downloaded);
    assert_eq!(seed.state_data.actual_data_size, Some(10));
    assert_eq!(seed.state_data.content_length, Some(100));
    assert!(seed.state_data.sent_incorrect_size);

    let events = drain(&mut events);
    assert!(names(&events).contains(&"fetchdataerror"));
    let body_len = events.iter().find_map(|e| match e {
        CrawlEvent::FetchComplete { body, .. } => Some(body.len()),
        _ => None,
    });
    assert_eq!(body_len, Some(10));
}

#[tokio::test]
async fn test_unsupported_mime_not_scanned() {
    let transport = Arc::new(
        ScriptedTransport::new().route(
            SEED,
            Route::status(200)
                .header("content-type", "image/png")
                .body(br#"<a href="/hidden">x</a>"#),
        ),
    );
    let mut crawler = crawler(config(), &transport);

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 1);
    assert_eq!(
        crawler.queue().get(0).unwrap().status,
        FetchStatus::Downloaded
    );
}

#[tokio::test]
async fn test_robots_rules_are_respected() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(
                "http://example.com/robots.txt",
                Route::status(200).body(b"User-agent: *\nDisallow: /private\n"),
            )
            .route(
                SEED,
                Route::html(r#"<a href="/private/x">p</a> <a href="/public">q</a>"#),
            )
            .route("http://example.com/public", Route::html("")),
    );
    let mut config = config();
    config.crawler.respect_robots_txt = true;
    let mut crawler = crawler(config, &transport);
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    let urls: Vec<&str> = crawler.queue().iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, vec![SEED, "http://example.com/public"]);
    assert_eq!(transport.request_count("http://example.com/private/x"), 0);

    let disallowed: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            CrawlEvent::FetchDisallowed { url } => Some(url),
            _ => None,
        })
        .collect();
    assert_eq!(disallowed, vec!["http://example.com/private/x".to_string()]);
}

#[tokio::test]
async fn test_missing_robots_allows_all() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route("http://example.com/robots.txt", Route::status(404))
            .route(SEED, Route::html(r#"<a href="/private">p</a>"#))
            .route("http://example.com/private", Route::html("")),
    );
    let mut config = config();
    config.crawler.respect_robots_txt = true;
    let mut crawler = crawler(config, &transport);

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 2);
}

#[tokio::test]
async fn test_request_headers() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/a">a</a>"#))
            .route("http://example.com/a", Route::html("")),
    );
    let mut config = config();
    config.crawler.user_agent = "test-agent/1.0".to_string();
    let mut crawler = crawler(config, &transport);

    run(&mut crawler).await;

    let requests = transport.requests();
    let child = requests
        .iter()
        .find(|r| r.url == "http://example.com/a")
        .unwrap();
    assert!(child
        .headers
        .contains(&("user-agent".to_string(), "test-agent/1.0".to_string())));
    assert!(child
        .headers
        .contains(&("referer".to_string(), SEED.to_string())));
}

#[tokio::test]
async fn test_not_modified_uses_cache() {
    let transport = Arc::new(
        ScriptedTransport::new().route(SEED, Route::html("cached page").etag("\"v1\"")),
    );
    let cache = Arc::new(MemoryCache::new());

    let mut first = crawler(config(), &transport).with_cache(cache.clone());
    run(&mut first).await;
    assert_eq!(cache.len(), 1);
    assert_eq!(
        cache.get(SEED).unwrap().unwrap().etag.as_deref(),
        Some("\"v1\"")
    );

    let mut second = crawler(config(), &transport).with_cache(cache.clone());
    let mut events = second.subscribe();
    run(&mut second).await;

    assert_eq!(
        second.queue().get(0).unwrap().status,
        FetchStatus::NotModified
    );
    let cached = drain(&mut events).into_iter().find_map(|e| match e {
        CrawlEvent::NotModified { cached, .. } => Some(cached),
        _ => None,
    });
    assert_eq!(cached.unwrap().unwrap().body, b"cached page".to_vec());
}

#[tokio::test]
async fn test_stop_freeze_and_resume() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/a">a</a> <a href="/b">b</a>"#))
            .route("http://example.com/a", Route::html(r#"<a href="/c">c</a>"#))
            .route("http://example.com/b", Route::html(""))
            .route("http://example.com/c", Route::html("")),
    );
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("queue.json");

    let mut first = crawler(config(), &transport).with_config_hash("hash-1");
    let handle = first.handle();
    first.on(SignalKind::FetchComplete, move |event| {
        if event.item().map(|item| item.id) == Some(0) {
            handle.stop();
        }
    });
    let mut events = first.subscribe();
    run(&mut first).await;
    assert!(!names(&drain(&mut events)).contains(&"complete"));
    assert!(first.queue().fetched_count() < 4);
    first.freeze(&snapshot).unwrap();

    let queue = FrontierQueue::defrost(&snapshot).unwrap();
    assert_eq!(queue.config_hash(), Some("hash-1"));
    assert!(queue.get(0).unwrap().fetched);

    let mut second = crawler(config(), &transport)
        .with_config_hash("hash-1")
        .with_queue(queue);
    run(&mut second).await;

    let queue = second.queue();
    assert_eq!(queue.len(), 4);
    assert!(queue.iter().all(|item| item.status == FetchStatus::Downloaded));
    assert_eq!(transport.request_count(SEED), 1);
}

#[tokio::test]
async fn test_hard_stop_requeues_in_flight() {
    let transport = Arc::new(
        ScriptedTransport::new().route(SEED, Route::html("").delay(Duration::from_secs(30))),
    );
    let mut crawler = crawler(config(), &transport);
    let handle = crawler.handle();
    crawler.on(SignalKind::FetchStart, move |_| handle.hard_stop());

    run(&mut crawler).await;

    let seed = crawler.queue().get(0).unwrap();
    assert_eq!(seed.status, FetchStatus::Queued);
    assert!(!seed.fetched);
    assert_eq!(crawler.open_fetches(), 0);
}

#[tokio::test]
async fn test_reconfigure_while_running() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/a">a</a>"#))
            .route("http://example.com/a", Route::html("")),
    );
    let mut crawler = crawler(config(), &transport);
    let handle = crawler.handle();
    let mut narrowed = config();
    narrowed.crawler.max_depth = 1;
    crawler.on(SignalKind::CrawlStart, move |_| {
        handle.reconfigure(narrowed.clone()).unwrap();
    });

    run(&mut crawler).await;

    assert_eq!(crawler.config().crawler.max_depth, 1);
    assert_eq!(crawler.queue().len(), 1);
}

#[tokio::test]
async fn test_panicking_fetch_releases_slot() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/boom">boom</a> <a href="/ok">ok</a>"#))
            .route("http://example.com/boom", Route::panicking())
            .route("http://example.com/ok", Route::html("")),
    );
    let mut config = config();
    config.crawler.timeout = 200;
    let mut crawler = crawler(config, &transport);
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    let queue = crawler.queue();
    let boom = queue
        .iter()
        .find(|item| item.url == "http://example.com/boom")
        .unwrap();
    assert_eq!(boom.status, FetchStatus::Failed);
    assert_eq!(boom.state_data.code, Some(TRANSPORT_ERROR_CODE));
    assert_eq!(status_of(queue, "http://example.com/ok"), Some(FetchStatus::Downloaded));
    assert_eq!(crawler.open_fetches(), 0);

    let events = drain(&mut events);
    assert!(events.iter().any(|event| matches!(
        event,
        CrawlEvent::FetchClientError { item, .. } if item.url == "http://example.com/boom"
    )));
    assert_eq!(names(&events).iter().filter(|n| **n == "complete").count(), 1);
}

struct Panicking;

#[async_trait]
impl FetchCondition for Panicking {
    async fn allow(&self, _: &ResolvedUrl, _: &QueueItem) -> Result<bool, ConditionError> {
        panic!("condition panicked");
    }
}

#[tokio::test]
async fn test_panicking_fetch_condition_does_not_hang() {
    let transport = Arc::new(
        ScriptedTransport::new().route(SEED, Route::html(r#"<a href="/a">a</a>"#)),
    );
    let mut crawler = crawler(config(), &transport);
    crawler.add_fetch_condition(Arc::new(Panicking));
    let mut events = crawler.subscribe();

    run(&mut crawler).await;

    assert_eq!(crawler.queue().len(), 1);
    assert_eq!(transport.request_count("http://example.com/a"), 0);
    let names = names(&drain(&mut events));
    assert_eq!(names.last(), Some(&"complete"));
}

#[tokio::test]
async fn test_soft_stop_then_restart_same_crawler() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(SEED, Route::html(r#"<a href="/slow">slow</a> <a href="/b">b</a>"#))
            .route(
                "http://example.com/slow",
                Route::html("").delay(Duration::from_millis(100)),
            )
            .route("http://example.com/b", Route::html("")),
    );
    let mut crawler = crawler(config(), &transport);
    let handle = crawler.handle();
    crawler.on(SignalKind::FetchStart, move |event| {
        if event.item().map(|item| item.url.as_str()) == Some("http://example.com/slow") {
            handle.stop();
        }
    });
    let mut events = crawler.subscribe();

    run(&mut crawler).await;
    assert!(crawler.open_fetches() >= 1);
    assert!(!names(&drain(&mut events)).contains(&"complete"));

    // Let the in-flight fetch finish while the runloop is halted
    tokio::time::sleep(Duration::from_millis(300)).await;

    run(&mut crawler).await;

    let queue = crawler.queue();
    assert_eq!(queue.len(), 3);
    assert!(queue.iter().all(|item| item.status == FetchStatus::Downloaded));
    assert_eq!(crawler.open_fetches(), 0);
    assert_eq!(transport.request_count("http://example.com/slow"), 1);

    let names = names(&drain(&mut events));
    assert_eq!(names.iter().filter(|n| **n == "complete").count(), 1);
    assert_eq!(names.last(), Some(&"complete"));
}
