//! Scripted transport and helpers shared by the crawl tests

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_crawler::crawler::{FetchRequest, Transport, TransportResponse};
use sumi_crawler::{Config, CrawlEvent, Crawler, TransportError};
use tokio::sync::mpsc;

pub const SEED: &str = "http://example.com/";

/// A canned response
#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
    pub etag: Option<String>,
    pub panics: bool,
}

impl Route {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            delay: None,
            etag: None,
            panics: false,
        }
    }

    /// A route whose fetch panics instead of answering
    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::status(200)
        }
    }

    pub fn html(body: &str) -> Self {
        Self::status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(body.as_bytes())
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(301).header("location", location)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answers 304 when the request carries a matching `if-none-match`
    pub fn etag(mut self, etag: &str) -> Self {
        self.etag = Some(etag.to_string());
        self.header("etag", etag)
    }
}

/// A transport answering from a fixed route table
///
/// URLs without a route fail with a connection error.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<FetchRequest>>,
    active: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, route: Route) -> Self {
        self.routes.insert(url.to_string(), route);
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let route = match self.routes.get(&request.url) {
            Some(route) => route.clone(),
            None => {
                return Err(TransportError::Connection(format!(
                    "no route for {}",
                    request.url
                )))
            }
        };

        if route.panics {
            panic!("scripted panic for {}", request.url);
        }

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(Arc::clone(&self.active));
        self.peak.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        let not_modified = route.etag.as_ref().map_or(false, |etag| {
            request
                .headers
                .iter()
                .any(|(name, value)| name == "if-none-match" && value == etag)
        });
        let (status, body) = if not_modified {
            (304, Vec::new())
        } else {
            (route.status, route.body.clone())
        };

        let headers: BTreeMap<String, String> = route
            .headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.clone()))
            .collect();
        let chunks: Vec<Result<Vec<u8>, TransportError>> =
            body.chunks(16).map(|chunk| Ok(chunk.to_vec())).collect();

        Ok(TransportResponse {
            status,
            headers,
            body: stream::iter(chunks).boxed(),
        })
    }
}

/// Default test configuration: fast ticks, robots.txt ignored
pub fn config() -> Config {
    let mut config = Config::for_seed(SEED);
    config.crawler.interval = 1;
    config.crawler.respect_robots_txt = false;
    config
}

pub fn crawler(config: Config, transport: &Arc<ScriptedTransport>) -> Crawler {
    let transport: Arc<dyn Transport> = transport.clone();
    Crawler::new(config, transport).expect("valid config")
}

/// Runs the crawl to completion or stop, failing the test if it hangs
pub async fn run(crawler: &mut Crawler) {
    tokio::time::timeout(Duration::from_secs(10), crawler.start())
        .await
        .expect("crawl did not finish in time")
        .expect("crawl failed");
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<CrawlEvent>) -> Vec<CrawlEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn names(events: &[CrawlEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.name()).collect()
}
