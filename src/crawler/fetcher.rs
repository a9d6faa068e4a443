//! HTTP fetching for the crawler
//!
//! This module handles:
//! - the `Transport` seam the runloop fetches through
//! - a reqwest-backed `HttpTransport` (no automatic redirects, optional
//!   proxy, gzip/brotli, streaming bodies, basic auth)
//! - the per-item fetch task: headers, download conditions, bounded body
//!   accumulation and the per-item timeout

use crate::config::{AuthConfig, Config, FilterPolicy};
use crate::crawler::conditions::{evaluate_download_conditions, DownloadCondition, ResponseInfo};
use crate::crawler::scheduler::Event;
use crate::queue::QueueItem;
use crate::TransportError;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// A single GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Extra request headers, names lower-cased
    pub headers: Vec<(String, String)>,
    pub auth: Option<AuthConfig>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            auth: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_lowercase(), value.into()));
        self
    }

    pub fn auth(mut self, auth: Option<AuthConfig>) -> Self {
        self.auth = auth;
        self
    }
}

/// A response whose body has not been consumed
pub struct TransportResponse {
    pub status: u16,
    /// Response headers, names lower-cased
    pub headers: BTreeMap<String, String>,
    pub body: BoxStream<'static, Result<Vec<u8>, TransportError>>,
}

/// The network collaborator the crawler fetches through
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and resolves once response headers have arrived
    async fn fetch(&self, request: FetchRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a client from the crawl configuration
    ///
    /// Redirects are never followed by the client; the crawler queues the
    /// `Location` target itself.
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .user_agent(config.crawler.user_agent.as_str())
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::none()) // Handle redirects manually
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.url.as_str())
                .map_err(|e| TransportError::Request(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(auth) = &request.auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Body(e.to_string()))
            })
            .boxed();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_builder() {
        TransportError::Request(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}

/// Fetches a small resource in full, for robots.txt and similar
pub async fn fetch_bytes(
    transport: &dyn Transport,
    request: FetchRequest,
    max_size: usize,
) -> Result<(u16, Vec<u8>), TransportError> {
    let mut response = transport.fetch(request).await?;
    let mut body = Vec::new();
    while let Some(chunk) = response.body.next().await {
        let chunk = chunk?;
        let room = max_size.saturating_sub(body.len());
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= max_size {
            break;
        }
    }
    Ok((response.status, body))
}

/// Everything a spawned fetch task needs
pub(crate) struct FetchJob {
    pub item: QueueItem,
    pub request: FetchRequest,
    pub transport: Arc<dyn Transport>,
    pub download_conditions: Vec<Arc<dyn DownloadCondition>>,
    pub policy: Arc<FilterPolicy>,
    pub download_unsupported: bool,
    pub max_resource_size: usize,
    pub timeout: Duration,
    pub events: mpsc::UnboundedSender<Event>,
}

/// Runs one fetch under the item's timeout, reporting back over `events`
pub(crate) async fn run_fetch(job: FetchJob) {
    let id = job.item.id;
    let timeout = job.timeout;
    let events = job.events.clone();

    if tokio::time::timeout(timeout, fetch(job)).await.is_err() {
        debug!(id, timeout_ms = timeout.as_millis() as u64, "Fetch timed out");
        let _ = events.send(Event::TimedOut { id });
    }
}

async fn fetch(job: FetchJob) {
    let FetchJob {
        item,
        request,
        transport,
        download_conditions,
        policy,
        download_unsupported,
        max_resource_size,
        events,
        ..
    } = job;
    let id = item.id;
    let started = Instant::now();

    trace!(id, url = %request.url, "Sending request");
    let response = match transport.fetch(request).await {
        Ok(response) => response,
        Err(error) => {
            let _ = events.send(Event::TransportError { id, error });
            return;
        }
    };

    let TransportResponse {
        status,
        headers,
        mut body,
    } = response;
    let headers_at = Instant::now();
    let info = ResponseInfo::new(status, headers.clone());

    let _ = events.send(Event::Headers {
        id,
        status,
        headers,
        latency: headers_at - started,
    });

    // Non-2xx outcomes are decided from the headers alone
    if !(200..300).contains(&status) {
        return;
    }

    if !download_unsupported {
        let supported = info
            .content_type
            .as_deref()
            .map_or(false, |ct| policy.mime_supported(ct));
        if !supported {
            let _ = events.send(Event::DownloadPrevented { id });
            return;
        }
    }

    match evaluate_download_conditions(&download_conditions, &item, &info).await {
        Ok(true) => {}
        Ok(false) => {
            let _ = events.send(Event::DownloadPrevented { id });
            return;
        }
        Err(error) => {
            warn!(id, error = %error, "Download condition failed");
            let _ = events.send(Event::DownloadConditionError { id, error });
            return;
        }
    }

    let mut data: Vec<u8> = Vec::with_capacity(
        info.content_length
            .map_or(0, |len| (len as usize).min(max_resource_size)),
    );
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                let _ = events.send(Event::TransportError { id, error });
                return;
            }
        };

        let room = max_resource_size - data.len();
        if chunk.len() > room {
            data.extend_from_slice(&chunk[..room]);
            debug!(id, max_resource_size, "Resource exceeds maximum size, truncating");
            let _ = events.send(Event::DataError { id });
            break;
        }
        data.extend_from_slice(&chunk);
    }

    let finished = Instant::now();
    let _ = events.send(Event::Body {
        id,
        body: data,
        request_time: finished - started,
        download_time: finished - headers_at,
    });
}
