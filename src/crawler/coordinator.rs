//! Crawler coordinator - the runloop
//!
//! This module contains the loop that drives a crawl:
//! - dispatching the oldest queued item on every tick, up to the concurrency bound
//! - turning fetch task reports into status transitions and signals
//! - feeding discovered and redirected URLs back into the queue
//! - detecting completion and handling stop requests

use crate::cache::{CacheEntry, CacheStore};
use crate::config::{validate, Config, FilterPolicy};
use crate::crawler::conditions::{
    evaluate_fetch_conditions, ConditionId, ConditionRegistry, DownloadCondition,
    FetchCondition, ResponseInfo,
};
use crate::crawler::events::{CrawlEvent, SignalKind, Signals};
use crate::crawler::fetcher::{fetch_bytes, run_fetch, FetchJob, FetchRequest, HttpTransport, Transport};
use crate::crawler::scheduler::{Event, Scheduler};
use crate::discovery::{discover, DiscoveryOptions};
use crate::queue::{FrontierQueue, QueueEntry, QueueItem};
use crate::robots::{robots_url, ParsedRobots, RobotsCache};
use crate::state::FetchStatus;
use crate::url::{domain_valid, guess_mime_type, parse_absolute, resolve, ResolvedUrl};
use crate::{ConditionError, ConfigError, QueueResult, Result, TransportError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Status code recorded when the transport fails
pub const TRANSPORT_ERROR_CODE: u16 = 600;

/// Status code recorded when an item times out
pub const TIMEOUT_CODE: u16 = 599;

/// Upper bound on robots.txt bodies
const ROBOTS_MAX_SIZE: usize = 512 * 1024;

#[derive(Debug)]
enum Control {
    Stop,
    HardStop,
    Reconfigure(Box<Config>),
}

/// Controls a running crawl from another task
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    tx: mpsc::UnboundedSender<Control>,
}

impl CrawlHandle {
    /// Halts the runloop; in-flight fetches keep running and are picked up
    /// by the next `start`
    pub fn stop(&self) {
        let _ = self.tx.send(Control::Stop);
    }

    /// Halts the runloop and aborts in-flight fetches, which are queued again
    pub fn hard_stop(&self) {
        let _ = self.tx.send(Control::HardStop);
    }

    /// Replaces the configuration; it takes effect on the next tick
    pub fn reconfigure(&self, config: Config) -> std::result::Result<(), ConfigError> {
        validate(&config)?;
        let _ = self.tx.send(Control::Reconfigure(Box::new(config)));
        Ok(())
    }
}

/// A single-seed crawler
pub struct Crawler {
    config: Config,
    policy: Arc<FilterPolicy>,
    seed: ResolvedUrl,
    config_hash: Option<String>,
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn CacheStore>>,
    queue: FrontierQueue,
    scheduler: Scheduler,
    fetch_conditions: ConditionRegistry<dyn FetchCondition>,
    download_conditions: ConditionRegistry<dyn DownloadCondition>,
    signals: Signals,
    robots: RobotsCache,
    tasks: JoinSet<()>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: mpsc::UnboundedReceiver<Control>,
}

impl Crawler {
    /// Creates a crawler that fetches through `transport`
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let policy = validate(&config)?;
        let seed = parse_absolute(&config.crawler.seed)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            policy: Arc::new(policy),
            seed,
            config_hash: None,
            transport,
            cache: None,
            queue: FrontierQueue::new(),
            scheduler: Scheduler::new(),
            fetch_conditions: ConditionRegistry::new(),
            download_conditions: ConditionRegistry::new(),
            signals: Signals::new(),
            robots: RobotsCache::new(),
            tasks: JoinSet::new(),
            events_tx,
            events_rx,
            control_tx,
            control_rx,
        })
    }

    /// Creates a crawler with the reqwest-backed transport
    pub fn with_http(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::new(config, Arc::new(transport))
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Records the hash of the configuration file in the queue and its snapshots
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        let hash = hash.into();
        self.queue.set_config_hash(Some(hash.clone()));
        self.config_hash = Some(hash);
        self
    }

    /// Resumes from an existing (usually defrosted) queue
    pub fn with_queue(mut self, mut queue: FrontierQueue) -> Self {
        if let (Some(ours), Some(theirs)) = (self.config_hash.as_deref(), queue.config_hash()) {
            if ours != theirs {
                warn!(
                    queue_hash = theirs,
                    config_hash = ours,
                    "Queue was crawled with a different configuration"
                );
            }
        }
        if self.config_hash.is_some() {
            queue.set_config_hash(self.config_hash.clone());
        }
        self.queue = queue;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the configuration between runs
    ///
    /// The transport is not rebuilt; proxy and user agent changes need a new
    /// crawler when the reqwest transport is in use.
    pub fn set_config(&mut self, config: Config) -> std::result::Result<(), ConfigError> {
        let policy = validate(&config)?;
        let seed = parse_absolute(&config.crawler.seed)
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        self.policy = Arc::new(policy);
        self.seed = seed;
        self.config = config;
        Ok(())
    }

    pub fn queue(&self) -> &FrontierQueue {
        &self.queue
    }

    pub fn into_queue(self) -> FrontierQueue {
        self.queue
    }

    /// Number of fetches currently holding a slot
    pub fn open_fetches(&self) -> usize {
        self.scheduler.open_fetches()
    }

    /// Writes a snapshot of the queue to `path`
    pub fn freeze(&mut self, path: &Path) -> Result<()> {
        Ok(self.queue.freeze(path)?)
    }

    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle {
            tx: self.control_tx.clone(),
        }
    }

    pub fn add_fetch_condition(&mut self, condition: Arc<dyn FetchCondition>) -> ConditionId {
        self.fetch_conditions.add(condition)
    }

    pub fn remove_fetch_condition(&mut self, id: ConditionId) -> std::result::Result<(), ConditionError> {
        self.fetch_conditions.remove(id)
    }

    pub fn remove_fetch_condition_ref(
        &mut self,
        condition: &Arc<dyn FetchCondition>,
    ) -> std::result::Result<(), ConditionError> {
        self.fetch_conditions.remove_ref(condition)
    }

    pub fn add_download_condition(&mut self, condition: Arc<dyn DownloadCondition>) -> ConditionId {
        self.download_conditions.add(condition)
    }

    pub fn remove_download_condition(
        &mut self,
        id: ConditionId,
    ) -> std::result::Result<(), ConditionError> {
        self.download_conditions.remove(id)
    }

    pub fn remove_download_condition_ref(
        &mut self,
        condition: &Arc<dyn DownloadCondition>,
    ) -> std::result::Result<(), ConditionError> {
        self.download_conditions.remove_ref(condition)
    }

    /// Calls `listener` for every event of `kind`
    pub fn on<F>(&mut self, kind: SignalKind, listener: F)
    where
        F: Fn(&CrawlEvent) + Send + Sync + 'static,
    {
        self.signals.on(kind, listener);
    }

    pub fn on_any<F>(&mut self, listener: F)
    where
        F: Fn(&CrawlEvent) + Send + Sync + 'static,
    {
        self.signals.on_any(listener);
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CrawlEvent> {
        self.signals.subscribe()
    }

    /// Runs the crawl until it completes or is stopped
    ///
    /// The seed is queued when the queue is empty. A stopped crawl can be
    /// resumed by calling `start` again.
    pub async fn start(&mut self) -> Result<()> {
        // Stops requested while idle are stale
        while let Ok(control) = self.control_rx.try_recv() {
            if let Control::Reconfigure(config) = control {
                self.reconfigure(*config);
            }
        }

        info!(seed = %self.seed, items = self.queue.len(), "Starting crawl");
        self.signals.emit(CrawlEvent::CrawlStart);

        if self.config.crawler.respect_robots_txt && !self.robots.is_fresh(&self.seed) {
            let seed = self.seed.clone();
            self.load_robots(&seed).await;
        }

        if self.queue.is_empty() {
            self.queue_seed()?;
        }

        let mut ticker = new_ticker(self.config.crawler.interval);

        loop {
            // Control requests take priority over task reports, which take
            // priority over dispatching more work
            tokio::select! {
                biased;

                Some(control) = self.control_rx.recv() => match control {
                    Control::Stop => {
                        info!(open_fetches = self.scheduler.open_fetches(), "Crawl stopped");
                        break;
                    }
                    Control::HardStop => {
                        self.abort_in_flight();
                        break;
                    }
                    Control::Reconfigure(config) => {
                        self.reconfigure(*config);
                        if ticker.period() != Duration::from_millis(self.config.crawler.interval) {
                            ticker = new_ticker(self.config.crawler.interval);
                        }
                    }
                },
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }
                Some(exit) = self.tasks.join_next() => {
                    self.on_task_exit(exit);
                }
                _ = ticker.tick() => {
                    if self.tick() {
                        info!(
                            items = self.queue.len(),
                            downloaded = self.queue.iter().filter(|i| i.status == FetchStatus::Downloaded).count(),
                            "Crawl complete"
                        );
                        self.signals.emit(CrawlEvent::Complete);
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Resolves, filters and queues a URL
    ///
    /// The URL is resolved against the referrer item, or the seed when there
    /// is none. Fetch conditions only run when a referrer is given. Returns the
    /// new item's id, or `None` when the URL was filtered out, disallowed,
    /// vetoed or is already queued (and `force` is not set).
    pub async fn queue_url(
        &mut self,
        url: &str,
        referrer: Option<usize>,
        force: bool,
    ) -> Result<Option<usize>> {
        let referrer = match referrer {
            Some(id) => Some(self.queue.get(id)?.clone()),
            None => None,
        };
        let (base, depth, referrer_url) = match &referrer {
            Some(item) => (item.resolved(), item.depth + 1, item.url.clone()),
            None => (self.seed.clone(), 1, String::new()),
        };

        let resolved = match resolve(url, &base) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.signals.emit(CrawlEvent::QueueError {
                    url: url.to_string(),
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let entry = match self.admit(resolved, depth, &referrer_url, force) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if let Some(item) = &referrer {
            let conditions = self.fetch_conditions.snapshot();
            match evaluate_fetch_conditions(&conditions, &entry.url, item).await {
                Ok(true) => {}
                Ok(false) => return Ok(None),
                Err(error) => {
                    warn!(url = %entry.url, error = %error, "Fetch condition failed");
                    self.signals.emit(CrawlEvent::FetchConditionError {
                        url: entry.url.url(),
                        referrer: item.clone(),
                        error,
                    });
                    return Ok(None);
                }
            }
        }

        match self.insert(entry, referrer.as_ref(), force) {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.is_duplicate() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn reconfigure(&mut self, config: Config) {
        match self.set_config(config) {
            Ok(()) => debug!("Configuration updated"),
            Err(e) => warn!(error = %e, "Rejected configuration update"),
        }
    }

    /// Returns true once the crawl is complete
    fn tick(&mut self) -> bool {
        let max = self.config.crawler.max_concurrency as usize;
        if !self.scheduler.has_capacity(max) {
            return false;
        }

        if let Some(id) = self.queue.oldest_unfetched_item().map(|item| item.id) {
            self.dispatch(id);
            return false;
        }

        self.scheduler.is_idle() && self.queue.fetched_count() == self.queue.len()
    }

    fn queue_seed(&mut self) -> Result<()> {
        let seed = self.seed.clone();
        if self.config.crawler.respect_robots_txt
            && !self.robots.is_allowed(&seed, &self.config.crawler.user_agent)
        {
            info!(seed = %seed, "Seed is disallowed by robots.txt");
            self.signals
                .emit(CrawlEvent::FetchDisallowed { url: seed.url() });
            return Ok(());
        }

        self.insert(QueueEntry::new(seed, 1, ""), None, false)?;
        Ok(())
    }

    async fn load_robots(&mut self, url: &ResolvedUrl) {
        let location = robots_url(url);
        let request = FetchRequest::new(location.url())
            .header("user-agent", self.config.crawler.user_agent.as_str())
            .auth(self.config.auth.clone());
        let timeout = Duration::from_millis(self.config.crawler.timeout);

        let fetched = tokio::time::timeout(
            timeout,
            fetch_bytes(self.transport.as_ref(), request, ROBOTS_MAX_SIZE),
        )
        .await;

        let rules = match fetched {
            Ok(Ok((status, body))) => {
                debug!(url = %location, status, "Fetched robots.txt");
                ParsedRobots::from_response(status, &body)
            }
            Ok(Err(e)) => {
                warn!(url = %location, error = %e, "Failed to fetch robots.txt, allowing all");
                ParsedRobots::allow_all()
            }
            Err(_) => {
                warn!(url = %location, "Timed out fetching robots.txt, allowing all");
                ParsedRobots::allow_all()
            }
        };
        self.robots.insert(url, rules);
    }

    fn dispatch(&mut self, id: usize) {
        let item = match self.queue.get_mut(id) {
            Ok(item) => {
                item.status = FetchStatus::Spooled;
                item.clone()
            }
            Err(_) => return,
        };

        let mut request = FetchRequest::new(item.url.as_str())
            .header("user-agent", self.config.crawler.user_agent.as_str())
            .auth(self.config.auth.clone());
        if !item.referrer.is_empty() {
            request = request.header("referer", item.referrer.as_str());
        }
        if let Some(cached) = self.cache_lookup(&item.url) {
            for (name, value) in cached.conditional_headers() {
                request = request.header(name, value);
            }
        }

        debug!(id, url = %item.url, depth = item.depth, "Dispatching fetch");
        self.signals
            .emit(CrawlEvent::FetchStart { item: item.clone() });

        let crawler = &self.config.crawler;
        let job = FetchJob {
            item,
            request,
            transport: Arc::clone(&self.transport),
            download_conditions: self.download_conditions.snapshot(),
            policy: Arc::clone(&self.policy),
            download_unsupported: crawler.download_unsupported,
            max_resource_size: usize::try_from(crawler.max_resource_size).unwrap_or(usize::MAX),
            timeout: Duration::from_millis(crawler.timeout),
            events: self.events_tx.clone(),
        };
        let abort = self.tasks.spawn(run_fetch(job));
        self.scheduler.acquire(id, abort);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Headers {
                id,
                status,
                headers,
                latency,
            } => self.on_headers(id, status, ResponseInfo::new(status, headers), latency),
            Event::DownloadPrevented { id } => {
                if let Some(item) = self.finish(id, FetchStatus::DownloadPrevented, None) {
                    self.signals.emit(CrawlEvent::DownloadPrevented { item });
                }
            }
            Event::DownloadConditionError { id, error } => {
                if let Some(item) = self.finish(id, FetchStatus::DownloadPrevented, None) {
                    self.signals
                        .emit(CrawlEvent::DownloadConditionError { item, error });
                }
            }
            Event::DataError { id } => {
                if let Some(item) = self.in_flight(id) {
                    warn!(id, url = %item.url, "Resource exceeds maximum size");
                    self.signals.emit(CrawlEvent::FetchDataError { item });
                }
            }
            Event::Body {
                id,
                body,
                request_time,
                download_time,
            } => self.on_body(id, body, request_time, download_time),
            Event::TransportError { id, error } => {
                if let Some(item) = self.finish(id, FetchStatus::Failed, Some(TRANSPORT_ERROR_CODE)) {
                    warn!(id, url = %item.url, error = %error, "Fetch failed");
                    self.signals
                        .emit(CrawlEvent::FetchClientError { item, error });
                }
            }
            Event::TimedOut { id } => {
                if let Some(item) = self.finish(id, FetchStatus::Timeout, Some(TIMEOUT_CODE)) {
                    warn!(id, url = %item.url, "Fetch timed out");
                    self.signals.emit(CrawlEvent::FetchTimeout {
                        item,
                        timeout_ms: self.config.crawler.timeout,
                    });
                }
            }
            Event::Evaluated {
                task,
                referrer,
                results,
            } => self.on_evaluated(task, referrer, results),
        }
    }

    /// A copy of the item if it still holds a fetch slot
    fn in_flight(&self, id: usize) -> Option<QueueItem> {
        if !self.scheduler.is_in_flight(id) {
            return None;
        }
        self.queue.get(id).ok().filter(|item| !item.fetched).cloned()
    }

    /// Records a terminal outcome and frees the item's slot
    ///
    /// Only the first outcome for an item counts; later ones return `None`.
    fn finish(&mut self, id: usize, status: FetchStatus, code: Option<u16>) -> Option<QueueItem> {
        if !self.scheduler.is_in_flight(id) {
            return None;
        }
        let item = self.queue.get_mut(id).ok()?;
        if item.fetched {
            return None;
        }

        item.status = status;
        item.fetched = true;
        if code.is_some() {
            item.state_data.code = code;
        }
        let item = item.clone();

        self.scheduler.release(id);
        Some(item)
    }

    fn on_headers(&mut self, id: usize, status: u16, info: ResponseInfo, latency: Duration) {
        if !self.scheduler.is_in_flight(id) {
            return;
        }
        let item = match self.queue.get_mut(id) {
            Ok(item) if !item.fetched => item,
            _ => return,
        };

        let location = info.headers.get("location").cloned();
        item.status = FetchStatus::Headers;
        let data = &mut item.state_data;
        data.code = Some(status);
        data.request_latency = Some(millis(latency));
        data.content_length = info.content_length;
        data.content_type = info.content_type;
        data.headers = info.headers;
        let item = item.clone();

        trace!(id, status, "Received headers");
        self.signals
            .emit(CrawlEvent::FetchHeaders { item });

        match (status, location) {
            (200..=299, _) => {}
            (304, _) => {
                if let Some(item) = self.finish(id, FetchStatus::NotModified, None) {
                    let cached = self.cache_lookup(&item.url);
                    self.signals.emit(CrawlEvent::NotModified { item, cached });
                }
            }
            (300..=399, Some(location)) => {
                if let Some(item) = self.finish(id, FetchStatus::Redirected, None) {
                    self.signals.emit(CrawlEvent::FetchRedirect {
                        item: item.clone(),
                        location: location.clone(),
                    });
                    self.follow_redirect(&item, &location);
                }
            }
            (404 | 410, _) => {
                if let Some(item) = self.finish(id, FetchStatus::NotFound, None) {
                    self.signals.emit(CrawlEvent::Fetch404 { item });
                }
            }
            _ => {
                if let Some(item) = self.finish(id, FetchStatus::Failed, None) {
                    self.signals.emit(CrawlEvent::FetchError { item });
                }
            }
        }
    }

    fn on_body(&mut self, id: usize, body: Vec<u8>, request_time: Duration, download_time: Duration) {
        if !self.scheduler.is_in_flight(id) {
            return;
        }
        if let Ok(item) = self.queue.get_mut(id) {
            if item.fetched {
                return;
            }
            let actual = body.len() as u64;
            let data = &mut item.state_data;
            data.actual_data_size = Some(actual);
            data.sent_incorrect_size = data.content_length.map_or(false, |len| len != actual);
            data.request_time = Some(millis(request_time));
            data.download_time = Some(millis(download_time));
        }

        let item = match self.finish(id, FetchStatus::Downloaded, None) {
            Some(item) => item,
            None => return,
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&item, &body) {
                warn!(url = %item.url, error = %e, "Failed to store response in cache");
            }
        }

        let body = Arc::new(body);
        self.signals.emit(CrawlEvent::FetchComplete {
            item: item.clone(),
            body: Arc::clone(&body),
        });

        let supported = item
            .state_data
            .content_type
            .as_deref()
            .map_or(false, |ct| self.policy.mime_supported(ct));
        if !self.config.crawler.discover_resources || !supported {
            return;
        }

        let options = DiscoveryOptions {
            parse_html_comments: self.config.crawler.parse_html_comments,
            parse_script_tags: self.config.crawler.parse_script_tags,
        };
        let resources = discover(&body, &options);
        trace!(id, found = resources.len(), "Discovered resources");
        self.signals.emit(CrawlEvent::DiscoveryComplete {
            item: item.clone(),
            resources: resources.clone(),
        });

        let base = item.resolved();
        let mut entries = Vec::new();
        for resource in &resources {
            match resolve(resource, &base) {
                Ok(url) => {
                    if let Some(entry) = self.admit(url, item.depth + 1, &item.url, false) {
                        entries.push(entry);
                    }
                }
                Err(e) => trace!(resource = %resource, error = %e, "Dropping unresolvable resource"),
            }
        }
        self.submit(&item, entries);
    }

    fn follow_redirect(&mut self, item: &QueueItem, location: &str) {
        match resolve(location, &item.resolved()) {
            Ok(url) => {
                if let Some(entry) = self.admit(url, item.depth + 1, &item.url, false) {
                    self.submit(item, vec![entry]);
                }
            }
            Err(e) => self.signals.emit(CrawlEvent::QueueError {
                url: location.to_string(),
                error: e.to_string(),
            }),
        }
    }

    /// Applies protocol, domain, depth, robots and duplicate policy
    fn admit(
        &mut self,
        url: ResolvedUrl,
        depth: u32,
        referrer: &str,
        force: bool,
    ) -> Option<QueueEntry> {
        if !self.policy.protocol_allowed(&url.protocol) {
            trace!(url = %url, "Protocol not allowed");
            return None;
        }
        if !domain_valid(&url.host, &self.seed.host, &self.config.domain) {
            trace!(url = %url, "Host out of scope");
            return None;
        }
        if !self.depth_allowed(&url, depth) {
            trace!(url = %url, depth, "Beyond maximum depth");
            return None;
        }

        let key = url.url();
        if self.config.crawler.respect_robots_txt
            && !self.robots.is_allowed(&url, &self.config.crawler.user_agent)
        {
            self.signals.emit(CrawlEvent::FetchDisallowed { url: key });
            return None;
        }
        if !force && self.queue.exists(&key) {
            self.signals.emit(CrawlEvent::QueueDuplicate { url: key });
            return None;
        }

        Some(QueueEntry::new(url, depth, referrer))
    }

    fn depth_allowed(&self, url: &ResolvedUrl, depth: u32) -> bool {
        let crawler = &self.config.crawler;
        if crawler.max_depth == 0 || depth <= crawler.max_depth {
            return true;
        }

        let limit = crawler
            .max_depth
            .saturating_add(crawler.fetch_whitelisted_mime_types_below_max_depth);
        depth <= limit
            && guess_mime_type(url.path_only()).map_or(false, |mime| self.policy.mime_whitelisted(mime))
    }

    /// Queues admitted entries, after fetch conditions when any are registered
    fn submit(&mut self, referrer: &QueueItem, entries: Vec<QueueEntry>) {
        if entries.is_empty() {
            return;
        }

        let conditions = self.fetch_conditions.snapshot();
        if conditions.is_empty() {
            for entry in entries {
                let _ = self.insert(entry, Some(referrer), false);
            }
            return;
        }

        let events = self.events_tx.clone();
        let referrer = referrer.clone();
        let abort = self.tasks.spawn(async move {
            let mut results = Vec::with_capacity(entries.len());
            for entry in entries {
                let allowed = evaluate_fetch_conditions(&conditions, &entry.url, &referrer).await;
                results.push((entry, allowed));
            }
            let _ = events.send(Event::Evaluated {
                task: tokio::task::id(),
                referrer: referrer.id,
                results,
            });
        });
        self.scheduler.begin_evaluation(abort.id());
    }

    fn on_evaluated(
        &mut self,
        task: tokio::task::Id,
        referrer: usize,
        results: Vec<(QueueEntry, std::result::Result<bool, ConditionError>)>,
    ) {
        self.scheduler.end_evaluation(task);
        let referrer = match self.queue.get(referrer) {
            Ok(item) => item.clone(),
            Err(_) => return,
        };

        for (entry, allowed) in results {
            match allowed {
                Ok(true) => {
                    let _ = self.insert(entry, Some(&referrer), false);
                }
                Ok(false) => trace!(url = %entry.url, "Vetoed by fetch condition"),
                Err(error) => {
                    warn!(url = %entry.url, error = %error, "Fetch condition failed");
                    self.signals.emit(CrawlEvent::FetchConditionError {
                        url: entry.url.url(),
                        referrer: referrer.clone(),
                        error,
                    });
                }
            }
        }
    }

    /// Releases whatever a task that died without reporting was holding
    fn on_task_exit(&mut self, exit: std::result::Result<(), JoinError>) {
        let error = match exit {
            Err(error) if !error.is_cancelled() => error,
            _ => return,
        };

        let task = error.id();
        if self.scheduler.end_evaluation(task) {
            warn!(error = %error, "Fetch condition task failed");
            return;
        }
        if let Some(id) = self.scheduler.fetch_for_task(task) {
            if let Some(item) = self.finish(id, FetchStatus::Failed, Some(TRANSPORT_ERROR_CODE)) {
                warn!(id, url = %item.url, error = %error, "Fetch task failed");
                self.signals.emit(CrawlEvent::FetchClientError {
                    item,
                    error: TransportError::Task(error.to_string()),
                });
            }
        }
    }

    fn insert(
        &mut self,
        entry: QueueEntry,
        referrer: Option<&QueueItem>,
        force: bool,
    ) -> QueueResult<usize> {
        let url = entry.url.url();
        match self.queue.add(entry, force).map(|item| item.clone()) {
            Ok(item) => {
                let id = item.id;
                self.signals.emit(CrawlEvent::QueueAdd {
                    item,
                    referrer: referrer.cloned(),
                });
                Ok(id)
            }
            Err(e) if e.is_duplicate() => {
                self.signals.emit(CrawlEvent::QueueDuplicate { url });
                Err(e)
            }
            Err(e) => {
                self.signals.emit(CrawlEvent::QueueError {
                    url,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn cache_lookup(&self, url: &str) -> Option<CacheEntry> {
        let cache = self.cache.as_ref()?;
        match cache.get(url) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(url, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    fn abort_in_flight(&mut self) {
        let aborted = self.scheduler.abort_all();
        self.queue.requeue(&aborted);

        // Reports from aborted fetches are stale; finished evaluations are not
        let mut evaluations = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if matches!(event, Event::Evaluated { .. }) {
                evaluations.push(event);
            }
        }
        for event in evaluations {
            self.handle_event(event);
        }

        info!(aborted = aborted.len(), "Crawl hard-stopped");
    }
}

fn new_ticker(interval_ms: u64) -> Interval {
    let mut ticker = interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
