//! Crawl signals
//!
//! Every observable step of a crawl is reported as a [`CrawlEvent`]. Callers
//! either register listeners for specific kinds with [`Signals::on`] or take
//! a channel of all events with [`Signals::subscribe`].

use crate::cache::CacheEntry;
use crate::queue::QueueItem;
use crate::{ConditionError, TransportError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Something that happened during a crawl
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// The runloop started
    CrawlStart,
    /// An item was added to the queue
    QueueAdd {
        item: QueueItem,
        referrer: Option<QueueItem>,
    },
    /// A URL could not be resolved or inserted
    QueueError { url: String, error: String },
    /// A URL was already present in the queue
    QueueDuplicate { url: String },
    /// A request was dispatched
    FetchStart { item: QueueItem },
    /// Response headers arrived
    FetchHeaders { item: QueueItem },
    /// A body was downloaded in full
    FetchComplete { item: QueueItem, body: Arc<Vec<u8>> },
    /// The body exceeded the maximum resource size and was truncated
    FetchDataError { item: QueueItem },
    /// The server answered 304; carries the cached entry when one exists
    NotModified {
        item: QueueItem,
        cached: Option<CacheEntry>,
    },
    /// The server redirected; `location` is the raw header value
    FetchRedirect {
        item: QueueItem,
        location: String,
    },
    /// The server answered 404 or 410
    Fetch404 { item: QueueItem },
    /// The server answered with an unhandled status
    FetchError { item: QueueItem },
    /// The transport failed before a full response arrived
    FetchClientError {
        item: QueueItem,
        error: TransportError,
    },
    /// No terminal outcome within the timeout
    FetchTimeout { item: QueueItem, timeout_ms: u64 },
    /// A download condition or MIME policy vetoed the body
    DownloadPrevented { item: QueueItem },
    /// A download condition failed; the download was prevented
    DownloadConditionError {
        item: QueueItem,
        error: ConditionError,
    },
    /// A fetch condition failed; the URL was not queued
    FetchConditionError {
        url: String,
        referrer: QueueItem,
        error: ConditionError,
    },
    /// robots.txt disallows the URL
    FetchDisallowed { url: String },
    /// Discovery finished for a downloaded document
    DiscoveryComplete {
        item: QueueItem,
        resources: Vec<String>,
    },
    /// Nothing is in flight or queued and every item is fetched
    Complete,
}

/// The kind of a [`CrawlEvent`], used to select listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    CrawlStart,
    QueueAdd,
    QueueError,
    QueueDuplicate,
    FetchStart,
    FetchHeaders,
    FetchComplete,
    FetchDataError,
    NotModified,
    FetchRedirect,
    Fetch404,
    FetchError,
    FetchClientError,
    FetchTimeout,
    DownloadPrevented,
    DownloadConditionError,
    FetchConditionError,
    FetchDisallowed,
    DiscoveryComplete,
    Complete,
}

impl SignalKind {
    /// The signal's wire name, e.g. `"fetchcomplete"`
    pub fn name(&self) -> &'static str {
        match self {
            Self::CrawlStart => "crawlstart",
            Self::QueueAdd => "queueadd",
            Self::QueueError => "queueerror",
            Self::QueueDuplicate => "queueduplicate",
            Self::FetchStart => "fetchstart",
            Self::FetchHeaders => "fetchheaders",
            Self::FetchComplete => "fetchcomplete",
            Self::FetchDataError => "fetchdataerror",
            Self::NotModified => "notmodified",
            Self::FetchRedirect => "fetchredirect",
            Self::Fetch404 => "fetch404",
            Self::FetchError => "fetcherror",
            Self::FetchClientError => "fetchclienterror",
            Self::FetchTimeout => "fetchtimeout",
            Self::DownloadPrevented => "downloadprevented",
            Self::DownloadConditionError => "downloadconditionerror",
            Self::FetchConditionError => "fetchconditionerror",
            Self::FetchDisallowed => "fetchdisallowed",
            Self::DiscoveryComplete => "discoverycomplete",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CrawlEvent {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::CrawlStart => SignalKind::CrawlStart,
            Self::QueueAdd { .. } => SignalKind::QueueAdd,
            Self::QueueError { .. } => SignalKind::QueueError,
            Self::QueueDuplicate { .. } => SignalKind::QueueDuplicate,
            Self::FetchStart { .. } => SignalKind::FetchStart,
            Self::FetchHeaders { .. } => SignalKind::FetchHeaders,
            Self::FetchComplete { .. } => SignalKind::FetchComplete,
            Self::FetchDataError { .. } => SignalKind::FetchDataError,
            Self::NotModified { .. } => SignalKind::NotModified,
            Self::FetchRedirect { .. } => SignalKind::FetchRedirect,
            Self::Fetch404 { .. } => SignalKind::Fetch404,
            Self::FetchError { .. } => SignalKind::FetchError,
            Self::FetchClientError { .. } => SignalKind::FetchClientError,
            Self::FetchTimeout { .. } => SignalKind::FetchTimeout,
            Self::DownloadPrevented { .. } => SignalKind::DownloadPrevented,
            Self::DownloadConditionError { .. } => SignalKind::DownloadConditionError,
            Self::FetchConditionError { .. } => SignalKind::FetchConditionError,
            Self::FetchDisallowed { .. } => SignalKind::FetchDisallowed,
            Self::DiscoveryComplete { .. } => SignalKind::DiscoveryComplete,
            Self::Complete => SignalKind::Complete,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// The queue item the event is about, if any
    pub fn item(&self) -> Option<&QueueItem> {
        match self {
            Self::QueueAdd { item, .. }
            | Self::FetchStart { item }
            | Self::FetchHeaders { item }
            | Self::FetchComplete { item, .. }
            | Self::FetchDataError { item }
            | Self::NotModified { item, .. }
            | Self::FetchRedirect { item, .. }
            | Self::Fetch404 { item }
            | Self::FetchError { item }
            | Self::FetchClientError { item, .. }
            | Self::FetchTimeout { item, .. }
            | Self::DownloadPrevented { item }
            | Self::DownloadConditionError { item, .. }
            | Self::DiscoveryComplete { item, .. } => Some(item),
            _ => None,
        }
    }
}

type Listener = Box<dyn Fn(&CrawlEvent) + Send + Sync>;

/// Listener and subscriber registry for crawl events
#[derive(Default)]
pub struct Signals {
    listeners: Vec<(Option<SignalKind>, Listener)>,
    subscribers: Vec<mpsc::UnboundedSender<CrawlEvent>>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls `listener` for every event of `kind`
    pub fn on<F>(&mut self, kind: SignalKind, listener: F)
    where
        F: Fn(&CrawlEvent) + Send + Sync + 'static,
    {
        self.listeners.push((Some(kind), Box::new(listener)));
    }

    /// Calls `listener` for every event
    pub fn on_any<F>(&mut self, listener: F)
    where
        F: Fn(&CrawlEvent) + Send + Sync + 'static,
    {
        self.listeners.push((None, Box::new(listener)));
    }

    /// Returns a channel receiving a copy of every later event
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CrawlEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: CrawlEvent) {
        let kind = event.kind();
        match event.item() {
            Some(item) => debug!(signal = %kind, id = item.id, url = %item.url, "Signal"),
            None => debug!(signal = %kind, "Signal"),
        }

        for (filter, listener) in &self.listeners {
            if filter.map_or(true, |k| k == kind) {
                listener(&event);
            }
        }

        // Dropped receivers are forgotten
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("listeners", &self.listeners.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
