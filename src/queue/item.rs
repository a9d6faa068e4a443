use crate::state::FetchStatus;
use crate::url::ResolvedUrl;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resolved URL waiting to be inserted into the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub url: ResolvedUrl,
    pub depth: u32,
    pub referrer: String,
}

impl QueueEntry {
    pub fn new(url: ResolvedUrl, depth: u32, referrer: impl Into<String>) -> Self {
        Self {
            url,
            depth,
            referrer: referrer.into(),
        }
    }
}

/// One discovered or fetched resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Position in the frontier, assigned at insertion
    pub id: usize,
    /// Canonical URL, the de-duplication key
    pub url: String,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Distance from the seed (seed = 1)
    pub depth: u32,
    /// URL of the document that linked here; empty for the seed
    pub referrer: String,
    pub status: FetchStatus,
    /// Set once a terminal outcome has been recorded; never reverts
    pub fetched: bool,
    #[serde(default)]
    pub state_data: StateData,
}

impl QueueItem {
    pub(crate) fn new(id: usize, entry: QueueEntry) -> Self {
        let QueueEntry {
            url,
            depth,
            referrer,
        } = entry;
        Self {
            id,
            url: url.url(),
            protocol: url.protocol,
            host: url.host,
            port: url.port,
            path: url.path,
            depth,
            referrer,
            status: FetchStatus::Queued,
            fetched: false,
            state_data: StateData::default(),
        }
    }

    /// The item's URL as components, usable as a resolution context
    pub fn resolved(&self) -> ResolvedUrl {
        ResolvedUrl {
            protocol: self.protocol.clone(),
            host: self.host.clone(),
            port: self.port,
            path: self.path.clone(),
        }
    }
}

/// Timing, response metadata and size bookkeeping for a queue item
///
/// Times are in milliseconds, sizes in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateData {
    /// Dispatch until response headers
    pub request_latency: Option<u64>,
    /// Dispatch until the body was complete
    pub request_time: Option<u64>,
    /// Response headers until the body was complete
    pub download_time: Option<u64>,
    /// Advertised `content-length`
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    /// HTTP status, or a sentinel for transport errors and timeouts
    pub code: Option<u16>,
    /// Raw response headers with lower-cased names
    pub headers: BTreeMap<String, String>,
    /// Bytes actually accumulated
    pub actual_data_size: Option<u64>,
    /// True when the accumulated size differs from the advertised length
    pub sent_incorrect_size: bool,
}

/// Numeric `StateData` fields that can be aggregated over a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    RequestLatency,
    RequestTime,
    DownloadTime,
    ContentLength,
    ActualDataSize,
}

impl Statistic {
    /// Parses a statistic name, in either camelCase or snake_case
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "requestLatency" | "request_latency" => Some(Self::RequestLatency),
            "requestTime" | "request_time" => Some(Self::RequestTime),
            "downloadTime" | "download_time" => Some(Self::DownloadTime),
            "contentLength" | "content_length" => Some(Self::ContentLength),
            "actualDataSize" | "actual_data_size" => Some(Self::ActualDataSize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestLatency => "requestLatency",
            Self::RequestTime => "requestTime",
            Self::DownloadTime => "downloadTime",
            Self::ContentLength => "contentLength",
            Self::ActualDataSize => "actualDataSize",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::RequestLatency,
            Self::RequestTime,
            Self::DownloadTime,
            Self::ContentLength,
            Self::ActualDataSize,
        ]
    }

    /// Reads this statistic from an item's state data
    pub fn value(&self, data: &StateData) -> Option<u64> {
        match self {
            Self::RequestLatency => data.request_latency,
            Self::RequestTime => data.request_time,
            Self::DownloadTime => data.download_time,
            Self::ContentLength => data.content_length,
            Self::ActualDataSize => data.actual_data_size,
        }
    }
}
