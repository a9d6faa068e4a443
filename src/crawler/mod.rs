//! Crawler module for the crawl runloop
//!
//! This module contains the core crawling logic, including:
//! - the tick-driven runloop with a bounded number of concurrent fetches
//! - fetch tasks and the transport they go through
//! - fetch and download conditions
//! - crawl signals

mod conditions;
mod coordinator;
mod events;
mod fetcher;
mod scheduler;

pub use conditions::{
    evaluate_download_conditions, evaluate_fetch_conditions, ConditionId, ConditionRegistry,
    DownloadCondition, FetchCondition, ResponseInfo,
};
pub use coordinator::{CrawlHandle, Crawler, TIMEOUT_CODE, TRANSPORT_ERROR_CODE};
pub use events::{CrawlEvent, SignalKind, Signals};
pub use fetcher::{fetch_bytes, FetchRequest, HttpTransport, Transport, TransportResponse};
pub use scheduler::Scheduler;
