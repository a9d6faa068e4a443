//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `FetchStatus`: the lifecycle of a single queue item (queued, spooled,
//!   headers, and the terminal outcomes)

mod fetch_status;

pub use fetch_status::FetchStatus;
