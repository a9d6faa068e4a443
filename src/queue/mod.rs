//! Frontier queue for the crawl
//!
//! # Components
//!
//! - `QueueItem` / `StateData`: one resource and its fetch bookkeeping
//! - `ItemFilter`: field-subset matching for counting and filtering items
//! - `FrontierQueue`: insertion-ordered, de-duplicated item store with
//!   statistics and freeze/defrost snapshots

mod filter;
mod frontier;
mod item;
mod snapshot;

pub use filter::ItemFilter;
pub use frontier::FrontierQueue;
pub use item::{QueueEntry, QueueItem, StateData, Statistic};
pub use snapshot::SNAPSHOT_VERSION;
