use crate::queue::{ItemFilter, QueueEntry, QueueItem, Statistic};
use crate::state::FetchStatus;
use crate::{QueueError, QueueResult};
use std::collections::HashSet;
use tracing::trace;

/// The ordered, de-duplicated collection of every resource the crawl has seen
///
/// Items are only ever appended; an item's id is its position. The
/// duplicate index holds every canonical URL that has been added.
#[derive(Debug, Clone, Default)]
pub struct FrontierQueue {
    pub(crate) items: Vec<QueueItem>,
    pub(crate) scanned: HashSet<String>,
    pub(crate) oldest_unfetched_index: usize,
    pub(crate) config_hash: Option<String>,
}

impl FrontierQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new queued item for the entry's URL
    ///
    /// Fails with [`QueueError::Duplicate`] if the canonical URL was already
    /// added, unless `allow_duplicate` is set.
    pub fn add(&mut self, entry: QueueEntry, allow_duplicate: bool) -> QueueResult<&QueueItem> {
        let key = entry.url.url();
        if !allow_duplicate && self.scanned.contains(&key) {
            return Err(QueueError::Duplicate(key));
        }

        let id = self.items.len();
        trace!(id, url = %key, depth = entry.depth, "Adding queue item");
        self.scanned.insert(key);
        self.items.push(QueueItem::new(id, entry));
        Ok(&self.items[id])
    }

    /// Returns true if this canonical URL has been added
    pub fn exists(&self, url: &str) -> bool {
        self.scanned.contains(url)
    }

    pub fn get(&self, id: usize) -> QueueResult<&QueueItem> {
        let len = self.items.len();
        self.items.get(id).ok_or(QueueError::OutOfRange { id, len })
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> QueueResult<&mut QueueItem> {
        let len = self.items.len();
        self.items.get_mut(id).ok_or(QueueError::OutOfRange { id, len })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    /// Returns the first queued item at or after the cursor
    ///
    /// The cursor only moves forward, to the position of the item returned.
    /// Items before it are never rescanned.
    pub fn oldest_unfetched_item(&mut self) -> Option<&QueueItem> {
        let start = self.oldest_unfetched_index.min(self.items.len());
        let offset = self.items[start..]
            .iter()
            .position(|item| item.status == FetchStatus::Queued)?;

        self.oldest_unfetched_index = start + offset;
        self.items.get(self.oldest_unfetched_index)
    }

    /// Puts items whose fetch was abandoned back in line
    ///
    /// The cursor moves back to the smallest requeued id so they are
    /// dispatched again.
    pub(crate) fn requeue(&mut self, ids: &[usize]) {
        for &id in ids {
            if let Some(item) = self.items.get_mut(id) {
                if !item.fetched {
                    item.status = FetchStatus::Queued;
                    item.state_data = Default::default();
                }
            }
        }
        if let Some(&first) = ids.iter().min() {
            self.oldest_unfetched_index = self.oldest_unfetched_index.min(first);
        }
    }

    pub fn count_items(&self, filter: &ItemFilter) -> usize {
        self.items.iter().filter(|item| filter.matches(item)).count()
    }

    pub fn filter_items(&self, filter: &ItemFilter) -> Vec<&QueueItem> {
        self.items.iter().filter(|item| filter.matches(item)).collect()
    }

    /// Number of items with a recorded terminal outcome
    pub fn fetched_count(&self) -> usize {
        self.items.iter().filter(|item| item.fetched).count()
    }

    /// Largest value of a statistic over fetched items; 0 when none has it
    pub fn max(&self, statistic: &str) -> QueueResult<u64> {
        Ok(self.values(statistic)?.max().unwrap_or(0))
    }

    /// Smallest value of a statistic over fetched items; 0 when none has it
    pub fn min(&self, statistic: &str) -> QueueResult<u64> {
        Ok(self.values(statistic)?.min().unwrap_or(0))
    }

    /// Mean value of a statistic over fetched items; 0 when none has it
    pub fn avg(&self, statistic: &str) -> QueueResult<f64> {
        let (sum, count) = self
            .values(statistic)?
            .fold((0u128, 0u64), |(sum, count), v| (sum + v as u128, count + 1));

        if count == 0 {
            Ok(0.0)
        } else {
            Ok(sum as f64 / count as f64)
        }
    }

    fn values<'a>(&'a self, statistic: &str) -> QueueResult<impl Iterator<Item = u64> + 'a> {
        let stat = Statistic::parse(statistic)
            .ok_or_else(|| QueueError::UnknownStatistic(statistic.to_string()))?;

        Ok(self
            .items
            .iter()
            .filter(|item| item.fetched)
            .filter_map(move |item| stat.value(&item.state_data)))
    }

    /// Hash of the configuration this queue was crawled with, if recorded
    pub fn config_hash(&self) -> Option<&str> {
        self.config_hash.as_deref()
    }

    pub fn set_config_hash(&mut self, hash: Option<String>) {
        self.config_hash = hash;
    }
}
