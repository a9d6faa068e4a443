//! Fetch slot bookkeeping for the runloop
//!
//! This module handles:
//! - tracking which queue items currently hold a fetch slot
//! - tracking fetch-condition evaluations that are still outstanding
//! - mapping spawned tasks back to the work they were doing
//! - the messages fetch and evaluation tasks send back to the runloop

use crate::queue::QueueEntry;
use crate::{ConditionError, TransportError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::task::{AbortHandle, Id};

/// Messages from spawned tasks to the runloop
#[derive(Debug)]
pub(crate) enum Event {
    /// Response headers arrived
    Headers {
        id: usize,
        status: u16,
        headers: BTreeMap<String, String>,
        latency: Duration,
    },
    /// The body will not be read
    DownloadPrevented { id: usize },
    /// A download condition failed
    DownloadConditionError { id: usize, error: ConditionError },
    /// The body exceeded the size cap and was truncated
    DataError { id: usize },
    /// The body was read
    Body {
        id: usize,
        body: Vec<u8>,
        request_time: Duration,
        download_time: Duration,
    },
    /// The transport failed
    TransportError { id: usize, error: TransportError },
    /// The item's timeout elapsed
    TimedOut { id: usize },
    /// Fetch conditions were evaluated for a batch of candidates
    Evaluated {
        task: Id,
        referrer: usize,
        results: Vec<(QueueEntry, Result<bool, ConditionError>)>,
    },
}

/// Tracks fetch slots and outstanding condition evaluations
///
/// Releasing a slot is idempotent, so a late or duplicate outcome for an item
/// can never free a slot twice.
#[derive(Debug, Default)]
pub struct Scheduler {
    in_flight: HashMap<usize, AbortHandle>,
    evaluations: HashSet<Id>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `id` now holds a fetch slot
    pub fn acquire(&mut self, id: usize, abort: AbortHandle) {
        self.in_flight.insert(id, abort);
    }

    /// Frees the slot held by `id`; returns false if it held none
    pub fn release(&mut self, id: usize) -> bool {
        self.in_flight.remove(&id).is_some()
    }

    pub fn is_in_flight(&self, id: usize) -> bool {
        self.in_flight.contains_key(&id)
    }

    /// The queue item whose fetch runs on `task`, if it still holds a slot
    pub fn fetch_for_task(&self, task: Id) -> Option<usize> {
        self.in_flight
            .iter()
            .find(|(_, abort)| abort.id() == task)
            .map(|(id, _)| *id)
    }

    pub fn open_fetches(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_evaluations(&self) -> usize {
        self.evaluations.len()
    }

    /// Records an evaluation running on `task`
    pub fn begin_evaluation(&mut self, task: Id) {
        self.evaluations.insert(task);
    }

    /// Ends the evaluation on `task`; returns false if it was not pending
    pub fn end_evaluation(&mut self, task: Id) -> bool {
        self.evaluations.remove(&task)
    }

    /// Slots in use: open fetches plus outstanding evaluations
    pub fn busy(&self) -> usize {
        self.in_flight.len() + self.evaluations.len()
    }

    pub fn has_capacity(&self, max_concurrency: usize) -> bool {
        self.busy() < max_concurrency
    }

    /// True when nothing is in flight or being evaluated
    pub fn is_idle(&self) -> bool {
        self.busy() == 0
    }

    /// Aborts every in-flight fetch and returns the ids that were aborted
    ///
    /// Evaluations keep running; their results are still wanted.
    pub fn abort_all(&mut self) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .in_flight
            .drain()
            .map(|(id, abort)| {
                abort.abort();
                id
            })
            .collect();
        ids.sort_unstable();
        ids
    }
}
