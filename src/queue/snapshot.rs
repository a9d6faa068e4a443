//! Freeze/defrost persistence for the frontier
//!
//! A snapshot is a single JSON document holding every item, the duplicate
//! index and the oldest-unfetched cursor.

use crate::queue::{FrontierQueue, QueueItem};
use crate::state::FetchStatus;
use crate::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueSnapshot {
    version: u32,
    frozen_at: DateTime<Utc>,
    #[serde(default)]
    config_hash: Option<String>,
    items: Vec<QueueItem>,
    #[serde(default)]
    scanned: Vec<String>,
    #[serde(default)]
    oldest_unfetched_index: usize,
}

impl FrontierQueue {
    /// Serializes the queue to a JSON string
    ///
    /// Items without a terminal outcome are reset to `queued` first, so a
    /// fetch that was in flight is retried after defrosting.
    pub fn freeze_to_string(&mut self) -> QueueResult<String> {
        let mut reset = 0;
        let mut first_reset: Option<usize> = None;
        for item in self.items.iter_mut().filter(|item| !item.fetched) {
            if item.status != FetchStatus::Queued {
                item.status = FetchStatus::Queued;
                first_reset.get_or_insert(item.id);
                reset += 1;
            }
        }
        debug!(reset, "Reset unfinished items before freezing");

        // A reset item behind the cursor must still be reachable after defrost
        let cursor = first_reset.map_or(self.oldest_unfetched_index, |id| {
            id.min(self.oldest_unfetched_index)
        });

        let mut scanned: Vec<String> = self.scanned.iter().cloned().collect();
        scanned.sort();

        let snapshot = QueueSnapshot {
            version: SNAPSHOT_VERSION,
            frozen_at: Utc::now(),
            config_hash: self.config_hash.clone(),
            items: self.items.clone(),
            scanned,
            oldest_unfetched_index: cursor,
        };

        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Writes a snapshot of the queue to `path`
    pub fn freeze(&mut self, path: &Path) -> QueueResult<()> {
        let json = self.freeze_to_string()?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), items = self.items.len(), "Froze queue");
        Ok(())
    }

    /// Rebuilds a queue from a snapshot string
    pub fn defrost_from_str(json: &str) -> QueueResult<Self> {
        if json.trim().is_empty() {
            return Err(QueueError::EmptySnapshot);
        }

        let snapshot: QueueSnapshot = serde_json::from_str(json)?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(QueueError::MalformedSnapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        if snapshot.oldest_unfetched_index > snapshot.items.len() {
            return Err(QueueError::MalformedSnapshot(format!(
                "cursor {} is past the end of {} items",
                snapshot.oldest_unfetched_index,
                snapshot.items.len()
            )));
        }

        let mut scanned: HashSet<String> = snapshot.scanned.into_iter().collect();
        for (position, item) in snapshot.items.iter().enumerate() {
            if item.id != position {
                return Err(QueueError::MalformedSnapshot(format!(
                    "item at position {} has id {}",
                    position, item.id
                )));
            }
            if item.fetched && !item.status.is_terminal() {
                return Err(QueueError::MalformedSnapshot(format!(
                    "item {} is fetched but has status {}",
                    item.id, item.status
                )));
            }
            scanned.insert(item.url.clone());
        }

        Ok(Self {
            items: snapshot.items,
            scanned,
            oldest_unfetched_index: snapshot.oldest_unfetched_index,
            config_hash: snapshot.config_hash,
        })
    }

    /// Reads a queue snapshot from `path`
    pub fn defrost(path: &Path) -> QueueResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let queue = Self::defrost_from_str(&json)?;
        info!(path = %path.display(), items = queue.len(), "Defrosted queue");
        Ok(queue)
    }
}
