//! Fetch and download conditions
//!
//! Conditions are user predicates that gate the crawl:
//! - a [`FetchCondition`] decides whether a discovered URL is queued
//! - a [`DownloadCondition`] decides whether a 2xx response body is read
//!
//! Both are asynchronous. Plain closures returning `bool` implement the
//! traits directly. Evaluation stops at the first condition that says no,
//! and an error counts as a veto.

use crate::queue::QueueItem;
use crate::url::ResolvedUrl;
use crate::ConditionError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metadata of a response whose body has not been read yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub status: u16,
    /// Response headers with lower-cased names
    pub headers: BTreeMap<String, String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl ResponseInfo {
    pub fn new(status: u16, headers: BTreeMap<String, String>) -> Self {
        let content_type = headers.get("content-type").cloned();
        let content_length = headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok());
        Self {
            status,
            headers,
            content_type,
            content_length,
        }
    }
}

/// Decides whether a candidate URL may be queued
#[async_trait]
pub trait FetchCondition: Send + Sync {
    async fn allow(
        &self,
        candidate: &ResolvedUrl,
        referrer: &QueueItem,
    ) -> Result<bool, ConditionError>;
}

#[async_trait]
impl<F> FetchCondition for F
where
    F: Fn(&ResolvedUrl, &QueueItem) -> bool + Send + Sync,
{
    async fn allow(
        &self,
        candidate: &ResolvedUrl,
        referrer: &QueueItem,
    ) -> Result<bool, ConditionError> {
        Ok(self(candidate, referrer))
    }
}

/// Decides whether a response body may be downloaded
#[async_trait]
pub trait DownloadCondition: Send + Sync {
    async fn allow(
        &self,
        item: &QueueItem,
        response: &ResponseInfo,
    ) -> Result<bool, ConditionError>;
}

#[async_trait]
impl<F> DownloadCondition for F
where
    F: Fn(&QueueItem, &ResponseInfo) -> bool + Send + Sync,
{
    async fn allow(
        &self,
        item: &QueueItem,
        response: &ResponseInfo,
    ) -> Result<bool, ConditionError> {
        Ok(self(item, response))
    }
}

/// Identifier handed out when a condition is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionId(pub u64);

/// Ordered list of registered conditions
///
/// Ids increase monotonically and are never reused by the same registry.
pub struct ConditionRegistry<C: ?Sized> {
    next_id: u64,
    entries: Vec<(ConditionId, Arc<C>)>,
}

impl<C: ?Sized> Default for ConditionRegistry<C> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<C: ?Sized> ConditionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, condition: Arc<C>) -> ConditionId {
        let id = ConditionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, condition));
        id
    }

    /// Removes the condition registered under `id`
    pub fn remove(&mut self, id: ConditionId) -> Result<(), ConditionError> {
        let index = self
            .entries
            .iter()
            .position(|(entry_id, _)| *entry_id == id)
            .ok_or(ConditionError::NotFound(id.0))?;
        self.entries.remove(index);
        Ok(())
    }

    /// Removes a condition by identity
    pub fn remove_ref(&mut self, condition: &Arc<C>) -> Result<(), ConditionError> {
        let target = Arc::as_ptr(condition) as *const ();
        let index = self
            .entries
            .iter()
            .position(|(_, entry)| Arc::as_ptr(entry) as *const () == target)
            .ok_or(ConditionError::NotRegistered)?;
        self.entries.remove(index);
        Ok(())
    }

    /// The registered conditions in registration order
    pub fn snapshot(&self) -> Vec<Arc<C>> {
        self.entries.iter().map(|(_, c)| Arc::clone(c)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs fetch conditions in order, stopping at the first veto or error
pub async fn evaluate_fetch_conditions(
    conditions: &[Arc<dyn FetchCondition>],
    candidate: &ResolvedUrl,
    referrer: &QueueItem,
) -> Result<bool, ConditionError> {
    for condition in conditions {
        if !condition.allow(candidate, referrer).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Runs download conditions in order, stopping at the first veto or error
pub async fn evaluate_download_conditions(
    conditions: &[Arc<dyn DownloadCondition>],
    item: &QueueItem,
    response: &ResponseInfo,
) -> Result<bool, ConditionError> {
    for condition in conditions {
        if !condition.allow(item, response).await? {
            return Ok(false);
        }
    }
    Ok(true)
}
