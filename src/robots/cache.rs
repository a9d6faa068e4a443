//! Per-host robots.txt rule cache

use crate::robots::ParsedRobots;
use crate::url::ResolvedUrl;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Hours before cached rules are fetched again
const ROBOTS_TTL_HOURS: i64 = 24;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub content: ParsedRobots,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Whether the rules are older than the cache lifetime
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(ROBOTS_TTL_HOURS)
    }
}

/// Robots rules keyed by protocol, host and port
///
/// URLs on hosts without cached rules are allowed.
#[derive(Debug, Clone, Default)]
pub struct RobotsCache {
    hosts: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the rules that apply to `url`'s origin
    pub fn insert(&mut self, url: &ResolvedUrl, robots: ParsedRobots) {
        self.hosts.insert(origin_key(url), CachedRobots::new(robots));
    }

    /// Whether unexpired rules are cached for `url`'s origin
    pub fn is_fresh(&self, url: &ResolvedUrl) -> bool {
        self.get(url).map_or(false, |cached| !cached.is_expired())
    }

    pub fn get(&self, url: &ResolvedUrl) -> Option<&CachedRobots> {
        self.hosts.get(&origin_key(url))
    }

    /// Checks `url` against the cached rules for its origin
    pub fn is_allowed(&self, url: &ResolvedUrl, user_agent: &str) -> bool {
        match self.get(url) {
            Some(cached) => cached.content.is_allowed(&url.url(), user_agent),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

fn origin_key(url: &ResolvedUrl) -> String {
    format!("{}://{}:{}", url.protocol, url.host, url.port)
}
