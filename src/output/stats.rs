//! Statistics over a frontier queue
//!
//! This module provides functionality for summarizing a queue after (or
//! during) a crawl and printing the summary.

use crate::queue::{FrontierQueue, Statistic};
use crate::state::FetchStatus;
use std::collections::{BTreeMap, HashMap};

/// Aggregate of one statistic over fetched items
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticSummary {
    pub statistic: Statistic,
    pub min: u64,
    pub max: u64,
    pub avg: f64,
}

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of items in the queue
    pub total_items: usize,

    /// Number of items with a terminal outcome
    pub fetched_items: usize,

    /// Count of items by status
    pub items_by_status: HashMap<FetchStatus, usize>,

    /// Count of items by depth
    pub items_by_depth: BTreeMap<u32, usize>,

    /// Number of distinct hosts in the queue
    pub unique_hosts: usize,

    /// Items whose body differed from the advertised content length
    pub incorrect_size_items: usize,

    /// Timing and size aggregates, one per statistic
    pub timings: Vec<StatisticSummary>,

    /// URLs that ended in an error status, in queue order
    pub error_urls: Vec<(String, FetchStatus)>,
}

impl CrawlStatistics {
    /// Summarizes every item in the queue
    pub fn from_queue(queue: &FrontierQueue) -> Self {
        let mut items_by_status = HashMap::new();
        let mut items_by_depth = BTreeMap::new();
        let mut hosts = std::collections::HashSet::new();
        let mut error_urls = Vec::new();
        let mut incorrect_size_items = 0;

        for item in queue.iter() {
            *items_by_status.entry(item.status).or_insert(0) += 1;
            *items_by_depth.entry(item.depth).or_insert(0) += 1;
            hosts.insert(item.host.as_str());
            if item.state_data.sent_incorrect_size {
                incorrect_size_items += 1;
            }
            if item.status.is_error() {
                error_urls.push((item.url.clone(), item.status));
            }
        }

        // Statistic names come from Statistic::all, so lookups cannot fail
        let timings = Statistic::all()
            .iter()
            .map(|stat| StatisticSummary {
                statistic: *stat,
                min: queue.min(stat.as_str()).unwrap_or(0),
                max: queue.max(stat.as_str()).unwrap_or(0),
                avg: queue.avg(stat.as_str()).unwrap_or(0.0),
            })
            .collect();

        Self {
            total_items: queue.len(),
            fetched_items: queue.fetched_count(),
            items_by_status,
            items_by_depth,
            unique_hosts: hosts.len(),
            incorrect_size_items,
            timings,
            error_urls,
        }
    }

    /// Count of items with the given status
    pub fn count(&self, status: FetchStatus) -> usize {
        self.items_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of items that reached a content-bearing outcome, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        let successes: usize = FetchStatus::all()
            .iter()
            .filter(|s| s.is_success())
            .map(|s| self.count(*s))
            .sum();
        successes as f64 / self.total_items as f64 * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total items: {}", stats.total_items);
    println!("  Fetched items: {}", stats.fetched_items);
    println!("  Unique hosts: {}", stats.unique_hosts);
    if stats.incorrect_size_items > 0 {
        println!("  Incorrect content length: {}", stats.incorrect_size_items);
    }
    println!();

    println!("Items by Status:");
    // Sort statuses by count (descending)
    let mut status_counts: Vec<_> = stats.items_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    for (status, count) in status_counts {
        let percentage = if stats.total_items > 0 {
            (*count as f64 / stats.total_items as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Items by Depth:");
    for (depth, count) in &stats.items_by_depth {
        println!("  {}: {}", depth, count);
    }
    println!();

    println!("Timings:");
    for timing in &stats.timings {
        println!(
            "  {}: min {} / avg {:.1} / max {}",
            timing.statistic.as_str(),
            timing.min,
            timing.avg,
            timing.max
        );
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} items)",
        stats.success_rate(),
        stats.total_items
    );
}
