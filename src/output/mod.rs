//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Aggregating statistics over a frontier queue
//! - Printing statistics to the terminal
//! - Generating markdown summaries

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary, ReportInfo};
pub use stats::{print_statistics, CrawlStatistics, StatisticSummary};
