//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a crawl,
//! including status counts, depth breakdown, timings and error URLs.

use crate::output::stats::CrawlStatistics;
use chrono::Utc;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Run metadata shown at the top of a report
#[derive(Debug, Clone, Default)]
pub struct ReportInfo {
    pub seed: String,
    pub config_hash: Option<String>,
}

/// Writes a markdown summary to `output_path`
pub fn generate_markdown_summary(
    stats: &CrawlStatistics,
    info: &ReportInfo,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_summary(stats, info);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats crawl statistics as markdown
pub fn format_markdown_summary(stats: &CrawlStatistics, info: &ReportInfo) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Crawler Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", info.seed));
    md.push_str(&format!("- **Generated**: {}\n", Utc::now().to_rfc3339()));
    if let Some(hash) = &info.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Items**: {}\n", stats.total_items));
    md.push_str(&format!("- **Fetched Items**: {}\n", stats.fetched_items));
    md.push_str(&format!("- **Unique Hosts**: {}\n", stats.unique_hosts));
    md.push_str(&format!(
        "- **Incorrect Content Length**: {}\n",
        stats.incorrect_size_items
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    // Status breakdown, in lifecycle order
    md.push_str("## Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    for status in crate::state::FetchStatus::all() {
        let count = stats.count(status);
        if count > 0 {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
    }
    md.push('\n');

    if !stats.items_by_depth.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Items |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &stats.items_by_depth {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    md.push_str("## Timings\n\n");
    md.push_str("| Statistic | Min | Avg | Max |\n");
    md.push_str("|-----------|-----|-----|-----|\n");
    for timing in &stats.timings {
        md.push_str(&format!(
            "| {} | {} | {:.1} | {} |\n",
            timing.statistic.as_str(),
            timing.min,
            timing.avg,
            timing.max
        ));
    }
    md.push('\n');

    if !stats.error_urls.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| URL | Status |\n");
        md.push_str("|-----|--------|\n");
        for (url, status) in stats.error_urls.iter().take(50) {
            md.push_str(&format!("| {} | {} |\n", url, status));
        }
        if stats.error_urls.len() > 50 {
            md.push_str(&format!(
                "\n... and {} more\n",
                stats.error_urls.len() - 50
            ));
        }
        md.push('\n');
    }

    md
}
