//! Configuration module for Sumi-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawling from: {}", config.crawler.seed);
//! ```

mod parser;
mod policy;
mod types;
mod validation;

// Re-export types
pub use policy::FilterPolicy;
pub use types::{AuthConfig, Config, CrawlerConfig, DomainConfig, FilterConfig, ProxyConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
