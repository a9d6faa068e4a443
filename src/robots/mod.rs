//! Robots.txt handling module
//!
//! Parses robots.txt files and caches their rules per origin so discovered
//! URLs can be checked before they are queued.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use crate::url::ResolvedUrl;

/// Location of the robots.txt file governing `url`
pub fn robots_url(url: &ResolvedUrl) -> ResolvedUrl {
    ResolvedUrl {
        protocol: url.protocol.clone(),
        host: url.host.clone(),
        port: url.port,
        path: "/robots.txt".to_string(),
    }
}
