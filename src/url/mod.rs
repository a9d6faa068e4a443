//! URL handling module for Sumi-Crawler
//!
//! This module provides URL resolution against a base document, canonical
//! keys for de-duplication, domain scope checks and wildcard matching.

mod domain;
mod matcher;
mod resolve;

// Re-export main functions
pub use domain::{domain_valid, guess_mime_type, is_subdomain_of, strip_www};
pub use matcher::matches_wildcard;
pub use resolve::{default_port, parse_absolute, resolve, ResolvedUrl};
