//! Resource discovery for fetched documents
//!
//! Extracts candidate URL strings from a document body with a set of regular
//! expression heuristics rather than a full HTML parse:
//! - quoted and unquoted `href=` / `src=` attributes
//! - every candidate of a `srcset=` list
//! - CSS `url(...)` references
//! - bare `http://` and `https://` occurrences
//! - string arguments of `javascript:` pseudo-URLs
//!
//! Discovery is purely syntactic. The strings it returns still have to be
//! resolved and filtered before anything is queued.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::trace;

static QUOTED_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s(?:href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("quoted attribute regex is valid")
});

static UNQUOTED_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s(?:href|src)\s*=\s*([^"'\s>][^\s>]*)"#)
        .expect("unquoted attribute regex is valid")
});

static SRCSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\ssrcset\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("srcset regex is valid")
});

static QUOTED_CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#).expect("css url regex is valid")
});

static UNQUOTED_CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*([^"'\s)][^\s)]*)\s*\)"#).expect("css url regex is valid")
});

static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s<>'"(),]+"#).expect("bare url regex is valid"));

static JAVASCRIPT_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)javascript:\s*[\w$.]+\(\s*['"]([^'"\s]+)"#)
        .expect("javascript regex is valid")
});

static HTML_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--[\s\S]*?-->").expect("comment regex is valid"));

static SCRIPT_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<script(?:\s[^>]*)?>[\s\S]*?</script\s*>").expect("script regex is valid")
});

/// Which parts of a document are scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Scan inside `<!-- ... -->` blocks
    pub parse_html_comments: bool,
    /// Scan inside `<script>` element bodies
    pub parse_script_tags: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            parse_html_comments: true,
            parse_script_tags: true,
        }
    }
}

/// Extracts candidate URL strings from a document body
///
/// The body is decoded as UTF-8 with lossy replacement. Results keep the order
/// in which they were first found and contain no duplicates. Fragments are
/// removed and fragment-only references are dropped.
///
/// # Example
///
/// ```
/// use sumi_crawler::discovery::{discover, DiscoveryOptions};
///
/// let html = br#"<a href="/about#team">About</a> <img src='logo.png'>"#;
/// let found = discover(html, &DiscoveryOptions::default());
/// assert_eq!(found, vec!["/about", "logo.png"]);
/// ```
pub fn discover(body: &[u8], options: &DiscoveryOptions) -> Vec<String> {
    let text = String::from_utf8_lossy(body);
    let mut text = text.into_owned();

    if !options.parse_html_comments {
        text = HTML_COMMENT.replace_all(&text, "").into_owned();
    }
    if !options.parse_script_tags {
        text = SCRIPT_BODY.replace_all(&text, "").into_owned();
    }

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut push = |raw: &str| {
        if let Some(candidate) = clean(raw) {
            if seen.insert(candidate.clone()) {
                found.push(candidate);
            }
        }
    };

    for family in [&*QUOTED_ATTRIBUTE, &*QUOTED_CSS_URL] {
        for caps in family.captures_iter(&text) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                push(m.as_str());
            }
        }
    }

    for caps in SRCSET.captures_iter(&text) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            // "a.png 1x, b.png 2x": the URL is the first token of each candidate
            for candidate in m.as_str().split(',') {
                push(candidate);
            }
        }
    }

    for family in [&*UNQUOTED_ATTRIBUTE, &*UNQUOTED_CSS_URL, &*JAVASCRIPT_STRING] {
        for caps in family.captures_iter(&text) {
            if let Some(m) = caps.get(1) {
                push(m.as_str());
            }
        }
    }

    for m in BARE_URL.find_iter(&text) {
        push(m.as_str());
    }

    trace!(count = found.len(), "Discovered candidate resources");
    found
}

/// Trims a raw match down to a usable URL string
fn clean(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let first = trimmed.split_whitespace().next()?;
    let without_fragment = first.split('#').next().unwrap_or("");
    if without_fragment.is_empty() {
        None
    } else {
        Some(without_fragment.to_string())
    }
}
