use crate::{UrlError, UrlResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Matches a leading URI scheme ("http:", "feed:", "mailto:")
static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").expect("scheme regex is valid"));

/// A URL decomposed into the components the crawler works with
///
/// `path` always starts with `/` and carries the query string, if any.
/// Fragments are never part of a resolved URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedUrl {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl ResolvedUrl {
    /// Returns the canonical string form, used as the de-duplication key
    ///
    /// The port is omitted when it is the protocol's default.
    pub fn url(&self) -> String {
        if self.port == default_port(&self.protocol) {
            format!("{}://{}{}", self.protocol, self.host, self.path)
        } else {
            format!("{}://{}:{}{}", self.protocol, self.host, self.port, self.path)
        }
    }

    /// The path without its query string
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or("/")
    }
}

impl fmt::Display for ResolvedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Default port for a protocol; unknown protocols fall back to 80
pub fn default_port(protocol: &str) -> u16 {
    match protocol {
        "https" => 443,
        "ftp" => 21,
        _ => 80,
    }
}

/// Parses an absolute URL string into its components
///
/// The host is lower-cased, the port defaults to the protocol default and the
/// fragment is discarded.
///
/// # Examples
///
/// ```
/// use sumi_crawler::url::parse_absolute;
///
/// let url = parse_absolute("HTTP://Example.COM/a/b?x=1#top").unwrap();
/// assert_eq!(url.host, "example.com");
/// assert_eq!(url.port, 80);
/// assert_eq!(url.path, "/a/b?x=1");
/// ```
pub fn parse_absolute(url_str: &str) -> UrlResult<ResolvedUrl> {
    let parsed = Url::parse(url_str).map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingHost(url_str.to_string()))?
        .to_lowercase();

    let protocol = parsed.scheme().to_lowercase();
    let port = parsed
        .port_or_known_default()
        .unwrap_or_else(|| default_port(&protocol));

    let mut path = if parsed.path().is_empty() {
        "/".to_string()
    } else {
        parsed.path().to_string()
    };
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok(ResolvedUrl {
        protocol,
        host,
        port,
        path,
    })
}

/// Resolves a possibly-relative URL string against a context URL
///
/// - absolute URLs (with a scheme) are parsed as-is
/// - `//host/path` inherits the context protocol
/// - `/path` is resolved under the context host
/// - anything else is resolved against the context's directory
///
/// `&amp;` entities are decoded first. Resolution fails when the input is
/// empty, unparseable, has no host, or ascends above the root.
///
/// # Examples
///
/// ```
/// use sumi_crawler::url::{parse_absolute, resolve};
///
/// let context = parse_absolute("http://example.com/docs/guide/intro.html").unwrap();
/// let url = resolve("../api/index.html", &context).unwrap();
/// assert_eq!(url.url(), "http://example.com/docs/api/index.html");
/// ```
pub fn resolve(url_str: &str, context: &ResolvedUrl) -> UrlResult<ResolvedUrl> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let decoded = trimmed.replace("&amp;", "&");
    // Fragments never take part in resolution
    let without_fragment = decoded.split('#').next().unwrap_or("");

    if SCHEME.is_match(without_fragment) {
        return parse_absolute(without_fragment);
    }

    if let Some(rest) = without_fragment.strip_prefix("//") {
        return parse_absolute(&format!("{}://{}", context.protocol, rest));
    }

    let (rel_path, query) = split_query(without_fragment);
    let path = if rel_path.is_empty() {
        // "" or "?query": the context document itself
        context.path_only().to_string()
    } else if rel_path.starts_with('/') {
        remove_dot_segments(rel_path, url_str)?
    } else {
        let base = base_directory(context.path_only());
        remove_dot_segments(&format!("{}{}", base, rel_path), url_str)?
    };

    let path = match query {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    };

    let joined = ResolvedUrl {
        protocol: context.protocol.clone(),
        host: context.host.clone(),
        port: context.port,
        path,
    };
    // Reparse so relative results are encoded exactly like absolute ones
    parse_absolute(&joined.url())
}

fn split_query(s: &str) -> (&str, Option<&str>) {
    match s.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (s, None),
    }
}

/// Everything up to and including the last `/`
fn base_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    }
}

/// Applies `.` and `..` segments to an absolute path
fn remove_dot_segments(path: &str, original: &str) -> UrlResult<String> {
    let mut output: Vec<&str> = Vec::new();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let mut trailing_slash = false;

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        match *segment {
            "." => trailing_slash = last,
            ".." => {
                if output.pop().is_none() {
                    return Err(UrlError::AboveRoot(original.to_string()));
                }
                trailing_slash = last;
            }
            s => {
                output.push(s);
                trailing_slash = false;
            }
        }
    }

    let mut resolved = format!("/{}", output.join("/"));
    if trailing_slash && !resolved.ends_with('/') {
        resolved.push('/');
    }
    Ok(resolved)
}
