use crate::config::DomainConfig;
use crate::url::matcher::matches_wildcard;

/// Strips a leading `www.` label from a host
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Returns true if `host` is `parent` or lies beneath it
///
/// Comparison is label-by-label from the right, so `badexample.com` is not a
/// subdomain of `example.com`.
///
/// # Examples
///
/// ```
/// use sumi_crawler::url::is_subdomain_of;
///
/// assert!(is_subdomain_of("blog.example.com", "example.com"));
/// assert!(is_subdomain_of("example.com", "example.com"));
/// assert!(!is_subdomain_of("badexample.com", "example.com"));
/// ```
pub fn is_subdomain_of(host: &str, parent: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    let parent = parent.trim_end_matches('.').to_lowercase();
    if host.is_empty() || parent.is_empty() {
        return false;
    }

    let host_labels: Vec<&str> = host.rsplit('.').collect();
    let parent_labels: Vec<&str> = parent.rsplit('.').collect();

    host_labels.len() >= parent_labels.len()
        && parent_labels
            .iter()
            .zip(host_labels.iter())
            .all(|(p, h)| p == h)
}

/// Decides whether a host is inside the crawl's domain scope
///
/// The seed host is always in scope. With domain filtering off every host is.
/// Otherwise a host is accepted when it matches the seed host (modulo `www.`
/// when configured), a subdomain of it with `scan_subdomains`, or an entry
/// of the whitelist.
pub fn domain_valid(host: &str, seed_host: &str, config: &DomainConfig) -> bool {
    if !config.filter_by_domain {
        return true;
    }

    let host = host.to_lowercase();
    let seed_host = seed_host.to_lowercase();

    let (candidate, home) = if config.ignore_www_domain {
        (strip_www(&host), strip_www(&seed_host))
    } else {
        (host.as_str(), seed_host.as_str())
    };

    if candidate == home {
        return true;
    }

    if config.scan_subdomains && is_subdomain_of(candidate, home) {
        return true;
    }

    config.whitelist.iter().any(|entry| {
        let entry = entry.to_lowercase();
        matches_wildcard(&entry, &host)
            || matches_wildcard(&entry, candidate)
            || (config.scan_subdomains && is_subdomain_of(candidate, entry.trim_start_matches("*.")))
    })
}

/// Guesses a MIME type from the extension of a URL path
///
/// Used by the depth policy to decide whether an item that has not been
/// fetched yet is a whitelisted resource type.
pub fn guess_mime_type(path: &str) -> Option<&'static str> {
    let path = path.split('?').next().unwrap_or(path);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file.rsplit_once('.')?;

    let mime = match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" | "shtml" => "text/html",
        "xhtml" => "application/xhtml+xml",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "rss" => "application/rss+xml",
        "atom" => "application/atom+xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => return None,
    };
    Some(mime)
}
