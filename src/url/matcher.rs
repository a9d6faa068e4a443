/// Checks if a host matches a whitelist pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and any host
///    beneath it, at any depth
///
/// Comparison ignores ASCII case and a trailing root dot.
///
/// # Examples
///
/// ```
/// use sumi_crawler::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "EXAMPLE.com"));
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        return false;
    }

    match pattern.strip_prefix("*.") {
        Some(base) => {
            let base = base.trim_end_matches('.');
            if host.eq_ignore_ascii_case(base) {
                return true;
            }
            // Needs at least one extra label in front of the base
            let (host, base) = (host.as_bytes(), base.as_bytes());
            host.len() > base.len() + 1
                && host[host.len() - base.len() - 1] == b'.'
                && host[host.len() - base.len()..].eq_ignore_ascii_case(base)
        }
        None => host.eq_ignore_ascii_case(pattern.trim_end_matches('.')),
    }
}
