use serde::Deserialize;

/// Main configuration structure for Sumi-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub domain: DomainConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

impl Config {
    /// Builds a configuration with default settings for the given seed URL
    pub fn for_seed(seed: impl Into<String>) -> Self {
        Self {
            crawler: CrawlerConfig::for_seed(seed),
            domain: DomainConfig::default(),
            filters: FilterConfig::default(),
            proxy: None,
            auth: None,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// URL the crawl starts from; its host is the crawl's home domain
    pub seed: String,

    /// Maximum number of concurrent fetches
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Time between runloop ticks (milliseconds)
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Maximum depth from the seed (seed = 1, 0 = unlimited)
    #[serde(default)]
    pub max_depth: u32,

    /// Per-item timeout measured from dispatch (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Upper bound on accumulated body bytes per resource
    #[serde(default = "default_max_resource_size")]
    pub max_resource_size: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether downloaded documents are scanned for further resources
    #[serde(default = "default_true")]
    pub discover_resources: bool,

    /// Whether URLs inside HTML comments are discovered
    #[serde(default = "default_true")]
    pub parse_html_comments: bool,

    /// Whether URLs inside `<script>` bodies are discovered
    #[serde(default = "default_true")]
    pub parse_script_tags: bool,

    /// Whether robots.txt rules are fetched and honoured
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// Whether bodies of unsupported MIME types are downloaded at all
    #[serde(default = "default_true")]
    pub download_unsupported: bool,

    /// Extra depth levels allowed for whitelisted resource MIME types
    #[serde(default)]
    pub fetch_whitelisted_mime_types_below_max_depth: u32,
}

impl CrawlerConfig {
    /// Builds a crawler section with default settings for the given seed URL
    pub fn for_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            max_concurrency: default_max_concurrency(),
            interval: default_interval(),
            max_depth: 0,
            timeout: default_timeout(),
            max_resource_size: default_max_resource_size(),
            user_agent: default_user_agent(),
            discover_resources: true,
            parse_html_comments: true,
            parse_script_tags: true,
            respect_robots_txt: true,
            download_unsupported: true,
            fetch_whitelisted_mime_types_below_max_depth: 0,
        }
    }
}

/// Domain policy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DomainConfig {
    /// Restrict the crawl to the seed host (plus the whitelist)
    #[serde(default = "default_true")]
    pub filter_by_domain: bool,

    /// Treat subdomains of the seed host (and of whitelist entries) as in scope
    #[serde(default)]
    pub scan_subdomains: bool,

    /// Treat `www.host` and `host` as the same domain
    #[serde(default = "default_true")]
    pub ignore_www_domain: bool,

    /// Additional in-scope hosts ("example.com" or "*.example.com")
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            filter_by_domain: true,
            scan_subdomains: false,
            ignore_www_domain: true,
            whitelist: Vec::new(),
        }
    }
}

/// MIME type and protocol matchers (regular expressions, case-insensitive)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Content types that are scanned for further resources
    #[serde(default = "default_supported_mime_types")]
    pub supported_mime_types: Vec<String>,

    /// Resource content types that may be fetched past the maximum depth
    #[serde(default = "default_whitelisted_mime_types")]
    pub whitelisted_mime_types: Vec<String>,

    /// Protocols that may be queued
    #[serde(default = "default_allowed_protocols")]
    pub allowed_protocols: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            supported_mime_types: default_supported_mime_types(),
            whitelisted_mime_types: default_whitelisted_mime_types(),
            allowed_protocols: default_allowed_protocols(),
        }
    }
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. "http://127.0.0.1:8080"
    pub url: String,
}

/// HTTP basic authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrency() -> u32 {
    5
}

fn default_interval() -> u64 {
    250
}

fn default_timeout() -> u64 {
    300_000
}

fn default_max_resource_size() -> u64 {
    16 * 1024 * 1024
}

fn default_user_agent() -> String {
    format!("sumi-crawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_supported_mime_types() -> Vec<String> {
    vec![
        "^text/".to_string(),
        "^application/(rss|html|xhtml)?[+/-]?xml".to_string(),
        "^application/javascript".to_string(),
        "^xml".to_string(),
    ]
}

fn default_whitelisted_mime_types() -> Vec<String> {
    vec![
        "^text/(css|javascript|ecmascript)".to_string(),
        "^application/javascript".to_string(),
        "^application/x-font".to_string(),
        "^application/font".to_string(),
        "^image/".to_string(),
        "^font/".to_string(),
    ]
}

fn default_allowed_protocols() -> Vec<String> {
    vec!["^https?$".to_string(), r"^(rss|atom|feed)(\+xml)?$".to_string()]
}
