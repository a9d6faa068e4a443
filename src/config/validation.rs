use crate::config::policy::FilterPolicy;
use crate::config::types::{Config, CrawlerConfig, DomainConfig, ProxyConfig};
use crate::url::parse_absolute;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Returns the compiled filter policy so callers don't compile the patterns twice.
pub fn validate(config: &Config) -> Result<FilterPolicy, ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_domain_config(&config.domain)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }

    let policy = FilterPolicy::compile(&config.filters)?;
    validate_seed(&config.crawler.seed, &policy)?;

    Ok(policy)
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth of 0 means unlimited, so any u32 is acceptable

    if config.max_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be >= 1, got {}",
            config.max_concurrency
        )));
    }

    if config.interval < 1 {
        return Err(ConfigError::Validation(
            "interval must be >= 1ms".to_string(),
        ));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(
            "timeout must be >= 1ms".to_string(),
        ));
    }

    if config.max_resource_size < 1 {
        return Err(ConfigError::Validation(
            "max_resource_size must be >= 1 byte".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the seed URL: absolute, with a host, valid port and an allowed protocol
fn validate_seed(seed: &str, policy: &FilterPolicy) -> Result<(), ConfigError> {
    let resolved = parse_absolute(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if !policy.protocol_allowed(&resolved.protocol) {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' uses a protocol that is not allowed",
            seed
        )));
    }

    Ok(())
}

/// Validates domain policy configuration
fn validate_domain_config(config: &DomainConfig) -> Result<(), ConfigError> {
    for pattern in &config.whitelist {
        validate_domain_pattern(pattern)?;
    }
    Ok(())
}

/// Validates proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy URL: {}", e)))?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Proxy URL '{}' has no host",
            config.url
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    // Check if it's a wildcard pattern
    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
