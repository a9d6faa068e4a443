use crate::config::types::FilterConfig;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// Compiled form of the `[filters]` section
///
/// All patterns are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    supported_mime_types: Vec<Regex>,
    whitelisted_mime_types: Vec<Regex>,
    allowed_protocols: Vec<Regex>,
}

impl FilterPolicy {
    /// Compiles every pattern in the filter configuration
    pub fn compile(config: &FilterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            supported_mime_types: compile_all(&config.supported_mime_types)?,
            whitelisted_mime_types: compile_all(&config.whitelisted_mime_types)?,
            allowed_protocols: compile_all(&config.allowed_protocols)?,
        })
    }

    /// Returns true if documents of this content type should be scanned for links
    pub fn mime_supported(&self, content_type: &str) -> bool {
        any_match(&self.supported_mime_types, content_type)
    }

    /// Returns true if resources of this content type may exceed the maximum depth
    pub fn mime_whitelisted(&self, content_type: &str) -> bool {
        any_match(&self.whitelisted_mime_types, content_type)
    }

    /// Returns true if URLs with this protocol may be queued
    pub fn protocol_allowed(&self, protocol: &str) -> bool {
        any_match(&self.allowed_protocols, protocol)
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        // The built-in patterns are known to compile
        Self::compile(&FilterConfig::default()).unwrap_or(Self {
            supported_mime_types: Vec::new(),
            whitelisted_mime_types: Vec::new(),
            allowed_protocols: Vec::new(),
        })
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    ConfigError::InvalidPattern(format!("Invalid regex '{}': {}", pattern, e))
                })
        })
        .collect()
}

fn any_match(patterns: &[Regex], value: &str) -> bool {
    patterns.iter().any(|re| re.is_match(value))
}
