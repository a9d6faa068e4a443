//! Robots.txt parser implementation
//!
//! Matching is delegated to the robotstxt crate.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data for one host
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt is missing or could not be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Builds rules from a robots.txt response
    ///
    /// Anything but a 2xx answer allows everything.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        if (200..300).contains(&status) {
            Self::from_content(&String::from_utf8_lossy(body))
        } else {
            Self::allow_all()
        }
    }

    /// Checks if an absolute URL is allowed for the given user agent
    ///
    /// Only the product token of the user agent ("name" in "name/1.0") is
    /// matched against `User-agent` lines.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let product = user_agent.split('/').next().unwrap_or(user_agent).trim();
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product, url)
    }
}
