/// Fetch status definitions for tracking queue item progress
///
/// This module defines every state a queue item moves through between being
/// discovered and reaching a terminal outcome.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a queue item in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    // ===== Active States =====
    /// Item is waiting to be fetched
    Queued,

    /// A request has been dispatched for the item
    Spooled,

    /// Response headers have been received
    Headers,

    // ===== Terminal Success States =====
    /// Body was downloaded in full (or up to the size cap)
    Downloaded,

    /// A download condition (or MIME policy) vetoed the body download
    DownloadPrevented,

    /// Server answered 304 against a conditional request
    NotModified,

    // ===== Terminal Non-Content States =====
    /// Server answered 404 or 410
    NotFound,

    /// Server answered with a redirect
    Redirected,

    /// Transport error or an unhandled HTTP error code
    Failed,

    /// No terminal outcome within the per-item timeout
    Timeout,
}

impl FetchStatus {
    /// Returns true if this is a terminal status (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true while the item is waiting or in flight
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Spooled | Self::Headers)
    }

    /// Returns true if this represents a content-bearing success
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Downloaded | Self::DownloadPrevented | Self::NotModified
        )
    }

    /// Returns true if this represents an error outcome
    pub fn is_error(&self) -> bool {
        matches!(self, Self::NotFound | Self::Failed | Self::Timeout)
    }

    /// Converts the status to its string representation
    ///
    /// This is the form used in snapshots, filters and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Spooled => "spooled",
            Self::Headers => "headers",
            Self::Downloaded => "downloaded",
            Self::DownloadPrevented => "downloadprevented",
            Self::NotModified => "notmodified",
            Self::NotFound => "notfound",
            Self::Redirected => "redirected",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 10] {
        [
            Self::Queued,
            Self::Spooled,
            Self::Headers,
            Self::Downloaded,
            Self::DownloadPrevented,
            Self::NotModified,
            Self::NotFound,
            Self::Redirected,
            Self::Failed,
            Self::Timeout,
        ]
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
