use crate::queue::QueueItem;
use crate::state::FetchStatus;

/// Matches queue items on any subset of their fields
///
/// Unset fields match everything, so `ItemFilter::default()` matches every item.
///
/// # Example
///
/// ```
/// use sumi_crawler::{FetchStatus, ItemFilter};
///
/// let filter = ItemFilter::new().status(FetchStatus::Downloaded).code(200);
/// assert_eq!(filter.status, Some(FetchStatus::Downloaded));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub status: Option<FetchStatus>,
    pub fetched: Option<bool>,
    pub depth: Option<u32>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub referrer: Option<String>,
    pub code: Option<u16>,
    pub content_type: Option<String>,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: FetchStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn fetched(mut self, fetched: bool) -> Self {
        self.fetched = Some(fetched);
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns true if every set field equals the item's value
    pub fn matches(&self, item: &QueueItem) -> bool {
        fn check<T: PartialEq + ?Sized>(want: Option<&T>, have: &T) -> bool {
            want.map_or(true, |w| w == have)
        }

        check(self.status.as_ref(), &item.status)
            && check(self.fetched.as_ref(), &item.fetched)
            && check(self.depth.as_ref(), &item.depth)
            && check(self.protocol.as_deref(), item.protocol.as_str())
            && check(self.host.as_deref(), item.host.as_str())
            && check(self.referrer.as_deref(), item.referrer.as_str())
            && self
                .code
                .map_or(true, |c| item.state_data.code == Some(c))
            && self.content_type.as_deref().map_or(true, |ct| {
                item.state_data.content_type.as_deref() == Some(ct)
            })
    }
}
