use std::time::Duration;

/// Endpoint of the public API.
pub const DEFAULT_ENDPOINT: &str = "http://api.dribbble.com";

/// Number of calls the API accepts per [`DEFAULT_WINDOW`].
pub const DEFAULT_CALLS: usize = 60;

/// Length of a quota window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Longest quota window accepted. Longer windows are shortened to this.
pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Per-window call quota enforced by the client before requests reach the network.
///
/// ```
/// # use courtside::config::Quota;
/// # use std::time::Duration;
/// let quota = Quota::new(30, Duration::from_secs(60)).max_queued(500);
///
/// assert_eq!(quota.calls(), 30);
/// assert_eq!(quota.queue_limit(), Some(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    calls: usize,
    window: Duration,
    max_queued: Option<usize>,
}

impl Default for Quota {
    fn default() -> Self {
        Quota {
            calls: DEFAULT_CALLS,
            window: DEFAULT_WINDOW,
            max_queued: None,
        }
    }
}

impl Quota {
    /// Allow `calls` dispatches per `window`. A quota of zero calls is raised to one, otherwise
    /// nothing would ever leave the queue. Windows are capped at [`MAX_WINDOW`].
    pub fn new(calls: usize, window: Duration) -> Self {
        Quota {
            calls: calls.max(1),
            window: window.min(MAX_WINDOW),
            max_queued: None,
        }
    }

    /// Cap the number of requests waiting for the next window. Requests arriving past the cap fail
    /// with [`Error::QueueFull`](crate::error::Error::QueueFull). Unbounded by default.
    pub fn max_queued<T: Into<Option<usize>>>(mut self, max_queued: T) -> Self {
        self.max_queued = max_queued.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn queue_limit(&self) -> Option<usize> {
        self.max_queued
    }
}

/// Settings used to build a [`Client`](crate::client::Client).
///
/// ```
/// # use courtside::config::{Config, Quota};
/// # use std::time::Duration;
/// let config = Config::new("http://api.dribbble.com", "MyProject/1.0")
///     .quota(Quota::default().max_queued(1000))
///     .timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub(crate) base_url: String,
    pub(crate) user_agent: String,
    pub(crate) quota: Quota,
    pub(crate) timeout: Option<Duration>,
}

impl Config {
    /// Create a configuration for the API at `base_url`, with the default quota and no timeout.
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Config {
            base_url: base_url.into(),
            user_agent: user_agent.into(),
            quota: Quota::default(),
            timeout: None,
        }
    }

    /// Set the call quota.
    pub fn quota(mut self, quota: Quota) -> Self {
        self.quota = quota;
        self
    }

    /// Set the timeout applied to each HTTP request. Ignored on `wasm` targets.
    pub fn timeout<T: Into<Option<Duration>>>(mut self, timeout: T) -> Self {
        self.timeout = timeout.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quota_matches_api() {
        let quota = Quota::default();

        assert_eq!(quota.calls(), 60);
        assert_eq!(quota.window(), Duration::from_secs(60));
        assert_eq!(quota.queue_limit(), None);
    }

    #[test]
    fn zero_call_quota_is_raised() {
        assert_eq!(Quota::new(0, DEFAULT_WINDOW).calls(), 1);
    }

    #[test]
    fn huge_window_is_capped() {
        assert_eq!(Quota::new(1, Duration::MAX).window(), MAX_WINDOW);
        assert_eq!(Quota::new(1, MAX_WINDOW).window(), MAX_WINDOW);
    }

    #[test]
    fn build_config() {
        let config = Config::new(DEFAULT_ENDPOINT, "courtside/unit_test")
            .quota(Quota::new(10, Duration::from_secs(1)))
            .timeout(Duration::from_secs(5));

        assert_eq!(
            config,
            Config {
                base_url: String::from("http://api.dribbble.com"),
                user_agent: String::from("courtside/unit_test"),
                quota: Quota::new(10, Duration::from_secs(1)),
                timeout: Some(Duration::from_secs(5)),
            }
        );
    }
}
