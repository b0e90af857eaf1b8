// src/config.rs
// =============================================================================
// Runtime settings for the checking engine.
//
// The CLI builds one of these from its flags; library users can start from
// `CheckerConfig::default()` and override what they need.
// =============================================================================

use std::time::Duration;

/// Number of sites a pool checks at once when nothing else is configured.
pub const DEFAULT_WORKERS: usize = 3;

/// Per-request timeout (same 10 seconds link-guardian always used).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hops followed before a URL is reported as failed.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

pub const DEFAULT_USER_AGENT: &str = concat!("bookmark-guardian/", env!("CARGO_PKG_VERSION"));

/// Settings shared by the transport, the worker pool and the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Pool width: sites checked concurrently by a `GroupChecker`.
    pub workers: usize,
    /// Timeout for each HTTP request. Every redirect hop and the GET retry
    /// after a refused HEAD is a request of its own, so one URL can take up
    /// to `2 * (max_redirects + 1)` timeouts.
    pub timeout: Duration,
    /// Maximum redirect hops followed per URL.
    pub max_redirects: usize,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Rewrite stored `http://` URLs that the server upgrades to `https://`.
    pub auto_https: bool,
    /// Try a HEAD request first and fall back to GET on 405/501.
    pub head_first: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auto_https: true,
            head_first: true,
        }
    }
}

impl CheckerConfig {
    /// Pool width, never less than one.
    pub fn pool_width(&self) -> usize {
        self.workers.max(1)
    }
}
