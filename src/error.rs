// src/error.rs
// =============================================================================
// Error types for the library side of bookmark-guardian.
//
// None of these are "the link is broken" errors - a broken link is just a
// LinkStatus value. These are contract violations: committing a status
// vector of the wrong length, resetting a checker that is still running,
// starting a pool run while another one is active, and so on.
//
// The CLI wraps all of them in anyhow::Error.
// =============================================================================

use thiserror::Error;

/// Errors raised by the `SiteLink` data model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// A URL or label was empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Which field was empty ("url" or "label").
        field: &'static str,
    },

    /// An index was outside the site's URL list.
    #[error("index {index} is out of range (site has {len} links)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A committed status vector did not match the number of URLs.
    #[error("status vector has {actual} entries but the site has {expected} links")]
    LengthMismatch { expected: usize, actual: usize },

    /// `rewrite_url_to_https` was asked to upgrade a non-http URL.
    #[error("link {index} does not use plain http: {url}")]
    NotHttp { index: usize, url: String },

    /// `begin_check` was called while another check of the site is in flight.
    #[error("site is already being checked")]
    AlreadyChecking,
}

/// Errors raised by a `SiteLinkChecker`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    /// `start` was called while a previous check has not been reset.
    #[error("checker is busy with another site")]
    Busy,

    /// The site already has a check in flight (from another checker).
    #[error("site is already being checked")]
    SiteBusy,

    /// `run` was called without a prepared site.
    #[error("no site has been prepared for checking")]
    NotPrepared,

    /// `reset` was called before the running check completed.
    #[error("check has not completed yet")]
    NotCompleted,

    /// The checker was torn down before the check finished.
    #[error("checker was dropped before the check finished")]
    Abandoned,
}

/// Errors raised by the `GroupChecker` worker pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// A run is in progress (dispatched > 0 and not all done).
    #[error("a check run is already in progress")]
    RunInProgress,

    /// `start_checks` was called with nothing queued.
    #[error("nothing to check")]
    EmptyQueue,

    /// `start_checks` was called twice for the same queue.
    #[error("checks for this list were already started")]
    AlreadyStarted,
}

/// Errors building the HTTP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The reqwest client could not be built (bad TLS setup, bad header...).
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors loading a bookmark collection file.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("could not read collection: {0}")]
    Io(#[from] std::io::Error),

    #[error("collection is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad bookmark in group '{group}': {source}")]
    Model {
        group: String,
        #[source]
        source: ModelError,
    },
}
