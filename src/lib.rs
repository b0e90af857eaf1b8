// src/lib.rs
// =============================================================================
// bookmark-guardian: checks bookmark collections for dead, moved and
// HTTPS-upgraded links.
//
// Modules:
// - model: SiteLink (a bookmark with one or more URLs), groups, collections
// - checker: checking every URL of one site, status classification and
//   redirect handling
// - pool: a fixed-width worker pool for whole lists, and one-off checks
// - config: runtime settings
// - error: library error types
//
// Quick tour:
//
//   let config = CheckerConfig::default();
//   let transport = Arc::new(HttpTransport::new(&config)?);
//   let (tx, mut rx) = event_channel();
//   let pool = GroupChecker::new(&config, transport, tx);
//   pool.set_group_to_check(&group)?;
//   pool.start_checks()?;
//   // ... read CheckEvents from rx until RunFinished
// =============================================================================

pub mod checker;
pub mod config;
pub mod error;
pub mod model;
pub mod pool;

pub use checker::{
    CheckOptions, CheckPhase, CheckReport, HttpTransport, Probe, ProbeOutcome, SiteLinkChecker,
    Transport,
};
pub use config::CheckerConfig;
pub use error::{CheckError, CollectionError, ModelError, PoolError, TransportError};
pub use model::{LinkCollection, LinkGroup, LinkStatus, SiteLink};
pub use pool::{event_channel, CheckEvent, EventReceiver, GroupChecker, SingleLinkChecker};
