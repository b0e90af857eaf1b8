// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic for a single site.
//
// Submodules:
// - classify: maps an HTTP status (or a failure) to a LinkStatus
// - redirect: decides whether a redirect is the same resource, an HTTPS
//   upgrade, or a real move
// - transport: makes the HTTP requests (reqwest, redirects intercepted)
// - site: SiteLinkChecker, which checks all URLs of one site concurrently
//
// Checking many sites at once is the pool module's job.
//
// Rust concepts:
// - Traits as seams: the engine only sees `dyn Transport`
// - cfg(test): the scripted transport is compiled into test builds only
// =============================================================================

mod classify;
mod redirect;
mod site;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{classify, classify_status};
pub use redirect::{resolve_redirect, RedirectOutcome};
pub use site::{CheckOptions, CheckPhase, CheckReport, DoneCallback, SiteLinkChecker};
pub use transport::{HttpTransport, Probe, ProbeOutcome, Transport};
