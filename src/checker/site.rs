// src/checker/site.rs
// =============================================================================
// Checks every URL of one SiteLink concurrently.
//
// Lifecycle of a checker:
//
//   Idle --prepare()--> Prepared --run()--> Running --last URL--> Completed
//     ^                                                              |
//     +---------------------------reset()----------------------------+
//
// prepare() parses the URLs. Malformed or non-http(s) URLs become Invalid
// right away and are never requested. If nothing is left to request, the
// checker goes straight to Completed and reports zero changes without
// touching the site.
//
// run() spawns one tokio task per remaining URL. Each task classifies its
// response and records it in the session; the task that brings the finished
// count up to the dispatched count commits the new statuses to the site and
// fires the completion callback. Completions can arrive in any order and on
// any worker thread - only the count matters.
//
// A site has at most one check in flight. prepare() fails with SiteBusy if
// another checker is already working on it, and leaves this checker Idle.
//
// Dropping a checker aborts its in-flight requests; no callback fires.
//
// Rust concepts:
// - Enums with data: each URL slot and the checker state carry their own data
// - Arc + Mutex: the state is shared with every spawned request task
// - FnOnce: the completion callback can only ever be called once
// =============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::classify::classify;
use super::redirect::{resolve_redirect, RedirectOutcome};
use super::transport::{Probe, ProbeOutcome, Transport};
use crate::error::CheckError;
use crate::model::{LinkStatus, SiteLink};

/// Per-checker behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Write the status vector back even if nothing changed.
    pub always_commit: bool,
    /// Store `https://` for URLs the server upgraded.
    pub auto_https: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            always_commit: true,
            auto_https: true,
        }
    }
}

/// Where a checker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPhase {
    Idle,
    Prepared,
    Running,
    Completed,
}

/// What a finished check did.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub site: Arc<SiteLink>,
    /// Per-URL statuses that differ from before the check
    pub changed: usize,
    /// URLs actually requested
    pub dispatched: usize,
    /// The statuses the check produced, one per URL
    pub statuses: Vec<LinkStatus>,
    /// Whether the statuses were written back to the site
    pub committed: bool,
    /// Indices whose stored URL was rewritten to https
    pub upgraded: Vec<usize>,
    /// Why each Failed URL failed, by index
    pub failures: Vec<(usize, String)>,
}

/// Called exactly once when a started check completes.
pub type DoneCallback = Box<dyn FnOnce(CheckReport) + Send + 'static>;

// One URL of the site being checked
enum UrlSlot {
    Invalid,
    Pending {
        url: Url,
        task: Option<AbortHandle>,
    },
    Done(LinkStatus),
}

struct Session {
    site: Arc<SiteLink>,
    // URL strings as stored when the check was prepared
    urls: Vec<String>,
    slots: Vec<UrlSlot>,
    // Statuses as they were when the check began
    before: Vec<LinkStatus>,
    dispatched: usize,
    finished: usize,
    upgraded: Vec<usize>,
    failures: Vec<(usize, String)>,
    on_done: Option<DoneCallback>,
}

fn parse_checkable(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

impl Session {
    fn prepare(site: Arc<SiteLink>) -> Result<Self, CheckError> {
        let urls = site.urls();
        let slots: Vec<UrlSlot> = urls
            .iter()
            .map(|raw| match parse_checkable(raw) {
                Some(url) => UrlSlot::Pending { url, task: None },
                None => UrlSlot::Invalid,
            })
            .collect();
        let dispatched = slots
            .iter()
            .filter(|slot| matches!(slot, UrlSlot::Pending { .. }))
            .count();

        // A site with nothing to request is never marked as checking
        let before = if dispatched > 0 {
            site.begin_check().map_err(|_| CheckError::SiteBusy)?
        } else {
            site.statuses()
        };

        Ok(Self {
            site,
            urls,
            slots,
            before,
            dispatched,
            finished: 0,
            upgraded: Vec::new(),
            failures: Vec::new(),
            on_done: None,
        })
    }

    fn statuses(&self) -> Vec<LinkStatus> {
        self.slots
            .iter()
            .map(|slot| match slot {
                UrlSlot::Invalid => LinkStatus::Invalid,
                UrlSlot::Pending { .. } => LinkStatus::Unchecked,
                UrlSlot::Done(status) => *status,
            })
            .collect()
    }

    fn record(&mut self, index: usize, probe: Probe, options: CheckOptions) {
        let original = self.urls[index].clone();
        let mut status = classify(&probe.outcome);

        if status == LinkStatus::Okay {
            if let Some(target) = probe.observed_redirect.as_deref() {
                match resolve_redirect(&original, target) {
                    RedirectOutcome::SameResource => {}
                    RedirectOutcome::SchemeUpgrade => {
                        if options.auto_https {
                            self.upgrade_to_https(index);
                        }
                    }
                    RedirectOutcome::None => status = LinkStatus::Redirected,
                }
            }
        }

        if let ProbeOutcome::Failed(reason) = &probe.outcome {
            debug!(url = %original, %reason, "link check failed");
            self.failures.push((index, reason.clone()));
        }
        debug!(url = %original, ?status, redirect = ?probe.observed_redirect, "link checked");
        self.slots[index] = UrlSlot::Done(status);
        self.finished += 1;
    }

    fn upgrade_to_https(&mut self, index: usize) {
        // The URL may have been edited while the request was in flight
        if self.site.url_at(index).as_deref() != Some(self.urls[index].as_str()) {
            return;
        }
        match self.site.rewrite_url_to_https(index) {
            Ok(()) => {
                info!(url = %self.urls[index], "stored URL upgraded to https");
                self.upgraded.push(index);
            }
            Err(e) => warn!(error = %e, "could not upgrade URL to https"),
        }
    }

    /// Builds the report and writes the results back to the site.
    fn complete(mut self, options: CheckOptions) -> (CheckReport, Option<DoneCallback>) {
        let statuses = self.statuses();
        let mut changed = 0;
        let mut committed = false;

        if self.dispatched > 0 {
            changed = statuses
                .iter()
                .enumerate()
                .filter(|(i, status)| self.before.get(*i) != Some(*status))
                .count();

            if changed > 0 || options.always_commit {
                match self.site.commit_statuses(statuses.clone()) {
                    Ok(()) => committed = true,
                    Err(e) => {
                        warn!(error = %e, "site changed during check, results dropped");
                        self.site.end_check();
                    }
                }
            } else {
                self.site.end_check();
            }
        }

        let report = CheckReport {
            site: Arc::clone(&self.site),
            changed,
            dispatched: self.dispatched,
            statuses,
            committed,
            upgraded: std::mem::take(&mut self.upgraded),
            failures: std::mem::take(&mut self.failures),
        };
        (report, self.on_done.take())
    }

    fn abort(&self) {
        for slot in &self.slots {
            if let UrlSlot::Pending {
                task: Some(handle), ..
            } = slot
            {
                handle.abort();
            }
        }
    }
}

enum State {
    Idle,
    Prepared(Session),
    Running(Session),
    Completed(CheckReport),
}

struct Shared {
    transport: Arc<dyn Transport>,
    options: CheckOptions,
    state: Mutex<State>,
}

impl Shared {
    // Runs on whichever worker thread finished the request
    fn finish_url(&self, index: usize, probe: Probe) {
        let (report, callback) = {
            let mut state = self.state.lock();
            let State::Running(session) = &mut *state else {
                // torn down or reset underneath us
                return;
            };
            session.record(index, probe, self.options);
            if session.finished < session.dispatched {
                return;
            }
            let State::Running(session) = std::mem::replace(&mut *state, State::Idle) else {
                return;
            };
            let (report, callback) = session.complete(self.options);
            info!(
                changed = report.changed,
                dispatched = report.dispatched,
                "site check complete"
            );
            *state = State::Completed(report.clone());
            (report, callback)
        };

        if let Some(callback) = callback {
            callback(report);
        }
    }
}

/// Checks all URLs of one site at a time; reusable after [`reset`].
///
/// [`reset`]: SiteLinkChecker::reset
pub struct SiteLinkChecker {
    shared: Arc<Shared>,
}

impl SiteLinkChecker {
    pub fn new(transport: Arc<dyn Transport>, options: CheckOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                options,
                state: Mutex::new(State::Idle),
            }),
        }
    }

    pub fn options(&self) -> CheckOptions {
        self.shared.options
    }

    pub fn phase(&self) -> CheckPhase {
        match *self.shared.state.lock() {
            State::Idle => CheckPhase::Idle,
            State::Prepared(_) => CheckPhase::Prepared,
            State::Running(_) => CheckPhase::Running,
            State::Completed(_) => CheckPhase::Completed,
        }
    }

    /// The report of the last completed check, until the next reset.
    pub fn last_report(&self) -> Option<CheckReport> {
        match &*self.shared.state.lock() {
            State::Completed(report) => Some(report.clone()),
            _ => None,
        }
    }

    /// Parses the site's URLs and returns how many will be requested.
    ///
    /// With zero the checker is already `Completed` and the site untouched.
    pub fn prepare(&self, site: Arc<SiteLink>) -> Result<usize, CheckError> {
        let mut state = self.shared.state.lock();
        if !matches!(*state, State::Idle) {
            return Err(CheckError::Busy);
        }

        let session = Session::prepare(site)?;
        let dispatched = session.dispatched;
        if dispatched == 0 {
            debug!("nothing to check, completing immediately");
            let (report, _) = session.complete(self.shared.options);
            *state = State::Completed(report);
        } else {
            *state = State::Prepared(session);
        }
        Ok(dispatched)
    }

    /// Starts every prepared request. Must be called inside a tokio runtime.
    pub fn run<F>(&self, on_done: F) -> Result<(), CheckError>
    where
        F: FnOnce(CheckReport) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        let mut session = match std::mem::replace(&mut *state, State::Idle) {
            State::Prepared(session) => session,
            other => {
                *state = other;
                return Err(CheckError::NotPrepared);
            }
        };
        session.on_done = Some(Box::new(on_done));

        // The lock is held while spawning, so no task can finish before
        // every handle is in place.
        for (index, slot) in session.slots.iter_mut().enumerate() {
            if let UrlSlot::Pending { url, task } = slot {
                let shared = Arc::clone(&self.shared);
                let url = url.clone();
                let handle = tokio::spawn(async move {
                    let probe = shared.transport.probe(&url).await;
                    shared.finish_url(index, probe);
                });
                *task = Some(handle.abort_handle());
            }
        }

        *state = State::Running(session);
        Ok(())
    }

    /// Prepares and runs a check. `on_done` fires exactly once, straight
    /// away if there was nothing to request.
    pub fn start<F>(&self, site: Arc<SiteLink>, on_done: F) -> Result<(), CheckError>
    where
        F: FnOnce(CheckReport) + Send + 'static,
    {
        if self.prepare(site)? > 0 {
            return self.run(on_done);
        }
        match self.last_report() {
            Some(report) => {
                on_done(report);
                Ok(())
            }
            None => Err(CheckError::NotCompleted),
        }
    }

    /// Checks a site and waits for the result.
    pub async fn check(&self, site: Arc<SiteLink>) -> Result<CheckReport, CheckError> {
        let (tx, rx) = oneshot::channel();
        self.start(site, move |report| {
            let _ = tx.send(report);
        })?;
        rx.await.map_err(|_| CheckError::Abandoned)
    }

    /// Returns to `Idle` after a completed check.
    ///
    /// `Ok(false)` if the checker was already idle; fails without side
    /// effects while a check is prepared or running.
    pub fn reset(&self) -> Result<bool, CheckError> {
        let mut state = self.shared.state.lock();
        match *state {
            State::Idle => Ok(false),
            State::Completed(_) => {
                *state = State::Idle;
                Ok(true)
            }
            State::Prepared(_) | State::Running(_) => Err(CheckError::NotCompleted),
        }
    }
}

impl Drop for SiteLinkChecker {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if let State::Prepared(session) | State::Running(session) = &*state {
            session.abort();
            session.site.end_check();
        }
        *state = State::Idle;
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why std::mem::replace on the state?
//    - A Session is moved out of State::Running to be completed
//    - You can't move out of a `&mut` directly, so we swap Idle in first
//    - Then the finished State::Completed is written back
//
// 2. Why is the callback called after the lock is released?
//    - The callback may call back into this checker (reset(), last_report())
//    - parking_lot mutexes are not re-entrant: that would deadlock
//
// 3. What is an AbortHandle?
//    - A handle from tokio::spawn that can cancel the task
//    - Drop uses it so no request outlives its checker
// -----------------------------------------------------------------------------
