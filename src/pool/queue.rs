// src/pool/queue.rs
// =============================================================================
// This module checks a whole list of sites with a fixed number of workers.
//
// How it works:
// 1. set_list_to_check() stores the queue of sites and a label for the run
// 2. start_checks() hands the first W sites to the W workers
// 3. Whenever a worker finishes, it is reset and immediately given the next
//    site that has not been started yet
// 4. When the last site finishes, a single RunFinished event is sent
//
// A site that is already being checked elsewhere (or sits in the queue
// twice) can't be started; it is counted as finished with no changes.
//
// So at most W sites (and their requests) are in flight at any moment, no
// matter how long the list is - bookmark files can hold thousands of links
// and checking them all at once would exhaust sockets or get us rate limited.
//
// Politeness:
// - The pool width is the only rate limit; there is no delay between checks
// =============================================================================

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{info, warn};

use super::events::{emit, CheckEvent, EventSender};
use crate::checker::{CheckOptions, CheckReport, SiteLinkChecker, Transport};
use crate::config::CheckerConfig;
use crate::error::PoolError;
use crate::model::{LinkCollection, LinkGroup, SiteLink, UNSORTED_NAME};

// Everything guarded by the pool-wide lock
#[derive(Debug)]
struct PoolState {
    queue: Vec<Arc<SiteLink>>,
    label: Arc<str>,
    dispatched: usize,
    completed: usize,
    all_done: bool,
}

/// Counters of the current (or last) run, read under the pool lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolProgress {
    pub label: Arc<str>,
    pub queued: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub all_done: bool,
}

impl PoolProgress {
    /// Sites dispatched but not finished.
    pub fn in_flight(&self) -> usize {
        self.dispatched - self.completed
    }
}

/// Worker pool that checks a list of sites, at most `width` at a time.
pub struct GroupChecker {
    workers: Vec<SiteLinkChecker>,
    state: Mutex<PoolState>,
    events: EventSender,
    me: Weak<GroupChecker>,
}

impl GroupChecker {
    /// Creates `config.pool_width()` workers sharing one transport.
    pub fn new(
        config: &CheckerConfig,
        transport: Arc<dyn Transport>,
        events: EventSender,
    ) -> Arc<Self> {
        let options = CheckOptions {
            always_commit: false,
            auto_https: config.auto_https,
        };
        Arc::new_cyclic(|me| Self {
            workers: (0..config.pool_width())
                .map(|_| SiteLinkChecker::new(Arc::clone(&transport), options))
                .collect(),
            state: Mutex::new(PoolState {
                queue: Vec::new(),
                label: Arc::from(""),
                dispatched: 0,
                completed: 0,
                all_done: false,
            }),
            events,
            me: me.clone(),
        })
    }

    pub fn width(&self) -> usize {
        self.workers.len()
    }

    /// True when no run is in progress, i.e. a new one may be set up.
    pub fn not_active(&self) -> bool {
        let state = self.state.lock();
        state.all_done || state.dispatched == 0
    }

    pub fn progress(&self) -> PoolProgress {
        let state = self.state.lock();
        PoolProgress {
            label: Arc::clone(&state.label),
            queued: state.queue.len(),
            dispatched: state.dispatched,
            completed: state.completed,
            all_done: state.all_done,
        }
    }

    /// Replaces the queue. Rejected while a previous run is in progress.
    pub fn set_list_to_check(
        &self,
        sites: Vec<Arc<SiteLink>>,
        name: &str,
    ) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        if state.dispatched > 0 && !state.all_done {
            return Err(PoolError::RunInProgress);
        }
        *state = PoolState {
            queue: sites,
            label: Arc::from(name),
            dispatched: 0,
            completed: 0,
            all_done: false,
        };
        Ok(())
    }

    /// Queues every site of a group, labelled with the group name.
    pub fn set_group_to_check(&self, group: &LinkGroup) -> Result<(), PoolError> {
        if group.is_empty() {
            return Err(PoolError::EmptyQueue);
        }
        self.set_list_to_check(group.links.clone(), &group.name)
    }

    /// Queues the unsorted links of a collection.
    pub fn set_unsorted_to_check(&self, collection: &LinkCollection) -> Result<(), PoolError> {
        if collection.unsorted.is_empty() {
            return Err(PoolError::EmptyQueue);
        }
        self.set_list_to_check(collection.unsorted.clone(), UNSORTED_NAME)
    }

    /// Starts the first `min(width, queue length)` checks.
    /// Must be called inside a tokio runtime.
    pub fn start_checks(&self) -> Result<(), PoolError> {
        let (label, queued, batch) = {
            let mut state = self.state.lock();
            if state.queue.is_empty() {
                return Err(PoolError::EmptyQueue);
            }
            if state.dispatched > 0 {
                return Err(PoolError::AlreadyStarted);
            }
            let count = self.workers.len().min(state.queue.len());
            state.dispatched = count;
            let batch: Vec<_> = state.queue[..count].iter().cloned().enumerate().collect();
            (Arc::clone(&state.label), state.queue.len(), batch)
        };

        info!(run = %label, sites = queued, workers = batch.len(), "starting check run");
        for (worker, site) in batch {
            self.dispatch(worker, site);
        }
        Ok(())
    }

    fn dispatch(&self, worker: usize, mut site: Arc<SiteLink>) {
        loop {
            emit(&self.events, CheckEvent::Started { site: Arc::clone(&site) });

            let pool = self.me.clone();
            let started = self.workers[worker].start(Arc::clone(&site), move |report| {
                // Leave the checker's completion path before taking the pool lock
                tokio::spawn(async move {
                    if let Some(pool) = pool.upgrade() {
                        pool.worker_done(worker, report);
                    }
                });
            });
            let Err(e) = started else {
                return;
            };

            // Typically the same site queued twice: the first check owns it.
            // It still counts as done so the run can finish.
            warn!(worker, error = %e, "site skipped");
            match self.site_finished(worker, site, 0) {
                Some(next) => site = next,
                None => return,
            }
        }
    }

    fn worker_done(&self, worker: usize, report: CheckReport) {
        if let Some(next) = self.site_finished(worker, report.site, report.changed) {
            self.dispatch(worker, next);
        }
    }

    // Books one finished site and hands back the next one for this worker
    fn site_finished(
        &self,
        worker: usize,
        site: Arc<SiteLink>,
        changed: usize,
    ) -> Option<Arc<SiteLink>> {
        let mut state = self.state.lock();
        emit(
            &self.events,
            CheckEvent::SiteChecked {
                site,
                changed,
                run: Some(Arc::clone(&state.label)),
            },
        );
        state.completed += 1;

        if let Err(e) = self.workers[worker].reset() {
            warn!(worker, error = %e, "worker reported done but could not be reset");
        }

        if state.dispatched < state.queue.len() {
            let site = Arc::clone(&state.queue[state.dispatched]);
            state.dispatched += 1;
            return Some(site);
        }
        if state.completed == state.queue.len() && !state.all_done {
            state.all_done = true;
            info!(run = %state.label, sites = state.completed, "check run finished");
            emit(
                &self.events,
                CheckEvent::RunFinished {
                    label: Arc::clone(&state.label),
                },
            );
        }
        None
    }
}
