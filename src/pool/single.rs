// src/pool/single.rs
// =============================================================================
// Fire-and-forget checks of individual sites.
//
// When the user asks to check one bookmark, then another before the first is
// done, each request gets its own SiteLinkChecker keyed by a sequence number.
// The entry is dropped as soon as that check completes. There is no limit on
// how many run at once: bulk checking goes through GroupChecker instead.
//
// A site that is already being checked (here or by a pool) is refused with
// CheckError::SiteBusy rather than checked twice.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::events::{emit, CheckEvent, EventSender};
use crate::checker::{CheckOptions, CheckReport, SiteLinkChecker, Transport};
use crate::config::CheckerConfig;
use crate::error::CheckError;
use crate::model::SiteLink;

pub struct SingleLinkChecker {
    transport: Arc<dyn Transport>,
    options: CheckOptions,
    events: EventSender,
    next_key: AtomicU64,
    active: Mutex<HashMap<u64, Arc<SiteLinkChecker>>>,
    me: Weak<SingleLinkChecker>,
}

impl SingleLinkChecker {
    pub fn new(
        config: &CheckerConfig,
        transport: Arc<dyn Transport>,
        events: EventSender,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            transport,
            // Single checks always write back, even when nothing changed
            options: CheckOptions {
                always_commit: true,
                auto_https: config.auto_https,
            },
            events,
            next_key: AtomicU64::new(0),
            active: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// Number of checks still running.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Starts checking `site` and returns the key of the new check.
    /// Must be called inside a tokio runtime.
    pub fn launch_check(&self, site: Arc<SiteLink>) -> Result<u64, CheckError> {
        if site.is_checking() {
            return Err(CheckError::SiteBusy);
        }
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        let checker = Arc::new(SiteLinkChecker::new(Arc::clone(&self.transport), self.options));
        self.active.lock().insert(key, Arc::clone(&checker));

        emit(&self.events, CheckEvent::Started { site: Arc::clone(&site) });
        debug!(key, "launching single site check");

        let launcher = self.me.clone();
        let started = checker.start(site, move |report| {
            if let Some(launcher) = launcher.upgrade() {
                launcher.finished(key, report);
            }
        });
        if let Err(e) = started {
            self.active.lock().remove(&key);
            return Err(e);
        }
        Ok(key)
    }

    fn finished(&self, key: u64, report: CheckReport) {
        // Taken out first so the checker is dropped outside the lock
        let checker = self.active.lock().remove(&key);
        drop(checker);
        emit(
            &self.events,
            CheckEvent::SiteChecked {
                site: report.site,
                changed: report.changed,
                run: None,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::testing::ScriptedTransport;
    use crate::checker::Probe;
    use crate::model::LinkStatus;
    use crate::pool::events::event_channel;
    use std::time::Duration;

    async fn next_checked(rx: &mut crate::pool::EventReceiver) -> (Arc<SiteLink>, usize) {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("no event in time")
                .expect("event channel closed");
            if let CheckEvent::SiteChecked { site, changed, run } = event {
                assert!(run.is_none());
                return (site, changed);
            }
        }
    }

    #[tokio::test]
    async fn test_overlapping_checks_are_kept_apart() {
        let transport = ScriptedTransport::new()
            .respond("http://gone.com", Probe::status(404))
            .held();
        let gate = transport.gate();
        let (tx, mut rx) = event_channel();
        let launcher = SingleLinkChecker::new(&CheckerConfig::default(), Arc::new(transport), tx);

        let ok = Arc::new(SiteLink::new("http://ok.com", "ok").unwrap());
        let gone = Arc::new(SiteLink::new("http://gone.com", "gone").unwrap());
        let first = launcher.launch_check(Arc::clone(&ok)).unwrap();
        let second = launcher.launch_check(Arc::clone(&gone)).unwrap();
        assert_ne!(first, second);
        assert_eq!(launcher.active_count(), 2);

        gate.add_permits(2);
        next_checked(&mut rx).await;
        next_checked(&mut rx).await;

        assert_eq!(launcher.active_count(), 0);
        assert_eq!(ok.status(), LinkStatus::Okay);
        assert_eq!(gone.status(), LinkStatus::Missing);
    }

    #[tokio::test]
    async fn test_same_site_twice_in_a_row() {
        let (tx, mut rx) = event_channel();
        let launcher = SingleLinkChecker::new(
            &CheckerConfig::default(),
            Arc::new(ScriptedTransport::new()),
            tx,
        );
        let site = Arc::new(SiteLink::new("http://ok.com", "ok").unwrap());

        launcher.launch_check(Arc::clone(&site)).unwrap();
        let (_, changed) = next_checked(&mut rx).await;
        assert_eq!(changed, 1);

        launcher.launch_check(Arc::clone(&site)).unwrap();
        let (checked, changed) = next_checked(&mut rx).await;
        assert!(Arc::ptr_eq(&checked, &site));
        assert_eq!(changed, 0);
        assert_eq!(launcher.active_count(), 0);
    }

    #[tokio::test]
    async fn test_site_without_checkable_urls() {
        let (tx, mut rx) = event_channel();
        let launcher = SingleLinkChecker::new(
            &CheckerConfig::default(),
            Arc::new(ScriptedTransport::new()),
            tx,
        );
        let site = Arc::new(SiteLink::new("javascript:void(0)", "js").unwrap());

        launcher.launch_check(Arc::clone(&site)).unwrap();
        // completed synchronously inside launch_check
        assert_eq!(launcher.active_count(), 0);
        let (_, changed) = next_checked(&mut rx).await;
        assert_eq!(changed, 0);
        assert!(!site.is_checking());
    }

    #[tokio::test]
    async fn test_site_in_flight_is_not_launched_again() {
        let transport = Arc::new(ScriptedTransport::new().held());
        let gate = transport.gate();
        let (tx, mut rx) = event_channel();
        let launcher = SingleLinkChecker::new(&CheckerConfig::default(), transport.clone(), tx);
        let site = Arc::new(SiteLink::new("http://ok.com", "ok").unwrap());

        launcher.launch_check(Arc::clone(&site)).unwrap();
        assert_eq!(
            launcher.launch_check(Arc::clone(&site)).unwrap_err(),
            CheckError::SiteBusy
        );
        assert_eq!(launcher.active_count(), 1);

        gate.add_permits(1);
        let (_, changed) = next_checked(&mut rx).await;
        assert_eq!(changed, 1);
        assert_eq!(transport.calls(), 1);
        assert_eq!(launcher.active_count(), 0);
        assert!(!site.is_checking());
    }
}
