// src/pool/events.rs
// =============================================================================
// Progress events sent to whoever started a check.
//
// The caller hands the pool (or launcher) the sending half of an unbounded
// tokio channel and reads events from the other half. Sending never blocks,
// so events can be emitted from completion handlers.
// =============================================================================

use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::model::SiteLink;

#[derive(Debug, Clone)]
pub enum CheckEvent {
    /// A check for this site is about to start
    Started { site: Arc<SiteLink> },
    /// A site finished; refresh anything showing it when `changed > 0`
    SiteChecked {
        site: Arc<SiteLink>,
        changed: usize,
        /// Label of the pool run the site belonged to, `None` for ad-hoc checks
        run: Option<Arc<str>>,
    },
    /// Every site of a pool run is done
    RunFinished { label: Arc<str> },
}

pub type EventSender = UnboundedSender<CheckEvent>;
pub type EventReceiver = UnboundedReceiver<CheckEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    unbounded_channel()
}

// A caller that stopped listening is not an error for the checker
pub(crate) fn emit(events: &EventSender, event: CheckEvent) {
    if events.send(event).is_err() {
        trace!("event receiver dropped");
    }
}
