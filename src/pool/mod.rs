// src/pool/mod.rs
// =============================================================================
// Running many site checks.
//
// Submodules:
// - queue: GroupChecker, a fixed-width worker pool for whole lists
// - single: SingleLinkChecker, independent one-off checks
// - events: the progress events both of them send to the caller
// =============================================================================

mod events;
mod queue;
mod single;

pub use events::{event_channel, CheckEvent, EventReceiver, EventSender};
pub use queue::{GroupChecker, PoolProgress};
pub use single::SingleLinkChecker;
