// src/checker/testing.rs
// Scripted transport for engine tests: fixed answers per URL, no network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use url::Url;

use super::transport::{Probe, Transport};

pub(crate) struct ScriptedTransport {
    responses: HashMap<String, Probe>,
    delay: Duration,
    // When set, every probe waits for a permit before answering
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delay: Duration::ZERO,
            gate: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Unscripted URLs answer 200.
    pub(crate) fn respond(mut self, url: &str, probe: Probe) -> Self {
        let key = Url::parse(url).expect("scripted URL must parse").to_string();
        self.responses.insert(key, probe);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn held(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub(crate) fn gate(&self) -> Arc<Semaphore> {
        Arc::clone(self.gate.as_ref().expect("transport is not held"))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn probe(&self, url: &Url) -> Probe {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| Probe::status(200))
    }
}
