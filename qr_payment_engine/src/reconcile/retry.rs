//! Retry bookkeeping for merchant orders that arrive before their payment exists.
//!
//! Each such order gets exactly one spawned chain that re-polls at fixed offsets from the
//! original event. The chain is cancellable from the payment path: the moment a payment webhook
//! settles the order, [`RetryChains::cancel`] flips the shared flag and wakes the sleeper so the
//! chain exits instead of re-polling. The offsets are bounded, so an order whose payment never
//! materializes simply runs out of retries and goes quiet.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::sync::{Mutex, Notify};

/// Re-poll offsets, measured from the moment the empty merchant order arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub offsets: Vec<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { offsets: vec![Duration::from_secs(3), Duration::from_secs(10), Duration::from_secs(20)] }
    }
}

impl RetryConfig {
    pub fn new<I: IntoIterator<Item = Duration>>(offsets: I) -> Self {
        Self { offsets: offsets.into_iter().collect() }
    }

    /// Disables retries altogether.
    pub fn none() -> Self {
        Self { offsets: Vec::new() }
    }
}

/// Shared state between a running chain and the rest of the flow. `resolved` is checked after
/// every sleep; `waker` cuts the sleep short when someone cancels.
pub(crate) struct ChainHandle {
    pub(crate) resolved: Arc<AtomicBool>,
    pub(crate) waker: Arc<Notify>,
}

impl ChainHandle {
    pub(crate) fn new() -> Self {
        Self { resolved: Arc::new(AtomicBool::new(false)), waker: Arc::new(Notify::new()) }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    pub(crate) fn resolve(&self) {
        self.resolved.store(true, Ordering::SeqCst);
    }
}

/// The set of live retry chains, keyed by merchant-order id. Duplicate deliveries for the same
/// order are already absorbed by the idempotency ledger, so at most one chain per order exists;
/// `register` enforces it anyway.
#[derive(Clone, Default)]
pub(crate) struct RetryChains {
    chains: Arc<Mutex<HashMap<String, ChainHandle>>>,
}

impl RetryChains {
    /// Registers a chain for the order and returns its handle parts, or `None` if a chain is
    /// already running.
    pub(crate) async fn register(&self, order_id: &str) -> Option<(Arc<AtomicBool>, Arc<Notify>)> {
        let mut chains = self.chains.lock().await;
        if chains.contains_key(order_id) {
            debug!("🕰️ A retry chain is already running for merchant order {order_id}");
            return None;
        }
        let handle = ChainHandle::new();
        let parts = (handle.resolved.clone(), handle.waker.clone());
        chains.insert(order_id.to_string(), handle);
        Some(parts)
    }

    /// Cancels the chain for an order, if one is running. The chain wakes, sees the flag and
    /// exits without another poll.
    pub(crate) async fn cancel(&self, order_id: &str) {
        let mut chains = self.chains.lock().await;
        if let Some(handle) = chains.remove(order_id) {
            handle.resolve();
            handle.waker.notify_one();
            debug!("🕰️ Cancelled the retry chain for merchant order {order_id}");
        }
    }

    /// Deregisters a finished chain. Called by the chain itself on the way out.
    pub(crate) async fn remove(&self, order_id: &str) {
        self.chains.lock().await.remove(order_id);
    }

    pub(crate) async fn is_scheduled(&self, order_id: &str) -> bool {
        self.chains.lock().await.contains_key(order_id)
    }
}
