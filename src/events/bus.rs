//! Typed event bus
//!
//! Fan-out is synchronous: `emit` invokes every registered observer inline
//! before returning, so an observer that has run has seen every event
//! emitted before its registration was dropped. Observer panics are caught
//! and counted rather than propagated into the engine. An async mirror of
//! the stream is available through `subscribe`.

use log::warn;
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use super::metrics::{EventBusMetrics, MetricsSnapshot};
use super::types::EngineEvent;

const BROADCAST_CAPACITY: usize = 1024;

/// Handle returned by [`EngineEventBus::on`]; pass it to `off` to detach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

pub struct EngineEventBus {
    observers: RwLock<Vec<(SubscriptionId, Observer)>>,
    next_id: AtomicU64,
    broadcast: broadcast::Sender<EngineEvent>,
    metrics: EventBusMetrics,
}

impl EngineEventBus {
    #[must_use]
    pub fn new() -> Self {
        let (broadcast, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            broadcast,
            metrics: EventBusMetrics::new(),
        }
    }

    /// Register a synchronous observer; it runs inline on every `emit`
    pub fn on<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut observers = self.observers.write();
        observers.push((id, Arc::new(observer)));
        self.metrics.update_observer_count(observers.len());
        id
    }

    /// Detach an observer; returns whether it was registered
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        let removed = observers.len() != before;
        self.metrics.update_observer_count(observers.len());
        removed
    }

    /// Async mirror of the event stream
    ///
    /// Slow receivers can lag and miss events; the synchronous observer path
    /// is the lossless one.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.broadcast.subscribe()
    }

    /// Deliver an event to every observer, in registration order
    pub fn emit(&self, event: &EngineEvent) {
        self.metrics.increment_emitted();

        // Snapshot under the read lock so an observer may call on/off
        // without deadlocking.
        let observers: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                self.metrics.increment_panics();
                warn!("event observer panicked on {}", event.name());
            }
        }

        // Best-effort mirror; no receivers is not an error.
        let _ = self.broadcast.send(event.clone());
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for EngineEventBus {
    fn default() -> Self {
        Self::new()
    }
}
