use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Lock-free counters for event bus activity.
///
/// All counters use `Ordering::SeqCst` so snapshot reads are coherent
/// across fields.
#[derive(Debug, Clone)]
pub struct EventBusMetrics {
    pub events_emitted: Arc<AtomicU64>,
    pub observer_panics: Arc<AtomicU64>,
    pub active_observers: Arc<AtomicUsize>,
    pub peak_observers: Arc<AtomicUsize>,
}

impl EventBusMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events_emitted: Arc::new(AtomicU64::new(0)),
            observer_panics: Arc::new(AtomicU64::new(0)),
            active_observers: Arc::new(AtomicUsize::new(0)),
            peak_observers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn increment_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_panics(&self) {
        self.observer_panics.fetch_add(1, Ordering::SeqCst);
    }

    pub fn update_observer_count(&self, count: usize) {
        self.active_observers.store(count, Ordering::SeqCst);
        let _ = self.peak_observers.fetch_max(count, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_emitted: self.events_emitted.load(Ordering::SeqCst),
            observer_panics: self.observer_panics.load(Ordering::SeqCst),
            active_observers: self.active_observers.load(Ordering::SeqCst),
            peak_observers: self.peak_observers.load(Ordering::SeqCst),
        }
    }
}

impl Default for EventBusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub events_emitted: u64,
    pub observer_panics: u64,
    pub active_observers: usize,
    pub peak_observers: usize,
}
