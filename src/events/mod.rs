//! Engine event stream: typed events, the synchronous bus, and its metrics

pub mod bus;
pub mod metrics;
pub mod types;

pub use bus::{EngineEventBus, SubscriptionId};
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use types::EngineEvent;
