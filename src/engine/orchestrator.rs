//! Crawl orchestrator
//!
//! The public job-control surface: register jobs, start them, observe their
//! events, and read their progress. One orchestrator owns the registry, the
//! session manager, the robots cache, and the event bus; jobs run as
//! spawned worker tasks against that shared state.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::executor::{self, EngineContext};
use super::robots::RobotsCache;
use super::session::SessionManager;
use crate::browser::BrowserBackend;
use crate::config::CrawlConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EngineEventBus, MetricsSnapshot, SubscriptionId};
use crate::jobs::{CrawlJob, CrawlProgress, JobId, JobRegistry, JobStatus, ProgressUpdate};

pub struct CrawlOrchestrator {
    ctx: Arc<EngineContext>,
}

impl CrawlOrchestrator {
    /// Orchestrator driving the given browser backend
    #[must_use]
    pub fn new(backend: Arc<dyn BrowserBackend>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            ctx: Arc::new(EngineContext {
                registry: JobRegistry::new(),
                sessions: SessionManager::new(backend),
                robots: RobotsCache::new(http.clone()),
                bus: EngineEventBus::new(),
                http,
            }),
        }
    }

    /// Register a new queued job
    pub fn create_job(&self, config: CrawlConfig) -> CrawlJob {
        self.ctx.registry.create_job(config)
    }

    pub fn get_job(&self, id: JobId) -> EngineResult<CrawlJob> {
        self.ctx.registry.get_job(id)
    }

    pub fn get_progress(&self, id: JobId) -> EngineResult<CrawlProgress> {
        self.ctx.registry.get_progress(id)
    }

    /// Apply a progress patch and return the merged snapshot
    pub fn update_progress(&self, id: JobId, update: ProgressUpdate) -> EngineResult<CrawlProgress> {
        self.ctx.registry.update_progress(id, update)
    }

    /// Start a queued job on a worker task and return its running snapshot
    ///
    /// The `JobStart` event has been delivered to registered observers by
    /// the time this returns.
    pub fn start_job(&self, id: JobId) -> EngineResult<CrawlJob> {
        let job = self.ctx.registry.get_job(id)?;
        if job.progress.status != JobStatus::Queued {
            return Err(EngineError::InvalidTransition {
                id,
                status: job.progress.status,
            });
        }

        executor::mark_running(&self.ctx, &job)?;
        tokio::spawn(executor::run_job(Arc::clone(&self.ctx), job));
        self.ctx.registry.get_job(id)
    }

    /// Start a queued job and wait for its terminal state
    pub async fn run_job_to_completion(&self, id: JobId) -> EngineResult<CrawlJob> {
        let job = self.ctx.registry.get_job(id)?;
        if job.progress.status != JobStatus::Queued {
            return Err(EngineError::InvalidTransition {
                id,
                status: job.progress.status,
            });
        }

        executor::mark_running(&self.ctx, &job)?;
        executor::run_job(Arc::clone(&self.ctx), job).await;
        self.ctx.registry.get_job(id)
    }

    /// Register a synchronous event observer
    pub fn on<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.ctx.bus.on(observer)
    }

    /// Detach an event observer
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.ctx.bus.off(id)
    }

    /// Async mirror of the event stream
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.ctx.bus.subscribe()
    }

    #[must_use]
    pub fn event_metrics(&self) -> MetricsSnapshot {
        self.ctx.bus.metrics()
    }

    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.ctx.sessions.active_count()
    }

    /// Close every live crawl session
    pub async fn shutdown(&self) {
        self.ctx.sessions.shutdown().await;
    }
}
