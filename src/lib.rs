//! sitescope: site crawl and analysis engine
//!
//! Drives a headless browser across a site, runs a configurable set of
//! metric plugins against every rendered page, and aggregates the results
//! into per-page records and a corpus summary. Jobs move through a
//! monotonic lifecycle (queued, running, then completed or failed) and
//! report through progress counters and a typed event bus.
//!
//! ```no_run
//! use sitescope::config::CrawlConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = CrawlConfig::builder()
//!     .seed_url("https://example.com")
//!     .max_depth(2)
//!     .build()?;
//! let result = sitescope::analyze(config).await?;
//! println!("analyzed {} pages", result.pages.len());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod jobs;
pub mod plugins;

use std::sync::Arc;

pub use browser::ChromiumBackend;
pub use config::{CrawlConfig, CrawlConfigBuilder, CrawlSpeed, PluginSettings};
pub use engine::CrawlOrchestrator;
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EngineEventBus};
pub use jobs::{CrawlJob, CrawlProgress, CrawlResult, JobId, JobStatus};
pub use plugins::{CrawlSummary, PageAnalysis};

/// Run one crawl to completion against a local chromium and return its
/// result
///
/// Convenience wrapper over [`CrawlOrchestrator`] for callers that need a
/// single blocking crawl rather than managed jobs.
pub async fn analyze(config: CrawlConfig) -> EngineResult<CrawlResult> {
    let orchestrator = CrawlOrchestrator::new(Arc::new(ChromiumBackend::new()));
    let job = orchestrator.create_job(config);
    let finished = orchestrator.run_job_to_completion(job.id).await?;
    orchestrator.shutdown().await;

    match finished.result {
        Some(result) if finished.progress.status == JobStatus::Completed => Ok(result),
        _ => Err(EngineError::Session(
            finished
                .progress
                .error
                .unwrap_or_else(|| "crawl did not complete".to_string()),
        )),
    }
}
