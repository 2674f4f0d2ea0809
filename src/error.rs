//! Error types for the job-control surface
//!
//! Page- and plugin-level failures are recovered inside the engine and only
//! show up in progress counters and the error summary; the variants here are
//! the conditions that surface synchronously to callers.

use crate::jobs::{JobId, JobStatus};

/// Errors returned by the orchestrator and job registry
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Lookup by an identifier the registry has never seen
    #[error("job not found: {id}")]
    JobNotFound { id: JobId },

    /// Malformed configuration caught before a job starts
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Attempt to start or advance a job from a state that does not allow it
    #[error("job {id} cannot be started from status {status:?}")]
    InvalidTransition { id: JobId, status: JobStatus },

    /// Crawl session acquisition or teardown failure
    #[error("crawl session error: {0}")]
    Session(String),
}

/// Convenience alias for results on the job-control surface
pub type EngineResult<T> = Result<T, EngineError>;
