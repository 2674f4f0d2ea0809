//! Job lifecycle: records, progress, and the registry

pub mod registry;
pub mod types;

pub use registry::JobRegistry;
pub use types::{
    CrawlJob, CrawlProgress, CrawlResult, DEFAULT_MAX_RETRIES, ErrorEntry, ErrorSummary,
    FailureKind, JobId, JobStatus, ProgressUpdate,
};
