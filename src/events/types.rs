//! Engine event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::{CrawlProgress, FailureKind, JobId};

/// Everything observable about a running job, in emission order
///
/// Events for one job are emitted from that job's worker task, so observers
/// see them in a consistent order: `JobStart` first, page events between,
/// and exactly one of `JobComplete`/`JobError` last.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    JobStart {
        job_id: JobId,
        seed_url: String,
        timestamp: DateTime<Utc>,
    },
    JobComplete {
        job_id: JobId,
        total_pages: u64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    JobError {
        job_id: JobId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    PageStart {
        job_id: JobId,
        url: String,
        depth: u32,
        timestamp: DateTime<Utc>,
    },
    PageComplete {
        job_id: JobId,
        url: String,
        depth: u32,
        http_status: u16,
        load_time_ms: u64,
        links_discovered: u64,
        timestamp: DateTime<Utc>,
    },
    PageError {
        job_id: JobId,
        url: String,
        error: String,
        kind: FailureKind,
        timestamp: DateTime<Utc>,
    },
    Progress {
        job_id: JobId,
        progress: CrawlProgress,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    #[must_use]
    pub fn job_start(job_id: JobId, seed_url: String) -> Self {
        Self::JobStart {
            job_id,
            seed_url,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn job_complete(job_id: JobId, total_pages: u64, duration_ms: u64) -> Self {
        Self::JobComplete {
            job_id,
            total_pages,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn job_error(job_id: JobId, error: String) -> Self {
        Self::JobError {
            job_id,
            error,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn page_start(job_id: JobId, url: String, depth: u32) -> Self {
        Self::PageStart {
            job_id,
            url,
            depth,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn page_complete(
        job_id: JobId,
        url: String,
        depth: u32,
        http_status: u16,
        load_time_ms: u64,
        links_discovered: u64,
    ) -> Self {
        Self::PageComplete {
            job_id,
            url,
            depth,
            http_status,
            load_time_ms,
            links_discovered,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn page_error(job_id: JobId, url: String, error: String, kind: FailureKind) -> Self {
        Self::PageError {
            job_id,
            url,
            error,
            kind,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn progress(job_id: JobId, progress: CrawlProgress) -> Self {
        Self::Progress {
            job_id,
            progress,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JobStart { .. } => "job_start",
            Self::JobComplete { .. } => "job_complete",
            Self::JobError { .. } => "job_error",
            Self::PageStart { .. } => "page_start",
            Self::PageComplete { .. } => "page_complete",
            Self::PageError { .. } => "page_error",
            Self::Progress { .. } => "progress",
        }
    }

    #[must_use]
    pub const fn job_id(&self) -> JobId {
        match self {
            Self::JobStart { job_id, .. }
            | Self::JobComplete { job_id, .. }
            | Self::JobError { job_id, .. }
            | Self::PageStart { job_id, .. }
            | Self::PageComplete { job_id, .. }
            | Self::PageError { job_id, .. }
            | Self::Progress { job_id, .. } => *job_id,
        }
    }
}
