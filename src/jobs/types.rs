//! Job records, progress, and failure classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::config::CrawlConfig;
use crate::plugins::{CrawlSummary, PageAnalysis};

/// Default retry budget per page visit
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Opaque job identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct JobId(Uuid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a job
///
/// Transitions are monotonic: queued -> running -> completed | failed.
/// Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the lifecycle permits moving from `self` to `next`
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Queued, Self::Failed)
        )
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Queued
    }
}

/// Live progress counters for a job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub status: JobStatus,
    pub pages_analyzed: u64,
    /// Best estimate of the frontier size; refined as the crawl discovers
    /// pages and finalized on completion
    pub total_pages: u64,
    pub current_depth: u32,
    /// Distinct final URLs seen after redirects
    pub unique_urls: u64,
    /// URLs rejected by robots rules or the configured filter
    pub skipped_urls: u64,
    pub failed_urls: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shallow-merge patch applied to [`CrawlProgress`]
///
/// `None` fields leave the current value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub status: Option<JobStatus>,
    pub pages_analyzed: Option<u64>,
    pub total_pages: Option<u64>,
    pub current_depth: Option<u32>,
    pub unique_urls: Option<u64>,
    pub skipped_urls: Option<u64>,
    pub failed_urls: Option<u64>,
    pub current_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Coarse classification of a page-visit failure, used for retry policy and
/// the error summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Browser,
    Script,
    RateLimited,
    Unknown,
}

impl FailureKind {
    /// Best-effort classification from the error chain text
    #[must_use]
    pub fn classify(err: &anyhow::Error) -> Self {
        let text = format!("{err:#}").to_lowercase();
        if text.contains("429") || text.contains("rate limit") || text.contains("too many requests")
        {
            Self::RateLimited
        } else if text.contains("timeout")
            || text.contains("timed out")
            || text.contains("dns")
            || text.contains("connection")
            || text.contains("net::")
        {
            Self::Network
        } else if text.contains("browser")
            || text.contains("session")
            || text.contains("target")
            || text.contains("page crashed")
        {
            Self::Browser
        } else if text.contains("evaluate") || text.contains("javascript") || text.contains("script")
        {
            Self::Script
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimited | Self::Browser)
    }

    /// Backoff multiplier applied on top of the exponential base delay
    #[must_use]
    pub const fn delay_multiplier(self) -> u32 {
        match self {
            Self::RateLimited => 4,
            Self::Network => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Browser => "browser",
            Self::Script => "script",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        }
    }
}

/// One recorded page failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub url: String,
    pub error: String,
    pub kind: FailureKind,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated failures for a job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total_errors: u64,
    pub errors_by_kind: BTreeMap<String, u64>,
    pub errors: Vec<ErrorEntry>,
}

impl ErrorSummary {
    pub fn record(&mut self, url: String, error: String, kind: FailureKind) {
        self.total_errors += 1;
        *self.errors_by_kind.entry(kind.name().to_string()).or_insert(0) += 1;
        self.errors.push(ErrorEntry {
            url,
            error,
            kind,
            timestamp: Utc::now(),
        });
    }
}

/// The complete output of a crawl job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub config: CrawlConfig,
    pub progress: CrawlProgress,
    pub pages: Vec<PageAnalysis>,
    pub errors: ErrorSummary,
    pub summary: CrawlSummary,
}

impl CrawlResult {
    #[must_use]
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            progress: CrawlProgress::default(),
            pages: Vec::new(),
            errors: ErrorSummary::default(),
            summary: CrawlSummary::default(),
        }
    }
}

/// A registered crawl job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    pub id: JobId,
    pub config: CrawlConfig,
    pub progress: CrawlProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CrawlResult>,
    pub priority: i32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrawlJob {
    #[must_use]
    pub fn new(config: CrawlConfig) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            config,
            progress: CrawlProgress::default(),
            result: None,
            priority: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_monotonic() {
        assert!(JobStatus::Queued.can_advance_to(JobStatus::Running));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Failed));
        assert!(!JobStatus::Completed.can_advance_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_advance_to(JobStatus::Queued));
        assert!(!JobStatus::Completed.can_advance_to(JobStatus::Failed));
    }

    #[test]
    fn classify_matches_error_text() {
        let err = anyhow::anyhow!("navigation timed out after 30s");
        assert_eq!(FailureKind::classify(&err), FailureKind::Network);

        let err = anyhow::anyhow!("upstream said 429 Too Many Requests");
        assert_eq!(FailureKind::classify(&err), FailureKind::RateLimited);

        let err = anyhow::anyhow!("failed to evaluate extraction");
        assert_eq!(FailureKind::classify(&err), FailureKind::Script);

        let err = anyhow::anyhow!("something odd");
        assert_eq!(FailureKind::classify(&err), FailureKind::Unknown);
    }

    #[test]
    fn error_summary_groups_by_kind() {
        let mut summary = ErrorSummary::default();
        summary.record("https://a.example/".into(), "timeout".into(), FailureKind::Network);
        summary.record("https://b.example/".into(), "timeout".into(), FailureKind::Network);
        summary.record("https://c.example/".into(), "weird".into(), FailureKind::Unknown);

        assert_eq!(summary.total_errors, 3);
        assert_eq!(summary.errors_by_kind.get("network"), Some(&2));
        assert_eq!(summary.errors_by_kind.get("unknown"), Some(&1));
        assert_eq!(summary.errors.len(), 3);
    }
}
