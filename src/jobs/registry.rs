//! In-memory job registry
//!
//! Thread-safe store for every job the engine has seen. Progress writes go
//! through [`JobRegistry::update_progress`], which enforces the monotonic
//! lifecycle; once a job reaches a terminal state further writes are
//! silently dropped, so completion and failure are idempotent.

use chrono::Utc;
use dashmap::DashMap;
use log::{debug, warn};

use super::types::{CrawlJob, CrawlProgress, CrawlResult, JobId, JobStatus, ProgressUpdate};
use crate::config::CrawlConfig;
use crate::error::{EngineError, EngineResult};

#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<JobId, CrawlJob>,
}

impl JobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new queued job and return its snapshot
    pub fn create_job(&self, config: CrawlConfig) -> CrawlJob {
        let job = CrawlJob::new(config);
        debug!("registered job {} for {}", job.id, job.config.seed_url());
        self.jobs.insert(job.id, job.clone());
        job
    }

    /// Snapshot of a job by id
    pub fn get_job(&self, id: JobId) -> EngineResult<CrawlJob> {
        self.jobs
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::JobNotFound { id })
    }

    /// Snapshot of a job's progress counters
    pub fn get_progress(&self, id: JobId) -> EngineResult<CrawlProgress> {
        Ok(self.get_job(id)?.progress)
    }

    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Shallow-merge a progress patch into a job, returning the merged
    /// progress snapshot
    ///
    /// Status changes that the lifecycle does not permit are dropped with a
    /// warning; the rest of the patch still applies unless the job is
    /// already terminal, in which case the whole patch is ignored.
    pub fn update_progress(&self, id: JobId, update: ProgressUpdate) -> EngineResult<CrawlProgress> {
        let mut entry = self.jobs.get_mut(&id).ok_or(EngineError::JobNotFound { id })?;
        let job = entry.value_mut();
        if job.progress.status.is_terminal() {
            debug!("dropping progress update for terminal job {id}");
            return Ok(job.progress.clone());
        }

        if let Some(status) = update.status {
            if status == job.progress.status || job.progress.status.can_advance_to(status) {
                job.progress.status = status;
            } else {
                warn!(
                    "ignoring status change {:?} -> {status:?} for job {id}",
                    job.progress.status
                );
            }
        }
        if let Some(pages_analyzed) = update.pages_analyzed {
            job.progress.pages_analyzed = pages_analyzed;
        }
        if let Some(total_pages) = update.total_pages {
            job.progress.total_pages = total_pages;
        }
        if let Some(current_depth) = update.current_depth {
            job.progress.current_depth = current_depth;
        }
        if let Some(unique_urls) = update.unique_urls {
            job.progress.unique_urls = unique_urls;
        }
        if let Some(skipped_urls) = update.skipped_urls {
            job.progress.skipped_urls = skipped_urls;
        }
        if let Some(failed_urls) = update.failed_urls {
            job.progress.failed_urls = failed_urls;
        }
        if let Some(current_url) = update.current_url {
            job.progress.current_url = Some(current_url);
        }
        if let Some(started_at) = update.started_at {
            job.progress.started_at = Some(started_at);
        }
        if let Some(ended_at) = update.ended_at {
            job.progress.ended_at = Some(ended_at);
        }
        if let Some(error) = update.error {
            job.progress.error = Some(error);
        }

        // The estimate can lag behind discovery; never report fewer total
        // pages than already analyzed.
        if job.progress.total_pages < job.progress.pages_analyzed {
            job.progress.total_pages = job.progress.pages_analyzed;
        }

        job.updated_at = Utc::now();
        Ok(job.progress.clone())
    }

    /// Apply a mutation to the job's result, initializing it on first use
    pub fn update_result<F>(&self, id: JobId, mutate: F) -> EngineResult<()>
    where
        F: FnOnce(&mut CrawlResult),
    {
        let mut entry = self.jobs.get_mut(&id).ok_or(EngineError::JobNotFound { id })?;
        let job = entry.value_mut();
        let config = job.config.clone();
        mutate(job.result.get_or_insert_with(|| CrawlResult::new(config)));
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Move a job to completed and attach its final result
    ///
    /// No-op if the job is already terminal.
    pub fn complete_job(&self, id: JobId, mut result: CrawlResult) -> EngineResult<()> {
        let mut entry = self.jobs.get_mut(&id).ok_or(EngineError::JobNotFound { id })?;
        let job = entry.value_mut();
        if job.progress.status.is_terminal() {
            debug!("job {id} already terminal, keeping existing outcome");
            return Ok(());
        }

        job.progress.status = JobStatus::Completed;
        job.progress.ended_at = Some(Utc::now());
        job.progress.current_url = None;
        result.progress = job.progress.clone();
        job.result = Some(result);
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Move a job to failed with a job-level error
    ///
    /// No-op if the job is already terminal. Partial results collected
    /// before the failure are kept.
    pub fn fail_job(&self, id: JobId, error: String) -> EngineResult<()> {
        let mut entry = self.jobs.get_mut(&id).ok_or(EngineError::JobNotFound { id })?;
        let job = entry.value_mut();
        if job.progress.status.is_terminal() {
            debug!("job {id} already terminal, keeping existing outcome");
            return Ok(());
        }

        job.progress.status = JobStatus::Failed;
        job.progress.error = Some(error);
        job.progress.ended_at = Some(Utc::now());
        job.progress.current_url = None;
        if let Some(result) = job.result.as_mut() {
            result.progress = job.progress.clone();
        }
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfigBuilder;

    fn config() -> CrawlConfig {
        CrawlConfigBuilder::new()
            .seed_url("https://example.com")
            .build()
            .expect("valid config")
    }

    #[test]
    fn unknown_job_lookup_fails() {
        let registry = JobRegistry::new();
        assert!(matches!(
            registry.get_job(JobId::new()),
            Err(EngineError::JobNotFound { .. })
        ));
    }

    #[test]
    fn progress_patch_is_shallow() {
        let registry = JobRegistry::new();
        let job = registry.create_job(config());

        registry
            .update_progress(
                job.id,
                ProgressUpdate {
                    status: Some(JobStatus::Running),
                    pages_analyzed: Some(3),
                    total_pages: Some(10),
                    ..ProgressUpdate::default()
                },
            )
            .expect("update");
        let merged = registry
            .update_progress(
                job.id,
                ProgressUpdate {
                    pages_analyzed: Some(4),
                    ..ProgressUpdate::default()
                },
            )
            .expect("update");

        // The returned snapshot is the merged state, same as a fresh read.
        assert_eq!(merged.status, JobStatus::Running);
        assert_eq!(merged.pages_analyzed, 4);
        assert_eq!(merged.total_pages, 10);

        let progress = registry.get_progress(job.id).expect("progress");
        assert_eq!(progress.status, JobStatus::Running);
        assert_eq!(progress.pages_analyzed, 4);
        assert_eq!(progress.total_pages, 10);
    }

    #[test]
    fn total_pages_never_lags_analyzed() {
        let registry = JobRegistry::new();
        let job = registry.create_job(config());

        registry
            .update_progress(
                job.id,
                ProgressUpdate {
                    status: Some(JobStatus::Running),
                    pages_analyzed: Some(7),
                    total_pages: Some(2),
                    ..ProgressUpdate::default()
                },
            )
            .expect("update");

        let progress = registry.get_progress(job.id).expect("progress");
        assert_eq!(progress.total_pages, 7);
    }

    #[test]
    fn illegal_status_change_is_dropped_but_patch_applies() {
        let registry = JobRegistry::new();
        let job = registry.create_job(config());

        registry
            .update_progress(
                job.id,
                ProgressUpdate {
                    status: Some(JobStatus::Completed),
                    pages_analyzed: Some(1),
                    ..ProgressUpdate::default()
                },
            )
            .expect("update");

        let progress = registry.get_progress(job.id).expect("progress");
        assert_eq!(progress.status, JobStatus::Queued);
        assert_eq!(progress.pages_analyzed, 1);
    }

    #[test]
    fn terminal_jobs_ignore_further_writes() {
        let registry = JobRegistry::new();
        let job = registry.create_job(config());

        registry
            .update_progress(
                job.id,
                ProgressUpdate {
                    status: Some(JobStatus::Running),
                    ..ProgressUpdate::default()
                },
            )
            .expect("update");
        registry
            .complete_job(job.id, CrawlResult::new(config()))
            .expect("complete");

        registry.fail_job(job.id, "late failure".into()).expect("fail");
        registry
            .update_progress(
                job.id,
                ProgressUpdate {
                    pages_analyzed: Some(99),
                    ..ProgressUpdate::default()
                },
            )
            .expect("update");

        let job = registry.get_job(job.id).expect("job");
        assert_eq!(job.progress.status, JobStatus::Completed);
        assert_eq!(job.progress.pages_analyzed, 0);
        assert!(job.progress.error.is_none());
    }

    #[test]
    fn completion_mirrors_progress_into_result() {
        let registry = JobRegistry::new();
        let job = registry.create_job(config());

        registry
            .update_progress(
                job.id,
                ProgressUpdate {
                    status: Some(JobStatus::Running),
                    pages_analyzed: Some(2),
                    total_pages: Some(2),
                    ..ProgressUpdate::default()
                },
            )
            .expect("update");
        registry
            .complete_job(job.id, CrawlResult::new(config()))
            .expect("complete");

        let job = registry.get_job(job.id).expect("job");
        let result = job.result.expect("result");
        assert_eq!(result.progress.status, JobStatus::Completed);
        assert_eq!(result.progress.pages_analyzed, 2);
        assert!(result.progress.ended_at.is_some());
    }
}
