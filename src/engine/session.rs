//! Crawl sessions
//!
//! A session binds one job to one launched backend instance plus the pacing
//! state that travels with it. The engine keeps one page open per session at
//! a time; [`CrawlSession::open_page`] hands out a configured page and the
//! executor closes it before requesting the next.

use dashmap::DashMap;
use log::{debug, warn};
use std::sync::Arc;

use super::rate_limiter::RequestRateLimiter;
use crate::browser::{BrowserBackend, BrowserPage, BrowserSession, NavigationOptions};
use crate::config::CrawlConfig;
use crate::error::{EngineError, EngineResult};
use crate::jobs::JobId;

/// Per-job crawl session state
pub struct CrawlSession {
    job_id: JobId,
    session: Box<dyn BrowserSession>,
    limiter: RequestRateLimiter,
    navigation: NavigationOptions,
    custom_headers: std::collections::HashMap<String, String>,
    user_agent: Option<String>,
}

impl CrawlSession {
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    #[must_use]
    pub const fn limiter(&self) -> &RequestRateLimiter {
        &self.limiter
    }

    #[must_use]
    pub const fn navigation(&self) -> &NavigationOptions {
        &self.navigation
    }

    /// Open the session's page for the next navigation, with the job's
    /// headers and user-agent applied
    pub async fn open_page(&self) -> EngineResult<Box<dyn BrowserPage>> {
        let page = self
            .session
            .new_page()
            .await
            .map_err(|err| EngineError::Session(format!("{err:#}")))?;
        if !self.custom_headers.is_empty()
            && let Err(err) = page.set_extra_headers(&self.custom_headers).await
        {
            warn!("failed to apply custom headers for job {}: {err:#}", self.job_id);
        }
        if let Some(user_agent) = &self.user_agent
            && let Err(err) = page.set_user_agent(user_agent).await
        {
            warn!("failed to apply user agent for job {}: {err:#}", self.job_id);
        }
        Ok(page)
    }

    async fn close(&self) {
        if let Err(err) = self.session.close().await {
            warn!("failed to close session for job {}: {err:#}", self.job_id);
        }
    }
}

/// Tracks the live session for each running job
pub struct SessionManager {
    backend: Arc<dyn BrowserBackend>,
    sessions: DashMap<JobId, Arc<CrawlSession>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(backend: Arc<dyn BrowserBackend>) -> Self {
        Self {
            backend,
            sessions: DashMap::new(),
        }
    }

    /// The job's session, launching one on first use
    pub async fn get_or_create(
        &self,
        job_id: JobId,
        config: &CrawlConfig,
    ) -> EngineResult<Arc<CrawlSession>> {
        if let Some(session) = self.sessions.get(&job_id) {
            return Ok(Arc::clone(&session));
        }

        let backend_session = self
            .backend
            .launch()
            .await
            .map_err(|err| EngineError::Session(format!("failed to launch session: {err:#}")))?;

        let session = Arc::new(CrawlSession {
            job_id,
            session: backend_session,
            limiter: RequestRateLimiter::per_minute(config.crawl_speed().requests_per_minute()),
            navigation: NavigationOptions {
                timeout: std::time::Duration::from_secs(config.page_timeout_secs()),
                request_timeout: std::time::Duration::from_secs(config.request_timeout_secs()),
            },
            custom_headers: config.custom_headers().clone(),
            user_agent: config.user_agent().map(String::from),
        });

        // Two callers may race past the lookup; keep whichever session
        // landed first and close the loser.
        match self.sessions.entry(job_id) {
            dashmap::Entry::Occupied(existing) => {
                let winner = Arc::clone(existing.get());
                drop(existing);
                session.close().await;
                Ok(winner)
            }
            dashmap::Entry::Vacant(slot) => {
                debug!("launched session for job {job_id}");
                slot.insert(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    /// Close and forget the job's session
    pub async fn release(&self, job_id: JobId) {
        if let Some((_, session)) = self.sessions.remove(&job_id) {
            session.close().await;
            debug!("released session for job {job_id}");
        }
    }

    /// Close every live session
    pub async fn shutdown(&self) {
        let job_ids: Vec<JobId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for job_id in job_ids {
            self.release(job_id).await;
        }
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}
