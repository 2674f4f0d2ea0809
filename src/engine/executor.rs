//! Job execution
//!
//! One worker task per running job: drives the frontier breadth-first,
//! paces navigations through the session's limiter, fans page analysis out
//! to the plugin pipeline, and reports through the registry and event bus.
//! Page-level failures are recorded and the crawl moves on; only seed
//! parsing and session launch fail the job.

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use super::robots::RobotsCache;
use super::session::{CrawlSession, SessionManager};
use super::sitemap;
use crate::browser::{BrowserPage, NavigationResult};
use crate::config::CrawlConfig;
use crate::events::{EngineEvent, EngineEventBus};
use crate::jobs::{CrawlJob, CrawlResult, FailureKind, JobRegistry, JobStatus, ProgressUpdate};
use crate::plugins::{PageAnalysis, PluginPipeline};

/// Base delay for the exponential retry backoff
const RETRY_BASE_DELAY_MS: u64 = 500;
/// Random jitter added to each retry delay
const RETRY_JITTER_MS: u64 = 250;

/// Shared engine state threaded through every worker
pub struct EngineContext {
    pub registry: JobRegistry,
    pub sessions: SessionManager,
    pub robots: RobotsCache,
    pub bus: EngineEventBus,
    pub http: reqwest::Client,
}

/// Run a job to its terminal state
///
/// Infallible from the caller's perspective: any job-level failure is
/// recorded in the registry and emitted before this returns.
pub async fn run_job(ctx: Arc<EngineContext>, job: CrawlJob) {
    let job_id = job.id;
    let started = Instant::now();

    // The terminal event is the last one a job emits; the closing
    // progress snapshot goes out just before it.
    match run_job_inner(&ctx, &job).await {
        Ok(result) => {
            let total_pages = result.progress.total_pages;
            if let Err(err) = ctx.registry.complete_job(job_id, result) {
                warn!("failed to record completion of job {job_id}: {err}");
            }
            info!(
                "job {job_id} completed: {total_pages} pages in {}ms",
                started.elapsed().as_millis()
            );
            if let Ok(progress) = ctx.registry.get_progress(job_id) {
                ctx.bus.emit(&EngineEvent::progress(job_id, progress));
            }
            ctx.bus.emit(&EngineEvent::job_complete(
                job_id,
                total_pages,
                started.elapsed().as_millis() as u64,
            ));
        }
        Err(err) => {
            let message = format!("{err:#}");
            if let Err(record_err) = ctx.registry.fail_job(job_id, message.clone()) {
                warn!("failed to record failure of job {job_id}: {record_err}");
            }
            warn!("job {job_id} failed: {message}");
            if let Ok(progress) = ctx.registry.get_progress(job_id) {
                ctx.bus.emit(&EngineEvent::progress(job_id, progress));
            }
            ctx.bus.emit(&EngineEvent::job_error(job_id, message));
        }
    }

    ctx.sessions.release(job_id).await;
}

async fn run_job_inner(ctx: &EngineContext, job: &CrawlJob) -> Result<CrawlResult> {
    let config = &job.config;
    let job_id = job.id;

    let seed = Url::parse(config.seed_url())
        .with_context(|| format!("invalid seed url {}", config.seed_url()))?;
    let seed_host = seed
        .host_str()
        .ok_or_else(|| anyhow!("seed url {seed} has no host"))?
        .to_string();

    let pipeline = PluginPipeline::from_settings(config.plugins());
    pipeline.initialize().await;
    pipeline.before_crawl().await;

    let robots = if config.respect_robots_txt() {
        Some(ctx.robots.rules_for(&seed).await)
    } else {
        None
    };

    let mut frontier: VecDeque<(String, u32)> = VecDeque::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut skipped: u64 = 0;

    let seed_url = normalize_url(seed.as_str()).unwrap_or_else(|| seed.to_string());
    visited.insert(seed_url.clone());
    frontier.push_back((seed_url, 0));

    // Sitemap entries join the frontier as depth-1 discoveries; a missing
    // or broken sitemap just means the crawl grows from the seed alone.
    if config.include_sitemap() {
        let location = sitemap::sitemap_url_for(&seed, config.sitemap_url());
        for raw in sitemap::fetch_sitemap(&ctx.http, &location).await {
            match classify_discovery(&raw, &seed_host, config, &visited) {
                Discovery::Accept(url) => {
                    visited.insert(url.clone());
                    frontier.push_back((url, 1));
                }
                Discovery::Filtered => skipped += 1,
                Discovery::Ignore => {}
            }
        }
    }

    // The initial estimate is the discovered sitemap URL count alone; the
    // seed is not part of it, so a failed fetch leaves the estimate at 0.
    ctx.registry.update_progress(
        job_id,
        ProgressUpdate {
            total_pages: Some(frontier.len() as u64 - 1),
            skipped_urls: Some(skipped),
            ..ProgressUpdate::default()
        },
    )?;

    let session = ctx
        .sessions
        .get_or_create(job_id, config)
        .await
        .map_err(|err| anyhow!("{err}"))?;

    let mut result = CrawlResult::new(config.clone());
    let mut final_urls: HashSet<String> = HashSet::new();
    let mut analyzed: u64 = 0;
    let mut failed: u64 = 0;
    let mut attempted: u64 = 0;

    while let Some((url, depth)) = frontier.pop_front() {
        if let Some(rules) = &robots {
            let path = Url::parse(&url).map(|u| u.path().to_string()).unwrap_or_default();
            if !rules.allows(&path) {
                debug!("robots rules skip {url}");
                skipped += 1;
                ctx.registry.update_progress(
                    job_id,
                    ProgressUpdate {
                        skipped_urls: Some(skipped),
                        ..ProgressUpdate::default()
                    },
                )?;
                continue;
            }
        }

        attempted += 1;
        ctx.bus.emit(&EngineEvent::page_start(job_id, url.clone(), depth));
        ctx.registry.update_progress(
            job_id,
            ProgressUpdate {
                current_url: Some(url.clone()),
                current_depth: Some(depth),
                ..ProgressUpdate::default()
            },
        )?;

        session.limiter().acquire().await;

        match visit_page(&session, &url, job.max_retries).await {
            Ok((page, navigation, load_time)) => {
                let mut analysis = PageAnalysis::new(url.clone(), &navigation, depth, load_time);
                pipeline.evaluate_page(&mut analysis, page.as_ref(), load_time).await;

                let mut links_discovered = 0u64;
                if u32::from(config.max_depth()) > depth {
                    for raw in discover_links(page.as_ref()).await {
                        links_discovered += 1;
                        match classify_discovery(&raw, &seed_host, config, &visited) {
                            Discovery::Accept(link) => {
                                visited.insert(link.clone());
                                frontier.push_back((link, depth + 1));
                            }
                            Discovery::Filtered => skipped += 1,
                            Discovery::Ignore => {}
                        }
                    }
                }
                if let Err(err) = page.close().await {
                    warn!("failed to close page for {url}: {err:#}");
                }

                analyzed += 1;
                final_urls.insert(analysis.final_url.clone());
                let http_status = analysis.http_status;
                result.pages.push(analysis.clone());
                // Re-run summarization on every result mutation so readers
                // mid-crawl see a summary consistent with the pages so far.
                result.summary = pipeline.summarize(&result.pages);
                let summary = result.summary.clone();
                ctx.registry.update_result(job_id, |stored| {
                    stored.pages.push(analysis);
                    stored.summary = summary;
                })?;
                ctx.registry.update_progress(
                    job_id,
                    ProgressUpdate {
                        pages_analyzed: Some(analyzed),
                        total_pages: Some(attempted + frontier.len() as u64),
                        unique_urls: Some(final_urls.len() as u64),
                        skipped_urls: Some(skipped),
                        ..ProgressUpdate::default()
                    },
                )?;
                ctx.bus.emit(&EngineEvent::page_complete(
                    job_id,
                    url,
                    depth,
                    http_status,
                    load_time.as_millis() as u64,
                    links_discovered,
                ));
            }
            Err(err) => {
                let kind = FailureKind::classify(&err);
                let message = format!("{err:#}");
                warn!("page {url} failed ({}): {message}", kind.name());

                failed += 1;
                result.errors.record(url.clone(), message.clone(), kind);
                ctx.registry.update_result(job_id, |stored| {
                    stored.errors.record(url.clone(), message.clone(), kind);
                })?;
                ctx.registry.update_progress(
                    job_id,
                    ProgressUpdate {
                        failed_urls: Some(failed),
                        total_pages: Some(attempted + frontier.len() as u64),
                        skipped_urls: Some(skipped),
                        ..ProgressUpdate::default()
                    },
                )?;
                ctx.bus.emit(&EngineEvent::page_error(job_id, url, message, kind));
            }
        }

        if let Ok(progress) = ctx.registry.get_progress(job_id) {
            ctx.bus.emit(&EngineEvent::progress(job_id, progress));
        }
    }

    result.summary = pipeline.summarize(&result.pages);
    ctx.registry.update_result(job_id, |stored| {
        stored.summary = result.summary.clone();
    })?;

    pipeline.after_crawl().await;
    pipeline.destroy().await;

    // The estimate becomes exact once the frontier is exhausted.
    ctx.registry.update_progress(
        job_id,
        ProgressUpdate {
            pages_analyzed: Some(analyzed),
            total_pages: Some(attempted),
            unique_urls: Some(final_urls.len() as u64),
            skipped_urls: Some(skipped),
            failed_urls: Some(failed),
            ..ProgressUpdate::default()
        },
    )?;
    result.progress = ctx.registry.get_progress(job_id)?;

    Ok(result)
}

/// Navigate to one URL, retrying retryable failures with exponential backoff
///
/// Returns the still-open page so the pipeline can evaluate against it; the
/// caller closes it. A failed attempt closes its page before the retry so
/// the session never holds more than one open page.
async fn visit_page(
    session: &CrawlSession,
    url: &str,
    max_retries: u32,
) -> Result<(Box<dyn BrowserPage>, NavigationResult, Duration)> {
    let mut attempt = 0u32;
    loop {
        let outcome = async {
            let page = session.open_page().await.map_err(|err| anyhow!("{err}"))?;
            let started = Instant::now();
            match page.goto(url, session.navigation()).await {
                Ok(navigation) => Ok((page, navigation, started.elapsed())),
                Err(err) => {
                    if let Err(close_err) = page.close().await {
                        debug!("failed to close page after error: {close_err:#}");
                    }
                    Err(err)
                }
            }
        }
        .await;

        match outcome {
            Ok(success) => return Ok(success),
            Err(err) => {
                let kind = FailureKind::classify(&err);
                if attempt >= max_retries || !kind.is_retryable() {
                    return Err(err.context(format!("navigation to {url} failed after {attempt} retries")));
                }
                let backoff = RETRY_BASE_DELAY_MS
                    .saturating_mul(1 << attempt.min(8))
                    .saturating_mul(u64::from(kind.delay_multiplier()));
                let jitter = rand::rng().random_range(0..RETRY_JITTER_MS);
                debug!(
                    "retrying {url} after {}ms ({} failure, attempt {})",
                    backoff + jitter,
                    kind.name(),
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
                attempt += 1;
            }
        }
    }
}

/// Collect the outbound links from a loaded page; extraction failure means
/// no discoveries, not a page failure
async fn discover_links(page: &dyn BrowserPage) -> Vec<String> {
    match page.evaluate(crate::plugins::scripts::DISCOVER_LINKS_SCRIPT).await {
        Ok(value) => serde_json::from_value(value).unwrap_or_default(),
        Err(err) => {
            debug!("link discovery failed: {err:#}");
            Vec::new()
        }
    }
}

enum Discovery {
    /// New same-site URL accepted onto the frontier
    Accept(String),
    /// Rejected by the configured URL filter
    Filtered,
    /// Off-site, malformed, or already seen
    Ignore,
}

fn classify_discovery(
    raw: &str,
    seed_host: &str,
    config: &CrawlConfig,
    visited: &HashSet<String>,
) -> Discovery {
    let Some(url) = normalize_url(raw) else {
        return Discovery::Ignore;
    };
    let Ok(parsed) = Url::parse(&url) else {
        return Discovery::Ignore;
    };
    if parsed.host_str() != Some(seed_host) {
        return Discovery::Ignore;
    }
    if visited.contains(&url) {
        return Discovery::Ignore;
    }
    if !config.accepts_url(&url) {
        return Discovery::Filtered;
    }
    Discovery::Accept(url)
}

/// Canonical frontier form of a URL: parsed, fragment stripped
fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

/// Mark a queued job running and emit its start event
///
/// Split out so spawning and awaiting callers share one transition path.
pub fn mark_running(ctx: &EngineContext, job: &CrawlJob) -> crate::error::EngineResult<()> {
    ctx.registry.update_progress(
        job.id,
        ProgressUpdate {
            status: Some(JobStatus::Running),
            started_at: Some(chrono::Utc::now()),
            ..ProgressUpdate::default()
        },
    )?;
    ctx.bus
        .emit(&EngineEvent::job_start(job.id, job.config.seed_url().to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_fragments() {
        assert_eq!(
            normalize_url("https://example.com/page#section"),
            Some("https://example.com/page".to_string())
        );
        assert_eq!(normalize_url("not a url"), None);
    }

    #[test]
    fn discovery_rejects_offsite_and_duplicates() {
        let config = crate::config::CrawlConfigBuilder::new()
            .seed_url("https://example.com")
            .build()
            .expect("config");
        let mut visited = HashSet::new();
        visited.insert("https://example.com/seen".to_string());

        assert!(matches!(
            classify_discovery("https://example.com/new", "example.com", &config, &visited),
            Discovery::Accept(_)
        ));
        assert!(matches!(
            classify_discovery("https://other.example/", "example.com", &config, &visited),
            Discovery::Ignore
        ));
        assert!(matches!(
            classify_discovery("https://example.com/seen", "example.com", &config, &visited),
            Discovery::Ignore
        ));
    }

    #[test]
    fn discovery_applies_url_filter() {
        let config = crate::config::CrawlConfigBuilder::new()
            .seed_url("https://example.com")
            .url_filter(|url: &str| !url.contains("/admin/"))
            .build()
            .expect("config");
        let visited = HashSet::new();

        assert!(matches!(
            classify_discovery("https://example.com/admin/x", "example.com", &config, &visited),
            Discovery::Filtered
        ));
        assert!(matches!(
            classify_discovery("https://example.com/blog", "example.com", &config, &visited),
            Discovery::Accept(_)
        ));
    }
}
