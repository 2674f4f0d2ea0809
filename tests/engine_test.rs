//! End-to-end job scenarios against the stub backend

mod common;

use std::sync::{Arc, Mutex};

use common::{PageSpec, StubBackend};
use sitescope::config::CrawlConfig;
use sitescope::{CrawlOrchestrator, EngineError, JobStatus};

fn config(seed: &str) -> CrawlConfig {
    CrawlConfig::builder()
        .seed_url(seed)
        .max_depth(2)
        .respect_robots_txt(false)
        .build()
        .expect("valid config")
}

#[tokio::test(start_paused = true)]
async fn single_page_crawl_completes() {
    let backend = StubBackend::new().with_page("https://site.test/", PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    assert_eq!(job.progress.status, JobStatus::Queued);

    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    assert_eq!(finished.progress.status, JobStatus::Completed);
    assert_eq!(finished.progress.pages_analyzed, 1);
    assert_eq!(finished.progress.total_pages, 1);
    assert_eq!(finished.progress.failed_urls, 0);
    assert!(finished.progress.started_at.is_some());
    assert!(finished.progress.ended_at.is_some());

    let result = finished.result.expect("result");
    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].http_status, 200);
    // Every enabled plugin contributed, by extraction or by default.
    assert!(result.pages[0].seo.is_some());
    assert!(result.pages[0].links.is_some());
    assert!(result.summary.seo.is_some());
}

#[tokio::test(start_paused = true)]
async fn discovered_links_grow_the_frontier_within_depth() {
    let backend = StubBackend::new()
        .with_page(
            "https://site.test/",
            PageSpec::ok().with_links(&[
                "https://site.test/a",
                "https://site.test/a#section",
                "https://other.test/offsite",
            ]),
        )
        .with_page(
            "https://site.test/a",
            PageSpec::ok().with_links(&["https://site.test/", "https://site.test/b"]),
        )
        .with_page("https://site.test/b", PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    // Seed, /a, /b; the fragment variant deduplicates and the off-site
    // link is ignored.
    assert_eq!(finished.progress.status, JobStatus::Completed);
    assert_eq!(finished.progress.pages_analyzed, 3);
    assert_eq!(finished.progress.unique_urls, 3);
}

#[tokio::test(start_paused = true)]
async fn url_filter_rejections_count_as_skipped() {
    let backend = StubBackend::new()
        .with_page(
            "https://site.test/",
            PageSpec::ok().with_links(&["https://site.test/keep", "https://site.test/admin/x"]),
        )
        .with_page("https://site.test/keep", PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let config = CrawlConfig::builder()
        .seed_url("https://site.test/")
        .max_depth(2)
        .respect_robots_txt(false)
        .url_filter(|url: &str| !url.contains("/admin/"))
        .build()
        .expect("valid config");
    let job = orchestrator.create_job(config);
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    assert_eq!(finished.progress.pages_analyzed, 2);
    assert_eq!(finished.progress.skipped_urls, 1);
}

#[tokio::test(start_paused = true)]
async fn page_failure_is_recorded_and_the_crawl_continues() {
    let backend = StubBackend::new()
        .with_page(
            "https://site.test/",
            PageSpec::ok().with_links(&["https://site.test/broken", "https://site.test/fine"]),
        )
        .with_page("https://site.test/broken", PageSpec::failing("renderer exploded"))
        .with_page("https://site.test/fine", PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    // Page failures never fail the job.
    assert_eq!(finished.progress.status, JobStatus::Completed);
    assert_eq!(finished.progress.pages_analyzed, 2);
    assert_eq!(finished.progress.failed_urls, 1);

    let result = finished.result.expect("result");
    assert_eq!(result.errors.total_errors, 1);
    assert_eq!(result.errors.errors[0].url, "https://site.test/broken");
    assert_eq!(result.pages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn retryable_failures_get_the_retry_budget() {
    let backend = StubBackend::new()
        .with_page("https://site.test/", PageSpec::failing("connection refused"));
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    assert_eq!(job.max_retries, 3);
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    assert_eq!(finished.progress.status, JobStatus::Completed);
    assert_eq!(finished.progress.failed_urls, 1);
    let result = finished.result.expect("result");
    assert_eq!(result.errors.errors[0].kind, sitescope::jobs::FailureKind::Network);
}

#[tokio::test(start_paused = true)]
async fn session_launch_failure_fails_the_job() {
    let backend = StubBackend::failing_to_launch("no browser available");
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("terminal state is reachable");

    assert_eq!(finished.progress.status, JobStatus::Failed);
    let error = finished.progress.error.expect("job error");
    assert!(error.contains("no browser available"), "got: {error}");
}

#[tokio::test(start_paused = true)]
async fn starting_a_non_queued_job_is_rejected() {
    let backend = StubBackend::new().with_page("https://site.test/", PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    match orchestrator.run_job_to_completion(job.id).await {
        Err(EngineError::InvalidTransition { status, .. }) => {
            assert_eq!(status, JobStatus::Completed);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn events_bracket_the_job_in_order() {
    let backend = StubBackend::new().with_page(
        "https://site.test/",
        PageSpec::ok().with_links(&["https://site.test/a"]),
    );
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    orchestrator.on(move |event| sink.lock().unwrap().push(event.name().to_string()));

    let job = orchestrator.create_job(config("https://site.test/"));
    orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    let events = events.lock().unwrap();
    assert_eq!(events.first().map(String::as_str), Some("job_start"));
    assert!(events.iter().any(|name| name == "page_start"));
    assert!(events.iter().any(|name| name == "page_complete"));
    // The terminal event closes the stream; the final progress snapshot
    // goes out immediately before it, never after.
    assert_eq!(events.last().map(String::as_str), Some("job_complete"));
    assert_eq!(events[events.len() - 2], "progress");
}

#[tokio::test(start_paused = true)]
async fn stored_summary_keeps_pace_with_analyzed_pages() {
    let backend = StubBackend::new()
        .with_page(
            "https://site.test/",
            PageSpec::ok().with_links(&["https://site.test/a", "https://site.test/b"]),
        )
        .with_page("https://site.test/a", PageSpec::ok())
        .with_page("https://site.test/b", PageSpec::ok());
    let orchestrator = Arc::new(CrawlOrchestrator::new(Arc::new(backend)));

    // A reader reacting to progress must find a stored summary covering
    // every page analyzed so far, including mid-crawl.
    let observations: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observations);
    let reader = Arc::clone(&orchestrator);
    orchestrator.on(move |event| {
        if let sitescope::EngineEvent::Progress { job_id, progress, .. } = event
            && progress.pages_analyzed >= 1
        {
            let consistent = reader
                .get_job(*job_id)
                .ok()
                .and_then(|job| job.result)
                .is_some_and(|result| {
                    result.pages.len() as u64 == progress.pages_analyzed
                        && result.summary.seo.is_some()
                });
            sink.lock().unwrap().push(consistent);
        }
    });

    let job = orchestrator.create_job(config("https://site.test/"));
    orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    let observations = observations.lock().unwrap();
    // Three pages means at least two genuinely mid-crawl snapshots.
    assert!(observations.len() >= 3, "got {} snapshots", observations.len());
    assert!(observations.iter().all(|ok| *ok));
}

#[tokio::test(start_paused = true)]
async fn one_session_and_one_page_at_a_time() {
    let backend = StubBackend::new()
        .with_page(
            "https://site.test/",
            PageSpec::ok().with_links(&["https://site.test/a", "https://site.test/b"]),
        )
        .with_page("https://site.test/a", PageSpec::ok())
        .with_page("https://site.test/b", PageSpec::ok());
    let probe = backend.clone();
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    assert_eq!(probe.launches(), 1);
    assert_eq!(probe.max_open_pages(), 1);
    assert_eq!(orchestrator.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn progress_reads_work_while_running_and_after() {
    let backend = StubBackend::new().with_page("https://site.test/", PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let job = orchestrator.create_job(config("https://site.test/"));
    let progress = orchestrator.get_progress(job.id).expect("progress");
    assert_eq!(progress.status, JobStatus::Queued);

    let started = orchestrator.start_job(job.id).expect("start");
    assert_eq!(started.progress.status, JobStatus::Running);

    // Poll the registry until the spawned worker reaches a terminal state.
    loop {
        let progress = orchestrator.get_progress(job.id).expect("progress");
        if progress.status.is_terminal() {
            assert_eq!(progress.status, JobStatus::Completed);
            assert_eq!(progress.pages_analyzed, 1);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
