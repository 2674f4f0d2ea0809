//! Politeness plumbing against a stubbed HTTP origin

mod common;

use std::sync::{Arc, Mutex};
use url::Url;

use common::{PageSpec, StubBackend};
use sitescope::config::CrawlConfig;
use sitescope::engine::RobotsCache;
use sitescope::engine::sitemap::fetch_sitemap;
use sitescope::{CrawlOrchestrator, EngineEvent, JobStatus};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("client")
}

#[tokio::test]
async fn robots_rules_are_fetched_and_cached_per_origin() {
    let mut server = mockito::Server::new_async().await;
    let robots = server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body("User-agent: *\nDisallow: /private/\n")
        .expect(1)
        .create_async()
        .await;

    let cache = RobotsCache::new(client());
    let origin = Url::parse(&server.url()).expect("url");

    let rules = cache.rules_for(&origin).await;
    assert!(!rules.allows("/private/page"));
    assert!(rules.allows("/public"));

    // Second lookup for the same origin hits the cache.
    let again = cache.rules_for(&origin).await;
    assert!(!again.allows("/private/page"));
    robots.assert_async().await;
}

#[tokio::test]
async fn missing_robots_degrades_to_allow_all() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;

    let cache = RobotsCache::new(client());
    let origin = Url::parse(&server.url()).expect("url");

    let rules = cache.rules_for(&origin).await;
    assert!(rules.allows("/anything"));
}

#[tokio::test]
async fn sitemap_entries_are_extracted() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    server
        .mock("GET", "/sitemap.xml")
        .with_status(200)
        .with_body(format!(
            "<urlset><url><loc>{base}/</loc></url><url><loc>{base}/about</loc></url></urlset>"
        ))
        .create_async()
        .await;

    let urls = fetch_sitemap(&client(), &format!("{base}/sitemap.xml")).await;
    assert_eq!(urls, vec![format!("{base}/"), format!("{base}/about")]);
}

#[tokio::test]
async fn broken_sitemap_yields_no_entries() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/sitemap.xml")
        .with_status(500)
        .create_async()
        .await;

    let urls = fetch_sitemap(&client(), &format!("{}/sitemap.xml", server.url())).await;
    assert!(urls.is_empty());
}

#[tokio::test]
async fn crawl_proceeds_when_sitemap_and_robots_are_unavailable() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/sitemap.xml")
        .with_status(500)
        .create_async()
        .await;

    let seed = format!("{}/", server.url());
    let backend = StubBackend::new().with_page(&seed, PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let config = CrawlConfig::builder()
        .seed_url(&seed)
        .max_depth(1)
        .include_sitemap(true)
        .build()
        .expect("valid config");
    let job = orchestrator.create_job(config);
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    // Best-effort politeness: both lookups failed and the crawl still ran.
    assert_eq!(finished.progress.status, JobStatus::Completed);
    assert_eq!(finished.progress.pages_analyzed, 1);
}

#[tokio::test]
async fn failed_sitemap_leaves_the_page_estimate_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/sitemap.xml")
        .with_status(500)
        .create_async()
        .await;

    let seed = format!("{}/", server.url());
    let backend = StubBackend::new().with_page(&seed, PageSpec::ok());
    let orchestrator = Arc::new(CrawlOrchestrator::new(Arc::new(backend)));

    // The estimate counts sitemap discoveries, not the seed, so a failed
    // fetch leaves it at zero when the first page starts.
    let estimates: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&estimates);
    let reader = Arc::clone(&orchestrator);
    orchestrator.on(move |event| {
        if let EngineEvent::PageStart { job_id, .. } = event
            && let Ok(progress) = reader.get_progress(*job_id)
        {
            sink.lock().unwrap().push(progress.total_pages);
        }
    });

    let config = CrawlConfig::builder()
        .seed_url(&seed)
        .max_depth(1)
        .include_sitemap(true)
        .build()
        .expect("valid config");
    let job = orchestrator.create_job(config);
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    assert_eq!(estimates.lock().unwrap().first(), Some(&0));
    // Once the frontier drains the estimate becomes the attempted count.
    assert_eq!(finished.progress.total_pages, 1);
}

#[tokio::test]
async fn robots_disallowed_pages_are_skipped() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body("User-agent: *\nDisallow: /private/\n")
        .create_async()
        .await;

    let base = server.url();
    let seed = format!("{base}/");
    let backend = StubBackend::new()
        .with_page(
            &seed,
            PageSpec::ok().with_links(&[
                &format!("{base}/private/secret"),
                &format!("{base}/open"),
            ]),
        )
        .with_page(&format!("{base}/open"), PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let config = CrawlConfig::builder()
        .seed_url(&seed)
        .max_depth(1)
        .build()
        .expect("valid config");
    let job = orchestrator.create_job(config);
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    assert_eq!(finished.progress.status, JobStatus::Completed);
    assert_eq!(finished.progress.pages_analyzed, 2);
    assert_eq!(finished.progress.skipped_urls, 1);
}

#[tokio::test]
async fn sitemap_urls_join_the_frontier() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;
    let base = server.url();
    server
        .mock("GET", "/sitemap.xml")
        .with_status(200)
        .with_body(format!(
            "<urlset><url><loc>{base}/from-sitemap</loc></url></urlset>"
        ))
        .create_async()
        .await;

    let seed = format!("{base}/");
    let backend = StubBackend::new()
        .with_page(&seed, PageSpec::ok())
        .with_page(&format!("{base}/from-sitemap"), PageSpec::ok());
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    let config = CrawlConfig::builder()
        .seed_url(&seed)
        .max_depth(1)
        .include_sitemap(true)
        .build()
        .expect("valid config");
    let job = orchestrator.create_job(config);
    let finished = orchestrator
        .run_job_to_completion(job.id)
        .await
        .expect("job runs");

    assert_eq!(finished.progress.status, JobStatus::Completed);
    assert_eq!(finished.progress.pages_analyzed, 2);
}
