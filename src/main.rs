//! Command-line crawl runner
//!
//! Runs one job against a local chromium, streaming page events to stderr
//! and printing the final result as JSON on stdout.

use anyhow::{Result, anyhow, bail};
use std::sync::Arc;

use sitescope::config::{CrawlConfig, CrawlSpeed};
use sitescope::{ChromiumBackend, CrawlOrchestrator, EngineEvent, JobStatus};

const USAGE: &str = "usage: sitescope <seed-url> [--depth N] [--speed slow|medium|fast] \
                     [--sitemap] [--no-robots] [--headed]";

struct CliArgs {
    seed_url: String,
    depth: u8,
    speed: CrawlSpeed,
    include_sitemap: bool,
    respect_robots: bool,
    headed: bool,
}

fn parse_args(mut args: std::env::Args) -> Result<CliArgs> {
    args.next(); // program name

    let mut seed_url = None;
    let mut parsed = CliArgs {
        seed_url: String::new(),
        depth: 3,
        speed: CrawlSpeed::Medium,
        include_sitemap: false,
        respect_robots: true,
        headed: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--depth" => {
                let value = args.next().ok_or_else(|| anyhow!("--depth needs a value"))?;
                parsed.depth = value.parse()?;
            }
            "--speed" => {
                let value = args.next().ok_or_else(|| anyhow!("--speed needs a value"))?;
                parsed.speed = match value.as_str() {
                    "slow" => CrawlSpeed::Slow,
                    "medium" => CrawlSpeed::Medium,
                    "fast" => CrawlSpeed::Fast,
                    other => bail!("unknown speed tier '{other}'"),
                };
            }
            "--sitemap" => parsed.include_sitemap = true,
            "--no-robots" => parsed.respect_robots = false,
            "--headed" => parsed.headed = true,
            "--help" | "-h" => bail!("{USAGE}"),
            other if seed_url.is_none() && !other.starts_with('-') => {
                seed_url = Some(other.to_string());
            }
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }

    parsed.seed_url = seed_url.ok_or_else(|| anyhow!("{USAGE}"))?;
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args())?;
    let config = CrawlConfig::builder()
        .seed_url(args.seed_url)
        .max_depth(args.depth)
        .crawl_speed(args.speed)
        .include_sitemap(args.include_sitemap)
        .respect_robots_txt(args.respect_robots)
        .build()?;

    let backend = if args.headed {
        ChromiumBackend::new().with_headed()
    } else {
        ChromiumBackend::new()
    };
    let orchestrator = CrawlOrchestrator::new(Arc::new(backend));

    orchestrator.on(|event| match event {
        EngineEvent::PageComplete {
            url,
            http_status,
            load_time_ms,
            ..
        } => eprintln!("{http_status} {url} ({load_time_ms}ms)"),
        EngineEvent::PageError { url, error, .. } => eprintln!("FAIL {url}: {error}"),
        EngineEvent::JobComplete {
            total_pages,
            duration_ms,
            ..
        } => eprintln!("done: {total_pages} pages in {duration_ms}ms"),
        _ => {}
    });

    let job = orchestrator.create_job(config);
    let finished = orchestrator.run_job_to_completion(job.id).await?;
    orchestrator.shutdown().await;

    if finished.progress.status != JobStatus::Completed {
        bail!(
            "crawl failed: {}",
            finished.progress.error.as_deref().unwrap_or("unknown error")
        );
    }
    let result = finished
        .result
        .ok_or_else(|| anyhow!("completed job has no result"))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
