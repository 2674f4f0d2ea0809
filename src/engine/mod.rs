//! Crawl engine: orchestration, sessions, pacing, and politeness

pub mod executor;
pub mod orchestrator;
pub mod rate_limiter;
pub mod robots;
pub mod session;
pub mod sitemap;

pub use orchestrator::CrawlOrchestrator;
pub use rate_limiter::{RateLimitDecision, RequestRateLimiter};
pub use robots::{RobotsCache, RobotsRules};
pub use session::{CrawlSession, SessionManager};
