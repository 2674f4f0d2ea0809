//! Crawl job configuration
//!
//! `CrawlConfig` is immutable once a job is created; the typestate builder in
//! [`builder`] performs all validation up front.

pub mod builder;
pub mod types;

pub use builder::CrawlConfigBuilder;
pub use types::{
    AnalyticsCredentials, CrawlConfig, CrawlSpeed, DEFAULT_MAX_DEPTH, DEFAULT_PAGE_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, PluginSettings, SearchConsoleCredentials, UrlFilter,
};
