//! Core configuration types for crawl jobs
//!
//! This module contains the main `CrawlConfig` struct and its associated types
//! that define the parameters for a website-analysis crawl.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default maximum crawl depth: 3 levels from the seed URL
pub const DEFAULT_MAX_DEPTH: u8 = 3;

/// Default `page.goto()` timeout in seconds
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Default timeout for individual backend requests (script evaluation,
/// header updates) in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Crawl speed tier, mapped to a requests-per-minute ceiling
///
/// The tier bounds how fast the crawl session issues page navigations;
/// the engine enforces it with a per-session rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlSpeed {
    Slow,
    Medium,
    Fast,
}

impl CrawlSpeed {
    /// Requests-per-minute ceiling for this tier
    #[must_use]
    pub const fn requests_per_minute(self) -> u32 {
        match self {
            Self::Slow => 30,
            Self::Medium => 60,
            Self::Fast => 120,
        }
    }
}

impl Default for CrawlSpeed {
    fn default() -> Self {
        Self::Medium
    }
}

/// URL-acceptance predicate applied to discovered links
///
/// Links rejected by the predicate are counted as skipped and never join
/// the frontier. The closure must be cheap; it runs once per discovered URL.
#[derive(Clone)]
pub struct UrlFilter(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl UrlFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Whether the predicate accepts the URL
    #[must_use]
    pub fn accepts(&self, url: &str) -> bool {
        (self.0)(url)
    }
}

impl fmt::Debug for UrlFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UrlFilter(..)")
    }
}

/// Credentials for the Google Analytics integration plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsCredentials {
    pub property_id: String,
    pub api_secret: String,
}

/// Credentials for the Search Console integration plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConsoleCredentials {
    pub site_url: String,
    pub api_key: String,
}

/// Enabled plugin set plus credentials for the third-party integrations
///
/// The six first-party plugins are on by default. The integration plugins
/// are off by default and fail soft when their credentials are missing or
/// their backing client cannot be constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    pub seo: bool,
    pub links: bool,
    pub performance: bool,
    pub security: bool,
    pub mobile: bool,
    pub content: bool,
    pub analytics: bool,
    pub search_console: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_credentials: Option<AnalyticsCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_console_credentials: Option<SearchConsoleCredentials>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            seo: true,
            links: true,
            performance: true,
            security: true,
            mobile: true,
            content: true,
            analytics: false,
            search_console: false,
            analytics_credentials: None,
            search_console_credentials: None,
        }
    }
}

/// Immutable configuration for one crawl job
///
/// Built through [`CrawlConfig::builder`]; validation happens at build time
/// so malformed input surfaces to the caller before a job is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub(crate) seed_url: String,
    pub(crate) max_depth: u8,
    pub(crate) crawl_speed: CrawlSpeed,
    pub(crate) page_timeout_secs: u64,
    pub(crate) request_timeout_secs: u64,
    pub(crate) custom_headers: HashMap<String, String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) respect_robots_txt: bool,
    pub(crate) include_sitemap: bool,
    pub(crate) sitemap_url: Option<String>,
    #[serde(skip)]
    pub(crate) url_filter: Option<UrlFilter>,
    pub(crate) plugins: PluginSettings,
}

impl CrawlConfig {
    #[must_use]
    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    #[must_use]
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    #[must_use]
    pub fn crawl_speed(&self) -> CrawlSpeed {
        self.crawl_speed
    }

    #[must_use]
    pub fn page_timeout_secs(&self) -> u64 {
        self.page_timeout_secs
    }

    #[must_use]
    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    #[must_use]
    pub fn custom_headers(&self) -> &HashMap<String, String> {
        &self.custom_headers
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    #[must_use]
    pub fn respect_robots_txt(&self) -> bool {
        self.respect_robots_txt
    }

    #[must_use]
    pub fn include_sitemap(&self) -> bool {
        self.include_sitemap
    }

    #[must_use]
    pub fn sitemap_url(&self) -> Option<&str> {
        self.sitemap_url.as_deref()
    }

    #[must_use]
    pub fn url_filter(&self) -> Option<&UrlFilter> {
        self.url_filter.as_ref()
    }

    #[must_use]
    pub fn plugins(&self) -> &PluginSettings {
        &self.plugins
    }

    /// Whether the URL passes the acceptance predicate (no predicate accepts all)
    #[must_use]
    pub fn accepts_url(&self, url: &str) -> bool {
        self.url_filter.as_ref().is_none_or(|f| f.accepts(url))
    }
}
