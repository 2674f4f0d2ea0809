//! Type-safe builder for `CrawlConfig` using the typestate pattern
//!
//! The seed URL is the only required field; the type parameter guarantees at
//! compile time that `build()` is unavailable until it has been provided.
//! `build()` validates the seed (and sitemap URL, when present) so that
//! configuration errors surface synchronously, before a job exists.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::marker::PhantomData;
use url::Url;

use super::types::{
    AnalyticsCredentials, CrawlConfig, CrawlSpeed, DEFAULT_MAX_DEPTH, DEFAULT_PAGE_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, PluginSettings, SearchConsoleCredentials, UrlFilter,
};

/// Typestate marker: the seed URL has been provided
pub struct WithSeedUrl;

pub struct CrawlConfigBuilder<State = ()> {
    seed_url: Option<String>,
    max_depth: u8,
    crawl_speed: CrawlSpeed,
    page_timeout_secs: u64,
    request_timeout_secs: u64,
    custom_headers: HashMap<String, String>,
    user_agent: Option<String>,
    respect_robots_txt: bool,
    include_sitemap: bool,
    sitemap_url: Option<String>,
    url_filter: Option<UrlFilter>,
    plugins: PluginSettings,
    _phantom: PhantomData<State>,
}

impl Default for CrawlConfigBuilder<()> {
    fn default() -> Self {
        Self {
            seed_url: None,
            max_depth: DEFAULT_MAX_DEPTH,
            crawl_speed: CrawlSpeed::default(),
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            custom_headers: HashMap::new(),
            user_agent: None,
            respect_robots_txt: true,
            include_sitemap: false,
            sitemap_url: None,
            url_filter: None,
            plugins: PluginSettings::default(),
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfig {
    /// Create a builder for configuring a `CrawlConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder<()> {
        CrawlConfigBuilder::default()
    }
}

impl CrawlConfigBuilder<()> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the seed URL the crawl starts from
    ///
    /// A bare hostname is normalized to `https://`.
    pub fn seed_url(self, url: impl Into<String>) -> CrawlConfigBuilder<WithSeedUrl> {
        let url_string = url.into();
        let normalized = if url_string.starts_with("http://") || url_string.starts_with("https://")
        {
            url_string
        } else {
            format!("https://{url_string}")
        };

        CrawlConfigBuilder {
            seed_url: Some(normalized),
            max_depth: self.max_depth,
            crawl_speed: self.crawl_speed,
            page_timeout_secs: self.page_timeout_secs,
            request_timeout_secs: self.request_timeout_secs,
            custom_headers: self.custom_headers,
            user_agent: self.user_agent,
            respect_robots_txt: self.respect_robots_txt,
            include_sitemap: self.include_sitemap,
            sitemap_url: self.sitemap_url,
            url_filter: self.url_filter,
            plugins: self.plugins,
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfigBuilder<WithSeedUrl> {
    /// Validate the configuration and produce an immutable `CrawlConfig`
    ///
    /// # Errors
    ///
    /// Returns an error if the seed URL (or the sitemap URL, when set) is not
    /// an absolute http(s) URL.
    pub fn build(self) -> Result<CrawlConfig> {
        let seed_url = self.seed_url.ok_or_else(|| anyhow!("seed_url is required"))?;

        let parsed = Url::parse(&seed_url).map_err(|e| anyhow!("invalid seed URL '{seed_url}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "seed URL '{seed_url}' must use the http or https scheme"
            ));
        }

        if let Some(ref sitemap) = self.sitemap_url {
            Url::parse(sitemap).map_err(|e| anyhow!("invalid sitemap URL '{sitemap}': {e}"))?;
        }

        Ok(CrawlConfig {
            seed_url,
            max_depth: self.max_depth,
            crawl_speed: self.crawl_speed,
            page_timeout_secs: self.page_timeout_secs,
            request_timeout_secs: self.request_timeout_secs,
            custom_headers: self.custom_headers,
            user_agent: self.user_agent,
            respect_robots_txt: self.respect_robots_txt,
            include_sitemap: self.include_sitemap,
            sitemap_url: self.sitemap_url,
            url_filter: self.url_filter,
            plugins: self.plugins,
        })
    }
}

// Optional knobs, available in any builder state
impl<State> CrawlConfigBuilder<State> {
    /// Maximum link depth to follow from the seed URL
    #[must_use]
    pub fn max_depth(mut self, depth: u8) -> Self {
        self.max_depth = depth;
        self
    }

    /// Crawl speed tier (requests-per-minute ceiling)
    #[must_use]
    pub fn crawl_speed(mut self, speed: CrawlSpeed) -> Self {
        self.crawl_speed = speed;
        self
    }

    /// Timeout for a single page navigation
    #[must_use]
    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.page_timeout_secs = secs;
        self
    }

    /// Timeout for individual backend requests within a page visit
    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Add a custom header sent with every page navigation
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    /// Replace the full custom header map
    #[must_use]
    pub fn custom_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.custom_headers = headers;
        self
    }

    /// Custom user-agent string for page navigations
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Whether to fetch and honor robots.txt for the seed origin (default: true)
    #[must_use]
    pub fn respect_robots_txt(mut self, respect: bool) -> Self {
        self.respect_robots_txt = respect;
        self
    }

    /// Whether to fetch the sitemap and seed the total-page estimate (default: false)
    #[must_use]
    pub fn include_sitemap(mut self, include: bool) -> Self {
        self.include_sitemap = include;
        self
    }

    /// Explicit sitemap URL; defaults to `<origin>/sitemap.xml` when unset
    #[must_use]
    pub fn sitemap_url(mut self, url: impl Into<String>) -> Self {
        self.sitemap_url = Some(url.into());
        self
    }

    /// URL-acceptance predicate applied to discovered links
    #[must_use]
    pub fn url_filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.url_filter = Some(UrlFilter::new(predicate));
        self
    }

    /// Replace the enabled plugin set
    #[must_use]
    pub fn plugins(mut self, plugins: PluginSettings) -> Self {
        self.plugins = plugins;
        self
    }

    /// Enable the analytics integration plugin with its credentials
    #[must_use]
    pub fn analytics(mut self, credentials: AnalyticsCredentials) -> Self {
        self.plugins.analytics = true;
        self.plugins.analytics_credentials = Some(credentials);
        self
    }

    /// Enable the Search Console integration plugin with its credentials
    #[must_use]
    pub fn search_console(mut self, credentials: SearchConsoleCredentials) -> Self {
        self.plugins.search_console = true;
        self.plugins.search_console_credentials = Some(credentials);
        self
    }
}
