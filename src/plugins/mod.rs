//! Metric plugins
//!
//! A plugin is a self-contained extractor/summarizer for one analysis
//! dimension: it evaluates a loaded page into a typed per-page metric and
//! reduces the collected pages into a corpus-level summary. The roster is a
//! closed set (`PluginKind`); per-page and corpus outputs are tagged unions
//! so contributions merge into `PageAnalysis`/`CrawlSummary` without key
//! collisions by construction.

pub mod analytics;
pub mod content;
pub mod links;
pub mod mobile;
pub mod performance;
pub mod pipeline;
pub mod scripts;
pub mod search_console;
pub mod security;
pub mod seo;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::browser::BrowserPage;
use crate::config::PluginSettings;

pub use analytics::{AnalyticsMetrics, AnalyticsPlugin, AnalyticsSummary};
pub use content::{ContentMetrics, ContentPlugin, ContentSummary};
pub use links::{LinkMetrics, LinkSummary, LinksPlugin};
pub use mobile::{MobileMetrics, MobilePlugin, MobileSummary};
pub use performance::{PerformanceMetrics, PerformancePlugin, PerformanceSummary};
pub use pipeline::PluginPipeline;
pub use search_console::{SearchConsoleMetrics, SearchConsolePlugin, SearchConsoleSummary};
pub use security::{SecurityMetrics, SecurityPlugin, SecuritySummary};
pub use seo::{SeoMetrics, SeoPlugin, SeoSummary};

/// The closed set of known plugin kinds
///
/// Each kind owns exactly one named field in `PageAnalysis` and
/// `CrawlSummary`; the name doubles as the field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Seo,
    Links,
    Performance,
    Security,
    Mobile,
    Content,
    Analytics,
    SearchConsole,
}

impl PluginKind {
    pub const ALL: [PluginKind; 8] = [
        Self::Seo,
        Self::Links,
        Self::Performance,
        Self::Security,
        Self::Mobile,
        Self::Content,
        Self::Analytics,
        Self::SearchConsole,
    ];

    /// The field name this plugin owns in merged records
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Seo => "seo",
            Self::Links => "links",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Mobile => "mobile",
            Self::Content => "content",
            Self::Analytics => "analytics",
            Self::SearchConsole => "search_console",
        }
    }
}

/// Per-page output of one plugin, tagged by kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMetrics {
    Seo(SeoMetrics),
    Links(LinkMetrics),
    Performance(PerformanceMetrics),
    Security(SecurityMetrics),
    Mobile(MobileMetrics),
    Content(ContentMetrics),
    Analytics(AnalyticsMetrics),
    SearchConsole(SearchConsoleMetrics),
}

impl PageMetrics {
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        match self {
            Self::Seo(_) => PluginKind::Seo,
            Self::Links(_) => PluginKind::Links,
            Self::Performance(_) => PluginKind::Performance,
            Self::Security(_) => PluginKind::Security,
            Self::Mobile(_) => PluginKind::Mobile,
            Self::Content(_) => PluginKind::Content,
            Self::Analytics(_) => PluginKind::Analytics,
            Self::SearchConsole(_) => PluginKind::SearchConsole,
        }
    }

    /// Empty metrics for the kind; a failing plugin contributes this instead
    /// of an error
    #[must_use]
    pub fn default_for(kind: PluginKind) -> Self {
        match kind {
            PluginKind::Seo => Self::Seo(SeoMetrics::default()),
            PluginKind::Links => Self::Links(LinkMetrics::default()),
            PluginKind::Performance => Self::Performance(PerformanceMetrics::default()),
            PluginKind::Security => Self::Security(SecurityMetrics::default()),
            PluginKind::Mobile => Self::Mobile(MobileMetrics::default()),
            PluginKind::Content => Self::Content(ContentMetrics::default()),
            PluginKind::Analytics => Self::Analytics(AnalyticsMetrics::default()),
            PluginKind::SearchConsole => Self::SearchConsole(SearchConsoleMetrics::default()),
        }
    }
}

/// Corpus-level output of one plugin, tagged by kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginSummary {
    Seo(SeoSummary),
    Links(LinkSummary),
    Performance(PerformanceSummary),
    Security(SecuritySummary),
    Mobile(MobileSummary),
    Content(ContentSummary),
    Analytics(AnalyticsSummary),
    SearchConsole(SearchConsoleSummary),
}

impl PluginSummary {
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        match self {
            Self::Seo(_) => PluginKind::Seo,
            Self::Links(_) => PluginKind::Links,
            Self::Performance(_) => PluginKind::Performance,
            Self::Security(_) => PluginKind::Security,
            Self::Mobile(_) => PluginKind::Mobile,
            Self::Content(_) => PluginKind::Content,
            Self::Analytics(_) => PluginKind::Analytics,
            Self::SearchConsole(_) => PluginKind::SearchConsole,
        }
    }
}

/// The merged per-page record: base navigation facts plus one optional field
/// per plugin kind
///
/// A disabled plugin's field stays `None` and is omitted from serialized
/// output entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// URL as requested from the frontier
    pub url: String,
    /// URL the navigation settled on
    pub final_url: String,
    pub http_status: u16,
    pub redirect_chain: Vec<String>,
    pub depth: u32,
    pub load_time_ms: u64,
    pub fetched_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_console: Option<SearchConsoleMetrics>,
}

impl PageAnalysis {
    /// Start a record from the base navigation facts; plugin fields are
    /// filled in by the pipeline
    #[must_use]
    pub fn new(
        url: String,
        navigation: &crate::browser::NavigationResult,
        depth: u32,
        load_time: Duration,
    ) -> Self {
        Self {
            url,
            final_url: navigation.final_url.clone(),
            http_status: navigation.http_status,
            redirect_chain: navigation.redirect_chain.clone(),
            depth,
            load_time_ms: load_time.as_millis() as u64,
            fetched_at: Utc::now(),
            seo: None,
            links: None,
            performance: None,
            security: None,
            mobile: None,
            content: None,
            analytics: None,
            search_console: None,
        }
    }

    /// Merge one plugin's output into its owned field
    pub fn merge(&mut self, metrics: PageMetrics) {
        match metrics {
            PageMetrics::Seo(m) => self.seo = Some(m),
            PageMetrics::Links(m) => self.links = Some(m),
            PageMetrics::Performance(m) => self.performance = Some(m),
            PageMetrics::Security(m) => self.security = Some(m),
            PageMetrics::Mobile(m) => self.mobile = Some(m),
            PageMetrics::Content(m) => self.content = Some(m),
            PageMetrics::Analytics(m) => self.analytics = Some(m),
            PageMetrics::SearchConsole(m) => self.search_console = Some(m),
        }
    }

    /// Project this page's contribution for one plugin kind, if present
    ///
    /// Summarization passes plugins only their own projection, so no plugin
    /// ever sees another plugin's data.
    #[must_use]
    pub fn project(&self, kind: PluginKind) -> Option<PageMetrics> {
        match kind {
            PluginKind::Seo => self.seo.clone().map(PageMetrics::Seo),
            PluginKind::Links => self.links.clone().map(PageMetrics::Links),
            PluginKind::Performance => self.performance.clone().map(PageMetrics::Performance),
            PluginKind::Security => self.security.clone().map(PageMetrics::Security),
            PluginKind::Mobile => self.mobile.clone().map(PageMetrics::Mobile),
            PluginKind::Content => self.content.clone().map(PageMetrics::Content),
            PluginKind::Analytics => self.analytics.clone().map(PageMetrics::Analytics),
            PluginKind::SearchConsole => {
                self.search_console.clone().map(PageMetrics::SearchConsole)
            }
        }
    }
}

/// Job-wide aggregation: one optional sub-object per enabled plugin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecuritySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_console: Option<SearchConsoleSummary>,
}

impl CrawlSummary {
    /// Merge one plugin's summary into its owned field
    pub fn merge(&mut self, summary: PluginSummary) {
        match summary {
            PluginSummary::Seo(s) => self.seo = Some(s),
            PluginSummary::Links(s) => self.links = Some(s),
            PluginSummary::Performance(s) => self.performance = Some(s),
            PluginSummary::Security(s) => self.security = Some(s),
            PluginSummary::Mobile(s) => self.mobile = Some(s),
            PluginSummary::Content(s) => self.content = Some(s),
            PluginSummary::Analytics(s) => self.analytics = Some(s),
            PluginSummary::SearchConsole(s) => self.search_console = Some(s),
        }
    }

    /// Whether the summary carries a contribution for the kind
    #[must_use]
    pub fn contains(&self, kind: PluginKind) -> bool {
        match kind {
            PluginKind::Seo => self.seo.is_some(),
            PluginKind::Links => self.links.is_some(),
            PluginKind::Performance => self.performance.is_some(),
            PluginKind::Security => self.security.is_some(),
            PluginKind::Mobile => self.mobile.is_some(),
            PluginKind::Content => self.content.is_some(),
            PluginKind::Analytics => self.analytics.is_some(),
            PluginKind::SearchConsole => self.search_console.is_some(),
        }
    }
}

/// Capability contract every metric plugin implements
///
/// `evaluate_page` runs concurrently with its siblings against the same
/// loaded page; `summarize` must be a pure function of the projection it is
/// handed, so re-running it over unchanged pages yields identical output.
#[async_trait]
pub trait MetricPlugin: Send + Sync {
    fn kind(&self) -> PluginKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// One-time setup before the plugin is first used
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Hook invoked once per job before navigation begins
    async fn before_crawl(&self) -> Result<()> {
        Ok(())
    }

    /// Extract this plugin's metrics from a loaded page
    async fn evaluate_page(&self, page: &dyn BrowserPage, load_time: Duration)
    -> Result<PageMetrics>;

    /// Reduce the per-page projection into a corpus summary
    ///
    /// `metrics` contains only this plugin's own entries, one per page that
    /// carried a contribution, in crawl discovery order.
    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary>;

    /// Hook invoked once per job after the frontier is exhausted
    async fn after_crawl(&self) -> Result<()> {
        Ok(())
    }

    /// Release any resources the plugin holds
    async fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

/// Construct the enabled plugin set for a job
#[must_use]
pub fn build_plugins(settings: &PluginSettings) -> Vec<Arc<dyn MetricPlugin>> {
    let mut plugins: Vec<Arc<dyn MetricPlugin>> = Vec::new();
    if settings.seo {
        plugins.push(Arc::new(SeoPlugin::new()));
    }
    if settings.links {
        plugins.push(Arc::new(LinksPlugin::new()));
    }
    if settings.performance {
        plugins.push(Arc::new(PerformancePlugin::new()));
    }
    if settings.security {
        plugins.push(Arc::new(SecurityPlugin::new()));
    }
    if settings.mobile {
        plugins.push(Arc::new(MobilePlugin::new()));
    }
    if settings.content {
        plugins.push(Arc::new(ContentPlugin::new()));
    }
    if settings.analytics {
        plugins.push(Arc::new(AnalyticsPlugin::new(
            settings.analytics_credentials.clone(),
        )));
    }
    if settings.search_console {
        plugins.push(Arc::new(SearchConsolePlugin::new(
            settings.search_console_credentials.clone(),
        )));
    }
    plugins
}
