//! Plugin pipeline
//!
//! Drives the enabled plugin set through its lifecycle: hooks, concurrent
//! per-page evaluation, and corpus summarization. A plugin failure is scoped
//! to that plugin's contribution and never aborts the page or the job.

use futures::future::join_all;
use log::warn;
use std::sync::Arc;
use std::time::Duration;

use super::{CrawlSummary, MetricPlugin, PageAnalysis, PageMetrics, build_plugins};
use crate::browser::BrowserPage;
use crate::config::PluginSettings;

pub struct PluginPipeline {
    plugins: Vec<Arc<dyn MetricPlugin>>,
}

impl PluginPipeline {
    #[must_use]
    pub fn new(plugins: Vec<Arc<dyn MetricPlugin>>) -> Self {
        Self { plugins }
    }

    #[must_use]
    pub fn from_settings(settings: &PluginSettings) -> Self {
        Self::new(build_plugins(settings))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run one-time setup on every plugin; failures are logged and the
    /// plugin keeps its slot (it degrades to default metrics per page)
    pub async fn initialize(&self) {
        for plugin in &self.plugins {
            if let Err(err) = plugin.initialize().await {
                warn!("plugin {} failed to initialize: {err:#}", plugin.name());
            }
        }
    }

    pub async fn before_crawl(&self) {
        for plugin in &self.plugins {
            if let Err(err) = plugin.before_crawl().await {
                warn!("plugin {} before_crawl failed: {err:#}", plugin.name());
            }
        }
    }

    /// Evaluate all plugins concurrently against one loaded page and merge
    /// their outputs into `analysis`
    ///
    /// A failing plugin contributes its kind's default metrics, so the page
    /// record always carries one entry per enabled plugin.
    pub async fn evaluate_page(
        &self,
        analysis: &mut PageAnalysis,
        page: &dyn BrowserPage,
        load_time: Duration,
    ) {
        let evaluations = self
            .plugins
            .iter()
            .map(|plugin| async move { (plugin.kind(), plugin.evaluate_page(page, load_time).await) });

        for (kind, outcome) in join_all(evaluations).await {
            match outcome {
                Ok(metrics) => analysis.merge(metrics),
                Err(err) => {
                    warn!(
                        "plugin {} failed on {}: {err:#}",
                        kind.name(),
                        analysis.url
                    );
                    analysis.merge(PageMetrics::default_for(kind));
                }
            }
        }
    }

    /// Reduce the collected pages into a corpus summary
    ///
    /// Each plugin sees only its own projection of the pages. A failing
    /// summarizer is omitted from the output rather than failing the job,
    /// and re-running over unchanged pages yields identical output.
    #[must_use]
    pub fn summarize(&self, pages: &[PageAnalysis]) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        for plugin in &self.plugins {
            let projection: Vec<PageMetrics> = pages
                .iter()
                .filter_map(|page| page.project(plugin.kind()))
                .collect();
            match plugin.summarize(&projection) {
                Ok(contribution) => summary.merge(contribution),
                Err(err) => {
                    warn!("plugin {} failed to summarize: {err:#}", plugin.name());
                }
            }
        }
        summary
    }

    pub async fn after_crawl(&self) {
        for plugin in &self.plugins {
            if let Err(err) = plugin.after_crawl().await {
                warn!("plugin {} after_crawl failed: {err:#}", plugin.name());
            }
        }
    }

    pub async fn destroy(&self) {
        for plugin in &self.plugins {
            if let Err(err) = plugin.destroy().await {
                warn!("plugin {} failed to shut down: {err:#}", plugin.name());
            }
        }
    }
}
