//! Link graph extraction and corpus summarization

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use super::scripts::LINKS_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;

/// Per-page anchor statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkMetrics {
    pub internal_links: u32,
    pub external_links: u32,
    pub nofollow_links: u32,
    /// Anchors with neither visible text nor an image alt
    pub empty_anchor_links: u32,
    pub external_domains: Vec<String>,
}

/// Corpus-level link summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkSummary {
    pub pages_evaluated: u64,
    pub total_internal_links: u64,
    pub total_external_links: u64,
    pub total_nofollow_links: u64,
    pub total_empty_anchor_links: u64,
    pub avg_internal_links_per_page: f64,
    pub unique_external_domains: u64,
}

pub struct LinksPlugin;

impl LinksPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinksPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricPlugin for LinksPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Links
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        _load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(LINKS_SCRIPT).await?;
        let metrics: LinkMetrics =
            serde_json::from_value(value).context("failed to decode link extraction")?;
        Ok(PageMetrics::Links(metrics))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&LinkMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::Links(l) => Some(l),
                _ => None,
            })
            .collect();

        let mut summary = LinkSummary {
            pages_evaluated: pages.len() as u64,
            ..LinkSummary::default()
        };
        if pages.is_empty() {
            return Ok(PluginSummary::Links(summary));
        }

        let mut domains: BTreeSet<&str> = BTreeSet::new();
        for page in &pages {
            summary.total_internal_links += u64::from(page.internal_links);
            summary.total_external_links += u64::from(page.external_links);
            summary.total_nofollow_links += u64::from(page.nofollow_links);
            summary.total_empty_anchor_links += u64::from(page.empty_anchor_links);
            domains.extend(page.external_domains.iter().map(String::as_str));
        }
        summary.avg_internal_links_per_page =
            summary.total_internal_links as f64 / pages.len() as f64;
        summary.unique_external_domains = domains.len() as u64;

        Ok(PluginSummary::Links(summary))
    }
}
