//! Page-context security signal extraction and corpus summarization

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::scripts::SECURITY_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;

/// Per-page security posture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityMetrics {
    pub is_https: bool,
    /// http: subresources loaded from an https page
    pub mixed_content_count: u32,
    pub has_csp_meta: bool,
    pub insecure_form_actions: u32,
    /// `target="_blank"` anchors without noopener/noreferrer
    pub unsafe_cross_origin_links: u32,
    /// 0-100 heuristic score
    pub score: f64,
}

/// Corpus-level security summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecuritySummary {
    pub pages_evaluated: u64,
    pub https_pages: u64,
    pub https_pct: f64,
    pub total_mixed_content: u64,
    pub pages_with_csp: u64,
    pub total_insecure_form_actions: u64,
    pub avg_score: f64,
}

/// Shape returned by [`SECURITY_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
struct SecurityExtraction {
    #[serde(default)]
    is_https: bool,
    #[serde(default)]
    mixed_content_count: u32,
    #[serde(default)]
    has_csp_meta: bool,
    #[serde(default)]
    insecure_form_actions: u32,
    #[serde(default)]
    unsafe_cross_origin_links: u32,
}

pub struct SecurityPlugin;

impl SecurityPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn score(extraction: &SecurityExtraction) -> f64 {
        let mut score: f64 = 0.0;
        if extraction.is_https {
            score += 50.0;
        }
        if extraction.mixed_content_count == 0 {
            score += 20.0;
        }
        if extraction.has_csp_meta {
            score += 15.0;
        }
        if extraction.insecure_form_actions == 0 {
            score += 10.0;
        }
        if extraction.unsafe_cross_origin_links == 0 {
            score += 5.0;
        }
        score
    }
}

impl Default for SecurityPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricPlugin for SecurityPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Security
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        _load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(SECURITY_SCRIPT).await?;
        let extraction: SecurityExtraction =
            serde_json::from_value(value).context("failed to decode security extraction")?;

        let score = Self::score(&extraction);
        Ok(PageMetrics::Security(SecurityMetrics {
            is_https: extraction.is_https,
            mixed_content_count: extraction.mixed_content_count,
            has_csp_meta: extraction.has_csp_meta,
            insecure_form_actions: extraction.insecure_form_actions,
            unsafe_cross_origin_links: extraction.unsafe_cross_origin_links,
            score,
        }))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&SecurityMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::Security(s) => Some(s),
                _ => None,
            })
            .collect();

        let mut summary = SecuritySummary {
            pages_evaluated: pages.len() as u64,
            ..SecuritySummary::default()
        };
        if pages.is_empty() {
            return Ok(PluginSummary::Security(summary));
        }

        for page in &pages {
            if page.is_https {
                summary.https_pages += 1;
            }
            if page.has_csp_meta {
                summary.pages_with_csp += 1;
            }
            summary.total_mixed_content += u64::from(page.mixed_content_count);
            summary.total_insecure_form_actions += u64::from(page.insecure_form_actions);
            summary.avg_score += page.score;
        }
        summary.https_pct = summary.https_pages as f64 * 100.0 / pages.len() as f64;
        summary.avg_score /= pages.len() as f64;

        Ok(PluginSummary::Security(summary))
    }
}
