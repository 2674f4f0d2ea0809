//! Navigation-timing extraction and corpus summarization

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::scripts::PERFORMANCE_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;

/// Per-page timing and resource facts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Wall-clock navigation time measured by the engine
    pub load_time_ms: u64,
    pub ttfb_ms: f64,
    pub dom_content_loaded_ms: f64,
    pub load_event_ms: f64,
    pub first_contentful_paint_ms: f64,
    pub resource_count: u32,
    pub transfer_size_bytes: u64,
    /// 0-100 heuristic score over load time and page weight
    pub score: f64,
}

/// Corpus-level performance summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub pages_evaluated: u64,
    pub avg_load_time_ms: f64,
    pub max_load_time_ms: u64,
    pub avg_ttfb_ms: f64,
    pub avg_resource_count: f64,
    pub total_transfer_size_bytes: u64,
    pub avg_score: f64,
}

/// Shape returned by [`PERFORMANCE_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
struct PerformanceExtraction {
    #[serde(default)]
    ttfb_ms: f64,
    #[serde(default)]
    dom_content_loaded_ms: f64,
    #[serde(default)]
    load_event_ms: f64,
    #[serde(default)]
    first_contentful_paint_ms: f64,
    #[serde(default)]
    resource_count: u32,
    #[serde(default)]
    transfer_size_bytes: u64,
}

pub struct PerformancePlugin;

impl PerformancePlugin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn score(load_time_ms: u64, transfer_size_bytes: u64) -> f64 {
        // Full marks under 1s / 500KB, falling off linearly to zero at
        // 10s / 10MB.
        let time_score = match load_time_ms {
            0..=1000 => 50.0,
            t => (50.0 - (t - 1000) as f64 / 180.0).max(0.0),
        };
        let weight_score = match transfer_size_bytes {
            0..=512_000 => 50.0,
            b => (50.0 - (b - 512_000) as f64 / 200_000.0).max(0.0),
        };
        time_score + weight_score
    }
}

impl Default for PerformancePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricPlugin for PerformancePlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Performance
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(PERFORMANCE_SCRIPT).await?;
        let extraction: PerformanceExtraction =
            serde_json::from_value(value).context("failed to decode performance extraction")?;

        let load_time_ms = load_time.as_millis() as u64;
        Ok(PageMetrics::Performance(PerformanceMetrics {
            load_time_ms,
            ttfb_ms: extraction.ttfb_ms,
            dom_content_loaded_ms: extraction.dom_content_loaded_ms,
            load_event_ms: extraction.load_event_ms,
            first_contentful_paint_ms: extraction.first_contentful_paint_ms,
            resource_count: extraction.resource_count,
            transfer_size_bytes: extraction.transfer_size_bytes,
            score: Self::score(load_time_ms, extraction.transfer_size_bytes),
        }))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&PerformanceMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::Performance(p) => Some(p),
                _ => None,
            })
            .collect();

        let mut summary = PerformanceSummary {
            pages_evaluated: pages.len() as u64,
            ..PerformanceSummary::default()
        };
        if pages.is_empty() {
            return Ok(PluginSummary::Performance(summary));
        }

        let count = pages.len() as f64;
        for page in &pages {
            summary.avg_load_time_ms += page.load_time_ms as f64;
            summary.max_load_time_ms = summary.max_load_time_ms.max(page.load_time_ms);
            summary.avg_ttfb_ms += page.ttfb_ms;
            summary.avg_resource_count += f64::from(page.resource_count);
            summary.total_transfer_size_bytes += page.transfer_size_bytes;
            summary.avg_score += page.score;
        }
        summary.avg_load_time_ms /= count;
        summary.avg_ttfb_ms /= count;
        summary.avg_resource_count /= count;
        summary.avg_score /= count;

        Ok(PluginSummary::Performance(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_light_page_scores_full_marks() {
        assert!((PerformancePlugin::score(800, 100_000) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn slow_heavy_page_scores_zero() {
        assert!(PerformancePlugin::score(20_000, 50_000_000) < 1.0);
    }

    #[test]
    fn summarize_tracks_max_load_time() {
        let plugin = PerformancePlugin::new();
        let metrics = vec![
            PageMetrics::Performance(PerformanceMetrics {
                load_time_ms: 500,
                ..PerformanceMetrics::default()
            }),
            PageMetrics::Performance(PerformanceMetrics {
                load_time_ms: 2500,
                ..PerformanceMetrics::default()
            }),
        ];

        let PluginSummary::Performance(summary) = plugin.summarize(&metrics).expect("summary")
        else {
            panic!("wrong summary kind");
        };
        assert_eq!(summary.max_load_time_ms, 2500);
        assert!((summary.avg_load_time_ms - 1500.0).abs() < f64::EPSILON);
    }
}
