//! Mobile-friendliness extraction and corpus summarization

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::scripts::MOBILE_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;

/// Per-page mobile-friendliness signals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MobileMetrics {
    pub has_viewport_meta: bool,
    pub viewport_content: Option<String>,
    /// Text elements rendered below 12px
    pub small_font_elements: u32,
    /// Images wider than 1.5x the viewport
    pub oversize_images: u32,
    pub uses_responsive_images: bool,
    /// 0-100 heuristic score
    pub score: f64,
}

/// Corpus-level mobile summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MobileSummary {
    pub pages_evaluated: u64,
    pub pages_with_viewport: u64,
    pub pages_with_small_fonts: u64,
    pub total_oversize_images: u64,
    pub avg_score: f64,
}

/// Shape returned by [`MOBILE_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
struct MobileExtraction {
    #[serde(default)]
    has_viewport_meta: bool,
    viewport_content: Option<String>,
    #[serde(default)]
    small_font_elements: u32,
    #[serde(default)]
    oversize_images: u32,
    #[serde(default)]
    uses_responsive_images: bool,
}

pub struct MobilePlugin;

impl MobilePlugin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn score(extraction: &MobileExtraction) -> f64 {
        let mut score: f64 = 0.0;
        if extraction.has_viewport_meta {
            score += 40.0;
        }
        if extraction.small_font_elements == 0 {
            score += 25.0;
        } else if extraction.small_font_elements < 5 {
            score += 10.0;
        }
        if extraction.oversize_images == 0 {
            score += 20.0;
        }
        if extraction.uses_responsive_images {
            score += 15.0;
        }
        score
    }
}

impl Default for MobilePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricPlugin for MobilePlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Mobile
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        _load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(MOBILE_SCRIPT).await?;
        let extraction: MobileExtraction =
            serde_json::from_value(value).context("failed to decode mobile extraction")?;

        let score = Self::score(&extraction);
        Ok(PageMetrics::Mobile(MobileMetrics {
            has_viewport_meta: extraction.has_viewport_meta,
            viewport_content: extraction.viewport_content,
            small_font_elements: extraction.small_font_elements,
            oversize_images: extraction.oversize_images,
            uses_responsive_images: extraction.uses_responsive_images,
            score,
        }))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&MobileMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::Mobile(m) => Some(m),
                _ => None,
            })
            .collect();

        let mut summary = MobileSummary {
            pages_evaluated: pages.len() as u64,
            ..MobileSummary::default()
        };
        if pages.is_empty() {
            return Ok(PluginSummary::Mobile(summary));
        }

        for page in &pages {
            if page.has_viewport_meta {
                summary.pages_with_viewport += 1;
            }
            if page.small_font_elements > 0 {
                summary.pages_with_small_fonts += 1;
            }
            summary.total_oversize_images += u64::from(page.oversize_images);
            summary.avg_score += page.score;
        }
        summary.avg_score /= pages.len() as f64;

        Ok(PluginSummary::Mobile(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responsive_page_scores_full_marks() {
        let extraction = MobileExtraction {
            has_viewport_meta: true,
            uses_responsive_images: true,
            ..MobileExtraction::default()
        };
        assert!((MobilePlugin::score(&extraction) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summarize_counts_viewport_pages() {
        let plugin = MobilePlugin::new();
        let metrics = vec![
            PageMetrics::Mobile(MobileMetrics {
                has_viewport_meta: true,
                score: 100.0,
                ..MobileMetrics::default()
            }),
            PageMetrics::Mobile(MobileMetrics {
                small_font_elements: 7,
                score: 20.0,
                ..MobileMetrics::default()
            }),
        ];

        let PluginSummary::Mobile(summary) = plugin.summarize(&metrics).expect("summary") else {
            panic!("wrong summary kind");
        };
        assert_eq!(summary.pages_with_viewport, 1);
        assert_eq!(summary.pages_with_small_fonts, 1);
        assert!((summary.avg_score - 60.0).abs() < f64::EPSILON);
    }
}
