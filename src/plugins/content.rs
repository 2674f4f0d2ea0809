//! Content-quality extraction and corpus summarization

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::scripts::CONTENT_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;

/// Pages under this word count are considered thin
const THIN_PAGE_WORDS: u32 = 300;

/// Assumed silent-reading speed for the reading-time estimate
const WORDS_PER_MINUTE: f64 = 225.0;

/// Per-page body-text and media facts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub word_count: u32,
    pub paragraph_count: u32,
    pub heading_count: u32,
    pub image_count: u32,
    pub images_missing_alt: u32,
    /// Visible text length over raw HTML length
    pub text_ratio: f64,
    pub reading_time_minutes: f64,
}

/// Corpus-level content summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSummary {
    pub pages_evaluated: u64,
    pub avg_word_count: f64,
    pub thin_pages: u64,
    pub total_images: u64,
    pub total_images_missing_alt: u64,
    /// Share of images carrying alt text, 0-100
    pub alt_text_coverage_pct: f64,
    pub avg_text_ratio: f64,
}

/// Shape returned by [`CONTENT_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
struct ContentExtraction {
    #[serde(default)]
    word_count: u32,
    #[serde(default)]
    paragraph_count: u32,
    #[serde(default)]
    heading_count: u32,
    #[serde(default)]
    image_count: u32,
    #[serde(default)]
    images_missing_alt: u32,
    #[serde(default)]
    text_ratio: f64,
}

pub struct ContentPlugin;

impl ContentPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ContentPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricPlugin for ContentPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Content
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        _load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(CONTENT_SCRIPT).await?;
        let extraction: ContentExtraction =
            serde_json::from_value(value).context("failed to decode content extraction")?;

        Ok(PageMetrics::Content(ContentMetrics {
            word_count: extraction.word_count,
            paragraph_count: extraction.paragraph_count,
            heading_count: extraction.heading_count,
            image_count: extraction.image_count,
            images_missing_alt: extraction.images_missing_alt,
            text_ratio: extraction.text_ratio,
            reading_time_minutes: f64::from(extraction.word_count) / WORDS_PER_MINUTE,
        }))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&ContentMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::Content(c) => Some(c),
                _ => None,
            })
            .collect();

        let mut summary = ContentSummary {
            pages_evaluated: pages.len() as u64,
            ..ContentSummary::default()
        };
        if pages.is_empty() {
            return Ok(PluginSummary::Content(summary));
        }

        for page in &pages {
            summary.avg_word_count += f64::from(page.word_count);
            if page.word_count < THIN_PAGE_WORDS {
                summary.thin_pages += 1;
            }
            summary.total_images += u64::from(page.image_count);
            summary.total_images_missing_alt += u64::from(page.images_missing_alt);
            summary.avg_text_ratio += page.text_ratio;
        }
        summary.avg_word_count /= pages.len() as f64;
        summary.avg_text_ratio /= pages.len() as f64;
        if summary.total_images > 0 {
            summary.alt_text_coverage_pct = (summary.total_images
                - summary.total_images_missing_alt) as f64
                * 100.0
                / summary.total_images as f64;
        }

        Ok(PluginSummary::Content(summary))
    }
}
