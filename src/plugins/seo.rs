//! SEO tag extraction and corpus summarization

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::scripts::SEO_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;

/// Recommended bounds used by the page score
const TITLE_MIN: usize = 10;
const TITLE_MAX: usize = 60;
const DESCRIPTION_MIN: usize = 50;
const DESCRIPTION_MAX: usize = 160;

/// Per-page SEO signals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeoMetrics {
    pub title: Option<String>,
    pub title_length: u32,
    pub meta_description: Option<String>,
    pub meta_description_length: u32,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub robots_directives: Option<String>,
    pub h1_count: u32,
    pub h2_count: u32,
    pub open_graph_tags: u32,
    pub structured_data_blocks: u32,
    pub language: Option<String>,
    /// 0-100 heuristic score over the signals above
    pub score: f64,
}

/// Corpus-level SEO summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeoSummary {
    pub pages_evaluated: u64,
    pub pages_missing_title: u64,
    pub pages_missing_description: u64,
    pub pages_with_duplicate_titles: u64,
    pub pages_without_canonical: u64,
    pub avg_title_length: f64,
    pub avg_score: f64,
}

/// Shape returned by [`SEO_SCRIPT`]
#[derive(Debug, Deserialize)]
struct SeoExtraction {
    title: Option<String>,
    meta_description: Option<String>,
    meta_keywords: Option<String>,
    canonical_url: Option<String>,
    robots_directives: Option<String>,
    #[serde(default)]
    h1_count: u32,
    #[serde(default)]
    h2_count: u32,
    #[serde(default)]
    open_graph_tags: u32,
    #[serde(default)]
    structured_data_blocks: u32,
    language: Option<String>,
}

pub struct SeoPlugin;

impl SeoPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn score(extraction: &SeoExtraction) -> f64 {
        let mut score = 0.0;

        match &extraction.title {
            Some(t) if (TITLE_MIN..=TITLE_MAX).contains(&t.chars().count()) => score += 25.0,
            Some(_) => score += 15.0,
            None => {}
        }
        match &extraction.meta_description {
            Some(d) if (DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&d.chars().count()) => {
                score += 25.0;
            }
            Some(_) => score += 15.0,
            None => {}
        }
        if extraction.h1_count == 1 {
            score += 20.0;
        } else if extraction.h1_count > 1 {
            score += 10.0;
        }
        if extraction.canonical_url.is_some() {
            score += 10.0;
        }
        if extraction.open_graph_tags > 0 {
            score += 10.0;
        }
        if extraction.structured_data_blocks > 0 {
            score += 5.0;
        }
        if extraction.language.is_some() {
            score += 5.0;
        }

        score
    }
}

impl Default for SeoPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricPlugin for SeoPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Seo
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        _load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(SEO_SCRIPT).await?;
        let extraction: SeoExtraction =
            serde_json::from_value(value).context("failed to decode SEO extraction")?;

        let score = Self::score(&extraction);
        Ok(PageMetrics::Seo(SeoMetrics {
            title_length: extraction
                .title
                .as_ref()
                .map_or(0, |t| t.chars().count() as u32),
            meta_description_length: extraction
                .meta_description
                .as_ref()
                .map_or(0, |d| d.chars().count() as u32),
            title: extraction.title,
            meta_description: extraction.meta_description,
            meta_keywords: extraction.meta_keywords,
            canonical_url: extraction.canonical_url,
            robots_directives: extraction.robots_directives,
            h1_count: extraction.h1_count,
            h2_count: extraction.h2_count,
            open_graph_tags: extraction.open_graph_tags,
            structured_data_blocks: extraction.structured_data_blocks,
            language: extraction.language,
            score,
        }))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&SeoMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::Seo(s) => Some(s),
                _ => None,
            })
            .collect();

        let mut summary = SeoSummary {
            pages_evaluated: pages.len() as u64,
            ..SeoSummary::default()
        };
        if pages.is_empty() {
            return Ok(PluginSummary::Seo(summary));
        }

        let mut title_counts: HashMap<&str, u64> = HashMap::new();
        let mut title_length_total = 0u64;
        let mut score_total = 0.0;

        for page in &pages {
            match page.title.as_deref() {
                Some(title) if !title.is_empty() => {
                    *title_counts.entry(title).or_insert(0) += 1;
                    title_length_total += u64::from(page.title_length);
                }
                _ => summary.pages_missing_title += 1,
            }
            if page.meta_description.is_none() {
                summary.pages_missing_description += 1;
            }
            if page.canonical_url.is_none() {
                summary.pages_without_canonical += 1;
            }
            score_total += page.score;
        }

        summary.pages_with_duplicate_titles = title_counts
            .values()
            .filter(|&&count| count > 1)
            .map(|&count| count)
            .sum();

        let titled_pages = pages.len() as u64 - summary.pages_missing_title;
        if titled_pages > 0 {
            summary.avg_title_length = title_length_total as f64 / titled_pages as f64;
        }
        summary.avg_score = score_total / pages.len() as f64;

        Ok(PluginSummary::Seo(summary))
    }
}
