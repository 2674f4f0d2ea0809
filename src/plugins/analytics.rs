//! Analytics instrumentation detection
//!
//! Page-local detection (gtag/ga globals, dataLayer, tracker IDs in script
//! URLs) always works. When measurement-protocol credentials are configured
//! an HTTP client is built for the reporting API; if the client cannot be
//! constructed the plugin degrades to page-local detection only instead of
//! failing the job.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::scripts::ANALYTICS_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;
use crate::config::AnalyticsCredentials;

/// Per-page analytics signals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsMetrics {
    pub has_google_analytics: bool,
    pub has_tag_manager: bool,
    /// Measurement/container IDs found in script URLs
    pub tracker_ids: Vec<String>,
    /// Property the page reports into, when credentials are configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
}

/// Corpus-level analytics summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub pages_evaluated: u64,
    pub pages_with_analytics: u64,
    pub pages_with_tag_manager: u64,
    pub unique_tracker_ids: Vec<String>,
    /// Pages instrumented but reporting a tracker other than the configured
    /// property
    pub pages_with_foreign_trackers: u64,
    /// Whether the reporting-API client was available for this job
    pub client_available: bool,
}

/// Shape returned by [`ANALYTICS_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
struct AnalyticsExtraction {
    #[serde(default)]
    has_google_analytics: bool,
    #[serde(default)]
    has_tag_manager: bool,
    #[serde(default)]
    tracker_ids: Vec<String>,
}

pub struct AnalyticsPlugin {
    credentials: Option<AnalyticsCredentials>,
    client: Option<reqwest::Client>,
}

impl AnalyticsPlugin {
    #[must_use]
    pub fn new(credentials: Option<AnalyticsCredentials>) -> Self {
        let client = credentials.as_ref().and_then(|_| {
            match reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
            {
                Ok(client) => Some(client),
                Err(err) => {
                    warn!("analytics reporting client unavailable: {err}");
                    None
                }
            }
        });
        Self {
            credentials,
            client,
        }
    }

    fn property_id(&self) -> Option<&str> {
        match (&self.client, &self.credentials) {
            (Some(_), Some(creds)) => Some(creds.property_id.as_str()),
            _ => None,
        }
    }
}

#[async_trait]
impl MetricPlugin for AnalyticsPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Analytics
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        _load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(ANALYTICS_SCRIPT).await?;
        let extraction: AnalyticsExtraction =
            serde_json::from_value(value).context("failed to decode analytics extraction")?;

        Ok(PageMetrics::Analytics(AnalyticsMetrics {
            has_google_analytics: extraction.has_google_analytics,
            has_tag_manager: extraction.has_tag_manager,
            tracker_ids: extraction.tracker_ids,
            property_id: self.property_id().map(String::from),
        }))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&AnalyticsMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::Analytics(a) => Some(a),
                _ => None,
            })
            .collect();

        let mut summary = AnalyticsSummary {
            pages_evaluated: pages.len() as u64,
            client_available: self.client.is_some(),
            ..AnalyticsSummary::default()
        };

        let configured = self.property_id();
        let mut trackers: Vec<String> = Vec::new();
        for page in &pages {
            if page.has_google_analytics {
                summary.pages_with_analytics += 1;
            }
            if page.has_tag_manager {
                summary.pages_with_tag_manager += 1;
            }
            if let Some(property) = configured
                && !page.tracker_ids.is_empty()
                && !page.tracker_ids.iter().any(|id| id == property)
            {
                summary.pages_with_foreign_trackers += 1;
            }
            for id in &page.tracker_ids {
                if !trackers.contains(id) {
                    trackers.push(id.clone());
                }
            }
        }
        trackers.sort();
        summary.unique_tracker_ids = trackers;

        Ok(PluginSummary::Analytics(summary))
    }
}
