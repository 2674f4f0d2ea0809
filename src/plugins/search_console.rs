//! Search Console verification detection
//!
//! Like the analytics plugin this degrades instead of failing: page-local
//! detection of the site-verification meta tag always works, and the
//! reporting-API client is only built when credentials are configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::scripts::SEARCH_CONSOLE_SCRIPT;
use super::{MetricPlugin, PageMetrics, PluginKind, PluginSummary};
use crate::browser::BrowserPage;
use crate::config::SearchConsoleCredentials;

/// Per-page Search Console signals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConsoleMetrics {
    pub has_verification_meta: bool,
    /// Property the page belongs to, when credentials are configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
}

/// Corpus-level Search Console summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConsoleSummary {
    pub pages_evaluated: u64,
    pub pages_with_verification_meta: u64,
    /// Whether the reporting-API client was available for this job
    pub client_available: bool,
}

/// Shape returned by [`SEARCH_CONSOLE_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
struct SearchConsoleExtraction {
    #[serde(default)]
    has_verification_meta: bool,
}

pub struct SearchConsolePlugin {
    credentials: Option<SearchConsoleCredentials>,
    client: Option<reqwest::Client>,
}

impl SearchConsolePlugin {
    #[must_use]
    pub fn new(credentials: Option<SearchConsoleCredentials>) -> Self {
        let client = credentials.as_ref().and_then(|_| {
            match reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
            {
                Ok(client) => Some(client),
                Err(err) => {
                    warn!("search console reporting client unavailable: {err}");
                    None
                }
            }
        });
        Self {
            credentials,
            client,
        }
    }

    fn site_url(&self) -> Option<&str> {
        match (&self.client, &self.credentials) {
            (Some(_), Some(creds)) => Some(creds.site_url.as_str()),
            _ => None,
        }
    }
}

#[async_trait]
impl MetricPlugin for SearchConsolePlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::SearchConsole
    }

    async fn evaluate_page(
        &self,
        page: &dyn BrowserPage,
        _load_time: Duration,
    ) -> Result<PageMetrics> {
        let value = page.evaluate(SEARCH_CONSOLE_SCRIPT).await?;
        let extraction: SearchConsoleExtraction =
            serde_json::from_value(value).context("failed to decode search console extraction")?;

        Ok(PageMetrics::SearchConsole(SearchConsoleMetrics {
            has_verification_meta: extraction.has_verification_meta,
            site_url: self.site_url().map(String::from),
        }))
    }

    fn summarize(&self, metrics: &[PageMetrics]) -> Result<PluginSummary> {
        let pages: Vec<&SearchConsoleMetrics> = metrics
            .iter()
            .filter_map(|m| match m {
                PageMetrics::SearchConsole(s) => Some(s),
                _ => None,
            })
            .collect();

        let mut summary = SearchConsoleSummary {
            pages_evaluated: pages.len() as u64,
            client_available: self.client.is_some(),
            ..SearchConsoleSummary::default()
        };
        for page in &pages {
            if page.has_verification_meta {
                summary.pages_with_verification_meta += 1;
            }
        }

        Ok(PluginSummary::SearchConsole(summary))
    }
}
