//! Browser-automation backend seam
//!
//! The engine drives an external page-rendering backend through the traits in
//! this module and treats every operation as fallible and retryable. The
//! production implementation is chromium-based ([`chromium`]); tests swap in
//! stub backends.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use chromium::ChromiumBackend;

/// Parameters for a single page navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationOptions {
    /// Overall deadline for `goto` including the load wait
    pub timeout: Duration,
    /// Deadline for follow-up requests against the loaded page
    /// (script evaluation, header updates)
    pub request_timeout: Duration,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of a successful navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// URL the page ended up on after redirects
    pub final_url: String,
    /// HTTP status of the final response
    pub http_status: u16,
    /// Intermediate URLs visited before `final_url` (empty when none)
    pub redirect_chain: Vec<String>,
}

/// Launches crawl sessions against the external backend
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Launch a new session; one session serves one job
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A stateful handle capable of opening pages
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a fresh blank page
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>>;

    /// Tear the session down, releasing backend resources
    async fn close(&self) -> Result<()>;
}

/// One open page within a session
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate to `url` and wait for the load to settle
    async fn goto(&self, url: &str, options: &NavigationOptions) -> Result<NavigationResult>;

    /// Execute script in the page context and return its structured result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Current URL of the page
    async fn url(&self) -> Result<String>;

    /// Attach extra headers to subsequent requests from this page
    async fn set_extra_headers(&self, headers: &HashMap<String, String>) -> Result<()>;

    /// Override the user-agent string for this page
    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Close the page
    async fn close(&self) -> Result<()>;
}
