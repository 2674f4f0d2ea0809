//! Chromium implementation of the browser backend seam
//!
//! Wraps `chromiumoxide`: launching spawns a handler task that drives the CDP
//! connection for the lifetime of the session; closing the session aborts it.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, Headers, SetExtraHttpHeadersParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{BrowserBackend, BrowserPage, BrowserSession, NavigationOptions, NavigationResult};

/// Reads the navigation response status from the performance timeline.
/// `responseStatus` is absent on older targets; 0 means "unknown".
const NAVIGATION_STATUS_SCRIPT: &str = r"
(() => {
    const nav = performance.getEntriesByType('navigation')[0];
    return nav && nav.responseStatus ? nav.responseStatus : 0;
})()
";

/// Wrap an async page operation with an explicit timeout
///
/// Prevents indefinite hangs on CDP operations; the error message
/// distinguishes a timeout from an operation failure.
async fn with_timeout<F, T>(operation: F, timeout: Duration, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "{operation_name} timeout after {} seconds",
            timeout.as_secs()
        )),
    }
}

/// Chromium-backed [`BrowserBackend`]
#[derive(Debug, Clone)]
pub struct ChromiumBackend {
    headless: bool,
}

impl ChromiumBackend {
    #[must_use]
    pub fn new() -> Self {
        Self { headless: true }
    }

    /// Run the browser with a visible window (debug builds only make sense here)
    #[must_use]
    pub fn with_headed(mut self) -> Self {
        self.headless = false;
        self
    }
}

impl Default for ChromiumBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let mut builder = BrowserConfig::builder();
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch chromium")?;

        // The handler stream must be polled for the CDP connection to make
        // progress; it ends when the browser process exits.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {e}");
                }
            }
        });

        debug!("chromium session launched");
        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(browser),
            handler_task: Mutex::new(Some(handler_task)),
        }))
    }
}

/// One live chromium instance serving a single crawl job
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<()> {
        {
            let mut browser = self.browser.lock().await;
            if let Err(e) = browser.close().await {
                warn!("error closing browser: {e}");
            }
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
            if let Err(e) = task.await
                && !e.is_cancelled()
            {
                warn!("browser handler task failed during abort: {e}");
            }
        }
        Ok(())
    }
}

/// One open chromium page
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&self, url: &str, options: &NavigationOptions) -> Result<NavigationResult> {
        let requested = url.to_string();

        with_timeout(
            async {
                self.page
                    .goto(requested.as_str())
                    .await
                    .map_err(|e| anyhow!("navigation failed: {e}"))?;
                self.page
                    .wait_for_navigation()
                    .await
                    .map_err(|e| anyhow!("page load failed: {e}"))?;
                Ok(())
            },
            options.timeout,
            "page navigation",
        )
        .await?;

        let final_url = self
            .page
            .url()
            .await
            .map_err(|e| anyhow!("failed to read page url: {e}"))?
            .unwrap_or_else(|| requested.clone());

        // CDP does not hand the response status back on goto; read it from the
        // performance timeline and assume success when the field is absent.
        let http_status = match self.evaluate(NAVIGATION_STATUS_SCRIPT).await {
            Ok(value) => {
                let status = value.as_u64().unwrap_or(0) as u16;
                if status == 0 { 200 } else { status }
            }
            Err(e) => {
                debug!("failed to read navigation status for {final_url}: {e}");
                200
            }
        };

        let redirect_chain = if final_url != requested {
            vec![requested]
        } else {
            Vec::new()
        };

        Ok(NavigationResult {
            final_url,
            http_status,
            redirect_chain,
        })
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| anyhow!("script evaluation failed: {e}"))?;
        result
            .into_value()
            .map_err(|e| anyhow!("failed to decode evaluation result: {e}"))
    }

    async fn url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| anyhow!("failed to read page url: {e}"))?;
        url.ok_or_else(|| anyhow!("page has no url"))
    }

    async fn set_extra_headers(&self, headers: &HashMap<String, String>) -> Result<()> {
        if headers.is_empty() {
            return Ok(());
        }
        self.page
            .execute(EnableParams::default())
            .await
            .map_err(|e| anyhow!("failed to enable network domain: {e}"))?;
        let header_value = serde_json::to_value(headers).context("failed to encode headers")?;
        self.page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(header_value)))
            .await
            .map_err(|e| anyhow!("failed to set extra headers: {e}"))?;
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.page
            .set_user_agent(user_agent)
            .await
            .map_err(|e| anyhow!("failed to set user agent: {e}"))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| anyhow!("failed to close page: {e}"))
    }
}
