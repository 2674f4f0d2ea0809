//! Stub browser backend for integration tests
//!
//! Pages are scripted up front: each URL maps to a `PageSpec` describing the
//! navigation outcome, canned script results, and outbound links. Unknown
//! URLs resolve to an empty 200 page.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use sitescope::browser::{
    BrowserBackend, BrowserPage, BrowserSession, NavigationOptions, NavigationResult,
};
use sitescope::plugins::scripts::DISCOVER_LINKS_SCRIPT;

/// Scripted behavior for one URL
#[derive(Debug, Clone, Default)]
pub struct PageSpec {
    pub status: u16,
    pub final_url: Option<String>,
    /// When set, `goto` fails with this message on every attempt
    pub goto_error: Option<String>,
    /// Canned `evaluate` results keyed by exact script text
    pub scripts: HashMap<String, Value>,
    /// Outbound links returned to the frontier discovery script
    pub links: Vec<String>,
}

impl PageSpec {
    pub fn ok() -> Self {
        Self {
            status: 200,
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn redirecting_to(mut self, final_url: &str) -> Self {
        self.final_url = Some(final_url.to_string());
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            goto_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_script(mut self, script: &str, value: Value) -> Self {
        self.scripts.insert(script.to_string(), value);
        self
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|&l| l.to_string()).collect();
        self
    }
}

#[derive(Default)]
struct StubState {
    pages: HashMap<String, PageSpec>,
    launch_error: Option<String>,
    launches: AtomicUsize,
    open_pages: AtomicUsize,
    max_open_pages: AtomicUsize,
}

/// Backend serving scripted pages
#[derive(Clone, Default)]
pub struct StubBackend {
    state: Arc<StubState>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose every launch fails
    pub fn failing_to_launch(message: &str) -> Self {
        Self {
            state: Arc::new(StubState {
                launch_error: Some(message.to_string()),
                ..StubState::default()
            }),
        }
    }

    pub fn with_page(self, url: &str, spec: PageSpec) -> Self {
        let mut state = Arc::try_unwrap(self.state).unwrap_or_else(|arc| StubState {
            pages: arc.pages.clone(),
            launch_error: arc.launch_error.clone(),
            ..StubState::default()
        });
        state.pages.insert(url.to_string(), spec);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn launches(&self) -> usize {
        self.state.launches.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open pages seen across all sessions
    pub fn max_open_pages(&self) -> usize {
        self.state.max_open_pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserBackend for StubBackend {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if let Some(message) = &self.state.launch_error {
            return Err(anyhow!("{message}"));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct StubSession {
    state: Arc<StubState>,
}

#[async_trait]
impl BrowserSession for StubSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let open = self.state.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_open_pages.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(StubPage {
            state: Arc::clone(&self.state),
            current: Mutex::new(None),
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct StubPage {
    state: Arc<StubState>,
    current: Mutex<Option<(String, PageSpec)>>,
}

#[async_trait]
impl BrowserPage for StubPage {
    async fn goto(&self, url: &str, _options: &NavigationOptions) -> Result<NavigationResult> {
        let spec = self.state.pages.get(url).cloned().unwrap_or_else(PageSpec::ok);
        if let Some(message) = &spec.goto_error {
            return Err(anyhow!("{message}"));
        }

        let final_url = spec.final_url.clone().unwrap_or_else(|| url.to_string());
        let redirect_chain = if final_url == url {
            Vec::new()
        } else {
            vec![url.to_string()]
        };
        let result = NavigationResult {
            final_url: final_url.clone(),
            http_status: spec.status,
            redirect_chain,
        };
        *self.current.lock().await = Some((final_url, spec));
        Ok(result)
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let current = self.current.lock().await;
        let Some((_, spec)) = current.as_ref() else {
            return Err(anyhow!("no page loaded"));
        };
        if script == DISCOVER_LINKS_SCRIPT {
            return Ok(json!(spec.links));
        }
        spec.scripts
            .get(script)
            .cloned()
            .ok_or_else(|| anyhow!("script evaluation not scripted for this page"))
    }

    async fn url(&self) -> Result<String> {
        let current = self.current.lock().await;
        current
            .as_ref()
            .map(|(url, _)| url.clone())
            .ok_or_else(|| anyhow!("no page loaded"))
    }

    async fn set_extra_headers(&self, _headers: &HashMap<String, String>) -> Result<()> {
        Ok(())
    }

    async fn set_user_agent(&self, _user_agent: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.open_pages.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
