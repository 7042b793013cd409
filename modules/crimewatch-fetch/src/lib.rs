//! Page fetching: direct HTTP with retries, and an optional headless-browser
//! path for listing pages that only render under JavaScript.

pub mod error;

mod browserless;
mod http;

pub use browserless::BrowserlessFetcher;
pub use error::{FetchError, Result};
pub use http::HttpFetcher;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::warn;

/// Max concurrent headless-browser renders. Each render is heavy on the
/// remote service, so the cap is deliberately small.
const MAX_CONCURRENT_BROWSER: usize = 2;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) CrimewatchBot/0.3";

/// Per-call fetch options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Route through the headless browser instead of direct HTTP.
    pub use_browser: bool,
    /// Total elapsed budget across all attempts. Aborts the retry loop even
    /// when attempts remain.
    pub total_budget: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            use_browser: false,
            total_budget: Duration::from_secs(45),
        }
    }
}

impl FetchOptions {
    pub fn browser() -> Self {
        Self {
            use_browser: true,
            ..Self::default()
        }
    }
}

/// A fetched HTTP resource.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
    pub final_url: String,
}

/// The fetch seam. `FetcherSet` is the production implementation; tests
/// substitute a scripted one.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage>;
}

/// Routes each fetch to direct HTTP or the headless browser based on the
/// caller's hint. Browser renders are capped by a shared semaphore; when no
/// browser service is configured, browser-hinted fetches fall back to direct
/// HTTP with a warning.
pub struct FetcherSet {
    http: HttpFetcher,
    browserless: Option<BrowserlessFetcher>,
    browser_permits: Arc<Semaphore>,
}

impl FetcherSet {
    pub fn new(http: HttpFetcher, browserless: Option<BrowserlessFetcher>) -> Self {
        Self {
            http,
            browserless,
            browser_permits: Arc::new(Semaphore::new(MAX_CONCURRENT_BROWSER)),
        }
    }
}

#[async_trait]
impl PageFetcher for FetcherSet {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        if options.use_browser {
            match &self.browserless {
                Some(browser) => {
                    let _permit = self
                        .browser_permits
                        .acquire()
                        .await
                        .map_err(|_| FetchError::Browser("browser semaphore closed".into()))?;
                    return browser.fetch(url).await;
                }
                None => {
                    warn!(url, "Browser fetch requested but no browser service configured, using direct HTTP");
                }
            }
        }
        self.http.fetch(url, options).await
    }
}
