use std::time::Duration;

use tracing::{info, warn};

use crate::error::{FetchError, Result};
use crate::FetchedPage;

/// Fetcher backed by a Browserless-style `/content` endpoint: the service
/// loads the page in headless Chrome, waits for network idle, and returns the
/// rendered HTML.
pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        info!(base_url, "BrowserlessFetcher initialized");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        info!(url, fetcher = "browserless", "Fetching page");

        let body = serde_json::json!({ "url": url, "waitUntil": "networkidle2" });

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(url, status = status.as_u16(), "Browserless error response");
            return Err(FetchError::Browser(format!(
                "status {}: {}",
                status.as_u16(),
                message
            )));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        Ok(FetchedPage {
            status: status.as_u16(),
            body: html,
            final_url: url.to_string(),
        })
    }
}
