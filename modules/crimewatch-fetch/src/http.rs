use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{retryable_status, FetchError, Result};
use crate::{FetchOptions, FetchedPage, DEFAULT_USER_AGENT};

/// Base backoff before the first retry. Actual delay is
/// `base * 2^attempt` with ±25% jitter.
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Direct HTTP fetcher with exponential backoff on transient failures.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            debug!(url, attempt, "HTTP fetch");

            let result = self.attempt(url, options.timeout).await;

            match result {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < options.max_retries => {
                    let delay = backoff_delay(attempt);
                    if started.elapsed() + delay > options.total_budget {
                        warn!(url, error = %e, "Fetch budget exhausted, giving up");
                        return Err(e);
                    }
                    warn!(url, attempt = attempt + 1, error = %e, "Transient fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if !response.status().is_success() {
            return Err(FetchError::Http { status });
        }

        let body = response.text().await?;
        Ok(FetchedPage {
            status,
            body,
            final_url,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential backoff with ±25% jitter: `1s * 2^attempt * [0.75, 1.25)`.
fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_BASE * 2u32.pow(attempt);
    let factor = rand::rng().random_range(0.75..1.25);
    base.mul_f64(factor)
}
