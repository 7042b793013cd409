use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Fetch timed out")]
    Timeout,

    #[error("HTTP error (status {status})")]
    Http { status: u16 },

    #[error("Browser fetch error: {0}")]
    Browser(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl FetchError {
    /// Transient failures are worth another attempt; everything else
    /// surfaces to the caller immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::Http { status } => retryable_status(*status),
            FetchError::Browser(_) => false,
        }
    }
}

/// 5xx plus the two 4xx codes that signal "try again later".
pub fn retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}
