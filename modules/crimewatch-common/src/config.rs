use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
///
/// Nothing here is strictly required: without `LLM_API_KEY` enrichment runs
/// in stub mode, and without `DATABASE_URL` the server falls back to the
/// in-memory store (dev only — nothing survives a restart).
#[derive(Debug, Clone)]
pub struct Config {
    // LLM provider. Absence of the key disables enrichment.
    pub llm_api_key: Option<String>,
    pub llm_model: String,

    // Postgres connection string.
    pub database_url: Option<String>,

    // "dev" enables the debug endpoints.
    pub env: String,

    // Web server
    pub api_host: String,
    pub api_port: u16,

    // Browserless (optional headless browser service)
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,

    // Source list (TOML)
    pub sources_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            llm_api_key: non_empty_env("LLM_API_KEY"),
            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            database_url: non_empty_env("DATABASE_URL"),
            env: env::var("ENV").unwrap_or_else(|_| "production".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
            browserless_url: non_empty_env("BROWSERLESS_URL"),
            browserless_token: non_empty_env("BROWSERLESS_TOKEN"),
            sources_file: PathBuf::from(
                env::var("SOURCES_FILE").unwrap_or_else(|_| "config/sources.toml".to_string()),
            ),
        }
    }

    pub fn is_dev(&self) -> bool {
        self.env == "dev"
    }

    /// Log which integrations are configured without leaking secret material.
    pub fn log_redacted(&self) {
        for (name, value) in [
            ("LLM_API_KEY", &self.llm_api_key),
            ("DATABASE_URL", &self.database_url),
            ("BROWSERLESS_URL", &self.browserless_url),
        ] {
            match value {
                Some(v) => tracing::info!("{name} = ({} chars)", v.len()),
                None => tracing::info!("{name} = (unset)"),
            }
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
