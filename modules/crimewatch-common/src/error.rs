use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrimewatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown parser id: {0}")]
    UnknownParser(String),

    #[error("No active sources found for region: {0}")]
    NoActiveSources(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Refresh job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidJobTransition { from: String, to: String },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
