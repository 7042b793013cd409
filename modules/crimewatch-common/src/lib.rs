pub mod config;
pub mod error;
pub mod fingerprint;
pub mod sources_file;
pub mod types;

pub use config::Config;
pub use error::CrimewatchError;
pub use fingerprint::{article_fingerprint, canonicalize_url};
pub use sources_file::{available_regions, load_sources_file, SourceConfig};
pub use types::*;
