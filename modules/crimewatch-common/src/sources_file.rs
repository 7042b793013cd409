//! TOML-backed source list loaded at startup and synced into the store.
//! Secrets stay in env vars; this file only describes newsrooms.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::CrimewatchError;

/// One newsroom record from `sources.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub agency_name: String,
    pub jurisdiction: String,
    pub region_label: String,
    pub source_type: String,
    pub base_url: String,
    pub parser_id: String,
    pub active: bool,
    #[serde(default)]
    pub use_browser: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourcesFile {
    sources: Vec<SourceConfig>,
}

/// Load and validate the source list. `known_parser_ids` is the registry's
/// closed family set — a typo'd `parser_id` fails startup here instead of
/// surfacing as a skipped source during refresh. Validation names the
/// offending record index so a typo in a 40-entry file is findable.
pub fn load_sources_file(path: &Path, known_parser_ids: &[&str]) -> Result<Vec<SourceConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file: {}", path.display()))?;
    let file: SourcesFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse sources file: {}", path.display()))?;
    validate(&file.sources, known_parser_ids)?;
    Ok(file.sources)
}

fn validate(sources: &[SourceConfig], known_parser_ids: &[&str]) -> Result<()> {
    for (i, s) in sources.iter().enumerate() {
        for (field, value) in [
            ("agency_name", &s.agency_name),
            ("jurisdiction", &s.jurisdiction),
            ("region_label", &s.region_label),
            ("source_type", &s.source_type),
        ] {
            if value.trim().is_empty() {
                return Err(config_error(format!(
                    "Source at index {i} has an empty {field}"
                )));
            }
        }
        if url::Url::parse(&s.base_url).is_err() {
            return Err(config_error(format!(
                "Source at index {i} has an invalid base_url: {}",
                s.base_url
            )));
        }
        if !known_parser_ids.contains(&s.parser_id.as_str()) {
            return Err(config_error(format!(
                "Source at index {i} has unknown parser_id {:?} (known: {})",
                s.parser_id,
                known_parser_ids.join(", ")
            )));
        }
    }
    Ok(())
}

fn config_error(message: String) -> anyhow::Error {
    CrimewatchError::Config(message).into()
}

/// Distinct region labels, sorted.
pub fn available_regions(sources: &[SourceConfig]) -> Vec<String> {
    let mut regions: Vec<String> = sources.iter().map(|s| s.region_label.clone()).collect();
    regions.sort();
    regions.dedup();
    regions
}
