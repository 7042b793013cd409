//! Enrichment: the single LLM-backed transformation from raw article to
//! structured incident, with a deterministic stub when no provider is
//! configured or a call fails. Data is never lost to a classifier outage.

mod client;
mod llm;

pub use llm::{LlmEnricher, PROMPT_VERSION};

use async_trait::async_trait;
use chrono::Utc;

use crimewatch_common::{CrimeCategory, EnrichedIncident, NewArticle, Severity};

pub const STUB_MODEL: &str = "none";
pub const STUB_PROMPT_VERSION: &str = "stub_v1";

/// Source fields the classifier prompt needs.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    pub agency_name: &'a str,
    pub region_label: &'a str,
}

/// One enrichment per new article. Implementations never fail — the stub is
/// the floor.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(
        &self,
        article_id: i64,
        article: &NewArticle,
        ctx: &SourceContext<'_>,
    ) -> EnrichedIncident;

    fn model_name(&self) -> &str;

    fn prompt_version(&self) -> &str;
}

/// Used when `LLM_API_KEY` is absent: every article gets the deterministic
/// stub record.
pub struct StubEnricher;

#[async_trait]
impl Enricher for StubEnricher {
    async fn enrich(
        &self,
        article_id: i64,
        article: &NewArticle,
        _ctx: &SourceContext<'_>,
    ) -> EnrichedIncident {
        stub_incident(article_id, &article.body_raw)
    }

    fn model_name(&self) -> &str {
        STUB_MODEL
    }

    fn prompt_version(&self) -> &str {
        STUB_PROMPT_VERSION
    }
}

/// The deterministic fallback record: MEDIUM severity, body-derived summary,
/// Unknown category, no extracted structure.
pub fn stub_incident(article_id: i64, body: &str) -> EnrichedIncident {
    EnrichedIncident {
        id: article_id,
        severity: Severity::Medium,
        summary_tactical: summary_from_body(body),
        tags: Vec::new(),
        entities: Vec::new(),
        location_label: None,
        lat: None,
        lng: None,
        graph_cluster_key: None,
        crime_category: CrimeCategory::Unknown,
        temporal_context: None,
        weapon_involved: None,
        tactical_advice: None,
        llm_model: STUB_MODEL.to_string(),
        prompt_version: STUB_PROMPT_VERSION.to_string(),
        processed_at: Utc::now(),
    }
}

const STUB_SUMMARY_LIMIT: usize = 200;

fn summary_from_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= STUB_SUMMARY_LIMIT {
        return body.to_string();
    }
    let mut end = STUB_SUMMARY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
