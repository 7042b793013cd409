//! The LLM-backed enricher: one classification call per new article, strict
//! domain validation, stub fallback on any failure.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::warn;

use crimewatch_common::{
    CrimeCategory, EnrichedIncident, Entity, NewArticle, Severity,
};

use crate::client::LlmClient;
use crate::{stub_incident, Enricher, SourceContext};

pub const PROMPT_VERSION: &str = "v1";

/// Provider rate limits are tight; keep concurrent calls modest.
const MAX_CONCURRENT_CALLS: usize = 2;

/// Body text beyond this adds cost without improving classification.
const BODY_BUDGET: usize = 8_000;

const SUMMARY_LIMIT: usize = 200;

const SYSTEM_PROMPT: &str = "\
You are a tactical analyst reviewing police news releases. Classify each \
release into structured intelligence.

Severity (choose exactly one):
- CRITICAL: homicide, active shooter, mass casualty, prison escape, officer killed
- HIGH: gang shooting, armed robbery, kidnapping, suspicious missing person, major drug operation
- MEDIUM: drug seizure, weapons seizure, organized theft, industrial theft
- LOW: non-violent property crime, traffic matters, minor incidents

Crime category (choose exactly one): Violent Crime, Property Crime, \
Traffic Incident, Drug Offense, Sexual Offense, Cybercrime, Public Safety, \
Other, Unknown.

Also produce: a one-sentence tactical summary (max 200 characters); 2-4 short \
tags; named entities (people, groups, specific locations); the most specific \
location mentioned with estimated coordinates; an optional cluster key when \
the release relates to a wider pattern (for example \"Fraser Valley Gang \
Conflict\"); and when stated, the time context, any weapon involved, and one \
line of tactical advice for patrol members.";

/// What the model returns. Kept close to the wire: free-form strings here,
/// domain validation afterwards.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct LlmIncident {
    /// LOW, MEDIUM, HIGH, or CRITICAL
    severity: String,
    /// One sentence, max 200 characters
    summary_tactical: String,
    tags: Vec<String>,
    entities: Vec<Entity>,
    location_label: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    /// Theme key when part of a wider pattern, else null
    graph_cluster_key: Option<String>,
    /// One of the closed category set
    crime_category: String,
    temporal_context: Option<String>,
    weapon_involved: Option<String>,
    tactical_advice: Option<String>,
}

pub struct LlmEnricher {
    client: LlmClient,
    model: String,
    permits: Arc<Semaphore>,
}

impl LlmEnricher {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: LlmClient::new(api_key),
            model: model.to_string(),
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_CALLS)),
        }
    }

    async fn classify(
        &self,
        article_id: i64,
        article: &NewArticle,
        ctx: &SourceContext<'_>,
    ) -> Result<EnrichedIncident> {
        let user_prompt = build_user_prompt(article, ctx);

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| anyhow!("LLM semaphore closed"))?;

        let raw: LlmIncident = self
            .client
            .extract(&self.model, SYSTEM_PROMPT, &user_prompt)
            .await?;

        validate(article_id, raw, &self.model)
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn enrich(
        &self,
        article_id: i64,
        article: &NewArticle,
        ctx: &SourceContext<'_>,
    ) -> EnrichedIncident {
        match self.classify(article_id, article, ctx).await {
            Ok(incident) => incident,
            Err(e) => {
                warn!(
                    article_id,
                    url = %article.url,
                    error = %e,
                    "Enrichment failed, storing stub"
                );
                stub_incident(article_id, &article.body_raw)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn prompt_version(&self) -> &str {
        PROMPT_VERSION
    }
}

fn build_user_prompt(article: &NewArticle, ctx: &SourceContext<'_>) -> String {
    let published = article
        .published_at
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        "Agency: {}\nRegion: {}\nPublished: {}\nTitle: {}\n\n{}",
        ctx.agency_name,
        ctx.region_label,
        published,
        article.title_raw,
        truncate(&article.body_raw, BODY_BUDGET),
    )
}

/// Map the wire response into the domain, rejecting anything outside the
/// closed severity/category sets.
pub(crate) fn validate(
    article_id: i64,
    raw: LlmIncident,
    model: &str,
) -> Result<EnrichedIncident> {
    let severity = Severity::parse(&raw.severity)
        .ok_or_else(|| anyhow!("severity outside domain: {:?}", raw.severity))?;
    let crime_category = CrimeCategory::parse(&raw.crime_category)
        .ok_or_else(|| anyhow!("crime_category outside domain: {:?}", raw.crime_category))?;

    if raw.summary_tactical.trim().is_empty() {
        return Err(anyhow!("empty summary_tactical"));
    }

    Ok(EnrichedIncident {
        id: article_id,
        severity,
        summary_tactical: truncate(raw.summary_tactical.trim(), SUMMARY_LIMIT).to_string(),
        tags: raw.tags,
        entities: raw.entities,
        location_label: raw.location_label,
        lat: raw.lat,
        lng: raw.lng,
        graph_cluster_key: raw.graph_cluster_key,
        crime_category,
        temporal_context: raw.temporal_context,
        weapon_involved: raw.weapon_involved,
        tactical_advice: raw.tactical_advice,
        llm_model: model.to_string(),
        prompt_version: PROMPT_VERSION.to_string(),
        processed_at: Utc::now(),
    })
}

/// Truncate to `max` bytes on a char boundary.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
