//! Persistence: the single seam every component writes through.
//!
//! `PgStore` is the production implementation; `MemoryStore` is the
//! functionally identical twin used by tests and by dev runs without a
//! `DATABASE_URL`. The store is the only place uniqueness is enforced —
//! parsers and the orchestrator never reason about duplicates themselves.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crimewatch_common::{
    EnrichedIncident, NewArticle, RawArticle, RefreshJob, Source, SourceConfig,
};

/// Result of an article upsert.
#[derive(Debug, Clone, Copy)]
pub struct UpsertOutcome {
    pub id: i64,
    /// True when this call created the row; false when it already existed.
    pub inserted: bool,
}

/// One incident joined with its article and source, as served by the API.
#[derive(Debug, Clone)]
pub struct IncidentRecord {
    pub source: Source,
    pub article: RawArticle,
    pub incident: EnrichedIncident,
}

#[async_trait]
pub trait Store: Send + Sync {
    // --- Sources ---

    /// Upsert the configured source list by `base_url`. Returns how many rows
    /// were written. Sources are never deleted here.
    async fn sync_sources(&self, configs: &[SourceConfig]) -> Result<u64>;

    async fn active_sources_for(&self, region: &str) -> Result<Vec<Source>>;

    async fn source(&self, source_id: i64) -> Result<Option<Source>>;

    /// Advance the advisory `last_checked_at` watermark. Idempotent.
    async fn touch_source(&self, source_id: i64, at: DateTime<Utc>) -> Result<()>;

    // --- Articles and incidents ---

    /// Atomic insert-if-absent keyed on `(source_id, external_id)`. Never
    /// mutates an existing row.
    async fn upsert_raw(&self, article: &NewArticle) -> Result<UpsertOutcome>;

    /// Insert the 1:1 enrichment row. Errors loudly when a row already exists
    /// for this id — callers must only enrich newly inserted articles.
    async fn store_enriched(&self, incident: &EnrichedIncident) -> Result<()>;

    async fn list_incidents(&self, region: &str, limit: u32) -> Result<Vec<IncidentRecord>>;

    async fn count_incidents(&self, region: &str) -> Result<u64>;

    // --- Refresh jobs ---

    /// Create a job in `pending` with a fresh opaque `job_id`.
    async fn create_job(&self, region: &str) -> Result<RefreshJob>;

    /// pending -> running. Any other starting state is an error.
    async fn mark_job_running(&self, job_id: &str) -> Result<()>;

    /// running -> succeeded, recording the counts.
    async fn mark_job_succeeded(
        &self,
        job_id: &str,
        new_articles: i64,
        total_incidents: i64,
    ) -> Result<()>;

    /// running -> failed, recording the error message.
    async fn mark_job_failed(&self, job_id: &str, error: &str) -> Result<()>;

    async fn job(&self, job_id: &str) -> Result<Option<RefreshJob>>;
}
