//! Postgres persistence via sqlx.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crimewatch_common::{
    CrimeCategory, CrimewatchError, EnrichedIncident, Entity, JobStatus, NewArticle, RawArticle,
    RefreshJob, Severity, Source, SourceConfig,
};

use crate::{IncidentRecord, Store, UpsertOutcome};

pub struct PgStore {
    pool: PgPool,
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: i64,
    agency_name: String,
    jurisdiction: String,
    region_label: String,
    source_type: String,
    base_url: String,
    parser_id: String,
    active: bool,
    use_browser: bool,
    last_checked_at: Option<DateTime<Utc>>,
}

impl From<SourceRow> for Source {
    fn from(r: SourceRow) -> Self {
        Source {
            id: r.id,
            agency_name: r.agency_name,
            jurisdiction: r.jurisdiction,
            region_label: r.region_label,
            source_type: r.source_type,
            base_url: r.base_url,
            parser_id: r.parser_id,
            active: r.active,
            use_browser: r.use_browser,
            last_checked_at: r.last_checked_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IncidentRow {
    // articles_raw
    id: i64,
    source_id: i64,
    external_id: String,
    url: String,
    title_raw: String,
    published_at: Option<DateTime<Utc>>,
    body_raw: String,
    raw_html: Option<String>,
    created_at: DateTime<Utc>,
    // incidents_enriched
    severity: String,
    summary_tactical: String,
    tags: serde_json::Value,
    entities: serde_json::Value,
    location_label: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    graph_cluster_key: Option<String>,
    crime_category: String,
    temporal_context: Option<String>,
    weapon_involved: Option<String>,
    tactical_advice: Option<String>,
    llm_model: String,
    prompt_version: String,
    processed_at: DateTime<Utc>,
    // sources
    agency_name: String,
    jurisdiction: String,
    region_label: String,
    source_type: String,
    base_url: String,
    parser_id: String,
    active: bool,
    use_browser: bool,
    last_checked_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    job_id: String,
    region: String,
    status: String,
    new_articles: Option<i64>,
    total_incidents: Option<i64>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for RefreshJob {
    type Error = anyhow::Error;

    fn try_from(r: JobRow) -> Result<Self> {
        let status = JobStatus::parse(&r.status)
            .ok_or_else(|| CrimewatchError::Store(format!("Unknown job status: {}", r.status)))?;
        Ok(RefreshJob {
            id: r.id,
            job_id: r.job_id,
            region: r.region,
            status,
            new_articles: r.new_articles,
            total_incidents: r.total_incidents,
            error_message: r.error_message,
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
        })
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Migration failed")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A guarded transition updated zero rows: report whether the job is
    /// missing or just not in the expected state.
    async fn check_transition(
        &self,
        job_id: &str,
        rows_affected: u64,
        target: JobStatus,
    ) -> Result<()> {
        if rows_affected == 1 {
            return Ok(());
        }

        let current = sqlx::query_scalar::<_, String>(
            "SELECT status FROM refresh_jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        match current {
            None => Err(CrimewatchError::JobNotFound(job_id.to_string()).into()),
            Some(from) => Err(CrimewatchError::InvalidJobTransition {
                from,
                to: target.to_string(),
            }
            .into()),
        }
    }
}

fn incident_record(row: IncidentRow) -> IncidentRecord {
    let severity = Severity::parse(&row.severity).unwrap_or(Severity::Medium);
    let crime_category =
        CrimeCategory::parse(&row.crime_category).unwrap_or(CrimeCategory::Unknown);
    let tags: Vec<String> = serde_json::from_value(row.tags).unwrap_or_default();
    let entities: Vec<Entity> = serde_json::from_value(row.entities).unwrap_or_default();

    IncidentRecord {
        source: Source {
            id: row.source_id,
            agency_name: row.agency_name,
            jurisdiction: row.jurisdiction,
            region_label: row.region_label,
            source_type: row.source_type,
            base_url: row.base_url,
            parser_id: row.parser_id,
            active: row.active,
            use_browser: row.use_browser,
            last_checked_at: row.last_checked_at,
        },
        article: RawArticle {
            id: row.id,
            source_id: row.source_id,
            external_id: row.external_id,
            url: row.url,
            title_raw: row.title_raw,
            published_at: row.published_at,
            body_raw: row.body_raw,
            raw_html: row.raw_html,
            created_at: row.created_at,
        },
        incident: EnrichedIncident {
            id: row.id,
            severity,
            summary_tactical: row.summary_tactical,
            tags,
            entities,
            location_label: row.location_label,
            lat: row.lat,
            lng: row.lng,
            graph_cluster_key: row.graph_cluster_key,
            crime_category,
            temporal_context: row.temporal_context,
            weapon_involved: row.weapon_involved,
            tactical_advice: row.tactical_advice,
            llm_model: row.llm_model,
            prompt_version: row.prompt_version,
            processed_at: row.processed_at,
        },
    }
}

#[async_trait]
impl Store for PgStore {
    async fn sync_sources(&self, configs: &[SourceConfig]) -> Result<u64> {
        let mut written = 0;
        for config in configs {
            sqlx::query(
                r#"
                INSERT INTO sources
                    (agency_name, jurisdiction, region_label, source_type,
                     base_url, parser_id, active, use_browser)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (base_url) DO UPDATE SET
                    agency_name = EXCLUDED.agency_name,
                    jurisdiction = EXCLUDED.jurisdiction,
                    region_label = EXCLUDED.region_label,
                    source_type = EXCLUDED.source_type,
                    parser_id = EXCLUDED.parser_id,
                    active = EXCLUDED.active,
                    use_browser = EXCLUDED.use_browser
                "#,
            )
            .bind(&config.agency_name)
            .bind(&config.jurisdiction)
            .bind(&config.region_label)
            .bind(&config.source_type)
            .bind(&config.base_url)
            .bind(&config.parser_id)
            .bind(config.active)
            .bind(config.use_browser)
            .execute(&self.pool)
            .await?;
            written += 1;
        }
        Ok(written)
    }

    async fn active_sources_for(&self, region: &str) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT * FROM sources
            WHERE region_label = $1 AND active
            ORDER BY id
            "#,
        )
        .bind(region)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Source::from).collect())
    }

    async fn source(&self, source_id: i64) -> Result<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM sources WHERE id = $1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Source::from))
    }

    async fn touch_source(&self, source_id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sources SET last_checked_at = $2 WHERE id = $1")
            .bind(source_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_raw(&self, article: &NewArticle) -> Result<UpsertOutcome> {
        // Atomic insert-if-absent; the unique constraint is the authority.
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO articles_raw
                (source_id, external_id, url, title_raw, published_at, body_raw, raw_html)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_id, external_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(article.source_id)
        .bind(&article.external_id)
        .bind(&article.url)
        .bind(&article.title_raw)
        .bind(article.published_at)
        .bind(&article.body_raw)
        .bind(&article.raw_html)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(UpsertOutcome { id, inserted: true });
        }

        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM articles_raw WHERE source_id = $1 AND external_id = $2",
        )
        .bind(article.source_id)
        .bind(&article.external_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UpsertOutcome {
            id,
            inserted: false,
        })
    }

    async fn store_enriched(&self, incident: &EnrichedIncident) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO incidents_enriched
                (id, severity, summary_tactical, tags, entities, location_label,
                 lat, lng, graph_cluster_key, crime_category, temporal_context,
                 weapon_involved, tactical_advice, llm_model, prompt_version, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(incident.id)
        .bind(incident.severity.as_str())
        .bind(&incident.summary_tactical)
        .bind(serde_json::to_value(&incident.tags)?)
        .bind(serde_json::to_value(&incident.entities)?)
        .bind(&incident.location_label)
        .bind(incident.lat)
        .bind(incident.lng)
        .bind(&incident.graph_cluster_key)
        .bind(incident.crime_category.as_str())
        .bind(&incident.temporal_context)
        .bind(&incident.weapon_involved)
        .bind(&incident.tactical_advice)
        .bind(&incident.llm_model)
        .bind(&incident.prompt_version)
        .bind(incident.processed_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store enrichment for article {}", incident.id))?;

        Ok(())
    }

    async fn list_incidents(&self, region: &str, limit: u32) -> Result<Vec<IncidentRecord>> {
        let rows = sqlx::query_as::<_, IncidentRow>(
            r#"
            SELECT
                a.id, a.source_id, a.external_id, a.url, a.title_raw,
                a.published_at, a.body_raw, a.raw_html, a.created_at,
                e.severity, e.summary_tactical, e.tags, e.entities,
                e.location_label, e.lat, e.lng, e.graph_cluster_key,
                e.crime_category, e.temporal_context, e.weapon_involved,
                e.tactical_advice, e.llm_model, e.prompt_version, e.processed_at,
                s.agency_name, s.jurisdiction, s.region_label, s.source_type,
                s.base_url, s.parser_id, s.active, s.use_browser, s.last_checked_at
            FROM articles_raw a
            JOIN incidents_enriched e ON e.id = a.id
            JOIN sources s ON s.id = a.source_id
            WHERE s.region_label = $1
            ORDER BY a.published_at DESC NULLS LAST, a.id DESC
            LIMIT $2
            "#,
        )
        .bind(region)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(incident_record).collect())
    }

    async fn count_incidents(&self, region: &str) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM incidents_enriched e
            JOIN articles_raw a ON a.id = e.id
            JOIN sources s ON s.id = a.source_id
            WHERE s.region_label = $1
            "#,
        )
        .bind(region)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn create_job(&self, region: &str) -> Result<RefreshJob> {
        let job_id = Uuid::new_v4().to_string();
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO refresh_jobs (job_id, region, status)
            VALUES ($1, $2, 'pending')
            RETURNING *
            "#,
        )
        .bind(&job_id)
        .bind(region)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn mark_job_running(&self, job_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE refresh_jobs SET status = 'running', started_at = now()
             WHERE job_id = $1 AND status = 'pending'",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        self.check_transition(job_id, result.rows_affected(), JobStatus::Running)
            .await
    }

    async fn mark_job_succeeded(
        &self,
        job_id: &str,
        new_articles: i64,
        total_incidents: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE refresh_jobs
             SET status = 'succeeded', new_articles = $2, total_incidents = $3,
                 completed_at = now()
             WHERE job_id = $1 AND status = 'running'",
        )
        .bind(job_id)
        .bind(new_articles)
        .bind(total_incidents)
        .execute(&self.pool)
        .await?;

        self.check_transition(job_id, result.rows_affected(), JobStatus::Succeeded)
            .await
    }

    async fn mark_job_failed(&self, job_id: &str, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE refresh_jobs
             SET status = 'failed', error_message = $2, completed_at = now()
             WHERE job_id = $1 AND status = 'running'",
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        self.check_transition(job_id, result.rows_affected(), JobStatus::Failed)
            .await
    }

    async fn job(&self, job_id: &str) -> Result<Option<RefreshJob>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM refresh_jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(RefreshJob::try_from).transpose()
    }
}
