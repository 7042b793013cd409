//! In-memory store twin. Same contract as `PgStore`, no database.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crimewatch_common::{
    CrimewatchError, EnrichedIncident, JobStatus, NewArticle, RawArticle, RefreshJob, Source,
    SourceConfig,
};

use crate::{IncidentRecord, Store, UpsertOutcome};

#[derive(Default)]
struct Inner {
    sources: Vec<Source>,
    articles: Vec<RawArticle>,
    incidents: HashMap<i64, EnrichedIncident>,
    jobs: Vec<RefreshJob>,
    next_source_id: i64,
    next_article_id: i64,
    next_job_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a source directly, bypassing the config sync. Test convenience.
    pub fn seed_source(&self, source: Source) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let mut source = source;
        if source.id == 0 {
            inner.next_source_id += 1;
            source.id = inner.next_source_id;
        } else {
            inner.next_source_id = inner.next_source_id.max(source.id);
        }
        let id = source.id;
        inner.sources.push(source);
        id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn sync_sources(&self, configs: &[SourceConfig]) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut written = 0;

        for config in configs {
            if let Some(existing) = inner
                .sources
                .iter_mut()
                .find(|s| s.base_url == config.base_url)
            {
                existing.agency_name = config.agency_name.clone();
                existing.jurisdiction = config.jurisdiction.clone();
                existing.region_label = config.region_label.clone();
                existing.source_type = config.source_type.clone();
                existing.parser_id = config.parser_id.clone();
                existing.active = config.active;
                existing.use_browser = config.use_browser;
            } else {
                inner.next_source_id += 1;
                let id = inner.next_source_id;
                inner.sources.push(Source {
                    id,
                    agency_name: config.agency_name.clone(),
                    jurisdiction: config.jurisdiction.clone(),
                    region_label: config.region_label.clone(),
                    source_type: config.source_type.clone(),
                    base_url: config.base_url.clone(),
                    parser_id: config.parser_id.clone(),
                    active: config.active,
                    use_browser: config.use_browser,
                    last_checked_at: None,
                });
            }
            written += 1;
        }

        Ok(written)
    }

    async fn active_sources_for(&self, region: &str) -> Result<Vec<Source>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sources
            .iter()
            .filter(|s| s.active && s.region_label == region)
            .cloned()
            .collect())
    }

    async fn source(&self, source_id: i64) -> Result<Option<Source>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sources.iter().find(|s| s.id == source_id).cloned())
    }

    async fn touch_source(&self, source_id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(source) = inner.sources.iter_mut().find(|s| s.id == source_id) {
            source.last_checked_at = Some(at);
        }
        Ok(())
    }

    async fn upsert_raw(&self, article: &NewArticle) -> Result<UpsertOutcome> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner
            .articles
            .iter()
            .find(|a| a.source_id == article.source_id && a.external_id == article.external_id)
        {
            return Ok(UpsertOutcome {
                id: existing.id,
                inserted: false,
            });
        }

        inner.next_article_id += 1;
        let id = inner.next_article_id;
        inner.articles.push(RawArticle {
            id,
            source_id: article.source_id,
            external_id: article.external_id.clone(),
            url: article.url.clone(),
            title_raw: article.title_raw.clone(),
            published_at: article.published_at,
            body_raw: article.body_raw.clone(),
            raw_html: article.raw_html.clone(),
            created_at: Utc::now(),
        });

        Ok(UpsertOutcome { id, inserted: true })
    }

    async fn store_enriched(&self, incident: &EnrichedIncident) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.articles.iter().any(|a| a.id == incident.id) {
            anyhow::bail!("No raw article with id {} to enrich", incident.id);
        }
        if inner.incidents.contains_key(&incident.id) {
            return Err(CrimewatchError::Store(format!(
                "Enrichment already exists for article {}",
                incident.id
            ))
            .into());
        }

        inner.incidents.insert(incident.id, incident.clone());
        Ok(())
    }

    async fn list_incidents(&self, region: &str, limit: u32) -> Result<Vec<IncidentRecord>> {
        let inner = self.inner.lock().unwrap();

        let mut records: Vec<IncidentRecord> = inner
            .articles
            .iter()
            .filter_map(|article| {
                let source = inner
                    .sources
                    .iter()
                    .find(|s| s.id == article.source_id && s.region_label == region)?;
                let incident = inner.incidents.get(&article.id)?;
                Some(IncidentRecord {
                    source: source.clone(),
                    article: article.clone(),
                    incident: incident.clone(),
                })
            })
            .collect();

        // published_at DESC with NULLS LAST, then id DESC.
        records.sort_by(|a, b| {
            match (b.article.published_at, a.article.published_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Greater,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then(b.article.id.cmp(&a.article.id))
        });
        records.truncate(limit as usize);

        Ok(records)
    }

    async fn count_incidents(&self, region: &str) -> Result<u64> {
        let inner = self.inner.lock().unwrap();
        let count = inner
            .articles
            .iter()
            .filter(|article| {
                inner.incidents.contains_key(&article.id)
                    && inner
                        .sources
                        .iter()
                        .any(|s| s.id == article.source_id && s.region_label == region)
            })
            .count();
        Ok(count as u64)
    }

    async fn create_job(&self, region: &str) -> Result<RefreshJob> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_job_id += 1;
        let job = RefreshJob {
            id: inner.next_job_id,
            job_id: Uuid::new_v4().to_string(),
            region: region.to_string(),
            status: JobStatus::Pending,
            new_articles: None,
            total_incidents: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        inner.jobs.push(job.clone());
        Ok(job)
    }

    async fn mark_job_running(&self, job_id: &str) -> Result<()> {
        self.transition(job_id, JobStatus::Pending, JobStatus::Running, |job| {
            job.started_at = Some(Utc::now());
        })
    }

    async fn mark_job_succeeded(
        &self,
        job_id: &str,
        new_articles: i64,
        total_incidents: i64,
    ) -> Result<()> {
        self.transition(job_id, JobStatus::Running, JobStatus::Succeeded, |job| {
            job.new_articles = Some(new_articles);
            job.total_incidents = Some(total_incidents);
            job.completed_at = Some(Utc::now());
        })
    }

    async fn mark_job_failed(&self, job_id: &str, error: &str) -> Result<()> {
        self.transition(job_id, JobStatus::Running, JobStatus::Failed, |job| {
            job.error_message = Some(error.to_string());
            job.completed_at = Some(Utc::now());
        })
    }

    async fn job(&self, job_id: &str) -> Result<Option<RefreshJob>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.jobs.iter().find(|j| j.job_id == job_id).cloned())
    }
}

impl MemoryStore {
    fn transition(
        &self,
        job_id: &str,
        expected: JobStatus,
        target: JobStatus,
        apply: impl FnOnce(&mut RefreshJob),
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.job_id == job_id)
            .ok_or_else(|| CrimewatchError::JobNotFound(job_id.to_string()))?;

        if job.status != expected {
            return Err(CrimewatchError::InvalidJobTransition {
                from: job.status.to_string(),
                to: target.to_string(),
            }
            .into());
        }

        job.status = target;
        apply(job);
        Ok(())
    }
}
