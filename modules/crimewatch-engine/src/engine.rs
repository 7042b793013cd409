use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crimewatch_common::{
    CrimewatchError, EnrichedIncident, NewArticle, RefreshJob, RefreshOutcome, Source,
};
use crimewatch_enrich::{Enricher, SourceContext};
use crimewatch_ingest::ParserRegistry;
use crimewatch_store::{IncidentRecord, Store};

use crate::views;

/// Fan-out cap across sources within one refresh.
pub const MAX_CONCURRENT_SOURCES: usize = 4;

/// Wall-clock budget for one source's whole run (listing, articles,
/// enrichment). Articles persisted before the deadline stay persisted.
pub const SOURCE_DEADLINE: Duration = Duration::from_secs(45);

/// Incident window used for the derived graph and map views.
const VIEW_LIMIT: u32 = 500;

/// How a single source run ended. Never fatal to the region refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceRunStatus {
    Ok,
    ParserUnknown,
    ListingFetchFailed,
    Timeout,
}

pub struct RefreshEngine {
    store: Arc<dyn Store>,
    registry: Arc<ParserRegistry>,
    enricher: Arc<dyn Enricher>,
}

impl RefreshEngine {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ParserRegistry>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self {
            store,
            registry,
            enricher,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn enricher(&self) -> &Arc<dyn Enricher> {
        &self.enricher
    }

    pub fn registry(&self) -> &Arc<ParserRegistry> {
        &self.registry
    }

    /// Refresh every active source in `region` and return honest aggregate
    /// counts. Individual source failures lower the count; only a region with
    /// no active sources is an error.
    pub async fn refresh(&self, region: &str) -> Result<RefreshOutcome, CrimewatchError> {
        let sources = self.store.active_sources_for(region).await?;
        if sources.is_empty() {
            return Err(CrimewatchError::NoActiveSources(region.to_string()));
        }

        info!(region, sources = sources.len(), "Refresh starting");

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_SOURCES));
        let mut tasks = JoinSet::new();

        for source in sources {
            let store = self.store.clone();
            let registry = self.registry.clone();
            let enricher = self.enricher.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return 0,
                };

                let (inserted, status) = match tokio::time::timeout(
                    SOURCE_DEADLINE,
                    refresh_source(&*store, &registry, &*enricher, &source),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => (0, SourceRunStatus::Timeout),
                };

                match status {
                    SourceRunStatus::Ok => info!(
                        agency = %source.agency_name,
                        inserted,
                        "Source refresh complete"
                    ),
                    _ => warn!(
                        agency = %source.agency_name,
                        status = ?status,
                        inserted,
                        "Source refresh did not complete cleanly"
                    ),
                }

                // The watermark advances even on failure so a broken source
                // cannot look perpetually due.
                if let Err(e) = store.touch_source(source.id, Utc::now()).await {
                    warn!(source_id = source.id, error = %e, "Failed to advance watermark");
                }

                inserted
            });
        }

        let mut new_articles: u64 = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(count) => new_articles += count,
                Err(e) => warn!(error = %e, "Source task panicked"),
            }
        }

        let total_incidents = self.store.count_incidents(region).await?;

        info!(region, new_articles, total_incidents, "Refresh complete");

        Ok(RefreshOutcome {
            region: region.to_string(),
            new_articles,
            total_incidents,
        })
    }

    /// Create a refresh job and run it in the background. Observers poll
    /// `job()`; there is no cancellation interface.
    pub async fn start_async(self: Arc<Self>, region: &str) -> Result<RefreshJob, CrimewatchError> {
        let job = self.store.create_job(region).await?;

        let engine = Arc::clone(&self);
        let job_id = job.job_id.clone();
        let region = region.to_string();

        tokio::spawn(async move {
            if let Err(e) = engine.store.mark_job_running(&job_id).await {
                warn!(job_id = %job_id, error = %e, "Failed to start refresh job");
                return;
            }

            match engine.refresh(&region).await {
                Ok(outcome) => {
                    if let Err(e) = engine
                        .store
                        .mark_job_succeeded(
                            &job_id,
                            outcome.new_articles as i64,
                            outcome.total_incidents as i64,
                        )
                        .await
                    {
                        warn!(job_id = %job_id, error = %e, "Failed to record job success");
                    }
                }
                Err(e) => {
                    if let Err(mark_err) = engine.store.mark_job_failed(&job_id, &e.to_string()).await
                    {
                        warn!(job_id = %job_id, error = %mark_err, "Failed to record job failure");
                    }
                }
            }
        });

        Ok(job)
    }

    pub async fn job(&self, job_id: &str) -> Result<RefreshJob, CrimewatchError> {
        self.store
            .job(job_id)
            .await?
            .ok_or_else(|| CrimewatchError::JobNotFound(job_id.to_string()))
    }

    // --- Read side ---

    pub async fn incidents(
        &self,
        region: &str,
        limit: u32,
    ) -> Result<Vec<IncidentRecord>, CrimewatchError> {
        Ok(self.store.list_incidents(region, limit).await?)
    }

    pub async fn graph(&self, region: &str) -> Result<views::GraphView, CrimewatchError> {
        let records = self.store.list_incidents(region, VIEW_LIMIT).await?;
        Ok(views::graph_view(region, &records))
    }

    pub async fn map(&self, region: &str) -> Result<Vec<views::MapMarker>, CrimewatchError> {
        let records = self.store.list_incidents(region, VIEW_LIMIT).await?;
        Ok(views::map_view(&records))
    }

    /// Listing-stage candidate URLs for one source. Debug surface.
    pub async fn candidate_urls(&self, source_id: i64) -> Result<Vec<String>, CrimewatchError> {
        let source = self
            .store
            .source(source_id)
            .await?
            .ok_or_else(|| CrimewatchError::Store(format!("No source with id {source_id}")))?;
        let parser = self.registry.get(&source.parser_id)?;
        parser
            .candidate_urls(&source)
            .await
            .map_err(CrimewatchError::from)
    }

    /// Run the enricher against a canned release. Debug surface.
    pub async fn enrichment_check(&self) -> EnrichmentCheck {
        let article = NewArticle {
            source_id: 0,
            external_id: String::new(),
            url: "https://example.invalid/news/check".to_string(),
            title_raw: "Armed robbery suspect arrested after brief pursuit".to_string(),
            published_at: None,
            body_raw: "Officers arrested one man following an armed robbery at a \
                       convenience store. A replica firearm was recovered at the scene."
                .to_string(),
            raw_html: None,
        };
        let ctx = SourceContext {
            agency_name: "Self Test PD",
            region_label: "Self Test",
        };

        let incident = self.enricher.enrich(0, &article, &ctx).await;
        EnrichmentCheck {
            ok: true,
            model_name: self.enricher.model_name().to_string(),
            prompt_version: self.enricher.prompt_version().to_string(),
            severity: incident.severity.as_str().to_string(),
            summary: incident.summary_tactical,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EnrichmentCheck {
    pub ok: bool,
    pub model_name: String,
    pub prompt_version: String,
    pub severity: String,
    pub summary: String,
}

/// One source's run: resolve parser, pull new articles, persist and enrich
/// each. Article-level failures are absorbed here; only the inserted count
/// escapes.
async fn refresh_source(
    store: &dyn Store,
    registry: &ParserRegistry,
    enricher: &dyn Enricher,
    source: &Source,
) -> (u64, SourceRunStatus) {
    let parser = match registry.get(&source.parser_id) {
        Ok(parser) => parser,
        Err(e) => {
            warn!(agency = %source.agency_name, error = %e, "Skipping source");
            return (0, SourceRunStatus::ParserUnknown);
        }
    };

    let articles = match parser.fetch_new(source, source.last_checked_at).await {
        Ok(articles) => articles,
        Err(e) => {
            warn!(agency = %source.agency_name, error = %e, "Listing fetch failed");
            return (0, SourceRunStatus::ListingFetchFailed);
        }
    };

    let ctx = SourceContext {
        agency_name: &source.agency_name,
        region_label: &source.region_label,
    };

    let mut inserted_count: u64 = 0;

    for article in articles {
        let outcome = match store.upsert_raw(&article).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url = %article.url, error = %e, "Article upsert failed, skipping");
                continue;
            }
        };

        if !outcome.inserted {
            continue;
        }
        inserted_count += 1;

        let incident: EnrichedIncident = enricher.enrich(outcome.id, &article, &ctx).await;

        // A duplicate here means another refresh raced us to the same new
        // article; the stored copy wins.
        if let Err(e) = store.store_enriched(&incident).await {
            warn!(article_id = outcome.id, error = %e, "Failed to store enrichment");
        }
    }

    (inserted_count, SourceRunStatus::Ok)
}
