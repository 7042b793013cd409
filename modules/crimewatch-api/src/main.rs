use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crimewatch_api::{build_router, AppState};
use crimewatch_common::{available_regions, load_sources_file, Config};
use crimewatch_engine::RefreshEngine;
use crimewatch_enrich::{Enricher, LlmEnricher, StubEnricher};
use crimewatch_fetch::{BrowserlessFetcher, FetcherSet, HttpFetcher};
use crimewatch_ingest::ParserRegistry;
use crimewatch_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("crimewatch=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    config.log_redacted();

    // ========== Store ==========
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url).await?;
            pg.migrate().await?;
            info!("Connected to Postgres");
            Arc::new(pg)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store (nothing survives restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // ========== Fetchers and parsers ==========
    let browserless = config
        .browserless_url
        .as_deref()
        .map(|url| BrowserlessFetcher::new(url, config.browserless_token.as_deref()));
    let fetcher = Arc::new(FetcherSet::new(HttpFetcher::new(), browserless));
    let registry = Arc::new(ParserRegistry::new(fetcher));

    // ========== Source list ==========
    if config.sources_file.exists() {
        let sources = load_sources_file(&config.sources_file, &registry.known_ids())?;
        let regions = available_regions(&sources);
        let written = store.sync_sources(&sources).await?;
        info!(
            sources = written,
            regions = ?regions,
            "Synced source list from {}",
            config.sources_file.display()
        );
    } else {
        warn!(
            "Sources file {} not found, serving existing sources only",
            config.sources_file.display()
        );
    }

    // ========== Enricher ==========
    let enricher: Arc<dyn Enricher> = match &config.llm_api_key {
        Some(key) => {
            info!(model = %config.llm_model, "LLM enrichment enabled");
            Arc::new(LlmEnricher::new(key, &config.llm_model))
        }
        None => {
            warn!("LLM_API_KEY not set, enrichment runs in stub mode");
            Arc::new(StubEnricher)
        }
    };

    let engine = Arc::new(RefreshEngine::new(store, registry, enricher));
    let state = Arc::new(AppState { engine });

    let router = build_router(state, config.is_dev());

    let addr = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, dev = config.is_dev(), "crimewatch-api listening");

    axum::serve(listener, router).await?;

    Ok(())
}
