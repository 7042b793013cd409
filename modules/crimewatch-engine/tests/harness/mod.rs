//! Deterministic test harness: in-memory store, scripted fetcher, stub
//! enrichment. No network, no database.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crimewatch_common::Source;
use crimewatch_engine::RefreshEngine;
use crimewatch_enrich::StubEnricher;
use crimewatch_fetch::{FetchError, FetchOptions, FetchedPage, PageFetcher};
use crimewatch_ingest::ParserRegistry;
use crimewatch_store::{MemoryStore, Store};

pub const REGION: &str = "Fraser Valley, BC";
pub const LISTING_URL: &str = "https://pd.example.ca/news";

pub const LISTING_TWO_ARTICLES: &str = r#"
    <html><body>
    <div class="news-card">
        <h4><a href="/news/release-alpha">Suspects arrested after overnight robbery spree</a></h4>
    </div>
    <div class="news-card">
        <h4><a href="/news/release-bravo">Police seek dashcam footage after serious collision</a></h4>
    </div>
    </body></html>
"#;

pub const LISTING_THREE_ARTICLES: &str = r#"
    <html><body>
    <div class="news-card">
        <h4><a href="/news/release-charlie">Stolen vehicle recovered, one person in custody</a></h4>
    </div>
    <div class="news-card">
        <h4><a href="/news/release-alpha">Suspects arrested after overnight robbery spree</a></h4>
    </div>
    <div class="news-card">
        <h4><a href="/news/release-bravo">Police seek dashcam footage after serious collision</a></h4>
    </div>
    </body></html>
"#;

pub const ARTICLE_ALPHA: &str = r#"
    <html><body><div class="content">
    <p>Patrol officers arrested two suspects following a series of overnight
    commercial robberies. Investigators believe the pair are responsible for at
    least four incidents across the city.</p>
    </div></body></html>
"#;

pub const ARTICLE_BRAVO: &str = r#"
    <html><body><div class="content">
    <p>Investigators are asking drivers who travelled the Fraser Highway
    corridor on Friday evening to review dashcam footage after a serious
    collision left one person in hospital.</p>
    </div></body></html>
"#;

pub const ARTICLE_CHARLIE: &str = r#"
    <html><body><div class="content">
    <p>A stolen pickup truck was located with the help of an automated licence
    plate reader. The driver was taken into custody without incident and faces
    possession charges.</p>
    </div></body></html>
"#;

/// Scripted fetcher: URL -> HTML, mutable mid-test, with optional hang URLs
/// that never resolve (for deadline tests).
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, String>>,
    hanging: Mutex<HashSet<String>>,
}

impl ScriptedFetcher {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: Mutex::new(
                pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.to_string()))
                    .collect(),
            ),
            hanging: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_page(&self, url: &str, html: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    pub fn hang_on(&self, url: &str) {
        self.hanging.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        _options: &FetchOptions,
    ) -> crimewatch_fetch::Result<FetchedPage> {
        if self.hanging.lock().unwrap().contains(url) {
            std::future::pending::<()>().await;
        }
        let page = self.pages.lock().unwrap().get(url).cloned();
        match page {
            Some(html) => Ok(FetchedPage {
                status: 200,
                body: html,
                final_url: url.to_string(),
            }),
            None => Err(FetchError::Http { status: 404 }),
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub engine: Arc<RefreshEngine>,
}

impl Harness {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new(pages));
        let registry = Arc::new(ParserRegistry::new(fetcher.clone()));
        let engine = Arc::new(RefreshEngine::new(
            store.clone() as Arc<dyn Store>,
            registry,
            Arc::new(StubEnricher),
        ));
        Self {
            store,
            fetcher,
            engine,
        }
    }

    /// The standard two-article municipal site.
    pub fn with_standard_site() -> Self {
        let harness = Self::new(&[
            (LISTING_URL, LISTING_TWO_ARTICLES),
            ("https://pd.example.ca/news/release-alpha", ARTICLE_ALPHA),
            ("https://pd.example.ca/news/release-bravo", ARTICLE_BRAVO),
        ]);
        harness.seed_municipal_source(1, LISTING_URL);
        harness
    }

    pub fn seed_municipal_source(&self, id: i64, base_url: &str) -> i64 {
        self.store.seed_source(make_source(id, base_url, "municipal_list"))
    }
}

pub fn make_source(id: i64, base_url: &str, parser_id: &str) -> Source {
    Source {
        id,
        agency_name: format!("Test Police Department {id}"),
        jurisdiction: "BC".to_string(),
        region_label: REGION.to_string(),
        source_type: "MUNICIPAL_PD_NEWS".to_string(),
        base_url: base_url.to_string(),
        parser_id: parser_id.to_string(),
        active: true,
        use_browser: false,
        last_checked_at: None,
    }
}
