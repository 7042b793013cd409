//! Parser families and the registry that maps `parser_id` strings to them.
//!
//! The family set is closed at build time: `rcmp` for detachment newsrooms,
//! `wordpress` for blog-style sites, `municipal_list` for list/card layouts.

mod municipal;
mod rcmp;
mod wordpress;

pub use municipal::MunicipalListParser;
pub use rcmp::RcmpParser;
pub use wordpress::WordPressParser;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crimewatch_common::{CrimewatchError, NewArticle, Source};
use crimewatch_fetch::PageFetcher;

/// The discovery-and-extract contract every family implements.
#[async_trait]
pub trait SourceParser: Send + Sync {
    /// The registry key for this family.
    fn parser_id(&self) -> &'static str;

    /// Fetch the listing page, discover new articles, and return them
    /// newest-first where `published_at` is known. `since` is an early-exit
    /// hint only — the store is authoritative on duplication.
    ///
    /// A failed listing fetch fails the run; failed article fetches are
    /// logged and skipped.
    async fn fetch_new(
        &self,
        source: &Source,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<NewArticle>>;

    /// Listing-stage candidate URLs after the family's URL filter, before any
    /// article fetches. Debug surface only.
    async fn candidate_urls(&self, source: &Source) -> Result<Vec<String>>;
}

impl std::fmt::Debug for dyn SourceParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceParser").field("parser_id", &self.parser_id()).finish()
    }
}

/// Maps `parser_id` strings to parser implementations.
pub struct ParserRegistry {
    parsers: HashMap<&'static str, Arc<dyn SourceParser>>,
}

impl ParserRegistry {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        let families = [
            Arc::new(RcmpParser::new(fetcher.clone())) as Arc<dyn SourceParser>,
            Arc::new(WordPressParser::new(fetcher.clone())) as Arc<dyn SourceParser>,
            Arc::new(MunicipalListParser::new(fetcher)) as Arc<dyn SourceParser>,
        ];

        let mut parsers = HashMap::new();
        for parser in families {
            parsers.insert(parser.parser_id(), parser);
        }
        Self { parsers }
    }

    pub fn get(&self, parser_id: &str) -> Result<Arc<dyn SourceParser>, CrimewatchError> {
        self.parsers
            .get(parser_id)
            .cloned()
            .ok_or_else(|| CrimewatchError::UnknownParser(parser_id.to_string()))
    }

    pub fn known_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.parsers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
