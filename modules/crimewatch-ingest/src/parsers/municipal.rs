//! Municipal police newsrooms with list/card layouts (Surrey PD, Abbotsford
//! PD and similar). No reliable markup to key on, so the filter is a
//! news-like path segment plus a blacklist of the usual site chrome.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use crimewatch_common::{NewArticle, Source};
use crimewatch_fetch::{FetchOptions, PageFetcher};

use crate::dates::parse_flexible_date;
use crate::listing::{collect_anchors, AnchorContext};
use crate::pipeline::{collect_articles, Candidate};

use super::SourceParser;

const BODY_SELECTORS: &[&str] = &[".content", "#content", ".news-content", "article", "main"];

/// Path segments that mark a news-like URL.
const NEWS_SEGMENTS: &[&str] = &["news", "release", "media", "blotter", "incident", "advisor"];

/// Path keywords that mark obvious non-articles.
const PATH_BLACKLIST: &[&str] = &[
    "login", "signin", "contact", "about", "privacy", "terms", "subscribe", "search", "sitemap",
    "careers", "faq", "tag/", "category/", "feed", "rss", "share", "facebook", "twitter",
    "instagram", "youtube", "linkedin",
];

/// Anchor titles that are navigation, whatever their URL looks like.
const NAV_TITLES: &[&str] = &["home", "about", "contact", "menu", "search", "subscribe", "login"];

const MIN_TITLE_CHARS: usize = 10;

pub struct MunicipalListParser {
    fetcher: Arc<dyn PageFetcher>,
}

impl MunicipalListParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    async fn discover(&self, source: &Source) -> Result<Vec<Candidate>> {
        let listing = self
            .fetcher
            .fetch(&source.base_url, &FetchOptions::default())
            .await
            .with_context(|| format!("Municipal listing fetch failed: {}", source.base_url))?;

        Ok(collect_anchors(&listing.body, &source.base_url)
            .into_iter()
            .filter_map(candidate_from_anchor)
            .collect())
    }
}

fn candidate_from_anchor(anchor: AnchorContext) -> Option<Candidate> {
    if !is_article_url(&anchor.url) {
        return None;
    }

    let title = anchor.best_title();
    if title.len() < MIN_TITLE_CHARS {
        return None;
    }
    let lower = title.to_lowercase();
    if NAV_TITLES.iter().any(|nav| lower.trim() == *nav) {
        return None;
    }

    let published_at = anchor.date_hint.as_deref().and_then(parse_flexible_date);

    Some(Candidate {
        url: anchor.url,
        title,
        published_at,
    })
}

/// News-like path segment required; blacklist keywords rejected.
fn is_article_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_lowercase(),
        Err(_) => return false,
    };
    if PATH_BLACKLIST.iter().any(|kw| path.contains(kw)) {
        return false;
    }
    NEWS_SEGMENTS.iter().any(|kw| path.contains(kw))
}

#[async_trait]
impl SourceParser for MunicipalListParser {
    fn parser_id(&self) -> &'static str {
        "municipal_list"
    }

    async fn fetch_new(
        &self,
        source: &Source,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<NewArticle>> {
        let candidates = self.discover(source).await?;
        Ok(collect_articles(self.fetcher.as_ref(), source, candidates, since, BODY_SELECTORS).await)
    }

    async fn candidate_urls(&self, source: &Source) -> Result<Vec<String>> {
        Ok(self
            .discover(source)
            .await?
            .into_iter()
            .map(|c| c.url)
            .collect())
    }
}
