//! The per-article fetch loop shared by every parser family.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crimewatch_common::{article_fingerprint, NewArticle, Source};
use crimewatch_fetch::{FetchOptions, PageFetcher};

use crate::extract;

/// Cap on articles processed in a single source run. Listing pages rarely
/// surface more than this, and the watermark picks up the rest next run.
pub(crate) const MAX_ARTICLES_PER_RUN: usize = 20;

/// Polite delay between article fetches within one source.
const ARTICLE_DELAY: Duration = Duration::from_secs(1);

/// Articles with less extracted text than this are navigation pages or stubs.
const MIN_ARTICLE_BODY: usize = 50;

/// How much raw HTML to retain for later reparse.
const RAW_HTML_LIMIT: usize = 10_000;

/// A listing-page candidate that passed the family's filters.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub url: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Fetch each candidate article sequentially, extract its body, and emit
/// `NewArticle` records. Candidates are re-sorted newest-first (undated last)
/// before the watermark check — listings sometimes pin an older release ahead
/// of newer ones, and anchor order alone must not end enumeration early.
/// Individual fetch or extraction failures skip that article only.
pub(crate) async fn collect_articles(
    fetcher: &dyn PageFetcher,
    source: &Source,
    mut candidates: Vec<Candidate>,
    since: Option<DateTime<Utc>>,
    body_selectors: &[&str],
) -> Vec<NewArticle> {
    let options = FetchOptions {
        use_browser: source.use_browser,
        ..FetchOptions::default()
    };

    // Stable sort: dated candidates newest-first, undated ones after them in
    // anchor order.
    candidates.sort_by(|a, b| match (b.published_at, a.published_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let mut articles = Vec::new();

    for (i, candidate) in candidates
        .into_iter()
        .take(MAX_ARTICLES_PER_RUN)
        .enumerate()
    {
        if let (Some(since), Some(published)) = (since, candidate.published_at) {
            if published <= since {
                break;
            }
        }

        if i > 0 {
            tokio::time::sleep(ARTICLE_DELAY).await;
        }

        let page = match fetcher.fetch(&candidate.url, &options).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %candidate.url, error = %e, "Article fetch failed, skipping");
                continue;
            }
        };

        let body = extract::extract_body(&page.body, body_selectors);
        if body.len() < MIN_ARTICLE_BODY {
            warn!(url = %candidate.url, "Too little article content, skipping");
            continue;
        }

        let external_id = article_fingerprint(source.id, &candidate.url, &candidate.title);

        articles.push(NewArticle {
            source_id: source.id,
            external_id,
            url: candidate.url,
            title_raw: candidate.title,
            published_at: candidate.published_at,
            body_raw: body,
            raw_html: Some(extract::truncate_chars(&page.body, RAW_HTML_LIMIT).to_string()),
        });
    }

    articles
}
