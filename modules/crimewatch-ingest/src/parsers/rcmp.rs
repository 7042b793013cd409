//! RCMP detachment newsrooms.
//!
//! Listing pages are JS-rendered, so sources in this family carry the browser
//! hint. Real article links live under `/news/` or `/node/<id>`; everything
//! else on the page is navigation.

use std::sync::Arc;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use url::Url;

use crimewatch_common::{NewArticle, Source};
use crimewatch_fetch::{FetchOptions, PageFetcher};

use crate::dates::parse_flexible_date;
use crate::listing::collect_anchors;
use crate::pipeline::{collect_articles, Candidate};

use super::SourceParser;

const BODY_SELECTORS: &[&str] = &["article", "main", ".content", ".post-content", ".entry-content"];

/// Utility and nav link titles that are never articles.
const BAD_TITLES: &[&str] = &[
    "newsroom archive",
    "social media",
    "british columbia rcmp",
    "about this site",
];

const MIN_TITLE_CHARS: usize = 15;

static NODE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/node/\d+").expect("valid regex"));

pub struct RcmpParser {
    fetcher: Arc<dyn PageFetcher>,
}

impl RcmpParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    async fn discover(&self, source: &Source) -> Result<Vec<Candidate>> {
        let options = FetchOptions {
            use_browser: source.use_browser,
            ..FetchOptions::default()
        };

        let listing = self
            .fetcher
            .fetch(&source.base_url, &options)
            .await
            .with_context(|| format!("RCMP listing fetch failed: {}", source.base_url))?;

        let mut candidates = Vec::new();
        for anchor in collect_anchors(&listing.body, &source.base_url) {
            if !is_article_url(&anchor.url) {
                continue;
            }
            let title = anchor.best_title();
            if is_bad_title(&title) {
                continue;
            }
            let published_at = anchor.date_hint.as_deref().and_then(parse_flexible_date);
            candidates.push(Candidate {
                url: anchor.url,
                title,
                published_at,
            });
        }
        Ok(candidates)
    }
}

#[async_trait]
impl SourceParser for RcmpParser {
    fn parser_id(&self) -> &'static str {
        "rcmp"
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
        let options = FetchOptions {
            use_browser: source.use_browser,
            ..FetchOptions::default()
        };
        let listing = self
            .fetcher
            .fetch(&source.base_url, &options)
            .await
            .with_context(|| format!("RCMP listing fetch failed: {}", source.base_url))?;

        Ok(collect_anchors(&listing.body, &source.base_url)
            .into_iter()
            .map(|a| a.url)
            .filter(|u| is_article_url(u))
            .collect())
    }
}

/// Real RCMP articles sit under `/news/` with a year or id digit in the path,
/// or under Drupal `/node/<digits>`.
fn is_article_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => return false,
    };
    if NODE_PATH_RE.is_match(&path) {
        return true;
    }
    path.contains("/news/") && path.chars().any(|c| c.is_ascii_digit())
}

fn is_bad_title(title: &str) -> bool {
    let t = title.trim().to_lowercase();
    if t.len() < MIN_TITLE_CHARS {
        return true;
    }
    BAD_TITLES.iter().any(|bad| t.contains(bad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_source, MockFetcher};

    const LISTING: &str = r#"
        <html><body>
        <nav><a href="/en/bc">British Columbia RCMP home page link</a></nav>
        <article class="news-item">
            <h3>Langley RCMP arrest two after commercial break and enter</h3>
            <time datetime="2024-12-02T09:00:00Z">December 2, 2024</time>
            <a href="/en/bc/langley/news/2024/12/arrests-break-enter">Read more</a>
        </article>
        <article class="news-item">
            <h3>Police seek witnesses to serious collision on Highway 1</h3>
            <time datetime="2024-12-01T14:00:00Z">December 1, 2024</time>
            <a href="/node/48211">Read more</a>
        </article>
        <div><a href="/en/bc/langley/news/archive">Newsroom archive page listing</a></div>
        <div><a href="/en/bc/langley/contact">Contact us</a></div>
        </body></html>
    "#;

    const ARTICLE_A: &str = r#"
        <html><body><article>
        <p>Langley RCMP officers arrested two suspects following a report of a
        commercial break and enter in the 20100 block of Industrial Avenue. Both
        remain in custody pending a court appearance.</p>
        </article></body></html>
    "#;

    const ARTICLE_B: &str = r#"
        <html><body><main>
        <p>Investigators are asking witnesses of a serious two-vehicle collision
        on Highway 1 near 232 Street to come forward. The highway was closed in
        both directions for several hours.</p>
        </main></body></html>
    "#;

    #[test]
    fn url_filter() {
        assert!(is_article_url("https://rcmp.ca/en/bc/langley/news/2024/12/x"));
        assert!(is_article_url("https://rcmp.ca/node/48211"));
        assert!(!is_article_url("https://rcmp.ca/en/bc/langley/news/"));
        assert!(!is_article_url("https://rcmp.ca/en/bc/contact"));
    }

    #[test]
    fn title_filter() {
        assert!(is_bad_title("Newsroom archive"));
        assert!(is_bad_title("short"));
        assert!(!is_bad_title("Langley RCMP arrest two after break and enter"));
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_new_articles() {
        let fetcher = Arc::new(MockFetcher::new(&[
            ("https://rcmp.ca/en/bc/langley/news", LISTING),
            (
                "https://rcmp.ca/en/bc/langley/news/2024/12/arrests-break-enter",
                ARTICLE_A,
            ),
            ("https://rcmp.ca/node/48211", ARTICLE_B),
        ]));
        let parser = RcmpParser::new(fetcher.clone());
        let source = make_source(1, "https://rcmp.ca/en/bc/langley/news", "rcmp");

        let articles = parser.fetch_new(&source, None).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(
            articles[0].title_raw,
            "Langley RCMP arrest two after commercial break and enter"
        );
        assert!(articles[0].body_raw.contains("Industrial Avenue"));
        assert_eq!(articles[0].external_id.len(), 64);
        assert!(articles[1].body_raw.contains("Highway 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn since_watermark_stops_enumeration() {
        let fetcher = Arc::new(MockFetcher::new(&[
            ("https://rcmp.ca/en/bc/langley/news", LISTING),
            (
                "https://rcmp.ca/en/bc/langley/news/2024/12/arrests-break-enter",
                ARTICLE_A,
            ),
            ("https://rcmp.ca/node/48211", ARTICLE_B),
        ]));
        let parser = RcmpParser::new(fetcher.clone());
        let source = make_source(1, "https://rcmp.ca/en/bc/langley/news", "rcmp");

        // Watermark sits between the two articles: only the newer one returns.
        let since = parse_flexible_date("2024-12-01T20:00:00Z");
        let articles = parser.fetch_new(&source, since).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert!(articles[0].body_raw.contains("Industrial Avenue"));
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_is_an_error() {
        let fetcher = Arc::new(MockFetcher::new(&[]));
        let parser = RcmpParser::new(fetcher);
        let source = make_source(1, "https://rcmp.ca/en/bc/langley/news", "rcmp");
        assert!(parser.fetch_new(&source, None).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_article_is_skipped() {
        // ARTICLE_B missing from the fetcher: run continues with what it has.
        let fetcher = Arc::new(MockFetcher::new(&[
            ("https://rcmp.ca/en/bc/langley/news", LISTING),
            (
                "https://rcmp.ca/en/bc/langley/news/2024/12/arrests-break-enter",
                ARTICLE_A,
            ),
        ]));
        let parser = RcmpParser::new(fetcher);
        let source = make_source(1, "https://rcmp.ca/en/bc/langley/news", "rcmp");

        let articles = parser.fetch_new(&source, None).await.unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn candidates_exclude_nav() {
        let fetcher = Arc::new(MockFetcher::new(&[(
            "https://rcmp.ca/en/bc/langley/news",
            LISTING,
        )]));
        let parser = RcmpParser::new(fetcher);
        let source = make_source(1, "https://rcmp.ca/en/bc/langley/news", "rcmp");

        let urls = parser.candidate_urls(&source).await.unwrap();
        assert!(urls
            .iter()
            .any(|u| u.ends_with("/news/2024/12/arrests-break-enter")));
        assert!(urls.iter().any(|u| u.ends_with("/node/48211")));
        assert!(!urls.iter().any(|u| u.contains("/contact")));
    }
}
