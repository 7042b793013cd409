//! WordPress-style newsrooms (VPD and similar blog layouts).
//!
//! Article cards expose `<time>` elements, which doubles as the article
//! filter: an anchor without a dated card is navigation.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crimewatch_common::{NewArticle, Source};
use crimewatch_fetch::{FetchOptions, PageFetcher};

use crate::dates::parse_flexible_date;
use crate::listing::{collect_anchors, AnchorContext};
use crate::pipeline::{collect_articles, Candidate};

use super::SourceParser;

const BODY_SELECTORS: &[&str] = &[".entry-content", ".post-content", "article", "main", ".content"];

const MIN_TITLE_CHARS: usize = 10;

pub struct WordPressParser {
    fetcher: Arc<dyn PageFetcher>,
}

impl WordPressParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    async fn discover(&self, source: &Source) -> Result<Vec<Candidate>> {
        let listing = self
            .fetcher
            .fetch(&source.base_url, &FetchOptions::default())
            .await
            .with_context(|| format!("WordPress listing fetch failed: {}", source.base_url))?;

        Ok(collect_anchors(&listing.body, &source.base_url)
            .into_iter()
            .filter_map(candidate_from_anchor)
            .collect())
    }
}

fn candidate_from_anchor(anchor: AnchorContext) -> Option<Candidate> {
    // A post card always carries a date; undated anchors are chrome.
    let published_at = parse_flexible_date(anchor.date_hint.as_deref()?)?;

    let title = anchor.best_title();
    if title.len() < MIN_TITLE_CHARS {
        return None;
    }

    Some(Candidate {
        url: anchor.url,
        title,
        published_at: Some(published_at),
    })
}

#[async_trait]
impl SourceParser for WordPressParser {
    fn parser_id(&self) -> &'static str {
        "wordpress"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_source, MockFetcher};

    const LISTING: &str = r#"
        <html><body>
        <nav><a href="/about/">About the department and history</a></nav>
        <article class="post">
            <h2><a href="/news/2024/12/suspect-charged-robbery-series/">Suspect charged in robbery series</a></h2>
            <time datetime="2024-12-03">December 3, 2024</time>
        </article>
        <article class="post">
            <h2><a href="/news/2024/11/public-assistance-missing-senior/">Public assistance sought to locate missing senior</a></h2>
            <time datetime="2024-11-28">November 28, 2024</time>
        </article>
        </body></html>
    "#;

    const ARTICLE_A: &str = r#"
        <html><body>
        <div class="entry-content">
        <p>Charges have been laid against a 34-year-old man in connection with a
        series of commercial robberies. Investigators believe there may be more
        victims and ask anyone with information to call the tip line.</p>
        </div>
        <footer>Share this post</footer>
        </body></html>
    "#;

    const ARTICLE_B: &str = r#"
        <html><body>
        <article>
        <p>The police department is asking for help finding a 78-year-old man
        who was last seen leaving his residence on Tuesday evening. He is
        considered vulnerable due to a medical condition.</p>
        </article>
        </body></html>
    "#;

    #[tokio::test(start_paused = true)]
    async fn undated_anchors_are_navigation() {
        let fetcher = Arc::new(MockFetcher::new(&[
            ("https://vpd.ca/news/", LISTING),
            (
                "https://vpd.ca/news/2024/12/suspect-charged-robbery-series",
                ARTICLE_A,
            ),
            (
                "https://vpd.ca/news/2024/11/public-assistance-missing-senior",
                ARTICLE_B,
            ),
        ]));
        let parser = WordPressParser::new(fetcher);
        let source = make_source(2, "https://vpd.ca/news/", "wordpress");

        let articles = parser.fetch_new(&source, None).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title_raw, "Suspect charged in robbery series");
        assert!(articles[0].body_raw.contains("commercial robberies"));
        assert!(!articles[0].body_raw.contains("Share this post"));
        assert_eq!(
            articles[1].title_raw,
            "Public assistance sought to locate missing senior"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn entry_content_wins_over_article() {
        let html = r#"
            <article>
            <div class="sidebar">Related posts and other listing noise that is
            long enough to pass the minimum body threshold if selected.</div>
            <div class="entry-content">
            <p>A firearm and a quantity of suspected fentanyl were seized during
            a traffic stop near Main and Hastings early Sunday. One man faces
            multiple charges.</p>
            </div>
            </article>
        "#;
        let listing = r#"
            <article class="post">
              <h2><a href="/news/seizure/">Firearm seized during traffic stop</a></h2>
              <time datetime="2024-12-01">December 1, 2024</time>
            </article>
        "#;
        let fetcher = Arc::new(MockFetcher::new(&[
            ("https://vpd.ca/news/", listing),
            ("https://vpd.ca/news/seizure", html),
        ]));
        let parser = WordPressParser::new(fetcher);
        let source = make_source(2, "https://vpd.ca/news/", "wordpress");

        let articles = parser.fetch_new(&source, None).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert!(articles[0].body_raw.contains("fentanyl"));
    }

    #[tokio::test(start_paused = true)]
    async fn watermark_short_circuits() {
        let fetcher = Arc::new(MockFetcher::new(&[
            ("https://vpd.ca/news/", LISTING),
            (
                "https://vpd.ca/news/2024/12/suspect-charged-robbery-series",
                ARTICLE_A,
            ),
        ]));
        let parser = WordPressParser::new(fetcher.clone());
        let source = make_source(2, "https://vpd.ca/news/", "wordpress");

        let since = parse_flexible_date("2024-11-30");
        let articles = parser.fetch_new(&source, since).await.unwrap();
        assert_eq!(articles.len(), 1);

        // The older article page was never requested.
        let requests = fetcher.requests.lock().unwrap();
        assert!(!requests.iter().any(|u| u.contains("missing-senior")));
    }
}
