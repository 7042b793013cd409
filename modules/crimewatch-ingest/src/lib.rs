//! Source parsers: discovery of articles on newsroom listing pages and their
//! normalization into raw article records.

pub mod dates;
pub mod extract;
pub mod listing;
pub mod parsers;
mod pipeline;

pub use parsers::{MunicipalListParser, ParserRegistry, RcmpParser, SourceParser, WordPressParser};

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crimewatch_common::Source;
    use crimewatch_fetch::{FetchError, FetchOptions, FetchedPage, PageFetcher};

    /// Scripted fetcher: canonical URL -> HTML. Unknown URLs 404.
    pub(crate) struct MockFetcher {
        pages: HashMap<String, String>,
        pub(crate) requests: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub(crate) fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(
            &self,
            url: &str,
            _options: &FetchOptions,
        ) -> crimewatch_fetch::Result<FetchedPage> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(html) => Ok(FetchedPage {
                    status: 200,
                    body: html.clone(),
                    final_url: url.to_string(),
                }),
                None => Err(FetchError::Http { status: 404 }),
            }
        }
    }

    pub(crate) fn make_source(id: i64, base_url: &str, parser_id: &str) -> Source {
        Source {
            id,
            agency_name: "Test Police Department".to_string(),
            jurisdiction: "BC".to_string(),
            region_label: "Fraser Valley, BC".to_string(),
            source_type: "MUNICIPAL_PD_NEWS".to_string(),
            base_url: base_url.to_string(),
            parser_id: parser_id.to_string(),
            active: true,
            use_browser: false,
            last_checked_at: None,
        }
    }
}
