//! Listing-page anchor discovery shared by all parser families.
//!
//! Collects every candidate anchor with enough surrounding context (nearest
//! card container, heading, and `<time>` hint) for the families to apply
//! their own filters on top.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crimewatch_common::canonicalize_url;

use crate::extract::element_text;

/// Containers that act as a "card" around a listing anchor.
const CARD_TAGS: &[&str] = &["article", "li", "div", "td", "tr", "section"];

/// An anchor found on a listing page, with the context needed for filtering.
#[derive(Debug, Clone)]
pub struct AnchorContext {
    /// Absolute, canonicalized target URL.
    pub url: String,
    /// Anchor text, whitespace-normalized.
    pub text: String,
    /// Text of the nearest heading inside the surrounding card, if any.
    pub heading: Option<String>,
    /// Raw date hint from the surrounding card (`<time datetime>`, a
    /// date-classed element, or nothing).
    pub date_hint: Option<String>,
}

impl AnchorContext {
    /// Anchor text, falling back to the card heading when the anchor itself
    /// is weak (image links, "Read more" stubs).
    pub fn best_title(&self) -> String {
        if self.text.len() >= 20 {
            return self.text.clone();
        }
        match &self.heading {
            Some(h) if h.len() > self.text.len() => h.clone(),
            _ => self.text.clone(),
        }
    }
}

/// Collect all plausible anchors from a listing page: absolutized against
/// `base_url`, http(s) only, deduplicated by canonical URL in document order,
/// self-links to the listing removed.
pub fn collect_anchors(html: &str, base_url: &str) -> Vec<AnchorContext> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let listing_canonical = canonicalize_url(base_url);

    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]").expect("valid selector");
    let time_selector = Selector::parse("time").expect("valid selector");
    let heading_selector = Selector::parse("h1, h2, h3, h4, h5").expect("valid selector");
    let date_class_selector = Selector::parse("[class*='date']").expect("valid selector");

    let mut seen = std::collections::HashSet::new();
    let mut anchors = Vec::new();

    for element in document.select(&anchor_selector) {
        let href = element.value().attr("href").unwrap_or("").trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        let url = canonicalize_url(resolved.as_str());
        if url == listing_canonical {
            continue;
        }
        if !seen.insert(url.clone()) {
            continue;
        }

        let card = nearest_card(&element);
        let (heading, date_hint) = match card {
            Some(card) => {
                let heading = card
                    .select(&heading_selector)
                    .next()
                    .map(element_text)
                    .filter(|t| !t.is_empty());
                let date_hint = card
                    .select(&time_selector)
                    .next()
                    .map(|t| {
                        t.value()
                            .attr("datetime")
                            .map(str::to_string)
                            .unwrap_or_else(|| element_text(t))
                    })
                    .or_else(|| {
                        card.select(&date_class_selector)
                            .next()
                            .map(element_text)
                    })
                    .filter(|t| !t.is_empty());
                (heading, date_hint)
            }
            None => (None, None),
        };

        anchors.push(AnchorContext {
            url,
            text: element_text(element),
            heading,
            date_hint,
        });
    }

    anchors
}

/// Walk up from an anchor to the nearest card-like ancestor.
fn nearest_card<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut current = element.parent();
    while let Some(node) = current {
        if let Some(el) = ElementRef::wrap(node) {
            if CARD_TAGS.contains(&el.value().name()) {
                return Some(el);
            }
        }
        current = node.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_and_dedups() {
        let html = r#"
            <html><body>
                <a href="/news/2024/release-1">First</a>
                <a href="https://vpd.ca/news/2024/release-1">First again</a>
                <a href="/news/2024/release-2">Second</a>
            </body></html>
        "#;
        let anchors = collect_anchors(html, "https://vpd.ca/news/");
        let urls: Vec<&str> = anchors.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://vpd.ca/news/2024/release-1",
                "https://vpd.ca/news/2024/release-2"
            ]
        );
    }

    #[test]
    fn skips_non_navigable() {
        let html = r##"
            <body>
                <a href="#main">Skip</a>
                <a href="javascript:void(0)">JS</a>
                <a href="mailto:media@vpd.ca">Email</a>
                <a href="tel:604-555-0100">Call</a>
                <a href="/news/real">Real</a>
            </body>
        "##;
        let anchors = collect_anchors(html, "https://vpd.ca/");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].url, "https://vpd.ca/news/real");
    }

    #[test]
    fn skips_listing_self_link() {
        let html = r#"<body><a href="/news/">News</a><a href="/news/item-1">Item</a></body>"#;
        let anchors = collect_anchors(html, "https://vpd.ca/news/");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].url, "https://vpd.ca/news/item-1");
    }

    #[test]
    fn captures_card_context() {
        let html = r#"
            <article>
                <h3>Suspect arrested after overnight pursuit</h3>
                <time datetime="2024-12-01T08:00:00Z">December 1, 2024</time>
                <a href="/news/pursuit">Read more</a>
            </article>
        "#;
        let anchors = collect_anchors(html, "https://vpd.ca/");
        assert_eq!(anchors.len(), 1);
        assert_eq!(
            anchors[0].heading.as_deref(),
            Some("Suspect arrested after overnight pursuit")
        );
        assert_eq!(anchors[0].date_hint.as_deref(), Some("2024-12-01T08:00:00Z"));
        assert_eq!(anchors[0].best_title(), "Suspect arrested after overnight pursuit");
    }

    #[test]
    fn date_class_fallback() {
        let html = r#"
            <div class="news-item">
                <span class="posted-date">November 15, 2024</span>
                <a href="/news/item">A fairly long release headline here</a>
            </div>
        "#;
        let anchors = collect_anchors(html, "https://city.gov/");
        assert_eq!(anchors[0].date_hint.as_deref(), Some("November 15, 2024"));
    }
}
