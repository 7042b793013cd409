//! Article-page content extraction.
//!
//! Newsroom article pages bury the release text under chrome: navigation,
//! sidebars, share widgets. Extraction walks a priority list of containers and
//! takes the first one with enough text, skipping script/style/nav subtrees.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Containers an article body is never inside of.
const STRIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "button", "iframe", "noscript",
];

/// Minimum text length for a container to count as the article body.
const MIN_BODY_CHARS: usize = 100;

static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid regex"));

/// Extract the main text content of an article page, trying `selectors` in
/// priority order and falling back to `<body>`.
pub fn extract_body(html: &str, selectors: &[&str]) -> String {
    let document = Html::parse_document(html);

    for sel in selectors {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        if let Some(container) = document.select(&selector).next() {
            let text = container_text(container);
            if text.len() >= MIN_BODY_CHARS {
                return text;
            }
        }
    }

    let body_selector = Selector::parse("body").expect("valid selector");
    document
        .select(&body_selector)
        .next()
        .map(container_text)
        .unwrap_or_default()
}

/// Page title: first `<h1>`, then `<title>`.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for sel in ["h1", "title"] {
        let selector = Selector::parse(sel).expect("valid selector");
        if let Some(el) = document.select(&selector).next() {
            let text = element_text(el);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    None
}

/// Collapse runs of spaces and blank lines, trim.
pub fn clean_text(text: &str) -> String {
    let text = SPACES_RE.replace_all(text, " ");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Truncate to `max` bytes on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn container_text(container: ElementRef) -> String {
    let mut parts: Vec<String> = Vec::new();
    collect_text(container, &mut parts);
    clean_text(&parts.join("\n"))
}

fn collect_text(el: ElementRef, out: &mut Vec<String>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !STRIP_TAGS.contains(&child_el.value().name()) {
                collect_text(child_el, out);
            }
        }
    }
}

/// Visible text of a single element, whitespace-normalized to one line.
pub(crate) fn element_text(el: ElementRef) -> String {
    let text: String = el.text().collect::<Vec<_>>().join(" ");
    SPACES_RE.replace_all(text.trim(), " ").replace('\n', " ").trim().to_string()
}
