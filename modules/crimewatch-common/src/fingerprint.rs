//! URL canonicalization and the deterministic article fingerprint.
//!
//! The fingerprint is the dedup key for a scraped article within its source.
//! It must be stable across processes and runs, so canonicalization is fixed
//! here rather than left to whatever form a listing page happened to link.

use sha2::{Digest, Sha256};
use url::Url;

/// Normalize a URL for fingerprinting: lowercase scheme and host, strip the
/// fragment, drop default ports, sort query pairs, drop the trailing slash
/// (unless the path is just "/").
///
/// Returns the input unchanged when it does not parse as an absolute URL.
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if parsed.port() == Some(80) && parsed.scheme() == "http"
        || parsed.port() == Some(443) && parsed.scheme() == "https"
    {
        let _ = parsed.set_port(None);
    }

    if let Some(query) = parsed.query() {
        if query.is_empty() {
            parsed.set_query(None);
        } else {
            let mut pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            pairs.sort();
            let sorted: Vec<String> = pairs
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{k}={v}")
                    }
                })
                .collect();
            parsed.set_query(Some(&sorted.join("&")));
        }
    }

    let mut result = parsed.to_string();
    if result.ends_with('/') && parsed.path() != "/" {
        result.pop();
    }

    result
}

/// Deterministic fingerprint of an article: hex-encoded SHA-256 over
/// `source_id`, the canonical URL, and the title, with an unambiguous
/// separator. Identical inputs hash identically in every process.
pub fn article_fingerprint(source_id: i64, canonical_url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_url.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strips_fragment_and_trailing_slash() {
        assert_eq!(
            canonicalize_url("https://vpd.ca/news/2024/incident/#top"),
            "https://vpd.ca/news/2024/incident"
        );
    }

    #[test]
    fn canonical_drops_default_ports() {
        assert_eq!(canonicalize_url("https://vpd.ca:443/news"), "https://vpd.ca/news");
        assert_eq!(canonicalize_url("http://vpd.ca:80/news"), "http://vpd.ca/news");
        assert_eq!(
            canonicalize_url("http://vpd.ca:8080/news"),
            "http://vpd.ca:8080/news"
        );
    }

    #[test]
    fn canonical_sorts_query_pairs() {
        assert_eq!(
            canonicalize_url("https://site.ca/page?b=2&a=1"),
            canonicalize_url("https://site.ca/page?a=1&b=2")
        );
    }

    #[test]
    fn canonical_keeps_root_slash() {
        assert_eq!(canonicalize_url("https://vpd.ca/"), "https://vpd.ca/");
    }

    #[test]
    fn canonical_passes_through_unparseable() {
        assert_eq!(canonicalize_url("not a url"), "not a url");
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = article_fingerprint(1, "https://vpd.ca/news/1234", "Arrest made");
        let b = article_fingerprint(1, "https://vpd.ca/news/1234", "Arrest made");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_is_sensitive_to_every_input() {
        let base = article_fingerprint(1, "https://vpd.ca/news/1234", "Arrest made");
        assert_ne!(base, article_fingerprint(2, "https://vpd.ca/news/1234", "Arrest made"));
        assert_ne!(base, article_fingerprint(1, "https://vpd.ca/news/1235", "Arrest made"));
        assert_ne!(base, article_fingerprint(1, "https://vpd.ca/news/1234", "Arrest mad"));
    }

    #[test]
    fn fingerprint_separator_is_unambiguous() {
        // Without a separator these two would collide.
        let a = article_fingerprint(1, "https://x.ca/ab", "c");
        let b = article_fingerprint(1, "https://x.ca/a", "bc");
        assert_ne!(a, b);
    }
}
