//! Best-effort date parsing for newsroom pages.
//!
//! Agencies publish dates in every shape imaginable: ISO timestamps in
//! `<time datetime>`, "December 1, 2024" in card text, "12/01/2024" in table
//! cells. Parsing is lenient by design — a None here only costs the early-exit
//! watermark hint, never correctness.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

static ISO_DATETIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("valid regex"));
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"));
static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").expect("valid regex"));
static MONTH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\.?\s+\d{1,2},?\s+\d{4}",
    )
    .expect("valid regex")
});

/// Parse a date string in any of the common newsroom formats. Falls back to
/// scanning the text for an embedded date when the whole string won't parse.
pub fn parse_flexible_date(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(dt) = parse_exact(trimmed) {
        return Some(dt);
    }

    // The string is prose ("Posted on December 1, 2024 by ..."): scan for the
    // first recognizable date fragment.
    for re in [&*ISO_DATETIME_RE, &*MONTH_NAME_RE, &*ISO_DATE_RE, &*SLASH_DATE_RE] {
        if let Some(m) = re.find(trimmed) {
            if let Some(dt) = parse_exact(m.as_str()) {
                return Some(dt);
            }
        }
    }

    None
}

fn parse_exact(s: &str) -> Option<DateTime<Utc>> {
    // Offset-carrying timestamps first.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Naive datetimes, assumed UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    // "Sept." and trailing periods defeat chrono's %b; normalize first.
    let normalized = s.replace("Sept.", "Sep").replace("Sept", "Sep").replace('.', "");
    let candidates = [s, normalized.as_str()];

    for candidate in candidates {
        for fmt in [
            "%Y-%m-%d",
            "%Y/%m/%d",
            "%m/%d/%Y",
            "%d/%m/%Y",
            "%B %d, %Y",
            "%B %d %Y",
            "%b %d, %Y",
            "%b %d %Y",
            "%d %B %Y",
            "%d %b %Y",
        ] {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
                return date
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| Utc.from_utc_datetime(&dt));
            }
        }
    }

    None
}
