// src/ingest/mod.rs
pub mod provider;
pub mod types;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::{NewsRecord, RawNewsItem, Status};

/// Publisher shown when the wire record has none.
pub const UNKNOWN_PUBLISHER: &str = "Unknown";

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("valid tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Parse the raw publish date. Accepts RFC 3339, RFC 2822,
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC) and a bare `YYYY-MM-DD`.
pub fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Map a wire status / fact-check rating onto [`Status`].
/// Anything that does not read as a negative rating counts as verified.
pub fn classify_status(raw: Option<&str>) -> Status {
    let Some(s) = raw else {
        return Status::Verified;
    };
    let s = s.trim().to_ascii_lowercase();
    let disputed = ["disputed", "false", "misleading", "mostly false", "pants on fire", "fake"];
    if disputed.iter().any(|d| s == *d || s.starts_with(d)) {
        Status::Disputed
    } else {
        Status::Verified
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| normalize_text(&v)).filter(|v| !v.is_empty())
}

/// Turn one raw record into a [`NewsRecord`], or `None` if it has no title
/// or no usable publish date.
pub fn ingest_one(raw: RawNewsItem) -> Option<NewsRecord> {
    let title = non_blank(raw.title)?;
    let published_at = raw.publish_date.as_deref().and_then(parse_publish_date)?;

    Some(NewsRecord {
        title,
        summary: raw.summary.map(|s| normalize_text(&s)).unwrap_or_default(),
        url: raw
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
        publisher: non_blank(raw.publisher).unwrap_or_else(|| UNKNOWN_PUBLISHER.to_string()),
        published_at,
        status: classify_status(raw.status.as_deref()),
    })
}

/// Validate a fetched batch. Malformed records are dropped silently
/// (counted, logged at debug), never reported as an error.
pub fn ingest_records(raw: Vec<RawNewsItem>) -> Vec<NewsRecord> {
    let total = raw.len();
    let kept: Vec<NewsRecord> = raw.into_iter().filter_map(ingest_one).collect();
    let dropped = total - kept.len();

    if dropped > 0 {
        counter!("news_records_dropped_total").increment(dropped as u64);
        tracing::debug!(target: "ingest", total, dropped, "dropped malformed records");
    }
    kept
}
