//! # Filterer
//! Pure transform from `(collection, criteria)` to the ordered view the user sees.
//!
//! Stages run in a fixed order, each on the previous stage's output:
//! status → source → search → sort. The input slice is never touched and the
//! sort is stable, so equal inputs always give an identical sequence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ingest::types::{NewsRecord, Status};

/// Source tokens offered by the filter panel. Other tokens are still accepted.
pub const KNOWN_SOURCES: &[(&str, &str)] = &[
    ("bbc", "BBC News"),
    ("gizmodo", "Gizmodo.com"),
    ("verge", "The Verge"),
    ("wired", "Wired"),
    ("reuters", "Reuters"),
    ("ap", "Associated Press"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Verified,
    Disputed,
}

impl StatusFilter {
    fn admits(&self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Verified => status == Status::Verified,
            StatusFilter::Disputed => status == Status::Disputed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    /// Accepted but not ranked: keeps the filtered order as is.
    Relevance,
}

/// The active filter state. Replaced wholesale on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub sources: BTreeSet<String>,
    #[serde(alias = "sort_by", alias = "sortKey")]
    pub sort_by: SortKey,
    #[serde(alias = "search_query")]
    pub search_query: String,
}

impl FilterCriteria {
    /// Normalizes source tokens; empty tokens are discarded.
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sources = sources
            .into_iter()
            .map(|s| normalize_source_token(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_sort(mut self, sort_by: SortKey) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = query.into();
        self
    }

    /// Re-normalize tokens that arrived over the wire.
    pub fn normalized(mut self) -> Self {
        let sources = std::mem::take(&mut self.sources);
        self.with_sources(sources)
    }
}

/// Lowercase and drop every whitespace character.
pub fn normalize_source_token(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Loose, bidirectional match: "bbc" matches "BBC News" and vice versa.
/// Short tokens can over-match ("ap" hits "gap"); kept on purpose.
fn source_matches(publisher: &str, sources: &BTreeSet<String>) -> bool {
    let p = normalize_source_token(publisher);
    sources
        .iter()
        .any(|s| p.contains(s.as_str()) || s.contains(p.as_str()))
}

fn search_matches(rec: &NewsRecord, needle: &str) -> bool {
    rec.title.to_lowercase().contains(needle)
        || rec.summary.to_lowercase().contains(needle)
        || rec.publisher.to_lowercase().contains(needle)
}

/// Apply `criteria` to `collection` and return a new ordered view.
pub fn filter(collection: &[NewsRecord], criteria: &FilterCriteria) -> Vec<NewsRecord> {
    let mut out: Vec<NewsRecord> = collection
        .iter()
        .filter(|r| criteria.status.admits(r.status))
        .cloned()
        .collect();

    if !criteria.sources.is_empty() {
        out.retain(|r| source_matches(&r.publisher, &criteria.sources));
    }

    if !criteria.search_query.is_empty() {
        let needle = criteria.search_query.to_lowercase();
        out.retain(|r| search_matches(r, &needle));
    }

    match criteria.sort_by {
        SortKey::Newest => out.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SortKey::Oldest => out.sort_by(|a, b| a.published_at.cmp(&b.published_at)),
        SortKey::Relevance => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn rec(title: &str, publisher: &str, ymd: (i32, u32, u32), status: Status) -> NewsRecord {
        NewsRecord {
            title: title.into(),
            summary: String::new(),
            url: None,
            publisher: publisher.into(),
            published_at: Utc.with_ymd_and_hms(ymd.0, ymd.1, ymd.2, 0, 0, 0).unwrap(),
            status,
        }
    }

    #[test]
    fn token_normalization() {
        assert_eq!(normalize_source_token(" BBC  News\t"), "bbcnews");
        assert_eq!(normalize_source_token("Gizmodo.com"), "gizmodo.com");
    }

    #[test]
    fn source_match_is_bidirectional() {
        let set: BTreeSet<String> = ["bbcnewsworld".to_string()].into();
        assert!(source_matches("BBC News", &set));
        let set: BTreeSet<String> = ["bbc".to_string()].into();
        assert!(source_matches("BBC News", &set));
        assert!(!source_matches("Reuters", &set));
    }

    #[test]
    fn short_tokens_over_match() {
        let set: BTreeSet<String> = ["ap".to_string()].into();
        assert!(source_matches("The Gap Times", &set));
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let c = vec![
            rec("first", "A", (2025, 1, 1), Status::Verified),
            rec("second", "B", (2025, 1, 1), Status::Verified),
            rec("third", "C", (2025, 1, 1), Status::Verified),
        ];
        for key in [SortKey::Newest, SortKey::Oldest, SortKey::Relevance] {
            let v = filter(&c, &FilterCriteria::default().with_sort(key));
            let titles: Vec<_> = v.iter().map(|r| r.title.as_str()).collect();
            assert_eq!(titles, ["first", "second", "third"], "{key:?}");
        }
    }

    #[test]
    fn relevance_keeps_original_order() {
        let c = vec![
            rec("old", "A", (2024, 1, 1), Status::Verified),
            rec("new", "B", (2025, 1, 1), Status::Verified),
        ];
        let v = filter(&c, &FilterCriteria::default().with_sort(SortKey::Relevance));
        assert_eq!(v[0].title, "old");
        let v = filter(&c, &FilterCriteria::default().with_sort(SortKey::Oldest));
        assert_eq!(v[0].title, "old");
        let v = filter(&c, &FilterCriteria::default());
        assert_eq!(v[0].title, "new");
    }

    #[test]
    fn criteria_deserialize_from_filter_panel_shape() {
        let c: FilterCriteria = serde_json::from_str(
            r#"{"status":"disputed","sources":["bbc","ap"],"sortBy":"oldest","searchQuery":"tariff"}"#,
        )
        .unwrap();
        assert_eq!(c.status, StatusFilter::Disputed);
        assert_eq!(c.sort_by, SortKey::Oldest);
        assert_eq!(c.search_query, "tariff");
        assert_eq!(c.sources.len(), 2);

        let d: FilterCriteria = serde_json::from_str("{}").unwrap();
        assert_eq!(d, FilterCriteria::default());
    }

    #[test]
    fn with_sources_drops_blank_tokens() {
        let c = FilterCriteria::default().with_sources([" BBC ", "  ", "The Verge"]);
        let got: Vec<_> = c.sources.iter().cloned().collect();
        assert_eq!(got, ["bbc", "theverge"]);
    }
}
