// src/ingest/types.rs
use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fact-check status, assigned once at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Verified,
    Disputed,
}

/// Style selector passed to the summaries endpoint. Opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Satirical,
    Comedy,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Satirical => "satirical",
            Tone::Comedy => "comedy",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record as delivered by the summaries endpoint.
/// Every field is optional; ingestion decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNewsItem {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub publisher: Option<String>,
    pub publish_date: Option<String>,
    pub status: Option<String>,
}

/// First key in `keys` that holds a string. Other JSON types count as absent.
fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

impl RawNewsItem {
    /// Read one record leniently. Only a non-object is rejected; wrong-typed
    /// fields degrade to `None` so ingestion can decide per record.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        Some(Self {
            title: first_str(obj, &["title"]),
            summary: first_str(obj, &["summary"]),
            url: first_str(obj, &["url"]),
            // backend sends `author`
            publisher: first_str(obj, &["publisher", "author", "source"]),
            publish_date: first_str(obj, &["publish_date", "publishDate", "published_at"]),
            status: first_str(obj, &["status", "verdict"]),
        })
    }
}

/// Envelope returned by `GET /news?tone=...`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NewsEnvelope {
    News { news: Vec<Value> },
    Error { error: String },
}

/// A validated, immutable news record. `published_at` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
    pub status: Status,
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch(&self, tone: Tone) -> Result<Vec<RawNewsItem>>;
    fn name(&self) -> &str;
}
