// src/ingest/provider.rs
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::histogram;

use crate::ingest::types::{NewsEnvelope, NewsProvider, RawNewsItem, Tone};

/// Parse a `{"news": [...]}` / `{"error": "..."}` body.
pub fn parse_envelope(body: &str) -> Result<Vec<RawNewsItem>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        bail!("news endpoint returned an empty body");
    }
    let env: NewsEnvelope = serde_json::from_str(trimmed).context("parse news JSON")?;
    match env {
        NewsEnvelope::News { news } => {
            let items: Vec<RawNewsItem> = news.iter().filter_map(RawNewsItem::from_json).collect();
            if items.len() < news.len() {
                tracing::debug!(
                    target: "ingest",
                    skipped = news.len() - items.len(),
                    "non-object entries in news array"
                );
            }
            Ok(items)
        }
        NewsEnvelope::Error { error } => bail!("news endpoint reported an error: {error}"),
    }
}

/// Fetches summaries from `{base_url}/news?tone=<tone>`.
pub struct HttpNewsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNewsProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/news", self.base_url)
    }
}

#[async_trait]
impl NewsProvider for HttpNewsProvider {
    async fn fetch(&self, tone: Tone) -> Result<Vec<RawNewsItem>> {
        let t0 = std::time::Instant::now();
        let url = self.endpoint();

        let resp = self
            .client
            .get(&url)
            .query(&[("tone", tone.as_str())])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("news endpoint returned {status}");
        }
        let body = resp.text().await.context("read news body")?;
        let items = parse_envelope(&body)?;

        histogram!("news_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Serves a fixed JSON document, ignoring the tone. Used offline and in tests.
pub struct FixtureProvider {
    pub body: String,
}

impl FixtureProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            body: content.to_string(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading news fixture from {}", path.display()))?;
        Ok(Self { body })
    }
}

#[async_trait]
impl NewsProvider for FixtureProvider {
    async fn fetch(&self, _tone: Tone) -> Result<Vec<RawNewsItem>> {
        parse_envelope(&self.body)
    }

    fn name(&self) -> &str {
        "fixture"
    }
}
