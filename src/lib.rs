// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod filter;
pub mod ingest;
pub mod metrics;
pub mod refresh;
pub mod session;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::filter::{filter, FilterCriteria, SortKey, StatusFilter};
pub use crate::ingest::types::{NewsProvider, NewsRecord, RawNewsItem, Status, Tone};
pub use crate::refresh::RefreshCycle;
pub use crate::session::{spawn_session, NewsSession, SessionCommand, SessionHandle, ViewSnapshot};
pub use crate::store::ResultStore;

use std::sync::Arc;

use anyhow::Result;

use crate::config::AppConfig;
use crate::ingest::provider::{FixtureProvider, HttpNewsProvider};

/// Pick the fetch collaborator from config: a fixture file if one is set,
/// otherwise the HTTP summaries API.
pub fn provider_from_config(cfg: &AppConfig) -> Result<Arc<dyn NewsProvider>> {
    match &cfg.fixture_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "serving news from fixture");
            Ok(Arc::new(FixtureProvider::from_path(path)?))
        }
        None => Ok(Arc::new(HttpNewsProvider::new(
            cfg.api_base_url.clone(),
            cfg.request_timeout(),
        )?)),
    }
}

/// Build the session described by `cfg` and spawn it.
pub fn start_session(
    cfg: &AppConfig,
    provider: Arc<dyn NewsProvider>,
) -> (SessionHandle, tokio::task::JoinHandle<()>) {
    let cycle = RefreshCycle::new(cfg.refresh_period_ticks, cfg.notification_ticks);
    let session = NewsSession::new(cycle, cfg.default_tone);
    spawn_session(session, provider, cfg.tick())
}
