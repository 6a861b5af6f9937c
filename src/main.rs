//! newsdesk: Binary Entrypoint
//! Loads config, starts the refresh session, and serves the JSON API.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsdesk::api::{self, AppState};
use newsdesk::config::AppConfig;
use newsdesk::metrics::Metrics;
use newsdesk::SessionCommand;

/// Compact logs by default; `NEWSDESK_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info,warn"));

    let json = std::env::var("NEWSDESK_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    tracing::info!(
        api = %cfg.api_base_url,
        tone = %cfg.default_tone,
        period_ticks = cfg.refresh_period_ticks,
        tick_secs = cfg.tick_secs,
        "config loaded"
    );

    let metrics = Metrics::init(cfg.refresh_period_ticks)?;
    let provider = newsdesk::provider_from_config(&cfg)?;
    let (session, task) = newsdesk::start_session(&cfg, provider);

    let app = api::router(AppState {
        session: session.clone(),
    })
    .merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("bind {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server")?;

    if let Err(e) = session.send(SessionCommand::Shutdown).await {
        tracing::warn!(error = ?e, "session already stopped");
    }
    let _ = task.await;
    Ok(())
}
