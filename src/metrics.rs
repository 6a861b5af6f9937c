use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the series the core emits.
    pub fn init(period_ticks: u32) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        describe_counter!("news_fetch_total", "Fetches started, by trigger.");
        describe_counter!("news_fetch_errors_total", "Fetches that failed.");
        describe_counter!(
            "news_records_dropped_total",
            "Records dropped at ingestion (missing title or date)."
        );
        describe_counter!("news_notifications_total", "New-data notifications raised.");
        describe_gauge!("news_collection_size", "Records in the current collection.");
        describe_gauge!("news_refresh_period_ticks", "Configured refresh period.");
        describe_histogram!("news_fetch_ms", "Summaries API round trip in milliseconds.");

        gauge!("news_refresh_period_ticks").set(period_ticks as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
