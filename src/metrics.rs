use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ingest::{FRESHNESS_WINDOW_MS, MAX_CONCURRENT_FETCHES};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the pipeline's static
    /// tuning parameters as gauges.
    pub fn init() -> Self {
        // Default buckets; the fetch histogram doesn't need custom ones.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("aggregate_freshness_window_ms").set(FRESHNESS_WINDOW_MS as f64);
        gauge!("aggregate_max_concurrent_fetches").set(MAX_CONCURRENT_FETCHES as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
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
