//! Prometheus metrics for the podium server.
//!
//! Exposes reconciliation outcomes, reconciled row counts and read-model cache
//! behaviour. No conference content or identifiers are recorded.
//!
//! The `/metrics` endpoint is unauthenticated. Restrict it to the Prometheus
//! scraper at the network level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use podium_core::DiffSummary;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Reconciliation metrics
pub static RECONCILIATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "podium_reconciliations_total",
            "Total reconciliation requests by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static RECONCILED_ROWS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "podium_reconciled_rows_total",
            "Total rows written by reconciliation, by operation",
        ),
        &["operation"],
    )
    .expect("metric creation failed")
});

pub static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "podium_reconcile_duration_seconds",
            "Time taken to plan and apply a reconciliation",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("metric creation failed")
});

// Read-model cache metrics
pub static SCHEDULE_CACHE_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "podium_schedule_cache_hits_total",
        "Total schedule projections served from cache",
    )
    .expect("metric creation failed")
});

pub static SCHEDULE_CACHE_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "podium_schedule_cache_misses_total",
        "Total schedule projections built from the database",
    )
    .expect("metric creation failed")
});

pub static SCHEDULE_CACHE_INVALIDATIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "podium_schedule_cache_invalidations_total",
        "Total cache invalidations after committed writes",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(RECONCILIATIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RECONCILED_ROWS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RECONCILE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SCHEDULE_CACHE_HITS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SCHEDULE_CACHE_MISSES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SCHEDULE_CACHE_INVALIDATIONS.clone()))
            .expect("metric registration failed");
    });
}

/// Handler for the `/metrics` endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record the outcome of a reconciliation request.
pub fn record_reconciliation(outcome: &str) {
    RECONCILIATIONS.with_label_values(&[outcome]).inc();
}

/// Record the rows a committed reconciliation wrote.
pub fn record_reconciled_rows(summary: &DiffSummary) {
    let total = summary.total;
    RECONCILED_ROWS
        .with_label_values(&["insert"])
        .inc_by(total.additions);
    RECONCILED_ROWS
        .with_label_values(&["update"])
        .inc_by(total.modifications);
    RECONCILED_ROWS
        .with_label_values(&["delete"])
        .inc_by(total.deletions);
}
