//! Prometheus metrics for the enrichment run.
//!
//! This module provides metrics for:
//! - Enrichment calls (outcome per task, call latency)
//! - Pipeline stages (fetched, complete, dropped, retried rows)
//! - LLM token usage
//!
//! A batch run has no scrape endpoint; the binary renders
//! [`encode_metrics`] into a textfile for node_exporter when configured.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for collector in all_metrics() {
        // Only fails on duplicate registration, which the static list rules out.
        let _ = registry.register(collector);
    }
    registry
});

// =============================================================================
// Enrichment Metrics
// =============================================================================

/// Enrichment calls total by task and outcome.
pub static ENRICHMENT_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "aipro_news_enrichment_calls_total",
            "Total per-article enrichment calls",
        ),
        &["task", "outcome"], // outcome: "success", "none_found", "timeout", ...
    )
    .unwrap()
});

/// Enrichment call duration in seconds.
pub static ENRICHMENT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "aipro_news_enrichment_duration_seconds",
            "Duration of per-article enrichment calls",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["task"],
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Articles by pipeline stage.
pub static ARTICLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aipro_news_articles_total", "Articles seen per pipeline stage"),
        &["stage"], // "fetched", "complete", "dropped"
    )
    .unwrap()
});

/// Rows sent through the retry pass.
pub static RETRIED_ROWS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "aipro_news_retried_rows_total",
        "Incomplete rows re-enriched by the retry pass",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aipro_news_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ENRICHMENT_CALLS.clone()),
        Box::new(ENRICHMENT_DURATION.clone()),
        Box::new(ARTICLES.clone()),
        Box::new(RETRIED_ROWS.clone()),
        Box::new(LLM_TOKENS.clone()),
    ]
}

/// Render all metrics in the Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        ENRICHMENT_CALLS
            .with_label_values(&["extract_tag", "success"])
            .inc();
        RETRIED_ROWS.inc();

        let output = encode_metrics();
        assert!(output.contains("aipro_news_enrichment_calls_total"));
        assert!(output.contains("aipro_news_retried_rows_total"));
        assert!(output.contains("# TYPE"));
    }
}
