//! Metrics and observability utilities
//!
//! Prometheus-style metrics through the `metrics` facade with
//! standardized naming conventions. Recording is a no-op until an
//! exporter is installed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all Axiotome metrics
pub const METRICS_PREFIX: &str = "axiotome";

/// Buckets for local search latency (in seconds)
/// Target: low single-digit milliseconds at full corpus scale
pub const SEARCH_BUCKETS: &[f64] = &[
    0.0001, // 100us
    0.0005, // 500us
    0.001,  // 1ms
    0.002,  // 2ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
];

/// Buckets for model call latency (typically slower)
pub const MODEL_BUCKETS: &[f64] = &[
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from the last search"
    );

    // Index metrics
    describe_counter!(
        format!("{}_books_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total book ingests applied to the index"
    );

    describe_counter!(
        format!("{}_books_removed_total", METRICS_PREFIX),
        Unit::Count,
        "Total books removed from the index"
    );

    describe_gauge!(
        format!("{}_index_lines", METRICS_PREFIX),
        Unit::Count,
        "Lines currently indexed"
    );

    describe_gauge!(
        format!("{}_index_terms", METRICS_PREFIX),
        Unit::Count,
        "Distinct terms currently indexed"
    );

    // Answer metrics
    describe_counter!(
        format!("{}_ask_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total answer requests by outcome"
    );

    describe_histogram!(
        format!("{}_model_call_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "External model call latency in seconds"
    );

    describe_counter!(
        format!("{}_model_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Model calls retried after a transient failure"
    );

    describe_counter!(
        format!("{}_summary_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Summary requests by outcome"
    );

    describe_gauge!(
        format!("{}_ask_in_flight", METRICS_PREFIX),
        Unit::Count,
        "Answer requests currently holding a concurrency permit"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, cached: bool, result_count: usize) {
    let source = if cached { "cache" } else { "index" };

    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "source" => source
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "source" => source
    )
    .record(duration_secs);

    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Helper to record index mutations; `lines` and `terms` are index totals afterwards
pub fn record_index_mutation(kind: &str, lines: usize, terms: usize) {
    let name = match kind {
        "remove" => format!("{}_books_removed_total", METRICS_PREFIX),
        _ => format!("{}_books_ingested_total", METRICS_PREFIX),
    };
    counter!(name).increment(1);

    gauge!(format!("{}_index_lines", METRICS_PREFIX)).set(lines as f64);
    gauge!(format!("{}_index_terms", METRICS_PREFIX)).set(terms as f64);
}

/// Helper to record a single model call
pub fn record_model_call(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    histogram!(
        format!("{}_model_call_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .record(duration_secs);
}

/// Helper to record a retry of a model call
pub fn record_model_retry(model: &str) {
    counter!(
        format!("{}_model_retries_total", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .increment(1);
}

/// Helper to record the outcome of an answer request
pub fn record_ask(outcome: &str) {
    counter!(
        format!("{}_ask_requests_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record a finished summary request
pub fn record_summary(outcome: &str) {
    counter!(
        format!("{}_summary_requests_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record permits currently held by answer requests
pub fn record_ask_in_flight(in_flight: usize) {
    gauge!(format!("{}_ask_in_flight", METRICS_PREFIX)).set(in_flight as f64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [SEARCH_BUCKETS, MODEL_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_recording_without_exporter() {
        // No recorder installed: every helper must be a silent no-op
        record_search(0.001, false, 3);
        record_index_mutation("ingest", 10, 25);
        record_model_call(0.5, "offline", true);
        record_model_retry("offline");
        record_ask("answered");
        record_summary("summarized");
        record_ask_in_flight(1);
        record_cache(true, "search");
    }
}
