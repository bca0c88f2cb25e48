//! Metrics definitions for the tracker API.
//!
//! This module defines all metrics used by the connection and loader core.
//! Metrics are collected using the `metrics` crate and can be exported to
//! Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "connection_queries_total",
        "Total number of paginated connection queries executed"
    );
    describe_histogram!(
        "connection_query_duration_seconds",
        "Time taken to produce one connection page in seconds"
    );
    describe_counter!(
        "pagination_validation_failures_total",
        "Total number of pagination argument rejections"
    );
    describe_counter!(
        "loader_batches_total",
        "Total number of batched key-lookup queries issued"
    );
    describe_counter!(
        "loader_keys_total",
        "Total number of keys requested from batch loaders"
    );
}

/// Record one paginated connection query.
pub fn record_connection_query(connection: &str) {
    counter!("connection_queries_total", "connection" => connection.to_string()).increment(1);
}

/// Record the duration of one connection page.
pub fn record_connection_query_duration(connection: &str, duration_secs: f64) {
    histogram!("connection_query_duration_seconds", "connection" => connection.to_string())
        .record(duration_secs);
}

/// Record a rejected set of pagination arguments.
pub fn record_validation_failure(connection: &str) {
    counter!("pagination_validation_failures_total", "connection" => connection.to_string())
        .increment(1);
}

/// Record one batched key-lookup wave.
///
/// # Arguments
/// * `loader` - The loader name
/// * `requested` - Number of keys requested in the wave
/// * `fetched` - Number of distinct keys actually queried
pub fn record_loader_batch(loader: &str, requested: usize, fetched: usize) {
    counter!("loader_batches_total", "loader" => loader.to_string()).increment(1);
    counter!("loader_keys_total", "loader" => loader.to_string(), "kind" => "requested")
        .increment(requested as u64);
    counter!("loader_keys_total", "loader" => loader.to_string(), "kind" => "fetched")
        .increment(fetched as u64);
}

/// A timer that records a connection query duration when dropped.
pub struct QueryTimer {
    connection: &'static str,
    start: Instant,
}

impl QueryTimer {
    /// Start a new query timer for the named connection.
    pub fn new(connection: &'static str) -> Self {
        Self {
            connection,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_connection_query_duration(self.connection, duration);
    }
}
