//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Fetch cycles against each source cluster (outcome, latency, batch size)
//! - Domain task application and quarantine
//! - Watermark progress
//! - Processor lifecycle
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replication_domain_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_replicator::metrics;
//! use std::time::Duration;
//!
//! metrics::record_fetch("active", "success", Duration::from_millis(12));
//! metrics::record_tasks_fetched("active", 2);
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a fetch cycle outcome (`success`, `failure`, `not_owner`, `lookup_failed`).
pub fn record_fetch(source_cluster: &str, outcome: &str, duration: Duration) {
    counter!(
        "replication_domain_fetches_total",
        "source_cluster" => source_cluster.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("replication_domain_fetch_duration_seconds", "source_cluster" => source_cluster.to_string())
        .record(duration.as_secs_f64());
}

/// Record a skipped cycle (this host does not own the stream, or lookup failed).
pub fn record_cycle_skipped(source_cluster: &str, reason: &str) {
    counter!(
        "replication_domain_cycles_skipped_total",
        "source_cluster" => source_cluster.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record the number of tasks returned by one fetch.
pub fn record_tasks_fetched(source_cluster: &str, count: usize) {
    counter!("replication_domain_tasks_fetched_total", "source_cluster" => source_cluster.to_string())
        .increment(count as u64);
    histogram!("replication_domain_batch_size", "source_cluster" => source_cluster.to_string())
        .record(count as f64);
}

/// Record a domain task applied locally.
pub fn record_task_applied(source_cluster: &str, duration: Duration) {
    counter!("replication_domain_tasks_applied_total", "source_cluster" => source_cluster.to_string())
        .increment(1);
    histogram!("replication_domain_task_duration_seconds", "source_cluster" => source_cluster.to_string())
        .record(duration.as_secs_f64());
}

/// Record a task skipped because it is not a domain task.
pub fn record_task_skipped(source_cluster: &str, task_type: &str) {
    counter!(
        "replication_domain_tasks_skipped_total",
        "source_cluster" => source_cluster.to_string(),
        "task_type" => task_type.to_string()
    )
    .increment(1);
}

/// Record an executor failure.
pub fn record_task_failure(source_cluster: &str) {
    counter!("replication_domain_task_failures_total", "source_cluster" => source_cluster.to_string())
        .increment(1);
}

/// Record a task quarantined to the DLQ.
pub fn record_task_quarantined(source_cluster: &str, domain_name: &str) {
    counter!(
        "replication_domain_tasks_quarantined_total",
        "source_cluster" => source_cluster.to_string(),
        "domain" => domain_name.to_string()
    )
    .increment(1);
}

/// Record a task that could neither be applied nor quarantined.
pub fn record_dlq_failure(source_cluster: &str) {
    counter!("replication_domain_dlq_failures_total", "source_cluster" => source_cluster.to_string())
        .increment(1);
}

/// Record a task rejected locally for missing attributes.
pub fn record_malformed_task(source_cluster: &str) {
    counter!("replication_domain_malformed_tasks_total", "source_cluster" => source_cluster.to_string())
        .increment(1);
}

/// Record a retry of any wrapped operation, labelled with the error kind that caused it.
pub fn record_retry(operation: &str, error_kind: &str) {
    counter!(
        "replication_domain_retries_total",
        "operation" => operation.to_string(),
        "error_kind" => error_kind.to_string()
    )
    .increment(1);
}

/// Set watermark gauges after a cycle.
pub fn set_watermarks(source_cluster: &str, last_retrieved: i64, last_processed: i64) {
    gauge!("replication_domain_last_retrieved_message_id", "source_cluster" => source_cluster.to_string())
        .set(last_retrieved as f64);
    gauge!("replication_domain_last_processed_message_id", "source_cluster" => source_cluster.to_string())
        .set(last_processed as f64);
}

/// Record lag between task creation at the source and its local application.
pub fn record_replication_lag(source_cluster: &str, lag: Duration) {
    histogram!("replication_domain_lag_seconds", "source_cluster" => source_cluster.to_string())
        .record(lag.as_secs_f64());
}

/// Record a DLQ merge run.
pub fn record_dlq_merge(merged: usize, failed: bool) {
    counter!("replication_domain_dlq_merged_total").increment(merged as u64);
    if failed {
        counter!("replication_domain_dlq_merge_failures_total").increment(1);
    }
}

/// Gauge for processor state.
pub fn set_processor_state(source_cluster: &str, state: &str) {
    // Encode state as numeric for alerting
    let value = match state {
        "Created" => 0.0,
        "Running" => 1.0,
        "Stopped" => 2.0,
        _ => -1.0,
    };
    gauge!("replication_domain_processor_state", "source_cluster" => source_cluster.to_string()).set(value);
}
