//! Prometheus metrics for finance-service.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, HistogramVec, TextEncoder, register_counter_vec, register_histogram_vec,
};

/// Histogram for database query duration by operation.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for import jobs by resulting status.
pub static IMPORT_JOBS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_import_jobs_total",
        "Import jobs by status transition",
        &["status"]
    )
    .expect("Failed to register IMPORT_JOBS")
});

/// Counter for queue messages by pipeline outcome.
pub static PIPELINE_MESSAGES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_pipeline_messages_total",
        "Transaction messages processed by outcome",
        &["outcome"]
    )
    .expect("Failed to register PIPELINE_MESSAGES")
});

pub static PIPELINE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_pipeline_duration_seconds",
        "Time to run one message through the transaction chain",
        &["outcome"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register PIPELINE_DURATION")
});

/// Counter for classifier results by source (model or fallback).
pub static CLASSIFIER_RESULTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_classifier_results_total",
        "Classifier results by source",
        &["source"]
    )
    .expect("Failed to register CLASSIFIER_RESULTS")
});

pub static SETTLEMENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_settlements_total",
        "Settlement requests by mode and scope",
        &["mode", "scope"]
    )
    .expect("Failed to register SETTLEMENTS")
});

/// Counter for swallowed import job counter/status write failures.
pub static JOB_COUNTER_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_job_counter_failures_total",
        "Import job counter or status updates that failed",
        &["operation"]
    )
    .expect("Failed to register JOB_COUNTER_FAILURES")
});

pub static NOTIFICATIONS_CREATED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_notifications_created_total",
        "Notifications created by type",
        &["type"]
    )
    .expect("Failed to register NOTIFICATIONS_CREATED")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&IMPORT_JOBS);
    Lazy::force(&PIPELINE_MESSAGES);
    Lazy::force(&PIPELINE_DURATION);
    Lazy::force(&CLASSIFIER_RESULTS);
    Lazy::force(&SETTLEMENTS);
    Lazy::force(&JOB_COUNTER_FAILURES);
    Lazy::force(&NOTIFICATIONS_CREATED);
    Lazy::force(&service_core::middleware::metrics::HTTP_REQUESTS);
    Lazy::force(&service_core::middleware::metrics::HTTP_REQUEST_DURATION);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_import_job(status: &str) {
    IMPORT_JOBS.with_label_values(&[status]).inc();
}

pub fn record_pipeline_message(outcome: &str, duration_secs: f64) {
    PIPELINE_MESSAGES.with_label_values(&[outcome]).inc();
    PIPELINE_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

pub fn record_classifier_result(source: &str) {
    CLASSIFIER_RESULTS.with_label_values(&[source]).inc();
}

pub fn record_settlement(mode: &str, scope: &str) {
    SETTLEMENTS.with_label_values(&[mode, scope]).inc();
}

pub fn record_job_counter_failure(operation: &str) {
    JOB_COUNTER_FAILURES.with_label_values(&[operation]).inc();
}

pub fn record_notification(notification_type: &str) {
    NOTIFICATIONS_CREATED
        .with_label_values(&[notification_type])
        .inc();
}
