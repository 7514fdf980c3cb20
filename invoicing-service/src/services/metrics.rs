//! Metrics collection and Prometheus export.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Must run before any metric is recorded.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))
    })?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| AppError::ConfigError(anyhow::anyhow!("Metrics already initialized")))
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_created() {
    counter!("invoices_created_total").increment(1);
}

pub fn record_transition(action: &str) {
    counter!("invoice_transitions_total", "action" => action.to_string()).increment(1);
}

pub fn record_rejection(operation: &'static str, reason: &'static str) {
    counter!(
        "invoice_rejections_total",
        "operation" => operation,
        "reason" => reason
    )
    .increment(1);
}
