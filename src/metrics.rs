//! Metric names and Prometheus recorder setup.
//!
//! Recording goes through the `metrics` facade; without an installed recorder every
//! call is a no-op, which keeps tests and one-shot CLI runs free of exporter state.

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    MutationsTotal,
    ValidationErrorsTotal,
    ReportRunsTotal,
    ReportAttemptsTotal,
    ReportDurationSeconds,
    ReportWriteErrorsTotal,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::MutationsTotal => "crm_mutations_total",
            MetricName::ValidationErrorsTotal => "crm_validation_errors_total",
            MetricName::ReportRunsTotal => "crm_report_runs_total",
            MetricName::ReportAttemptsTotal => "crm_report_attempts_total",
            MetricName::ReportDurationSeconds => "crm_report_duration_seconds",
            MetricName::ReportWriteErrorsTotal => "crm_report_write_errors_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the Prometheus recorder with an HTTP scrape listener on `addr`.
pub fn init(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    info!("Metrics exporter listening on http://{}/metrics", addr);
    Ok(())
}

pub fn record_mutation(mutation: &'static str, outcome: &'static str) {
    counter!(MetricName::MutationsTotal.as_str(), "mutation" => mutation, "outcome" => outcome)
        .increment(1);
}

pub fn record_validation_error(mutation: &'static str) {
    counter!(MetricName::ValidationErrorsTotal.as_str(), "mutation" => mutation).increment(1);
}

pub fn record_report_attempt() {
    counter!(MetricName::ReportAttemptsTotal.as_str()).increment(1);
}

pub fn record_report_run(status: &'static str, elapsed: Duration) {
    counter!(MetricName::ReportRunsTotal.as_str(), "status" => status).increment(1);
    histogram!(MetricName::ReportDurationSeconds.as_str()).record(elapsed.as_secs_f64());
}

pub fn record_report_write_error() {
    counter!(MetricName::ReportWriteErrorsTotal.as_str()).increment(1);
}
