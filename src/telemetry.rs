//! Counters for the generation pipeline
//!
//! # Metrics
//!
//! - `creditchat_submissions_total`: turns by `mode` and `outcome`
//!   (`success` or an error kind)
//! - `creditchat_debit_failures_total`: completed turns whose debit failed,
//!   by `mode`
//! - `creditchat_provider_errors_total`: failed provider calls by `provider`
//!   and `kind`
//!
//! Recording is a no-op until an exporter is installed. Build with the
//! `prometheus` feature and call [`init_metrics_exporter`] to expose them.

use crate::providers::GenerationMode;
use metrics::increment_counter;

/// Turns processed
pub const SUBMISSIONS_TOTAL: &str = "creditchat_submissions_total";
/// Debits that failed after a successful turn
pub const DEBIT_FAILURES_TOTAL: &str = "creditchat_debit_failures_total";
/// Provider calls that failed or timed out
pub const PROVIDER_ERRORS_TOTAL: &str = "creditchat_provider_errors_total";

/// Count one finished turn
pub fn record_submission(mode: GenerationMode, outcome: &'static str) {
    increment_counter!(SUBMISSIONS_TOTAL, "mode" => mode.as_str(), "outcome" => outcome);
}

/// Count one swallowed debit failure
pub fn record_debit_failure(mode: GenerationMode) {
    increment_counter!(DEBIT_FAILURES_TOTAL, "mode" => mode.as_str());
}

/// Count one failed provider call
pub fn record_provider_error(provider: &str, kind: &'static str) {
    increment_counter!(
        PROVIDER_ERRORS_TOTAL,
        "provider" => provider.to_string(),
        "kind" => kind
    );
}

/// Install the Prometheus exporter when built with the `prometheus` feature
///
/// Without the feature this does nothing. Failure to install is logged, not
/// returned.
///
/// # Examples
///
/// ```
/// use creditchat::telemetry::init_metrics_exporter;
///
/// init_metrics_exporter();
/// ```
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        match PrometheusBuilder::new().install() {
            Ok(()) => tracing::info!("Prometheus exporter installed"),
            Err(e) => tracing::warn!("Failed to install Prometheus exporter: {}", e),
        }
    }
}
