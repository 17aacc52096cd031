use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec, TextEncoder};

// Metrics registry
static RATE_LIMIT_DECISIONS_TOTAL: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    register_int_counter_vec!(
        "rate_limit_decisions_total",
        "Total number of rate limit decisions",
        &["policy", "decision"]
    )
    .map_err(|e| tracing::error!("Failed to register rate limit decision metric: {}", e))
    .ok()
});

static RATE_LIMIT_STORE_FALLBACKS_TOTAL: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    register_int_counter_vec!(
        "rate_limit_store_fallbacks_total",
        "Total number of store failures answered with a fresh status",
        &["backend", "reason"]
    )
    .map_err(|e| tracing::error!("Failed to register store fallback metric: {}", e))
    .ok()
});

pub struct MetricsRecorder;

impl MetricsRecorder {
    /// `decision` is one of "allowed", "limited" or "bypassed"
    pub fn record_rate_limit_decision(policy: &str, decision: &str) {
        if let Some(counter) = RATE_LIMIT_DECISIONS_TOTAL.as_ref() {
            counter.with_label_values(&[policy, decision]).inc();
        }
    }

    pub fn record_store_fallback(backend: &str, reason: &str) {
        if let Some(counter) = RATE_LIMIT_STORE_FALLBACKS_TOTAL.as_ref() {
            counter.with_label_values(&[backend, reason]).inc();
        }
    }

    /// Export all metrics in Prometheus format
    pub fn export() -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        encoder.encode_to_string(&metric_families)
    }
}
