use once_cell::sync::OnceCell;

/// Metrics interface allowing pluggable sinks (default: no-op).
pub trait TracerMetrics: Send + Sync {
    /// Record that a completed trace was discarded for the provided reason.
    fn record_discarded_trace(&self, _reason: &'static str) {}
    /// Record that delivering a report to the collector failed.
    fn record_delivery_failure(&self, _endpoint: &str) {}
    /// Record a violated accounting invariant (e.g. negative self time).
    fn record_invariant_violation(&self, _kind: &'static str) {}
    /// Record that tracing detached, optionally linked to an error code.
    fn record_detach(&self, _reason: &'static str, _error_code: Option<&str>) {}
    /// Record that a panic was caught inside an event callback.
    fn record_panic(&self, _label: &'static str) {}
}

struct NoopMetrics;

impl TracerMetrics for NoopMetrics {}

static METRICS_SINK: OnceCell<Box<dyn TracerMetrics>> = OnceCell::new();

fn metrics_sink() -> &'static dyn TracerMetrics {
    METRICS_SINK
        .get_or_init(|| Box::new(NoopMetrics) as Box<dyn TracerMetrics>)
        .as_ref()
}

/// Install a custom metrics sink. Intended for embedding or tests.
#[cfg_attr(not(test), allow(dead_code))]
pub fn install_metrics(metrics: Box<dyn TracerMetrics>) -> Result<(), Box<dyn TracerMetrics>> {
    METRICS_SINK.set(metrics)
}

pub fn record_discarded_trace(reason: &'static str) {
    metrics_sink().record_discarded_trace(reason);
}

pub fn record_delivery_failure(endpoint: &str) {
    metrics_sink().record_delivery_failure(endpoint);
}

pub fn record_invariant_violation(kind: &'static str) {
    metrics_sink().record_invariant_violation(kind);
}

pub fn record_detach(reason: &'static str, error_code: Option<&str>) {
    metrics_sink().record_detach(reason, error_code);
}

pub fn record_panic(label: &'static str) {
    metrics_sink().record_panic(label);
}
