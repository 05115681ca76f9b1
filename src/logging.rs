//! Diagnostics utilities: structured logging, metrics sinks, and error trailers.

mod logger;
mod metrics;
mod trailer;

pub use logger::{
    init_logging_with_default, log_tracer_error, set_active_session_id, with_error_code,
    with_error_code_opt,
};
pub use metrics::{
    install_metrics, record_delivery_failure, record_detach, record_discarded_trace,
    record_invariant_violation, record_panic, TracerMetrics,
};
pub use trailer::emit_error_trailer;

#[cfg(test)]
pub use metrics::test_support;
#[cfg(test)]
pub use trailer::set_error_trailer_writer_for_tests;

use crate::policy::TracerPolicy;

/// Propagate policy changes into the logger and trailer state.
pub fn apply_policy(policy: &TracerPolicy) {
    logger::apply_logger_policy(policy);
    trailer::set_json_errors_enabled(policy.json_errors);
}
