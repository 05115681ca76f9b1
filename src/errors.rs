//! Shared helpers for surfacing `TracerError` values that cannot propagate.

use tracer_errors::{TracerError, TracerResult};

use crate::logging;

/// Convenient alias for tracer results used across the crate.
pub type Result<T> = TracerResult<T>;

/// Log an error with its stable code and emit a JSON trailer when enabled.
///
/// Used on paths that must stay transparent to the instrumented program
/// (drop handlers, fire-and-forget delivery), where returning the error is
/// not an option.
pub fn surface(label: &str, err: &TracerError) {
    logging::log_tracer_error(label, err);
    logging::emit_error_trailer(err);
}
