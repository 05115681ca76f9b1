//! Call-stack instrumentation with scoped sessions.
//!
//! While a [`session::TraceSession`] is active, every call/return event
//! emitted through the [`instrument`] layer lands in a process-wide hook and
//! grows a timed call tree. Ending the session on the non-error path hands
//! the finalised tree to a report sink, which POSTs it as JSON to a local
//! collector.
//!
//! ```no_run
//! use calltree_recorder::{record_region, trace_call, SessionConfig};
//!
//! fn compute() -> Result<u64, std::io::Error> {
//!     let _scope = trace_call!("compute");
//!     Ok(6 * 7)
//! }
//!
//! let result: Result<u64, std::io::Error> =
//!     record_region(SessionConfig::default(), || compute());
//! # let _ = result;
//! ```

mod clock;
pub mod errors;
pub mod instrument;
pub mod logging;
pub mod monitoring;
pub mod policy;
pub mod report;
pub mod runtime;
pub mod session;

pub use instrument::CallScope;
pub use monitoring::{
    install_tracer, uninstall_tracer, CallEventKind, EventSet, FunctionIdentity, SourceLocation,
    Tracer,
};
pub use report::{CompletedTrace, HttpCollectorSink, ReportSink, DEFAULT_COLLECTOR_ENDPOINT};
pub use runtime::{CallTreeTracer, FrameId, FrameNode, FrameTree};
pub use session::{is_tracing, record_region, SessionConfig, TraceSession};
pub use tracer_errors::{ErrorCode, ErrorKind, TracerError, TracerResult};

/// Initialise the structured logger with the crate default filter.
///
/// Sessions do this lazily; call it directly to capture logs emitted before
/// the first session starts.
pub fn init_logging() {
    logging::init_logging_with_default("calltree_recorder=info");
}
