//! Scoped tracing sessions.
//!
//! A session owns the hook slot from `begin` to `end`. Ending on the
//! non-error path yields a [`CompletedTrace`] for the report sink; ending
//! with an error (or dropping the handle) uninstalls the hook and discards
//! the trace.

mod bootstrap;

pub use bootstrap::{ProgramMetadata, SessionBootstrap};

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use tracer_errors::{bug, ErrorCode, TracerResult};
use uuid::Uuid;

use crate::clock;
use crate::errors;
use crate::logging;
use crate::monitoring;
use crate::policy;
use crate::report::{self, CompletedTrace, HttpCollectorSink};
use crate::runtime::{CallTreeTracer, FrameTree};

/// Global flag tracking whether tracing is active.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Query whether a tracing session is currently active.
pub fn is_tracing() -> bool {
    ACTIVE.load(Ordering::SeqCst)
}

/// Per-session configuration. Fields left `None` fall back to the policy and
/// then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub collector_endpoint: Option<String>,
    /// Forwarded to the collector as a `name` query parameter.
    pub report_name: Option<String>,
}

/// Handle for one tracing session.
///
/// Nested sessions are unsupported: a second `begin` while a session is
/// active fails with [`ErrorCode::TracerInstallConflict`].
#[derive(Debug)]
pub struct TraceSession {
    bootstrap: SessionBootstrap,
    session_id: String,
    finished: bool,
}

impl TraceSession {
    /// Start a session: seed the root frame and occupy the hook slot.
    pub fn begin(config: SessionConfig) -> TracerResult<Self> {
        logging::init_logging_with_default("calltree_recorder=info");
        policy::configure_policy_from_env()?;
        let bootstrap = SessionBootstrap::prepare(&config)?;

        let began_at = clock::now_seconds();
        monitoring::install_tracer(Box::new(CallTreeTracer::new(began_at)))?;
        ACTIVE.store(true, Ordering::SeqCst);

        let session_id = Uuid::new_v4().to_string();
        logging::set_active_session_id(Some(session_id.clone()));
        debug!(
            target: "calltree_recorder::session",
            "session {} tracing '{}'",
            session_id,
            bootstrap.program()
        );

        Ok(Self {
            bootstrap,
            session_id,
            finished: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn collector_endpoint(&self) -> &str {
        self.bootstrap.collector_endpoint()
    }

    pub fn deliver_reports(&self) -> bool {
        self.bootstrap.deliver_reports()
    }

    /// End the session.
    ///
    /// The hook comes out before anything else so teardown is never traced.
    /// With `error_occurred` the trace is discarded; otherwise the finalised
    /// tree is returned for handoff to a report sink.
    pub fn end(mut self, error_occurred: bool) -> TracerResult<Option<CompletedTrace>> {
        self.finish(error_occurred, "region_error")
    }

    fn finish(
        &mut self,
        error_occurred: bool,
        discard_reason: &'static str,
    ) -> TracerResult<Option<CompletedTrace>> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;

        let tracer = monitoring::uninstall_tracer();
        let end = clock::now_seconds();
        ACTIVE.store(false, Ordering::SeqCst);
        logging::set_active_session_id(None);

        let Some(tracer) = tracer else {
            // The slot was emptied behind our back (callback detach).
            return Err(bug!(
                ErrorCode::TraceIncomplete,
                "no tracer installed at session end"
            ));
        };
        let tracer = tracer
            .into_any()
            .downcast::<CallTreeTracer>()
            .map_err(|_| {
                bug!(
                    ErrorCode::TraceIncomplete,
                    "hook slot held a foreign tracer at session end"
                )
            })?;

        if error_occurred {
            logging::record_discarded_trace(discard_reason);
            debug!(
                target: "calltree_recorder::session",
                "session {} discarded ({})",
                self.session_id,
                discard_reason
            );
            return Ok(None);
        }

        let tree = finalize_tree(*tracer, end);
        Ok(Some(CompletedTrace::new(
            tree,
            self.bootstrap.report_name().map(str::to_string),
        )))
    }
}

impl Drop for TraceSession {
    fn drop(&mut self) {
        if !self.finished {
            // Guaranteed release: the hook must come out on every exit path.
            if let Err(err) = self.finish(true, "abandoned_session") {
                errors::surface("session_drop", &err);
            }
        }
    }
}

fn finalize_tree(tracer: CallTreeTracer, end: f64) -> FrameTree {
    let (mut tree, stack) = tracer.into_parts();

    // Beyond the root and the exit invocation, open frames mean the runtime
    // lost return events.
    if stack.len() > 2 {
        logging::record_invariant_violation("unreturned_frames");
        logging::with_error_code(ErrorCode::TraceIncomplete, || {
            warn!("{} frame(s) still open at session end", stack.len() - 2);
        });
    }

    // The exit invocation was pushed by the act of calling into teardown
    // before the hook came out; it is not part of the traced region.
    let trailing_open = tree
        .node(FrameTree::ROOT)
        .children()
        .last()
        .copied()
        .filter(|last| tree.node(*last).is_open());
    if trailing_open.is_some() {
        tree.unlink_last_child(FrameTree::ROOT);
    }

    tree.finalize(FrameTree::ROOT, end);
    tree
}

/// Trace `region` under a session and ship the result on the success path.
///
/// Instrumentation stays transparent to the region's own control flow: if
/// the session cannot start, the region still runs untraced; if it returns
/// `Err`, the trace is discarded and the error passed through unchanged.
pub fn record_region<F, T, E>(config: SessionConfig, region: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let session = match TraceSession::begin(config) {
        Ok(session) => session,
        Err(err) => {
            errors::surface("session_begin", &err);
            return region();
        }
    };
    let deliver = session.deliver_reports();
    let endpoint = session.collector_endpoint().to_string();

    let result = region();

    match session.end(result.is_err()) {
        Ok(Some(trace)) => {
            if deliver {
                let sink = HttpCollectorSink::new(endpoint);
                report::deliver_or_log(&sink, &trace);
            }
        }
        Ok(None) => {}
        Err(err) => errors::surface("session_end", &err),
    }

    result
}
