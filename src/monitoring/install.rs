//! The process-wide hook slot and event dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use log::error;
use tracer_errors::{usage, ErrorCode, TracerResult};

use crate::clock;
use crate::logging;
use crate::policy::{self, OnTracerError};

use super::api::Tracer;
use super::{CallEventKind, EventSet, FunctionIdentity, SourceLocation};

struct Installed {
    tracer: Box<dyn Tracer>,
    mask: EventSet,
}

static GLOBAL: Mutex<Option<Installed>> = Mutex::new(None);

/// Install a tracer into the hook slot.
///
/// The slot is exclusive; a second install while one is active is a usage
/// error (nested sessions are unsupported).
pub fn install_tracer(tracer: Box<dyn Tracer>) -> TracerResult<()> {
    let mut guard = GLOBAL.lock().expect("hook slot lock poisoned");
    if guard.is_some() {
        return Err(usage!(
            ErrorCode::TracerInstallConflict,
            "tracer already installed"
        ));
    }
    let mask = tracer.interest();
    *guard = Some(Installed { tracer, mask });
    Ok(())
}

/// Remove the installed tracer, handing it back so the owner can finalise it.
///
/// Returns `None` when no tracer is installed.
pub fn uninstall_tracer() -> Option<Box<dyn Tracer>> {
    let mut guard = GLOBAL.lock().expect("hook slot lock poisoned");
    guard.take().map(|installed| installed.tracer)
}

/// Query whether a tracer currently occupies the hook slot.
pub fn is_installed() -> bool {
    GLOBAL.lock().expect("hook slot lock poisoned").is_some()
}

/// Deliver one event to the installed tracer, if any.
///
/// This is the hook entry point the instrumentation layer calls on every
/// call/return. It stamps the timestamp, filters by the tracer's interest
/// mask, and matches the closed event set exhaustively; `Other` is a no-op.
/// Panics inside the tracer are contained here so instrumentation never
/// alters the traced program's control flow.
pub fn dispatch_event(
    kind: CallEventKind,
    identity: Option<FunctionIdentity>,
    location: Option<SourceLocation>,
) {
    let mut guard = GLOBAL.lock().expect("hook slot lock poisoned");
    let Some(installed) = guard.as_mut() else {
        return;
    };
    let bit = kind.mask();
    if bit.is_empty() || !installed.mask.contains(bit) {
        return;
    }

    let now = clock::now_seconds();
    let tracer = installed.tracer.as_mut();
    let outcome = catch_unwind(AssertUnwindSafe(|| match kind {
        CallEventKind::Call => {
            tracer.on_call(identity.unwrap_or_else(FunctionIdentity::unknown), location, now)
        }
        CallEventKind::NativeCall => tracer.on_native_call(
            identity.unwrap_or_else(FunctionIdentity::unknown),
            location,
            now,
        ),
        CallEventKind::Return => tracer.on_return(now),
        CallEventKind::NativeReturn => tracer.on_native_return(now),
        CallEventKind::Other => {}
    }));

    if let Err(payload) = outcome {
        logging::record_panic("dispatch_event");
        let message = panic_message(payload.as_ref());
        logging::with_error_code(ErrorCode::Unknown, || {
            error!("tracer callback panicked: {message}");
        });
        match policy::policy_snapshot().on_tracer_error {
            OnTracerError::Disable => {
                // Detach so later events cannot hit the poisoned tracer.
                logging::record_detach("callback_panic", Some(ErrorCode::Unknown.as_str()));
                guard.take();
            }
            OnTracerError::Abort => {
                drop(guard);
                std::panic::resume_unwind(payload);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTracer {
        calls: Arc<AtomicUsize>,
        returns: Arc<AtomicUsize>,
        mask: EventSet,
    }

    impl Tracer for CountingTracer {
        fn interest(&self) -> EventSet {
            self.mask
        }

        fn on_call(
            &mut self,
            _identity: FunctionIdentity,
            _location: Option<SourceLocation>,
            _now: f64,
        ) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn on_return(&mut self, _now: f64) {
            self.returns.fetch_add(1, Ordering::SeqCst);
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    }

    #[test]
    fn slot_is_exclusive_and_dispatch_honours_interest() {
        let _serial = crate::monitoring::TEST_SLOT_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let calls = Arc::new(AtomicUsize::new(0));
        let returns = Arc::new(AtomicUsize::new(0));
        let tracer = CountingTracer {
            calls: calls.clone(),
            returns: returns.clone(),
            mask: EventSet::CALL,
        };
        install_tracer(Box::new(tracer)).expect("install tracer");
        assert!(is_installed());

        let second = CountingTracer {
            calls: calls.clone(),
            returns: returns.clone(),
            mask: EventSet::CALL,
        };
        let conflict = install_tracer(Box::new(second)).expect_err("nested install must fail");
        assert_eq!(conflict.code, ErrorCode::TracerInstallConflict);

        dispatch_event(
            CallEventKind::Call,
            Some(FunctionIdentity::new("f")),
            None,
        );
        // Outside the interest mask: dropped before reaching the tracer.
        dispatch_event(CallEventKind::Return, None, None);
        dispatch_event(CallEventKind::Other, None, None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(returns.load(Ordering::SeqCst), 0);

        assert!(uninstall_tracer().is_some());
        assert!(!is_installed());
        assert!(uninstall_tracer().is_none());

        // With the slot empty, dispatch is a no-op.
        dispatch_event(CallEventKind::Call, Some(FunctionIdentity::new("g")), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
