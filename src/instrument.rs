//! Instrumentation points feeding the hook.
//!
//! Rust has no ambient interpreter emitting call events, so instrumented
//! code marks its own calls: a [`CallScope`] emits the Call event when
//! constructed and the matching Return when dropped, which keeps the pair
//! balanced on every exit path, early returns and unwinding included.

use crate::monitoring::{dispatch_event, CallEventKind, FunctionIdentity, SourceLocation};

/// RAII guard bracketing one traced call.
#[must_use = "dropping the scope immediately records a zero-length call"]
pub struct CallScope {
    native: bool,
}

impl CallScope {
    /// Mark entry into an instrumented function.
    pub fn enter(name: &str, location: Option<SourceLocation>) -> Self {
        dispatch_event(
            CallEventKind::Call,
            Some(FunctionIdentity::new(name)),
            location,
        );
        Self { native: false }
    }

    /// Mark entry into a native callable with no known definition site.
    pub fn enter_native(name: &str) -> Self {
        dispatch_event(
            CallEventKind::NativeCall,
            Some(FunctionIdentity::new(name)),
            None,
        );
        Self { native: true }
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        let kind = if self.native {
            CallEventKind::NativeReturn
        } else {
            CallEventKind::Return
        };
        dispatch_event(kind, None, None);
    }
}

/// Trace the enclosing call, capturing the current file and line as the
/// definition site. Bind the result: the call ends when the scope drops.
///
/// ```
/// # use calltree_recorder::trace_call;
/// fn step() {
///     let _scope = trace_call!("step");
///     // traced body
/// }
/// # step();
/// ```
#[macro_export]
macro_rules! trace_call {
    ($name:expr) => {
        $crate::instrument::CallScope::enter(
            $name,
            Some($crate::monitoring::SourceLocation::new(file!(), line!())),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::{
        install_tracer, uninstall_tracer, EventSet, Tracer, ALL_EVENTS, TEST_SLOT_LOCK,
    };
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct BalanceTracker {
        calls: Arc<AtomicUsize>,
        returns: Arc<AtomicUsize>,
    }

    impl Tracer for BalanceTracker {
        fn interest(&self) -> EventSet {
            ALL_EVENTS
        }

        fn on_call(
            &mut self,
            _identity: FunctionIdentity,
            _location: Option<SourceLocation>,
            _now: f64,
        ) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn on_native_call(
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

        fn on_native_return(&mut self, _now: f64) {
            self.returns.fetch_add(1, Ordering::SeqCst);
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    }

    #[test]
    fn scopes_emit_balanced_events_even_on_early_exit() {
        let _serial = TEST_SLOT_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let calls = Arc::new(AtomicUsize::new(0));
        let returns = Arc::new(AtomicUsize::new(0));
        install_tracer(Box::new(BalanceTracker {
            calls: calls.clone(),
            returns: returns.clone(),
        }))
        .expect("install tracer");

        fn early_exit(flag: bool) -> u32 {
            let _scope = trace_call!("early_exit");
            if flag {
                return 1;
            }
            0
        }

        {
            let _outer = trace_call!("outer");
            let _native = CallScope::enter_native("<builtin: write>");
            early_exit(true);
        }

        uninstall_tracer();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(returns.load(Ordering::SeqCst), 3);
    }
}
