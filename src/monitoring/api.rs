//! The `Tracer` trait implemented by tracing backends.

use std::any::Any;

use super::{EventSet, FunctionIdentity, SourceLocation};

/// Trait implemented by tracing backends.
///
/// Each method corresponds to one [`super::CallEventKind`]. Default
/// implementations allow implementers to only handle the events they care
/// about; [`Tracer::interest`] controls which events the dispatcher forwards
/// at all.
///
/// Callbacks run synchronously on the instrumented thread and must not call
/// back into instrumented code.
pub trait Tracer: Send {
    /// Return the set of events the tracer wants to receive.
    fn interest(&self) -> EventSet {
        EventSet::empty()
    }

    /// Called when an instrumented function is entered.
    fn on_call(
        &mut self,
        _identity: FunctionIdentity,
        _location: Option<SourceLocation>,
        _now: f64,
    ) {
    }

    /// Called when a native (out-of-language) callable is entered.
    fn on_native_call(
        &mut self,
        _identity: FunctionIdentity,
        _location: Option<SourceLocation>,
        _now: f64,
    ) {
    }

    /// Called when the current instrumented function returns.
    fn on_return(&mut self, _now: f64) {}

    /// Called when the current native callable returns.
    fn on_native_return(&mut self, _now: f64) {}

    /// Downcast support for recovering the concrete tracer after
    /// [`super::uninstall_tracer`] hands the boxed instance back.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}
