//! Call-event interception: event taxonomy and the process-wide hook slot.
//!
//! The instrumented program emits [`CallEventKind`] events through
//! [`dispatch_event`]; whichever [`Tracer`] currently occupies the hook slot
//! receives them synchronously on the emitting thread. Only one tracer may be
//! installed at a time.

mod api;
mod install;

pub use api::Tracer;
pub use install::{dispatch_event, install_tracer, is_installed, uninstall_tracer};

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Mask of event kinds a tracer wants delivered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventSet: u8 {
        const CALL = 1 << 0;
        const NATIVE_CALL = 1 << 1;
        const RETURN = 1 << 2;
        const NATIVE_RETURN = 1 << 3;
    }
}

/// Every event kind the dispatcher knows about.
pub const ALL_EVENTS: EventSet = EventSet::all();

/// Closed set of call events. Runtimes with richer taxonomies map anything
/// unrecognised to `Other`, which the dispatcher drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEventKind {
    Call,
    NativeCall,
    Return,
    NativeReturn,
    Other,
}

impl CallEventKind {
    pub(crate) fn mask(self) -> EventSet {
        match self {
            CallEventKind::Call => EventSet::CALL,
            CallEventKind::NativeCall => EventSet::NATIVE_CALL,
            CallEventKind::Return => EventSet::RETURN,
            CallEventKind::NativeReturn => EventSet::NATIVE_RETURN,
            CallEventKind::Other => EventSet::empty(),
        }
    }
}

/// Stable label for a called function, e.g. a qualified name or a synthetic
/// `<builtin>` marker for native calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionIdentity(String);

impl FunctionIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Placeholder identity for call events that arrive without a label.
    pub fn unknown() -> Self {
        Self("<unknown>".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FunctionIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FunctionIdentity {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Best-effort definition site of a called function. Native calls usually
/// have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// Serialises tests that occupy the process-wide hook slot.
#[cfg(test)]
pub(crate) static TEST_SLOT_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_events_carry_no_mask_bit() {
        assert!(CallEventKind::Other.mask().is_empty());
        assert!(ALL_EVENTS.contains(CallEventKind::Call.mask()));
        assert!(ALL_EVENTS.contains(CallEventKind::NativeReturn.mask()));
    }

    #[test]
    fn identity_fallback_is_marked() {
        assert_eq!(FunctionIdentity::unknown().as_str(), "<unknown>");
    }
}
