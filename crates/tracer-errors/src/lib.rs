//! Shared error facade for the calltree recorder.
//!
//! Every fallible recorder operation returns a [`TracerError`] carrying a
//! stable [`ErrorCode`] so embedders and log processors can match on the code
//! rather than the message text.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Convenient alias used across the recorder crates.
pub type TracerResult<T> = Result<T, TracerError>;

/// Broad classification of who has to act on the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// The caller used the API incorrectly (e.g. nested sessions).
    Usage,
    /// The host environment rejected an operation (I/O, network, env vars).
    Environment,
    /// The instrumented program did something the recorder cannot handle.
    Target,
    /// A recorder invariant was violated; always a bug in the recorder.
    Internal,
}

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// A tracer is already installed in the process-wide hook slot.
    TracerInstallConflict,
    /// A return event arrived with nothing but the root on the stack.
    StackUnderflow,
    /// Timing accounting produced a negative self time.
    NegativeSelfTime,
    /// The session ended with unreturned frames beyond the exit call.
    TraceIncomplete,
    /// Delivering a completed trace to the collector failed.
    ReportDelivery,
    /// A policy override held a value outside the accepted vocabulary.
    InvalidPolicyValue,
    /// The configured collector endpoint or report name is malformed.
    InvalidEndpoint,
    Io,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TracerInstallConflict => "ERR_TRACER_INSTALL_CONFLICT",
            ErrorCode::StackUnderflow => "ERR_STACK_UNDERFLOW",
            ErrorCode::NegativeSelfTime => "ERR_NEGATIVE_SELF_TIME",
            ErrorCode::TraceIncomplete => "ERR_TRACE_INCOMPLETE",
            ErrorCode::ReportDelivery => "ERR_REPORT_DELIVERY",
            ErrorCode::InvalidPolicyValue => "ERR_INVALID_POLICY_VALUE",
            ErrorCode::InvalidEndpoint => "ERR_INVALID_ENDPOINT",
            ErrorCode::Io => "ERR_IO",
            ErrorCode::Unknown => "ERR_UNKNOWN",
        }
    }

    /// Parse the `ERR_*` form back into a code, if recognised.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ERR_TRACER_INSTALL_CONFLICT" => Some(ErrorCode::TracerInstallConflict),
            "ERR_STACK_UNDERFLOW" => Some(ErrorCode::StackUnderflow),
            "ERR_NEGATIVE_SELF_TIME" => Some(ErrorCode::NegativeSelfTime),
            "ERR_TRACE_INCOMPLETE" => Some(ErrorCode::TraceIncomplete),
            "ERR_REPORT_DELIVERY" => Some(ErrorCode::ReportDelivery),
            "ERR_INVALID_POLICY_VALUE" => Some(ErrorCode::InvalidPolicyValue),
            "ERR_INVALID_ENDPOINT" => Some(ErrorCode::InvalidEndpoint),
            "ERR_IO" => Some(ErrorCode::Io),
            "ERR_UNKNOWN" => Some(ErrorCode::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured recorder error: kind + code + message + context payload.
#[derive(Debug)]
pub struct TracerError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: Cow<'static, str>,
    /// Key/value payload attached at the failure site.
    pub context: Vec<(&'static str, String)>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl TracerError {
    pub fn new(kind: ErrorKind, code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attach a context entry; later entries with the same key are kept as-is.
    pub fn with_context(mut self, key: &'static str, value: String) -> Self {
        self.context.push((key, value));
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn source_ref(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|source| {
            let source: &(dyn StdError + 'static) = &**source;
            source
        })
    }
}

impl fmt::Display for TracerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            f.write_str(" (")?;
            for (index, (key, value)) in self.context.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            f.write_str(")")?;
        }
        if let Some(source) = self.source_ref() {
            write!(f, ": caused by {source}")?;
        }
        Ok(())
    }
}

impl StdError for TracerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source_ref()
    }
}

/// Build a [`ErrorKind::Usage`] error.
#[macro_export]
macro_rules! usage {
    ($code:expr, $($arg:tt)+) => {
        $crate::TracerError::new($crate::ErrorKind::Usage, $code, format!($($arg)+))
    };
}

/// Build an [`ErrorKind::Environment`] error.
#[macro_export]
macro_rules! enverr {
    ($code:expr, $($arg:tt)+) => {
        $crate::TracerError::new($crate::ErrorKind::Environment, $code, format!($($arg)+))
    };
}

/// Build an [`ErrorKind::Target`] error.
#[macro_export]
macro_rules! target {
    ($code:expr, $($arg:tt)+) => {
        $crate::TracerError::new($crate::ErrorKind::Target, $code, format!($($arg)+))
    };
}

/// Build an [`ErrorKind::Internal`] error for invariant violations.
#[macro_export]
macro_rules! bug {
    ($code:expr, $($arg:tt)+) => {
        $crate::TracerError::new($crate::ErrorKind::Internal, $code, format!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_context_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection refused");
        let err = enverr!(ErrorCode::ReportDelivery, "collector rejected report")
            .with_context("endpoint", "http://localhost:19876".to_string())
            .with_source(io);
        let text = err.to_string();
        assert!(text.starts_with("[ERR_REPORT_DELIVERY] collector rejected report"));
        assert!(text.contains("endpoint=http://localhost:19876"));
        assert!(text.contains("caused by connection refused"));
    }

    #[test]
    fn codes_round_trip_through_parse() {
        for code in [
            ErrorCode::TracerInstallConflict,
            ErrorCode::StackUnderflow,
            ErrorCode::NegativeSelfTime,
            ErrorCode::TraceIncomplete,
            ErrorCode::ReportDelivery,
            ErrorCode::InvalidPolicyValue,
            ErrorCode::InvalidEndpoint,
            ErrorCode::Io,
            ErrorCode::Unknown,
        ] {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::parse("ERR_NOPE"), None);
    }

    #[test]
    fn macros_pick_the_matching_kind() {
        assert_eq!(
            usage!(ErrorCode::TracerInstallConflict, "nested session").kind,
            ErrorKind::Usage
        );
        assert_eq!(bug!(ErrorCode::StackUnderflow, "bad pop").kind, ErrorKind::Internal);
        assert_eq!(target!(ErrorCode::Unknown, "odd region").kind, ErrorKind::Target);
    }
}
