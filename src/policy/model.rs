//! Policy data structures and in-memory management.

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::RwLock;
use tracer_errors::{usage, ErrorCode, TracerError};

static POLICY: OnceCell<RwLock<TracerPolicy>> = OnceCell::new();

fn policy_cell() -> &'static RwLock<TracerPolicy> {
    POLICY.get_or_init(|| RwLock::new(TracerPolicy::default()))
}

/// Behaviour when a tracer callback fails while instrumented code is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnTracerError {
    /// Propagate the failure to the instrumented thread (re-raise the panic).
    Abort,
    /// Detach the tracer and let the host program continue untraced.
    #[default]
    Disable,
}

#[derive(Debug)]
pub struct PolicyParseError(pub TracerError);

impl FromStr for OnTracerError {
    type Err = PolicyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(OnTracerError::Abort),
            "disable" => Ok(OnTracerError::Disable),
            other => Err(PolicyParseError(usage!(
                ErrorCode::InvalidPolicyValue,
                "invalid on_tracer_error value '{}' (expected 'abort' or 'disable')",
                other
            ))),
        }
    }
}

/// Recorder-wide runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerPolicy {
    pub on_tracer_error: OnTracerError,
    /// When false, completed traces are built but never shipped.
    pub deliver_reports: bool,
    /// Overrides the default collector endpoint for every session.
    pub collector_endpoint: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub json_errors: bool,
}

impl Default for TracerPolicy {
    fn default() -> Self {
        Self {
            on_tracer_error: OnTracerError::default(),
            deliver_reports: true,
            collector_endpoint: None,
            log_level: None,
            log_file: None,
            json_errors: false,
        }
    }
}

impl TracerPolicy {
    pub(crate) fn apply_update(&mut self, update: PolicyUpdate) {
        if let Some(on_err) = update.on_tracer_error {
            self.on_tracer_error = on_err;
        }
        if let Some(deliver) = update.deliver_reports {
            self.deliver_reports = deliver;
        }
        if let Some(endpoint) = update.collector_endpoint {
            self.collector_endpoint = match endpoint.trim() {
                "" => None,
                other => Some(other.to_string()),
            };
        }
        if let Some(level) = update.log_level {
            self.log_level = match level.trim() {
                "" => None,
                other => Some(other.to_string()),
            };
        }
        if let Some(path) = update.log_file {
            self.log_file = match path {
                PolicyPath::Clear => None,
                PolicyPath::Value(pb) => Some(pb),
            };
        }
        if let Some(json_errors) = update.json_errors {
            self.json_errors = json_errors;
        }
    }
}

/// Internal helper representing path updates.
#[derive(Debug, Clone)]
pub(crate) enum PolicyPath {
    Clear,
    Value(PathBuf),
}

/// Mutation record for the policy.
#[derive(Debug, Default, Clone)]
pub(crate) struct PolicyUpdate {
    pub(crate) on_tracer_error: Option<OnTracerError>,
    pub(crate) deliver_reports: Option<bool>,
    pub(crate) collector_endpoint: Option<String>,
    pub(crate) log_level: Option<String>,
    pub(crate) log_file: Option<PolicyPath>,
    pub(crate) json_errors: Option<bool>,
}

/// Snapshot the current policy.
pub fn policy_snapshot() -> TracerPolicy {
    policy_cell().read().expect("policy lock poisoned").clone()
}

/// Apply the provided update to the global policy and propagate logging changes.
pub(crate) fn apply_policy_update(update: PolicyUpdate) {
    let mut guard = policy_cell().write().expect("policy lock poisoned");
    guard.apply_update(update);
    crate::logging::apply_policy(&guard);
}

#[cfg(test)]
pub(crate) fn reset_policy_for_tests() {
    let mut guard = policy_cell().write().expect("policy lock poisoned");
    *guard = TracerPolicy::default();
    crate::logging::apply_policy(&guard);
}
