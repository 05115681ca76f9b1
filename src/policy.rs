//! Recorder-wide runtime configuration.

mod env;
mod model;

pub use env::{
    configure_policy_from_env, ENV_COLLECTOR_ENDPOINT, ENV_DELIVER_REPORTS, ENV_JSON_ERRORS,
    ENV_LOG_FILE, ENV_LOG_LEVEL, ENV_ON_TRACER_ERROR,
};
pub use model::{policy_snapshot, OnTracerError, TracerPolicy};

pub(crate) use model::apply_policy_update;
#[cfg(test)]
pub(crate) use model::reset_policy_for_tests;

/// Serialises tests that read or mutate the process-wide policy.
#[cfg(test)]
pub(crate) static TEST_POLICY_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
