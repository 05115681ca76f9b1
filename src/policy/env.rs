//! Environment variable parsing for tracer policy overrides.

use crate::policy::model::{apply_policy_update, OnTracerError, PolicyPath, PolicyUpdate};
use std::env;
use std::str::FromStr;
use tracer_errors::{usage, ErrorCode, TracerResult};

/// Environment variable configuring how the tracer reacts to callback failures.
pub const ENV_ON_TRACER_ERROR: &str = "CALLTRACE_ON_TRACER_ERROR";
/// Environment variable toggling delivery of completed traces.
pub const ENV_DELIVER_REPORTS: &str = "CALLTRACE_DELIVER_REPORTS";
/// Environment variable overriding the collector endpoint.
pub const ENV_COLLECTOR_ENDPOINT: &str = "CALLTRACE_COLLECTOR";
/// Environment variable controlling log level for the recorder crate.
pub const ENV_LOG_LEVEL: &str = "CALLTRACE_LOG_LEVEL";
/// Environment variable pointing to a log destination file.
pub const ENV_LOG_FILE: &str = "CALLTRACE_LOG_FILE";
/// Environment variable enabling JSON error trailers on stderr.
pub const ENV_JSON_ERRORS: &str = "CALLTRACE_JSON_ERRORS";

/// Load policy overrides from environment variables.
pub fn configure_policy_from_env() -> TracerResult<()> {
    let mut update = PolicyUpdate::default();

    if let Ok(value) = env::var(ENV_ON_TRACER_ERROR) {
        let on_err = OnTracerError::from_str(&value).map_err(|err| err.0)?;
        update.on_tracer_error = Some(on_err);
    }

    if let Ok(value) = env::var(ENV_DELIVER_REPORTS) {
        update.deliver_reports = Some(parse_bool(&value)?);
    }

    if let Ok(value) = env::var(ENV_COLLECTOR_ENDPOINT) {
        update.collector_endpoint = Some(value);
    }

    if let Ok(value) = env::var(ENV_LOG_LEVEL) {
        update.log_level = Some(value);
    }

    if let Ok(value) = env::var(ENV_LOG_FILE) {
        let path = if value.trim().is_empty() {
            PolicyPath::Clear
        } else {
            PolicyPath::Value(value.into())
        };
        update.log_file = Some(path);
    }

    if let Ok(value) = env::var(ENV_JSON_ERRORS) {
        update.json_errors = Some(parse_bool(&value)?);
    }

    apply_policy_update(update);
    Ok(())
}

fn parse_bool(value: &str) -> TracerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        other => Err(usage!(
            ErrorCode::InvalidPolicyValue,
            "invalid boolean value '{}' (expected true/false)",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::model::{policy_snapshot, reset_policy_for_tests};
    use crate::policy::TEST_POLICY_LOCK;

    #[test]
    fn configure_policy_from_env_updates_fields() {
        let _serial = TEST_POLICY_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _guard = EnvGuard;
        reset_policy_for_tests();
        std::env::set_var(ENV_ON_TRACER_ERROR, "abort");
        std::env::set_var(ENV_DELIVER_REPORTS, "no");
        std::env::set_var(ENV_COLLECTOR_ENDPOINT, "http://localhost:9999");
        std::env::set_var(ENV_LOG_LEVEL, "info");
        std::env::set_var(ENV_LOG_FILE, "/tmp/calltrace.log");
        std::env::set_var(ENV_JSON_ERRORS, "yes");

        configure_policy_from_env().expect("configure from env");
        let snap = policy_snapshot();
        assert_eq!(snap.on_tracer_error, OnTracerError::Abort);
        assert!(!snap.deliver_reports);
        assert_eq!(
            snap.collector_endpoint.as_deref(),
            Some("http://localhost:9999")
        );
        assert_eq!(snap.log_level.as_deref(), Some("info"));
        assert_eq!(
            snap.log_file.as_ref().map(|p| p.display().to_string()),
            Some("/tmp/calltrace.log".to_string())
        );
        assert!(snap.json_errors);
    }

    #[test]
    fn blank_endpoint_clears_the_override() {
        let _serial = TEST_POLICY_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _guard = EnvGuard;
        reset_policy_for_tests();
        std::env::set_var(ENV_COLLECTOR_ENDPOINT, "  ");
        configure_policy_from_env().expect("configure from env");
        assert!(policy_snapshot().collector_endpoint.is_none());
    }

    #[test]
    fn parse_bool_rejects_invalid() {
        assert!(parse_bool("sometimes").is_err());
        assert!(parse_bool("y").expect("accepts y"));
        assert!(!parse_bool("0").expect("accepts 0"));
    }

    struct EnvGuard;

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in [
                ENV_ON_TRACER_ERROR,
                ENV_DELIVER_REPORTS,
                ENV_COLLECTOR_ENDPOINT,
                ENV_LOG_LEVEL,
                ENV_LOG_FILE,
                ENV_JSON_ERRORS,
            ] {
                std::env::remove_var(key);
            }
            crate::policy::model::reset_policy_for_tests();
        }
    }
}
