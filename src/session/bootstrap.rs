//! Session preparation before the runtime tracer is installed.

use tracer_errors::{usage, ErrorCode, TracerResult};

use crate::policy;
use crate::report::DEFAULT_COLLECTOR_ENDPOINT;
use crate::session::SessionConfig;

/// Basic metadata about the instrumented program.
#[derive(Debug, Clone)]
pub struct ProgramMetadata {
    pub program: String,
    pub args: Vec<String>,
}

/// Collected data required to start a tracing session.
#[derive(Debug, Clone)]
pub struct SessionBootstrap {
    collector_endpoint: String,
    report_name: Option<String>,
    deliver_reports: bool,
    metadata: ProgramMetadata,
}

impl SessionBootstrap {
    /// Resolve the effective collector endpoint (config wins over policy,
    /// policy over the built-in default), validate it together with the
    /// report name, and capture program metadata.
    pub fn prepare(config: &SessionConfig) -> TracerResult<Self> {
        let policy = policy::policy_snapshot();
        let collector_endpoint = config
            .collector_endpoint
            .clone()
            .or(policy.collector_endpoint)
            .unwrap_or_else(|| DEFAULT_COLLECTOR_ENDPOINT.to_string());
        validate_endpoint(&collector_endpoint)?;
        if let Some(name) = config.report_name.as_deref() {
            validate_report_name(name)?;
        }
        Ok(Self {
            collector_endpoint,
            report_name: config.report_name.clone(),
            deliver_reports: policy.deliver_reports,
            metadata: collect_program_metadata(),
        })
    }

    pub fn collector_endpoint(&self) -> &str {
        &self.collector_endpoint
    }

    pub fn report_name(&self) -> Option<&str> {
        self.report_name.as_deref()
    }

    pub fn deliver_reports(&self) -> bool {
        self.deliver_reports
    }

    pub fn program(&self) -> &str {
        &self.metadata.program
    }

    pub fn args(&self) -> &[String] {
        &self.metadata.args
    }
}

/// Ensure the endpoint looks like a plain http(s) URL the sink can extend
/// with a query string.
fn validate_endpoint(endpoint: &str) -> TracerResult<()> {
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(usage!(
            ErrorCode::InvalidEndpoint,
            "collector endpoint '{}' must start with http:// or https://",
            endpoint
        ));
    }
    if endpoint.contains('?') || endpoint.contains('#') {
        return Err(usage!(
            ErrorCode::InvalidEndpoint,
            "collector endpoint '{}' must not carry a query or fragment",
            endpoint
        ));
    }
    Ok(())
}

/// Report names travel unescaped in the `name` query parameter.
fn validate_report_name(name: &str) -> TracerResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(usage!(
            ErrorCode::InvalidEndpoint,
            "report name '{}' may only contain ASCII alphanumerics, '-', '_' and '.'",
            name
        ));
    }
    Ok(())
}

/// Capture program name and arguments for session metadata.
fn collect_program_metadata() -> ProgramMetadata {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| String::from("<unknown>"));
    ProgramMetadata {
        program,
        args: args.collect(),
    }
}
