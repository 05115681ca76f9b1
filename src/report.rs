//! Completed-trace handoff: the wire shape and collector delivery.
//!
//! A frame serialises as `{"func", "line", "file", "children", "start",
//! "end", "total", "self"}`; the session root omits `func`/`line`/`file`,
//! and frames without a known definition site omit `line`/`file`.

use std::time::Duration;

use log::warn;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use tracer_errors::{enverr, ErrorCode, TracerResult};

use crate::logging;
use crate::runtime::{FrameId, FrameTree};

/// Collector endpoint used when neither config nor policy override it.
pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "http://localhost:19876";

/// A finalised call tree ready for delivery.
pub struct CompletedTrace {
    tree: FrameTree,
    name: Option<String>,
}

impl CompletedTrace {
    pub(crate) fn new(tree: FrameTree, name: Option<String>) -> Self {
        Self { tree, name }
    }

    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    /// Report name forwarded to the collector as a `name` query parameter.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn to_json(&self) -> TracerResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|err| {
            enverr!(ErrorCode::Io, "failed to encode trace report").with_source(err)
        })
    }
}

impl Serialize for CompletedTrace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FrameView {
            tree: &self.tree,
            id: FrameTree::ROOT,
        }
        .serialize(serializer)
    }
}

struct FrameView<'a> {
    tree: &'a FrameTree,
    id: FrameId,
}

impl Serialize for FrameView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.tree.node(self.id);
        let mut map = serializer.serialize_map(None)?;
        if let Some(identity) = node.identity() {
            map.serialize_entry("func", identity.as_str())?;
            if let Some(location) = node.location() {
                map.serialize_entry("line", &location.line)?;
                map.serialize_entry("file", &location.file)?;
            }
        }
        map.serialize_entry(
            "children",
            &ChildrenView {
                tree: self.tree,
                id: self.id,
            },
        )?;
        map.serialize_entry("start", &node.start())?;
        if let Some(end) = node.end() {
            map.serialize_entry("end", &end)?;
        }
        if let Some(total) = node.total() {
            map.serialize_entry("total", &total)?;
        }
        if let Some(self_time) = node.self_time() {
            map.serialize_entry("self", &self_time)?;
        }
        map.end()
    }
}

struct ChildrenView<'a> {
    tree: &'a FrameTree,
    id: FrameId,
}

impl Serialize for ChildrenView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let children = self.tree.node(self.id).children();
        let mut seq = serializer.serialize_seq(Some(children.len()))?;
        for child in children {
            seq.serialize_element(&FrameView {
                tree: self.tree,
                id: *child,
            })?;
        }
        seq.end()
    }
}

/// Destination for completed traces.
pub trait ReportSink {
    /// Deliver one trace. Implementations must not panic.
    fn deliver(&self, trace: &CompletedTrace) -> TracerResult<()>;

    /// Human-readable destination label used in logs and metrics.
    fn describe(&self) -> &str;
}

/// POSTs trace reports to the collector endpoint.
pub struct HttpCollectorSink {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpCollectorSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(5)))
            .build();
        Self {
            endpoint: endpoint.into(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn url_for(&self, trace: &CompletedTrace) -> String {
        match trace.name() {
            // Report names are validated at session bootstrap, so they can go
            // into the query string verbatim.
            Some(name) => format!("{}?name={}", self.endpoint, name),
            None => self.endpoint.clone(),
        }
    }
}

impl ReportSink for HttpCollectorSink {
    fn deliver(&self, trace: &CompletedTrace) -> TracerResult<()> {
        let url = self.url_for(trace);
        self.agent.post(url.as_str()).send_json(trace).map_err(|err| {
            enverr!(ErrorCode::ReportDelivery, "failed to deliver trace report")
                .with_context("endpoint", url.clone())
                .with_source(err)
        })?;
        Ok(())
    }

    fn describe(&self) -> &str {
        &self.endpoint
    }
}

/// Fire-and-forget delivery: failures are logged and counted, never raised
/// into the instrumented program.
pub fn deliver_or_log(sink: &dyn ReportSink, trace: &CompletedTrace) {
    if let Err(err) = sink.deliver(trace) {
        logging::record_delivery_failure(sink.describe());
        logging::with_error_code(err.code, || {
            warn!("trace report dropped: {}", err);
        });
        logging::emit_error_trailer(&err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::{FunctionIdentity, SourceLocation};
    use serde_json::Value;

    fn sample_trace() -> CompletedTrace {
        let mut tree = FrameTree::with_root(0.0);
        let child = tree.push_call(
            FrameTree::ROOT,
            FunctionIdentity::new("compute"),
            Some(SourceLocation::new("src/math.rs", 42)),
            0.25,
        );
        tree.finalize(child, 0.85);
        let native = tree.push_call(
            FrameTree::ROOT,
            FunctionIdentity::new("<builtin: read>"),
            None,
            0.9,
        );
        tree.finalize(native, 0.95);
        tree.finalize(FrameTree::ROOT, 1.0);
        CompletedTrace::new(tree, Some("bench".to_string()))
    }

    #[test]
    fn root_omits_identity_fields() {
        let json = sample_trace().to_json().expect("encode trace");
        assert!(json.get("func").is_none());
        assert!(json.get("line").is_none());
        assert!(json.get("file").is_none());
        assert_eq!(json.get("start").and_then(Value::as_f64), Some(0.0));
        assert_eq!(json.get("end").and_then(Value::as_f64), Some(1.0));
        assert_eq!(json.get("total").and_then(Value::as_f64), Some(1.0));
    }

    #[test]
    fn frames_carry_identity_location_and_timing() {
        let json = sample_trace().to_json().expect("encode trace");
        let children = json
            .get("children")
            .and_then(Value::as_array)
            .expect("children array");
        assert_eq!(children.len(), 2);

        let compute = &children[0];
        assert_eq!(compute.get("func").and_then(Value::as_str), Some("compute"));
        assert_eq!(compute.get("line").and_then(Value::as_u64), Some(42));
        assert_eq!(
            compute.get("file").and_then(Value::as_str),
            Some("src/math.rs")
        );
        assert!((compute.get("total").and_then(Value::as_f64).unwrap() - 0.6).abs() < 1e-12);
        assert!((compute.get("self").and_then(Value::as_f64).unwrap() - 0.6).abs() < 1e-12);

        // Native frame: identity present, definition site unknown.
        let native = &children[1];
        assert_eq!(
            native.get("func").and_then(Value::as_str),
            Some("<builtin: read>")
        );
        assert!(native.get("file").is_none());
        assert!(native.get("line").is_none());
    }

    #[test]
    fn url_carries_the_report_name() {
        let sink = HttpCollectorSink::new(DEFAULT_COLLECTOR_ENDPOINT);
        assert_eq!(
            sink.url_for(&sample_trace()),
            "http://localhost:19876?name=bench"
        );

        let unnamed = CompletedTrace::new(FrameTree::with_root(0.0), None);
        assert_eq!(sink.url_for(&unnamed), "http://localhost:19876");
    }
}
