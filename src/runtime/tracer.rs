//! Maps call events onto frame-tree mutations.

use std::any::Any;

use log::error;
use tracer_errors::ErrorCode;

use crate::logging;
use crate::monitoring::{EventSet, FunctionIdentity, SourceLocation, Tracer, ALL_EVENTS};

use super::{FrameId, FrameTree};

/// Tracer that turns the call/return event stream into a timed call tree.
///
/// The stack holds the indices of the current path from root; the top of the
/// stack is the frame currently executing. Call events push, return events
/// pop and finalise. The root is never finalised through the event path.
pub struct CallTreeTracer {
    tree: FrameTree,
    stack: Vec<FrameId>,
}

impl CallTreeTracer {
    pub fn new(start: f64) -> Self {
        Self {
            tree: FrameTree::with_root(start),
            stack: vec![FrameTree::ROOT],
        }
    }

    /// Current stack depth, root included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Hand the tree and the remaining stack back for session finalisation.
    pub fn into_parts(self) -> (FrameTree, Vec<FrameId>) {
        (self.tree, self.stack)
    }

    fn record_call(
        &mut self,
        identity: FunctionIdentity,
        location: Option<SourceLocation>,
        now: f64,
    ) {
        let parent = *self.stack.last().expect("call stack never empty");
        let child = self.tree.push_call(parent, identity, location, now);
        self.stack.push(child);
    }

    fn record_return(&mut self, now: f64) {
        // The root is only finalised by the session itself; a return at depth
        // one means the runtime delivered an unmatched event.
        if self.stack.len() <= 1 {
            logging::record_invariant_violation("return_underflow");
            logging::with_error_code(ErrorCode::StackUnderflow, || {
                error!("return event with only the root on the stack");
            });
            return;
        }
        let frame = self.stack.pop().expect("checked depth above");
        let self_time = self.tree.finalize(frame, now);
        if self_time < 0.0 {
            // Overlapping or duplicated events; keep the value as a bug
            // signal instead of clamping it.
            logging::record_invariant_violation("negative_self_time");
            logging::with_error_code(ErrorCode::NegativeSelfTime, || {
                error!(
                    "negative self time {:.9}s for '{}'",
                    self_time,
                    self.tree
                        .node(frame)
                        .identity()
                        .map(FunctionIdentity::as_str)
                        .unwrap_or("<root>")
                );
            });
        }
    }
}

impl Tracer for CallTreeTracer {
    fn interest(&self) -> EventSet {
        ALL_EVENTS
    }

    fn on_call(&mut self, identity: FunctionIdentity, location: Option<SourceLocation>, now: f64) {
        self.record_call(identity, location, now);
    }

    fn on_native_call(
        &mut self,
        identity: FunctionIdentity,
        location: Option<SourceLocation>,
        now: f64,
    ) {
        self.record_call(identity, location, now);
    }

    fn on_return(&mut self, now: f64) {
        self.record_return(now);
    }

    fn on_native_return(&mut self, now: f64) {
        self.record_return(now);
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::SourceLocation;

    fn call(tracer: &mut CallTreeTracer, name: &str, now: f64) {
        tracer.on_call(
            FunctionIdentity::new(name),
            Some(SourceLocation::new("lib.rs", 1)),
            now,
        );
    }

    #[test]
    fn nested_calls_build_a_nested_tree() {
        let mut tracer = CallTreeTracer::new(0.0);
        call(&mut tracer, "f", 1.0);
        call(&mut tracer, "g", 2.0);
        tracer.on_return(5.0); // g
        tracer.on_return(7.0); // f
        assert_eq!(tracer.depth(), 1);

        let (tree, stack) = tracer.into_parts();
        assert_eq!(stack, vec![FrameTree::ROOT]);

        let root = tree.node(FrameTree::ROOT);
        assert_eq!(root.children().len(), 1);
        let f = tree.node(root.children()[0]);
        assert_eq!(f.identity().unwrap().as_str(), "f");
        assert_eq!(f.children().len(), 1);
        let g = tree.node(f.children()[0]);
        assert_eq!(g.identity().unwrap().as_str(), "g");

        // f.self = f.total - g.total
        assert_eq!(g.total(), Some(3.0));
        assert_eq!(f.total(), Some(6.0));
        assert_eq!(f.self_time(), Some(3.0));
        assert_eq!(g.self_time(), Some(3.0));
    }

    #[test]
    fn siblings_appear_in_call_order() {
        let mut tracer = CallTreeTracer::new(0.0);
        for (name, at) in [("a", 1.0), ("b", 3.0), ("c", 5.0)] {
            call(&mut tracer, name, at);
            tracer.on_return(at + 1.0);
        }
        let (tree, _) = tracer.into_parts();
        let names: Vec<&str> = tree
            .node(FrameTree::ROOT)
            .children()
            .iter()
            .map(|child| tree.node(*child).identity().unwrap().as_str())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn native_events_are_tracked_like_regular_ones() {
        let mut tracer = CallTreeTracer::new(0.0);
        tracer.on_native_call(FunctionIdentity::new("<builtin: read>"), None, 1.0);
        tracer.on_native_return(2.0);
        let (tree, _) = tracer.into_parts();
        let child = tree.node(tree.node(FrameTree::ROOT).children()[0]);
        assert_eq!(child.identity().unwrap().as_str(), "<builtin: read>");
        assert!(child.location().is_none());
        assert_eq!(child.total(), Some(1.0));
    }

    #[test]
    fn return_at_root_depth_never_pops_the_root() {
        let mut tracer = CallTreeTracer::new(0.0);
        tracer.on_return(1.0);
        assert_eq!(tracer.depth(), 1);
        let (tree, _) = tracer.into_parts();
        assert!(tree.node(FrameTree::ROOT).is_open());
    }

    #[test]
    fn structure_is_deterministic_across_runs() {
        let run = || {
            let mut tracer = CallTreeTracer::new(0.0);
            call(&mut tracer, "f", 1.0);
            call(&mut tracer, "g", 2.0);
            tracer.on_return(3.0);
            tracer.on_return(4.0);
            call(&mut tracer, "h", 5.0);
            tracer.on_return(6.0);
            let (tree, _) = tracer.into_parts();
            fn shape(tree: &FrameTree, id: FrameId) -> Vec<(String, Vec<usize>)> {
                let mut out = vec![(
                    tree.node(id)
                        .identity()
                        .map(|identity| identity.as_str().to_string())
                        .unwrap_or_default(),
                    tree.node(id).children().iter().map(|c| c.0).collect(),
                )];
                for child in tree.node(id).children() {
                    out.extend(shape(tree, *child));
                }
                out
            }
            shape(&tree, FrameTree::ROOT)
        };
        assert_eq!(run(), run());
    }
}
