//! The tree-construction engine behind a tracing session.

mod frame_tree;
mod tracer;

pub use frame_tree::{FrameId, FrameNode, FrameTree};
pub use tracer::CallTreeTracer;
