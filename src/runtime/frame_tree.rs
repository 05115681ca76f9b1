//! Arena-backed call tree.
//!
//! Frames live in a flat vector and refer to their children by index, so the
//! stack of "current path from root" is a plain `Vec<FrameId>` and mutating
//! the current frame never needs shared references into the tree.

use crate::monitoring::{FunctionIdentity, SourceLocation};

/// Index of a frame inside its [`FrameTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(pub(crate) usize);

/// One call-tree entry.
///
/// Timing fields stay `None` until the matching return is processed; the
/// root is finalised only at session end.
#[derive(Debug, Clone)]
pub struct FrameNode {
    identity: Option<FunctionIdentity>,
    location: Option<SourceLocation>,
    children: Vec<FrameId>,
    start: f64,
    end: Option<f64>,
    total: Option<f64>,
    self_time: Option<f64>,
}

impl FrameNode {
    fn root(start: f64) -> Self {
        Self {
            identity: None,
            location: None,
            children: Vec::new(),
            start,
            end: None,
            total: None,
            self_time: None,
        }
    }

    fn call(identity: FunctionIdentity, location: Option<SourceLocation>, start: f64) -> Self {
        Self {
            identity: Some(identity),
            location,
            children: Vec::new(),
            start,
            end: None,
            total: None,
            self_time: None,
        }
    }

    /// `None` only for the session root.
    pub fn identity(&self) -> Option<&FunctionIdentity> {
        self.identity.as_ref()
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// Children in call order.
    pub fn children(&self) -> &[FrameId] {
        &self.children
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }

    pub fn total(&self) -> Option<f64> {
        self.total
    }

    pub fn self_time(&self) -> Option<f64> {
        self.self_time
    }

    /// A frame is open until its return has been processed.
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// The call tree for one session, rooted at [`FrameTree::ROOT`].
#[derive(Debug, Clone)]
pub struct FrameTree {
    nodes: Vec<FrameNode>,
}

impl FrameTree {
    pub const ROOT: FrameId = FrameId(0);

    /// Seed the tree with an open root frame starting at `start`.
    pub fn with_root(start: f64) -> Self {
        Self {
            nodes: vec![FrameNode::root(start)],
        }
    }

    pub fn node(&self, id: FrameId) -> &FrameNode {
        &self.nodes[id.0]
    }

    /// Number of frames ever pushed, including unlinked ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new open frame as the last child of `parent`.
    pub fn push_call(
        &mut self,
        parent: FrameId,
        identity: FunctionIdentity,
        location: Option<SourceLocation>,
        start: f64,
    ) -> FrameId {
        let id = FrameId(self.nodes.len());
        self.nodes.push(FrameNode::call(identity, location, start));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Close `id` at `end`, computing total and self time.
    ///
    /// Self time subtracts only finalised children; open children do not
    /// contribute (the caller is responsible for unlinking or closing them
    /// first). Returns the computed self time so callers can check the
    /// non-negativity invariant.
    pub fn finalize(&mut self, id: FrameId, end: f64) -> f64 {
        let children_total: f64 = self.nodes[id.0]
            .children
            .iter()
            .filter_map(|child| self.nodes[child.0].total)
            .sum();
        let node = &mut self.nodes[id.0];
        let total = end - node.start;
        let self_time = total - children_total;
        node.end = Some(end);
        node.total = Some(total);
        node.self_time = Some(self_time);
        self_time
    }

    /// Unlink and return the last child of `parent`, if any.
    ///
    /// The frame stays in the arena but is no longer reachable from the root.
    pub fn unlink_last_child(&mut self, parent: FrameId) -> Option<FrameId> {
        self.nodes[parent.0].children.pop()
    }
}
