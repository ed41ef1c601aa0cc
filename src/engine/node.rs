//! View nodes and their generational handles.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use crate::state::{StateMap, StateValue};
use super::tracker::TrackedDependencies;

/// Handle to a node slot in a [`ViewTree`](super::ViewTree).
///
/// Slots are reused after removal; the generation makes handles to removed
/// nodes stale instead of silently pointing at the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// One node of the view tree.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub(crate) id: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) read_paths: BTreeSet<String>,
    pub(crate) write_paths: BTreeSet<String>,
    pub(crate) local_read_paths: BTreeSet<String>,
    pub(crate) local_write_paths: BTreeSet<String>,
    pub(crate) local_state: Option<StateValue>,
    pub(crate) needs_update: bool,
    pub(crate) last_update: Option<Instant>,
}

impl ViewNode {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            read_paths: BTreeSet::new(),
            write_paths: BTreeSet::new(),
            local_read_paths: BTreeSet::new(),
            local_write_paths: BTreeSet::new(),
            local_state: None,
            needs_update: false,
            last_update: None,
        }
    }

    /// Document-level identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Global store paths this node read when last built.
    pub fn read_paths(&self) -> &BTreeSet<String> {
        &self.read_paths
    }

    pub fn write_paths(&self) -> &BTreeSet<String> {
        &self.write_paths
    }

    /// Local-state paths this node read, relative to its nearest scope.
    pub fn local_read_paths(&self) -> &BTreeSet<String> {
        &self.local_read_paths
    }

    pub fn local_write_paths(&self) -> &BTreeSet<String> {
        &self.local_write_paths
    }

    /// Local state owned by this node, if it declares a scope.
    pub fn local_state(&self) -> Option<&StateMap> {
        self.local_state.as_ref()?.as_object()
    }

    /// Local value at `key` in this node's own scope. Not tracked.
    pub fn local_value(&self, key: &str) -> Option<&StateValue> {
        self.local_state()?.get(key)
    }

    pub fn declares_local_state(&self) -> bool {
        self.local_state.is_some()
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Replace the recorded dependencies with `deps`.
    pub fn set_dependencies(&mut self, deps: TrackedDependencies) {
        self.read_paths = deps.reads;
        self.write_paths = deps.writes;
        self.local_read_paths = deps.local_reads;
        self.local_write_paths = deps.local_writes;
    }

    pub(crate) fn mark_updated(&mut self) {
        self.needs_update = false;
        self.last_update = Some(Instant::now());
    }
}
