//! View Tree - Arena of view nodes addressed by generational handles.
//!
//! Manages the node lifecycle:
//! - Slot allocation with a free list for reuse
//! - Generation bump on removal so stale handles never alias
//! - Parent back-references kept in sync with child lists
//! - Local state scopes and their tracked reads
//!
//! # Example
//!
//! ```ignore
//! use scals_core::engine::ViewTree;
//!
//! let mut tree = ViewTree::new();
//! let label = tree.create_node(Some("label"), vec![]);
//! let card = tree.create_node(Some("card"), vec![label]);
//! tree.set_root(card);
//!
//! assert_eq!(tree.parent(label), Some(card));
//! assert_eq!(tree.find_by_id("label"), Some(label));
//! ```

use crate::state::{StateMap, StatePath, StateValue};
use super::node::{NodeId, ViewNode};
use super::tracker;

/// Result of a local-state write.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalChange {
    /// Node that owns the scope that was written.
    pub scope: NodeId,
    /// Canonical path inside the scope.
    pub path: String,
    pub old: Option<StateValue>,
    pub new: StateValue,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<ViewNode>,
}

/// Arena owning every view node.
#[derive(Debug, Clone, Default)]
pub struct ViewTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<NodeId>,
    id_counter: usize,
    len: usize,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Create a node and adopt `children`.
    ///
    /// Without an id, one is generated (`n0`, `n1`, ...). Children that are
    /// already attached elsewhere are moved; stale handles are skipped.
    pub fn create_node(&mut self, id: Option<&str>, children: Vec<NodeId>) -> NodeId {
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let id = format!("n{}", self.id_counter);
                self.id_counter += 1;
                id
            }
        };

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(ViewNode::new(id));
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(ViewNode::new(id)),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        self.len += 1;

        for child in children {
            self.append_child(handle, child);
        }
        handle
    }

    /// Free `node` and all its descendants. Returns the removed handles, pre-order.
    pub fn remove_subtree(&mut self, node: NodeId) -> Vec<NodeId> {
        if !self.contains(node) {
            return Vec::new();
        }
        self.detach(node);
        let removed = self.subtree(node);
        for handle in &removed {
            let slot = &mut self.slots[handle.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(handle.index);
            self.len -= 1;
        }
        if self.root.is_some_and(|root| removed.contains(&root)) {
            self.root = None;
        }
        tracing::debug!(node = %node, removed = removed.len(), "removed subtree");
        removed
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn get(&self, node: NodeId) -> Option<&ViewNode> {
        self.slots
            .get(node.index as usize)
            .filter(|slot| slot.generation == node.generation)?
            .node
            .as_ref()
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut ViewNode> {
        self.slots
            .get_mut(node.index as usize)
            .filter(|slot| slot.generation == node.generation)?
            .node
            .as_mut()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ViewNode)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let node = slot.node.as_ref()?;
            let handle = NodeId {
                index: index as u32,
                generation: slot.generation,
            };
            Some((handle, node))
        })
    }

    pub fn set_root(&mut self, node: NodeId) {
        if self.contains(node) {
            self.detach(node);
            self.root = Some(node);
        } else {
            tracing::warn!(node = %node, "set_root with a stale handle");
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Live nodes without a parent.
    pub fn roots(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(handle, _)| handle)
            .collect()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Attach `child` as the last child of `parent`.
    ///
    /// Returns false for stale handles or if the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let position = self.children(parent).len();
        self.insert_child(parent, position, child)
    }

    /// Attach `child` under `parent` at `position` (clamped).
    pub fn insert_child(&mut self, parent: NodeId, position: usize, child: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(child) {
            tracing::warn!(parent = %parent, child = %child, "insert_child with a stale handle");
            return false;
        }
        if parent == child || self.is_ancestor(child, parent) {
            tracing::warn!(parent = %parent, child = %child, "insert_child would create a cycle");
            return false;
        }

        self.detach(child);
        if self.root == Some(child) {
            self.root = None;
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            let position = position.min(node.children.len());
            node.children.insert(position, child);
        }
        true
    }

    /// Unlink `node` from its parent's child list.
    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.get_mut(node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|&c| c != node);
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// First node with `id`, pre-order from the root (or every parentless node).
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let starts = match self.root {
            Some(root) => vec![root],
            None => self.roots(),
        };
        starts
            .into_iter()
            .flat_map(|start| self.subtree(start))
            .find(|&handle| self.get(handle).is_some_and(|n| n.id == id))
    }

    /// `node` followed by all its descendants, pre-order.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(node) {
            return out;
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// All descendants of `node`, pre-order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut all = self.subtree(node);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// Handles from the topmost ancestor down to `node` inclusive.
    pub fn path_from_root(&self, node: NodeId) -> Vec<NodeId> {
        if !self.contains(node) {
            return Vec::new();
        }
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Number of ancestors (0 for a parentless node).
    pub fn depth(&self, node: NodeId) -> usize {
        self.path_from_root(node).len().saturating_sub(1)
    }

    /// True if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.parent(handle);
        }
        false
    }

    // =========================================================================
    // Local state
    // =========================================================================

    /// Declare `node` as a local state scope seeded with `initial`.
    ///
    /// Re-declaring replaces the scope's contents.
    pub fn declare_local_state(&mut self, node: NodeId, initial: StateMap) -> bool {
        match self.get_mut(node) {
            Some(n) => {
                n.local_state = Some(StateValue::Object(initial));
                true
            }
            None => false,
        }
    }

    /// Closest scope owner: `node` itself, then its ancestors. Never descendants.
    pub fn nearest_local_state_scope(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(handle) = current {
            let n = self.get(handle)?;
            if n.local_state.is_some() {
                return Some(handle);
            }
            current = n.parent;
        }
        None
    }

    /// Read local state visible from `node`, recording a local read.
    pub fn local_get(&self, node: NodeId, path: &str) -> Option<StateValue> {
        let parsed = StatePath::parse(path).ok()?;
        tracker::track_local_read(&parsed.to_string());
        let scope = self.nearest_local_state_scope(node)?;
        let state = self.get(scope)?.local_state.as_ref()?;
        parsed.lookup(state).cloned()
    }

    /// Write local state in the scope visible from `node`.
    ///
    /// Returns `None` if no scope is visible, the path is malformed, or the
    /// write would pad an array too far.
    pub fn local_set(
        &mut self,
        node: NodeId,
        path: &str,
        value: impl Into<StateValue>,
    ) -> Option<LocalChange> {
        let parsed = match StatePath::parse(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path, %err, "local write to malformed path ignored");
                return None;
            }
        };
        let Some(scope) = self.nearest_local_state_scope(node) else {
            tracing::warn!(node = %node, path, "local write with no visible scope ignored");
            return None;
        };
        let value = value.into();
        let state = self.get_mut(scope)?.local_state.as_mut()?;
        let old = match parsed.assign(state, value.clone()) {
            Ok(old) => old,
            Err(err) => {
                tracing::warn!(node = %node, path, %err, "local write ignored");
                return None;
            }
        };
        let path = parsed.to_string();
        tracker::track_local_write(&path);
        Some(LocalChange {
            scope,
            path,
            old,
            new: value,
        })
    }
}
