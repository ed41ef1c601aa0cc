//! Tree Updater - Turns state changes into pending node updates.
//!
//! The updater owns the live [`ViewTree`] and its [`DependencyIndex`]. While
//! attached to a [`StateStore`] it hears every mutation, looks up the nodes
//! that read the written path, flags them and hands them to the renderer.
//!
//! ```text
//! store.set(path) → nodes_affected_by({path}) → needs_update + pending → on_nodes_need_update
//! ```
//!
//! # Example
//!
//! ```ignore
//! let updater = ViewTreeUpdater::new();
//! updater.set_root(tree);
//! updater.attach(&store);
//! updater.on_nodes_need_update(|nodes| schedule_render(nodes));
//!
//! store.set("count", 2);
//! for node in updater.minimal_update_set() {
//!     render(node);
//!     updater.mark_node_updated(node);
//! }
//! ```
//!
//! The pending set only shrinks through [`mark_node_updated`](ViewTreeUpdater::mark_node_updated).
//! Renderer effects can subscribe to [`revision`](ViewTreeUpdater::revision),
//! which bumps whenever new nodes become pending.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::mem;
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use crate::config::{EngineConfig, NotificationMode};
use crate::error::IndexError;
use crate::state::{StateChange, StateStore, StateValue, Subscription};
use super::index::DependencyIndex;
use super::node::NodeId;
use super::tracker::TrackedDependencies;
use super::tree::ViewTree;

/// Lifecycle of the updater's store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterPhase {
    Detached,
    Attached,
}

type UpdateCallback = Box<dyn FnMut(&[NodeId])>;

struct UpdaterState {
    config: EngineConfig,
    tree: ViewTree,
    index: DependencyIndex,
    pending: BTreeSet<NodeId>,
    suspended: usize,
}

impl UpdaterState {
    /// Flag `affected` nodes. Returns the live ones and whether any were newly pending.
    fn mark_pending(&mut self, affected: BTreeSet<NodeId>) -> (Vec<NodeId>, bool) {
        let mut marked = Vec::with_capacity(affected.len());
        let mut added = false;
        for node in affected {
            if let Some(view) = self.tree.get_mut(node) {
                view.needs_update = true;
                added |= self.pending.insert(node);
                marked.push(node);
            }
        }
        (marked, added)
    }
}

struct Shared {
    state: RefCell<UpdaterState>,
    callback: RefCell<Option<UpdateCallback>>,
    /// Paths that arrived while the state was borrowed.
    backlog: RefCell<Vec<String>>,
    outbox: RefCell<VecDeque<Vec<NodeId>>>,
    dispatching: Cell<bool>,
    subscription: RefCell<Option<Subscription>>,
    revision_count: Cell<u64>,
    revision: Signal<u64>,
}

/// Coordinates incremental updates for one view tree.
///
/// Cloning yields another handle to the same updater.
#[derive(Clone)]
pub struct ViewTreeUpdater {
    shared: Rc<Shared>,
}

impl Default for ViewTreeUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTreeUpdater {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let index = DependencyIndex::with_rule(config.match_rule);
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(UpdaterState {
                    config,
                    tree: ViewTree::new(),
                    index,
                    pending: BTreeSet::new(),
                    suspended: 0,
                }),
                callback: RefCell::new(None),
                backlog: RefCell::new(Vec::new()),
                outbox: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                subscription: RefCell::new(None),
                revision_count: Cell::new(0),
                revision: signal(0),
            }),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.shared.state.borrow().config.clone()
    }

    // =========================================================================
    // Store connection
    // =========================================================================

    /// Subscribe to `store`, replacing any previous store.
    ///
    /// Paths the store marked dirty before attaching are discarded; the tree
    /// is assumed to reflect the store as it is now.
    pub fn attach(&self, store: &StateStore) {
        self.detach();
        store.consume_dirty_paths();

        let weak: Weak<Shared> = Rc::downgrade(&self.shared);
        let subscription = store.subscribe(move |change| {
            if let Some(shared) = weak.upgrade() {
                ViewTreeUpdater { shared }.handle_change(change);
            }
        });
        *self.shared.subscription.borrow_mut() = Some(subscription);
        tracing::debug!("updater attached");
    }

    pub fn detach(&self) {
        if self.shared.subscription.borrow_mut().take().is_some() {
            tracing::debug!("updater detached");
        }
    }

    pub fn phase(&self) -> UpdaterPhase {
        if self.shared.subscription.borrow().is_some() {
            UpdaterPhase::Attached
        } else {
            UpdaterPhase::Detached
        }
    }

    /// Set the callback that receives each batch of affected nodes.
    pub fn on_nodes_need_update(&self, callback: impl FnMut(&[NodeId]) + 'static) {
        *self.shared.callback.borrow_mut() = Some(Box::new(callback));
    }

    // =========================================================================
    // Tree
    // =========================================================================

    /// Install `tree` and index every node in it.
    ///
    /// The previous tree, its registrations and any pending updates are dropped.
    pub fn set_root(&self, tree: ViewTree) {
        {
            let mut guard = self.shared.state.borrow_mut();
            let state = &mut *guard;
            state.tree = tree;
            state.pending.clear();
            state.index.clear();
            for (node, _) in state.tree.iter() {
                state.index.register(&state.tree, node);
            }
            tracing::debug!(nodes = state.tree.len(), "installed view tree");
        }
        self.drain_backlog();
    }

    /// Read access to the live tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&ViewTree) -> R) -> R {
        let result = f(&self.shared.state.borrow().tree);
        self.drain_backlog();
        result
    }

    /// Re-record `node`'s dependencies after it was resolved again.
    pub fn refresh_node(&self, node: NodeId, deps: TrackedDependencies) -> bool {
        let refreshed = {
            let mut guard = self.shared.state.borrow_mut();
            let state = &mut *guard;
            match state.tree.get_mut(node) {
                Some(view) => {
                    view.set_dependencies(deps);
                    state.index.update_registration(&state.tree, node);
                    true
                }
                None => false,
            }
        };
        self.drain_backlog();
        refreshed
    }

    /// Replace the subtree rooted at `target` with the one `build` returns.
    ///
    /// The old subtree is unregistered and freed before `build` runs; the
    /// new subtree takes the old one's place and every node in it is
    /// registered. Returns the new subtree root.
    pub fn replace_subtree(
        &self,
        target: NodeId,
        build: impl FnOnce(&mut ViewTree) -> NodeId,
    ) -> Option<NodeId> {
        let replacement = {
            let mut guard = self.shared.state.borrow_mut();
            let state = &mut *guard;
            if !state.tree.contains(target) {
                tracing::warn!(node = %target, "replace_subtree with a stale handle");
                return None;
            }

            let parent = state.tree.parent(target);
            let position = parent.and_then(|p| {
                state.tree.children(p).iter().position(|&c| c == target)
            });
            let was_root = state.tree.root() == Some(target);

            for node in state.tree.subtree(target) {
                state.index.unregister(node);
                state.pending.remove(&node);
            }
            let removed = state.tree.remove_subtree(target);

            let replacement = build(&mut state.tree);
            match (parent, position) {
                (Some(parent), Some(position)) => {
                    state.tree.insert_child(parent, position, replacement);
                }
                _ if was_root => state.tree.set_root(replacement),
                _ => {}
            }

            let added = state.tree.subtree(replacement);
            for &node in &added {
                state.index.register(&state.tree, node);
            }
            // `build` may have declared local state above existing readers
            state.index.refresh_scopes(&state.tree);
            tracing::debug!(
                old = %target,
                new = %replacement,
                removed = removed.len(),
                added = added.len(),
                "replaced subtree"
            );
            replacement
        };
        self.drain_backlog();
        Some(replacement)
    }

    /// Write local state visible from `node` and flag the scope's readers.
    ///
    /// Local writes are processed immediately in every mode, since they never
    /// pass through the store's dirty set.
    pub fn set_local_state(&self, node: NodeId, path: &str, value: impl Into<StateValue>) -> bool {
        let outcome = {
            let mut state = self.shared.state.borrow_mut();
            match state.tree.local_set(node, path, value) {
                Some(change) => {
                    let affected = state.index.nodes_affected_by_local(change.scope, [&change.path]);
                    Some(state.mark_pending(affected))
                }
                None => None,
            }
        };
        let written = outcome.is_some();
        if let Some((marked, added)) = outcome {
            self.publish(marked, added);
        }
        self.drain_backlog();
        written
    }

    pub fn check_consistency(&self) -> Result<(), IndexError> {
        let state = self.shared.state.borrow();
        state.index.check_consistency(&state.tree)
    }

    /// Nodes the index would flag for `paths`, without flagging them.
    pub fn nodes_affected_by<I, S>(&self, paths: I) -> BTreeSet<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shared.state.borrow().index.nodes_affected_by(paths)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    fn handle_change(&self, change: &StateChange) {
        self.shared.backlog.borrow_mut().push(change.path.clone());
        self.drain_backlog();
    }

    /// Process queued paths unless the state is already borrowed further up the stack.
    fn drain_backlog(&self) {
        let outcome = {
            let Ok(mut state) = self.shared.state.try_borrow_mut() else {
                return;
            };
            let paths = mem::take(&mut *self.shared.backlog.borrow_mut());
            if paths.is_empty()
                || state.suspended > 0
                || state.config.notification_mode == NotificationMode::Deferred
            {
                return;
            }
            let affected = state.index.nodes_affected_by(&paths);
            tracing::trace!(paths = paths.len(), affected = affected.len(), "state changed");
            state.mark_pending(affected)
        };
        let (marked, added) = outcome;
        self.publish(marked, added);
    }

    /// Drain the store's dirty set and flag every affected node in one pass.
    ///
    /// Works in every mode; this is how deferred updaters receive changes.
    pub fn process_dirty_paths(&self, store: &StateStore) -> BTreeSet<NodeId> {
        let paths = store.consume_dirty_paths();
        if paths.is_empty() {
            return BTreeSet::new();
        }
        self.invalidate(&paths)
    }

    /// Run `f` with per-mutation handling suspended, then process its writes once.
    pub fn batch<R>(&self, store: &StateStore, f: impl FnOnce() -> R) -> R {
        struct Resume<'a>(&'a ViewTreeUpdater);
        impl Drop for Resume<'_> {
            fn drop(&mut self) {
                let mut state = self.0.shared.state.borrow_mut();
                state.suspended = state.suspended.saturating_sub(1);
            }
        }

        let outermost = {
            let mut state = self.shared.state.borrow_mut();
            state.suspended += 1;
            state.suspended == 1
        };
        // Earlier writes were already handled one by one
        if outermost && self.config().notification_mode == NotificationMode::Immediate {
            store.consume_dirty_paths();
        }

        let result = {
            let _resume = Resume(self);
            f()
        };

        if outermost {
            let affected = self.process_dirty_paths(store);
            tracing::debug!(affected = affected.len(), "processed batch");
        }
        result
    }

    /// Flag every node affected by `paths`, as if they had been written.
    pub fn invalidate<I, S>(&self, paths: I) -> BTreeSet<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (marked, added) = {
            let mut state = self.shared.state.borrow_mut();
            let affected = state.index.nodes_affected_by(paths);
            state.mark_pending(affected)
        };
        let affected: BTreeSet<NodeId> = marked.iter().copied().collect();
        self.publish(marked, added);
        self.drain_backlog();
        affected
    }

    fn publish(&self, marked: Vec<NodeId>, added: bool) {
        if added {
            let next = self.shared.revision_count.get() + 1;
            self.shared.revision_count.set(next);
            self.shared.revision.set(next);
        }
        self.dispatch(marked);
    }

    /// Deliver a batch to the callback; batches raised from inside the callback queue up.
    fn dispatch(&self, nodes: Vec<NodeId>) {
        if nodes.is_empty() {
            return;
        }
        self.shared.outbox.borrow_mut().push_back(nodes);
        if self.shared.dispatching.replace(true) {
            return;
        }

        loop {
            let Some(batch) = self.shared.outbox.borrow_mut().pop_front() else {
                break;
            };
            let callback = self.shared.callback.borrow_mut().take();
            if let Some(mut callback) = callback {
                callback(&batch);
                let mut slot = self.shared.callback.borrow_mut();
                if slot.is_none() {
                    *slot = Some(callback);
                }
            }
        }

        self.shared.dispatching.set(false);
    }

    // =========================================================================
    // Pending set
    // =========================================================================

    pub fn pending(&self) -> BTreeSet<NodeId> {
        self.shared.state.borrow().pending.clone()
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.shared.state.borrow().pending.contains(&node)
    }

    /// Pending nodes with no pending ancestor.
    pub fn minimal_update_set(&self) -> BTreeSet<NodeId> {
        let state = self.shared.state.borrow();
        state
            .pending
            .iter()
            .copied()
            .filter(|&node| {
                let mut current = state.tree.parent(node);
                while let Some(ancestor) = current {
                    if state.pending.contains(&ancestor) {
                        return false;
                    }
                    current = state.tree.parent(ancestor);
                }
                true
            })
            .collect()
    }

    /// Pending nodes grouped by depth, shallowest first.
    pub fn updates_by_depth(&self) -> BTreeMap<usize, Vec<NodeId>> {
        let state = self.shared.state.borrow();
        let mut groups: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for &node in &state.pending {
            groups.entry(state.tree.depth(node)).or_default().push(node);
        }
        groups
    }

    /// Acknowledge that `node` was re-rendered.
    pub fn mark_node_updated(&self, node: NodeId) -> bool {
        let mut state = self.shared.state.borrow_mut();
        let was_pending = state.pending.remove(&node);
        match state.tree.get_mut(node) {
            Some(view) => {
                view.mark_updated();
                was_pending
            }
            None => false,
        }
    }

    /// Signal bumped each time nodes become newly pending.
    pub fn revision(&self) -> Signal<u64> {
        self.shared.revision.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tracker;
    use serde_json::json;
    use spark_signals::effect;

    fn deps(paths: &[&str]) -> TrackedDependencies {
        TrackedDependencies {
            reads: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn local_reader(tree: &mut ViewTree, id: &str, paths: &[&str]) -> NodeId {
        let node = tree.create_node(Some(id), vec![]);
        let deps = TrackedDependencies {
            local_reads: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        };
        tree.get_mut(node).unwrap().set_dependencies(deps);
        node
    }

    fn reader(tree: &mut ViewTree, id: &str, paths: &[&str], children: Vec<NodeId>) -> NodeId {
        let node = tree.create_node(Some(id), children);
        tree.get_mut(node).unwrap().set_dependencies(deps(paths));
        node
    }

    #[test]
    fn test_count_scenario() {
        let store = StateStore::with_initial(json!({"count": 1}).into());
        let mut tree = ViewTree::new();
        let n = reader(&mut tree, "N", &["count"], vec![]);
        tree.set_root(n);

        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.attach(&store);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        updater.on_nodes_need_update(move |nodes| seen_clone.borrow_mut().extend_from_slice(nodes));

        store.set("count", 2);

        assert_eq!(updater.nodes_affected_by(["count"]), BTreeSet::from([n]));
        assert!(updater.with_tree(|t| t.get(n).unwrap().needs_update()));
        assert_eq!(*seen.borrow(), vec![n]);
        assert_eq!(updater.pending(), BTreeSet::from([n]));
    }

    #[test]
    fn test_mark_node_updated() {
        let store = StateStore::new();
        let mut tree = ViewTree::new();
        let n = reader(&mut tree, "N", &["a"], vec![]);
        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.attach(&store);

        store.set("a", 1);
        assert!(updater.mark_node_updated(n));
        assert!(updater.pending().is_empty());
        updater.with_tree(|t| {
            let view = t.get(n).unwrap();
            assert!(!view.needs_update());
            assert!(view.last_update().is_some());
        });
    }

    #[test]
    fn test_detach_stops_updates() {
        let store = StateStore::new();
        let mut tree = ViewTree::new();
        reader(&mut tree, "N", &["a"], vec![]);
        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);

        updater.attach(&store);
        assert_eq!(updater.phase(), UpdaterPhase::Attached);
        updater.detach();
        assert_eq!(updater.phase(), UpdaterPhase::Detached);

        store.set("a", 1);
        assert!(updater.pending().is_empty());
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_attach_replaces_previous_store() {
        let first = StateStore::new();
        let second = StateStore::new();
        let mut tree = ViewTree::new();
        reader(&mut tree, "N", &["a"], vec![]);
        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);

        updater.attach(&first);
        updater.attach(&second);
        assert_eq!(first.subscriber_count(), 0);

        first.set("a", 1);
        assert!(updater.pending().is_empty());
        second.set("a", 1);
        assert_eq!(updater.pending().len(), 1);
    }

    #[test]
    fn test_batch_notifies_once() {
        let store = StateStore::new();
        let mut tree = ViewTree::new();
        reader(&mut tree, "A", &["a"], vec![]);
        reader(&mut tree, "B", &["b"], vec![]);
        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.attach(&store);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        updater.on_nodes_need_update(move |_| calls_clone.set(calls_clone.get() + 1));

        updater.batch(&store, || {
            store.set("a", 1);
            store.set("b", 2);
            store.set("a", 3);
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(updater.pending().len(), 2);
    }

    #[test]
    fn test_deferred_mode() {
        let config = EngineConfig {
            notification_mode: NotificationMode::Deferred,
            ..EngineConfig::default()
        };
        let store = StateStore::new();
        let mut tree = ViewTree::new();
        let n = reader(&mut tree, "N", &["items"], vec![]);
        let updater = ViewTreeUpdater::with_config(config);
        updater.set_root(tree);
        updater.attach(&store);

        store.append_to_array("items", "x");
        assert!(updater.pending().is_empty());

        assert_eq!(updater.process_dirty_paths(&store), BTreeSet::from([n]));
        assert!(updater.process_dirty_paths(&store).is_empty());
    }

    #[test]
    fn test_minimal_set_and_depth_groups() {
        let mut tree = ViewTree::new();
        let leaf = reader(&mut tree, "leaf", &["x"], vec![]);
        let mid = reader(&mut tree, "mid", &["x"], vec![leaf]);
        let other = reader(&mut tree, "other", &["x"], vec![]);
        let root = reader(&mut tree, "root", &[], vec![mid, other]);
        tree.set_root(root);

        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.invalidate(["x"]);

        assert_eq!(updater.minimal_update_set(), BTreeSet::from([mid, other]));
        let groups = updater.updates_by_depth();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(groups[&2], vec![leaf]);
    }

    #[test]
    fn test_refresh_node_updates_index() {
        let store = StateStore::new();
        let mut tree = ViewTree::new();
        let n = reader(&mut tree, "N", &["old"], vec![]);
        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.attach(&store);

        let ((), recorded) = tracker::track(|| {
            store.get("new");
        });
        assert!(updater.refresh_node(n, recorded));
        assert!(updater.check_consistency().is_ok());

        store.set("old", 1);
        assert!(updater.pending().is_empty());
        store.set("new", 1);
        assert_eq!(updater.pending(), BTreeSet::from([n]));
    }

    #[test]
    fn test_replace_subtree_reregisters() {
        let store = StateStore::new();
        let mut tree = ViewTree::new();
        let child = reader(&mut tree, "child", &["a"], vec![]);
        let root = reader(&mut tree, "root", &[], vec![child]);
        tree.set_root(root);

        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.attach(&store);

        let replacement = updater
            .replace_subtree(child, |tree| reader(tree, "child", &["b"], vec![]))
            .unwrap();
        assert!(updater.check_consistency().is_ok());
        assert_eq!(updater.with_tree(|t| t.parent(replacement)), Some(root));

        store.set("a", 1);
        assert!(updater.pending().is_empty());
        store.set("b", 1);
        assert_eq!(updater.pending(), BTreeSet::from([replacement]));
    }

    #[test]
    fn test_local_state_is_scoped() {
        let mut tree = ViewTree::new();
        let left_label = local_reader(&mut tree, "label", &["open"]);
        let right_label = local_reader(&mut tree, "label", &["open"]);
        let left = tree.create_node(Some("left"), vec![left_label]);
        let right = tree.create_node(Some("right"), vec![right_label]);
        tree.declare_local_state(left, Default::default());
        tree.declare_local_state(right, Default::default());

        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);

        assert!(updater.set_local_state(left_label, "open", true));
        assert_eq!(updater.pending(), BTreeSet::from([left_label]));
    }

    #[test]
    fn test_global_local_key_is_invalidated_by_store() {
        let store = StateStore::new();
        let mut tree = ViewTree::new();
        let global = reader(&mut tree, "global", &["local.theme"], vec![]);
        let scoped = local_reader(&mut tree, "scoped", &["theme"]);
        let root = reader(&mut tree, "root", &[], vec![global, scoped]);
        tree.declare_local_state(root, Default::default());
        tree.set_root(root);

        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.attach(&store);

        store.set("local.theme", "light");
        assert_eq!(updater.pending(), BTreeSet::from([global]));

        assert!(updater.mark_node_updated(global));
        assert!(updater.set_local_state(scoped, "theme", "dark"));
        assert_eq!(updater.pending(), BTreeSet::from([scoped]));
    }

    #[test]
    fn test_replace_subtree_follows_new_local_scope() {
        let mut tree = ViewTree::new();
        let sibling = local_reader(&mut tree, "sibling", &["open"]);
        let target = reader(&mut tree, "target", &[], vec![]);
        let middle = reader(&mut tree, "middle", &[], vec![sibling, target]);
        let outer = reader(&mut tree, "outer", &[], vec![middle]);
        tree.declare_local_state(outer, Default::default());
        tree.set_root(outer);

        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);

        updater
            .replace_subtree(target, move |tree| {
                tree.declare_local_state(middle, Default::default());
                reader(tree, "target", &[], vec![])
            })
            .unwrap();
        assert!(updater.check_consistency().is_ok());

        assert!(updater.set_local_state(sibling, "open", true));
        assert_eq!(updater.pending(), BTreeSet::from([sibling]));
        assert_eq!(
            updater.with_tree(|t| t.get(middle).unwrap().local_value("open").cloned()),
            Some(StateValue::Bool(true))
        );
    }

    #[test]
    fn test_revision_signal_drives_effects() {
        let mut tree = ViewTree::new();
        reader(&mut tree, "N", &["a"], vec![]);
        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let revision = updater.revision();
        let _effect = effect(move || {
            let _ = revision.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        updater.invalidate(["a"]);
        assert_eq!(runs.get(), 2);

        // Already pending, nothing new
        updater.invalidate(["a"]);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_callback_may_write_state() {
        let store = Rc::new(StateStore::new());
        let mut tree = ViewTree::new();
        let a = reader(&mut tree, "A", &["a"], vec![]);
        let b = reader(&mut tree, "B", &["b"], vec![]);
        let updater = ViewTreeUpdater::new();
        updater.set_root(tree);
        updater.attach(&store);

        let weak = Rc::downgrade(&store);
        updater.on_nodes_need_update(move |nodes| {
            if nodes.contains(&a) {
                if let Some(store) = weak.upgrade() {
                    store.set("b", 1);
                }
            }
        });

        store.set("a", 1);
        assert_eq!(updater.pending(), BTreeSet::from([a, b]));
    }
}
