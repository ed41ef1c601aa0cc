//! Dependency Index - Reverse map from state paths to the nodes that read them.
//!
//! Global reads are indexed by canonical path. Local reads are indexed per
//! scope owner, so two scopes declaring the same local name never see each
//! other's writes. A global path whose first key is `local` is an ordinary
//! global dependency.
//!
//! Every node has at most one registration. Unregistering uses the stored
//! registration rather than the node's current read set, which may already
//! have been replaced by a re-resolution.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use crate::config::PathMatchRule;
use crate::error::IndexError;
use crate::state::canonicalize;
use super::node::NodeId;
use super::tracker;
use super::tree::ViewTree;

type PathMap = BTreeMap<String, BTreeSet<NodeId>>;

#[derive(Debug, Clone, Default)]
struct Registration {
    global: BTreeSet<String>,
    local: BTreeSet<String>,
    /// Scope the local paths were indexed under.
    scope: Option<NodeId>,
}

impl Registration {
    fn keys(&self) -> BTreeSet<String> {
        self.global
            .iter()
            .cloned()
            .chain(self.local.iter().map(|p| tracker::local_dependency_key(p)))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    rule: PathMatchRule,
    global: PathMap,
    local: HashMap<NodeId, PathMap>,
    registrations: HashMap<NodeId, Registration>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(rule: PathMatchRule) -> Self {
        Self {
            rule,
            ..Self::default()
        }
    }

    pub fn rule(&self) -> PathMatchRule {
        self.rule
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Subscribe `node` to every path in its current read set.
    ///
    /// A node that is already registered is unregistered first.
    pub fn register(&mut self, tree: &ViewTree, node: NodeId) {
        let Some(view) = tree.get(node) else {
            tracing::warn!(node = %node, "register with a stale handle");
            return;
        };
        if self.registrations.contains_key(&node) {
            tracing::warn!(node = %node, "node registered twice, replacing registration");
            self.unregister(node);
        }

        let mut registration = Registration {
            global: view.read_paths().iter().map(|p| canonical(p)).collect(),
            local: view.local_read_paths().iter().map(|p| canonical(p)).collect(),
            scope: None,
        };

        for path in &registration.global {
            self.global.entry(path.clone()).or_default().insert(node);
        }
        if !registration.local.is_empty() {
            registration.scope = tree.nearest_local_state_scope(node);
            match registration.scope {
                Some(scope) => {
                    let scoped = self.local.entry(scope).or_default();
                    for path in &registration.local {
                        scoped.entry(path.clone()).or_default().insert(node);
                    }
                }
                None => {
                    tracing::warn!(node = %node, "local reads with no visible scope are not indexed");
                }
            }
        }

        tracing::trace!(
            node = %node,
            global = registration.global.len(),
            local = registration.local.len(),
            "registered node"
        );
        self.registrations.insert(node, registration);
    }

    /// Remove `node` from every path it was registered under.
    pub fn unregister(&mut self, node: NodeId) {
        let Some(registration) = self.registrations.remove(&node) else {
            return;
        };
        for path in &registration.global {
            remove_entry(&mut self.global, path, node);
        }
        if let Some(scope) = registration.scope {
            if let Some(scoped) = self.local.get_mut(&scope) {
                for path in &registration.local {
                    remove_entry(scoped, path, node);
                }
                if scoped.is_empty() {
                    self.local.remove(&scope);
                }
            }
        }
    }

    /// Re-register `node` after its read set changed.
    pub fn update_registration(&mut self, tree: &ViewTree, node: NodeId) {
        self.unregister(node);
        self.register(tree, node);
    }

    /// Re-register every node whose nearest local scope moved since it was
    /// registered, e.g. after an ancestor declared local state.
    ///
    /// Returns the number of nodes re-registered.
    pub fn refresh_scopes(&mut self, tree: &ViewTree) -> usize {
        let moved: Vec<NodeId> = self
            .registrations
            .iter()
            .filter(|(node, r)| {
                !r.local.is_empty()
                    && tree.contains(**node)
                    && r.scope != tree.nearest_local_state_scope(**node)
            })
            .map(|(node, _)| *node)
            .collect();
        for &node in &moved {
            self.update_registration(tree, node);
        }
        if !moved.is_empty() {
            tracing::debug!(count = moved.len(), "re-registered nodes under a new local scope");
        }
        moved.len()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.global.clear();
        self.local.clear();
        self.registrations.clear();
    }

    pub fn is_registered(&self, node: NodeId) -> bool {
        self.registrations.contains_key(&node)
    }

    /// Paths `node` is registered under, local ones with their qualifier.
    pub fn registered_paths(&self, node: NodeId) -> Option<BTreeSet<String>> {
        self.registrations.get(&node).map(Registration::keys)
    }

    /// Nodes registered under exactly `path`.
    pub fn subscribers(&self, path: &str) -> BTreeSet<NodeId> {
        self.global.get(&canonical(path)).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Nodes whose global reads match any of `paths`.
    pub fn nodes_affected_by<I, S>(&self, paths: I) -> BTreeSet<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut affected = BTreeSet::new();
        for path in paths {
            collect_matches(&self.global, self.rule, path.as_ref(), &mut affected);
        }
        tracing::trace!(count = affected.len(), "global lookup");
        affected
    }

    /// Nodes reading local state of `scope` at any of `paths`.
    pub fn nodes_affected_by_local<I, S>(&self, scope: NodeId, paths: I) -> BTreeSet<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut affected = BTreeSet::new();
        if let Some(scoped) = self.local.get(&scope) {
            for path in paths {
                collect_matches(scoped, self.rule, path.as_ref(), &mut affected);
            }
        }
        affected
    }

    // =========================================================================
    // Consistency
    // =========================================================================

    /// Verify the index mirrors `tree` exactly.
    ///
    /// Every live node must be registered under its current read sets and
    /// nearest local scope, no removed node may remain, and every path entry
    /// must be backed by the owning node's registration.
    pub fn check_consistency(&self, tree: &ViewTree) -> Result<(), IndexError> {
        for (node, view) in tree.iter() {
            let Some(registration) = self.registrations.get(&node) else {
                return Err(IndexError::Unregistered { node });
            };
            let current = Registration {
                global: view.read_paths().iter().map(|p| canonical(p)).collect(),
                local: view.local_read_paths().iter().map(|p| canonical(p)).collect(),
                scope: None,
            };
            if registration.global != current.global || registration.local != current.local {
                return Err(IndexError::Stale {
                    node,
                    registered: registration.keys().into_iter().collect(),
                    current: current.keys().into_iter().collect(),
                });
            }
            if !registration.local.is_empty() {
                let scope = tree.nearest_local_state_scope(node);
                if registration.scope != scope {
                    return Err(IndexError::ScopeMismatch {
                        node,
                        registered: registration.scope,
                        current: scope,
                    });
                }
            }
        }

        for &node in self.registrations.keys() {
            if !tree.contains(node) {
                return Err(IndexError::Orphaned { node });
            }
        }

        for (path, nodes) in &self.global {
            for &node in nodes {
                let backed = self
                    .registrations
                    .get(&node)
                    .is_some_and(|r| r.global.contains(path));
                if !backed {
                    return Err(IndexError::Dangling {
                        path: path.clone(),
                        node,
                    });
                }
            }
        }

        for (scope, scoped) in &self.local {
            for (path, nodes) in scoped {
                for &node in nodes {
                    let backed = self
                        .registrations
                        .get(&node)
                        .is_some_and(|r| r.scope == Some(*scope) && r.local.contains(path));
                    if !backed {
                        return Err(IndexError::Dangling {
                            path: tracker::local_dependency_key(path),
                            node,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn canonical(path: &str) -> String {
    canonicalize(path).unwrap_or_else(|_| path.to_string())
}

fn remove_entry(map: &mut PathMap, path: &str, node: NodeId) {
    if let Some(nodes) = map.get_mut(path) {
        nodes.remove(&node);
        if nodes.is_empty() {
            map.remove(path);
        }
    }
}

fn collect_matches(map: &PathMap, rule: PathMatchRule, path: &str, out: &mut BTreeSet<NodeId>) {
    let Ok(parsed) = crate::state::StatePath::parse(path) else {
        if let Some(nodes) = map.get(path) {
            out.extend(nodes.iter().copied());
        }
        return;
    };
    let path = parsed.to_string();

    if rule == PathMatchRule::Exact {
        if let Some(nodes) = map.get(&path) {
            out.extend(nodes.iter().copied());
        }
        return;
    }

    // Readers of the path itself or any ancestor
    for prefix in parsed.prefixes() {
        if let Some(nodes) = map.get(&prefix) {
            out.extend(nodes.iter().copied());
        }
    }

    // Readers of anything beneath the path; keys sharing a string prefix are contiguous
    let below = map
        .range::<str, _>((Bound::Excluded(path.as_str()), Bound::Unbounded))
        .take_while(|(key, _)| key.starts_with(path.as_str()));
    for (key, nodes) in below {
        if matches!(key.as_bytes().get(path.len()), Some(b'.' | b'[')) {
            out.extend(nodes.iter().copied());
        }
    }
}
