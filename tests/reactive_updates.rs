//! End-to-end update flow: resolve a small view tree against a store, mutate
//! state, and check which nodes the updater hands to the renderer.
//!
//! Run with: cargo test --test reactive_updates

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::json;

use scals_core::engine::tracker;
use scals_core::state::StateMap;
use scals_core::{
    style_dependency_key, ArrayRemoval, NodeId, StateStore, StateValue, StyleResolver,
    TrackedDependencies, ViewTree, ViewTreeUpdater,
};

// =============================================================================
// FIXTURE
// =============================================================================

/// Resolve a node: run `read` inside a tracking scope and record what it touched.
fn resolve_node(
    tree: &mut ViewTree,
    id: &str,
    children: Vec<NodeId>,
    read: impl FnOnce() -> String,
) -> (NodeId, String) {
    let (text, deps) = tracker::track(read);
    let node = tree.create_node(Some(id), children);
    tree.get_mut(node).unwrap().set_dependencies(deps);
    (node, text)
}

struct Screen {
    store: Rc<StateStore>,
    updater: ViewTreeUpdater,
    header: NodeId,
    greeting: NodeId,
    counter: NodeId,
    list: NodeId,
    footer: NodeId,
}

/// ```text
/// header (reads nothing)
/// ├── greeting  "Hello ${user.name}"
/// ├── counter   "${count} clicks"
/// └── list      reads items
///     (footer is a sibling root child reading user)
/// ```
fn screen() -> Screen {
    let store = Rc::new(StateStore::with_initial(
        json!({
            "user": {"name": "Ada", "role": "admin"},
            "count": 1,
            "items": ["a", "b"]
        })
        .into(),
    ));
    let mut tree = ViewTree::new();

    let (greeting, text) = resolve_node(&mut tree, "greeting", vec![], || {
        store.interpolate("Hello ${user.name}")
    });
    assert_eq!(text, "Hello Ada");
    let (counter, _) = resolve_node(&mut tree, "counter", vec![], || {
        store.interpolate("${count} clicks")
    });
    let (list, _) = resolve_node(&mut tree, "list", vec![], || {
        store.get_array("items").unwrap_or_default().len().to_string()
    });
    let (header, _) = resolve_node(&mut tree, "header", vec![greeting, counter, list], String::new);
    let (footer, _) = resolve_node(&mut tree, "footer", vec![], || {
        store.get("user").map(|u| u.to_string()).unwrap_or_default()
    });
    let root = tree.create_node(Some("root"), vec![header, footer]);
    tree.set_root(root);

    let updater = ViewTreeUpdater::new();
    updater.set_root(tree);
    updater.attach(&store);

    Screen {
        store,
        updater,
        header,
        greeting,
        counter,
        list,
        footer,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn test_count_scenario() {
    let s = screen();
    s.store.set("count", 2);

    assert_eq!(s.updater.nodes_affected_by(["count"]), BTreeSet::from([s.counter]));
    assert!(s.updater.with_tree(|t| t.get(s.counter).unwrap().needs_update()));
    assert_eq!(s.updater.pending(), BTreeSet::from([s.counter]));
}

#[test]
fn test_nested_write_reaches_whole_object_reader() {
    let s = screen();
    s.store.set("user.name", "Grace");

    assert_eq!(s.updater.pending(), BTreeSet::from([s.greeting, s.footer]));
}

#[test]
fn test_object_replacement_reaches_field_readers() {
    let s = screen();
    s.store.set("user", json!({"name": "Linus"}));
    assert!(s.updater.is_pending(s.greeting));
    assert!(s.updater.is_pending(s.footer));
    assert!(!s.updater.is_pending(s.counter));
}

#[test]
fn test_array_scenario() {
    let store = StateStore::new();
    store.append_to_array("items", "x");
    assert_eq!(store.get("items"), Some(StateValue::from(vec!["x"])));
    store.remove_from_array("items", ArrayRemoval::At(0));
    assert_eq!(store.get("items"), Some(StateValue::Array(vec![])));
}

#[test]
fn test_array_mutations_notify_readers() {
    let s = screen();
    let batches = Rc::new(RefCell::new(Vec::new()));
    let batches_clone = batches.clone();
    s.updater
        .on_nodes_need_update(move |nodes| batches_clone.borrow_mut().push(nodes.to_vec()));

    s.store.toggle_in_array("items", "c");
    s.store.remove_from_array("items", ArrayRemoval::At(10));

    // The out-of-range removal is a no-op and raises nothing
    assert_eq!(*batches.borrow(), vec![vec![s.list]]);
}

#[test]
fn test_render_loop_drains_minimal_set() {
    let s = screen();
    s.updater.invalidate(["count", "items"]);
    s.updater.invalidate(["user"]);

    // Header is not pending, so its children stay in the minimal set
    let minimal = s.updater.minimal_update_set();
    assert_eq!(minimal, BTreeSet::from([s.greeting, s.counter, s.list, s.footer]));

    for node in minimal {
        assert!(s.updater.mark_node_updated(node));
    }
    assert!(s.updater.pending().is_empty());
}

#[test]
fn test_minimal_set_drops_descendants_of_pending_ancestor() {
    let s = screen();
    let root = s.updater.with_tree(|t| t.root()).unwrap();

    // Header re-resolves against count now
    let deps = TrackedDependencies {
        reads: BTreeSet::from(["count".to_string()]),
        ..Default::default()
    };
    s.updater.refresh_node(s.header, deps);
    s.store.set("count", 5);

    assert_eq!(s.updater.pending(), BTreeSet::from([s.header, s.counter]));
    assert_eq!(s.updater.minimal_update_set(), BTreeSet::from([s.header]));

    let groups = s.updater.updates_by_depth();
    assert_eq!(groups[&1], vec![s.header]);
    assert_eq!(groups[&2], vec![s.counter]);
    assert!(!s.updater.with_tree(|t| t.is_ancestor(s.counter, root)));
}

#[test]
fn test_batched_action_notifies_once() {
    let s = screen();
    let calls = Rc::new(RefCell::new(0));
    let calls_clone = calls.clone();
    s.updater.on_nodes_need_update(move |_| *calls_clone.borrow_mut() += 1);

    s.updater.batch(&s.store, || {
        s.store.set("count", s.store.evaluate("count + 1"));
        s.store.set("count", s.store.evaluate("count + 1"));
        s.store.append_to_array("items", "z");
    });

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(s.store.get_i64("count"), Some(3));
    assert_eq!(s.updater.pending(), BTreeSet::from([s.counter, s.list]));
}

#[test]
fn test_rerender_cycle_keeps_index_consistent() {
    let s = screen();
    assert!(s.updater.check_consistency().is_ok());

    for round in 0..5 {
        s.store.set("count", round);
        for node in s.updater.minimal_update_set() {
            // Re-resolve the counter; on odd rounds it also reads the role
            let store = s.store.clone();
            let (_, deps) = tracker::track(|| {
                let mut text = store.interpolate("${count} clicks");
                if round % 2 == 1 {
                    text.push_str(&store.get_str("user.role").unwrap_or_default());
                }
                text
            });
            s.updater.refresh_node(node, deps);
            s.updater.mark_node_updated(node);
            assert!(s.updater.check_consistency().is_ok());
        }
    }

    // Last round (4) was even: the role read was dropped again
    s.store.set("user.role", "guest");
    assert!(!s.updater.is_pending(s.counter));
}

#[test]
fn test_subtree_replacement_moves_subscriptions() {
    let s = screen();
    let old_list = s.list;
    let store = s.store.clone();
    let new_list = s
        .updater
        .replace_subtree(old_list, |tree| {
            let (first, _) = resolve_node(tree, "item-0", vec![], || {
                store.get_str("items[0]").unwrap_or_default()
            });
            let (list, _) = resolve_node(tree, "list", vec![first], String::new);
            list
        })
        .unwrap();

    assert!(s.updater.check_consistency().is_ok());
    assert_eq!(s.updater.with_tree(|t| t.parent(new_list)), Some(s.header));
    assert!(!s.updater.with_tree(|t| t.contains(old_list)));

    s.store.set("items[0]", "q");
    let item = s.updater.with_tree(|t| t.find_by_id("item-0")).unwrap();
    assert_eq!(s.updater.pending(), BTreeSet::from([item]));
}

#[test]
fn test_local_state_same_name_different_scopes() {
    let mut tree = ViewTree::new();
    let left_label = tree.create_node(Some("label"), vec![]);
    let right_label = tree.create_node(Some("label"), vec![]);
    let left = tree.create_node(Some("left"), vec![left_label]);
    let right = tree.create_node(Some("right"), vec![right_label]);
    let root = tree.create_node(Some("root"), vec![left, right]);
    tree.set_root(root);
    tree.declare_local_state(left, StateMap::from([("open".to_string(), StateValue::Bool(false))]));
    tree.declare_local_state(right, StateMap::from([("open".to_string(), StateValue::Bool(true))]));

    for label in [left_label, right_label] {
        let (open, deps) = tracker::track(|| tree.local_get(label, "open"));
        assert!(open.is_some());
        tree.get_mut(label).unwrap().set_dependencies(deps);
    }

    let updater = ViewTreeUpdater::new();
    updater.set_root(tree);
    assert!(updater.check_consistency().is_ok());

    assert!(updater.set_local_state(right_label, "open", false));
    assert_eq!(updater.pending(), BTreeSet::from([right_label]));
    assert_eq!(
        updater.with_tree(|t| t.get(right).unwrap().local_value("open").cloned()),
        Some(StateValue::Bool(false))
    );

    // Local names never leak into the global index
    assert!(updater.nodes_affected_by(["open"]).is_empty());
    assert!(updater.nodes_affected_by(["local.open"]).is_empty());
}

#[test]
fn test_store_key_named_local_is_a_global_dependency() {
    let store = Rc::new(StateStore::with_initial(json!({"local": {"theme": "dark"}}).into()));
    let mut tree = ViewTree::new();
    let scope = tree.create_node(Some("scope"), vec![]);
    tree.declare_local_state(scope, StateMap::from([("theme".to_string(), "light".into())]));

    let (reader, text) = resolve_node(&mut tree, "reader", vec![], || {
        store.get_str("local.theme").unwrap_or_default()
    });
    assert_eq!(text, "dark");
    assert!(tree.append_child(scope, reader));
    tree.set_root(scope);

    let (local_text, local_deps) = tracker::track(|| tree.local_get(reader, "theme"));
    assert_eq!(local_text, Some(StateValue::from("light")));
    assert!(local_deps.reads.is_empty());

    let updater = ViewTreeUpdater::new();
    updater.set_root(tree);
    updater.attach(&store);
    assert!(updater.check_consistency().is_ok());

    // Local writes of the same name leave the global reader alone
    assert!(updater.set_local_state(reader, "theme", "blue"));
    assert!(updater.pending().is_empty());

    store.set("local.theme", "light");
    assert_eq!(updater.pending(), BTreeSet::from([reader]));
}

#[test]
fn test_style_edits_invalidate_styled_nodes() {
    let mut resolver = StyleResolver::from_json(
        r##"{ "base": { "cornerRadius": 4 }, "card": { "inherits": "base" } }"##,
    )
    .unwrap();

    let mut tree = ViewTree::new();
    let (card, _) = resolve_node(&mut tree, "card", vec![], || {
        format!("{:?}", resolver.resolve("card").corner_radius)
    });
    let (plain, _) = resolve_node(&mut tree, "plain", vec![], String::new);
    let root = tree.create_node(Some("root"), vec![card, plain]);
    tree.set_root(root);

    let updater = ViewTreeUpdater::new();
    updater.set_root(tree);

    resolver.define_style("base", Default::default());
    let affected = updater.invalidate([style_dependency_key("base")]);
    assert_eq!(affected, BTreeSet::from([card]));
}
