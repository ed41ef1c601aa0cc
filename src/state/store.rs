//! StateStore - The single source of truth for document state.
//!
//! All values live in one object tree addressed by dot/bracket paths. Every
//! read is reported to the dependency tracker, every write marks its path
//! dirty and notifies subscribers.
//!
//! # Example
//!
//! ```ignore
//! use scals_core::state::StateStore;
//!
//! let store = StateStore::new();
//! store.set("count", 0);
//! store.set("count", store.evaluate("count + 1"));
//! assert_eq!(store.get_i64("count"), Some(1));
//! assert_eq!(store.interpolate("Count: ${count}"), "Count: 1");
//! ```
//!
//! Notifications run synchronously inside the mutating call. A mutation made
//! from a subscriber is queued and delivered after the current notification
//! finishes, so subscribers always see changes in the order they happened.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::engine::tracker;
use crate::error::{ConfigError, EvalError};
use super::expression;
use super::path::StatePath;
use super::value::{StateMap, StateValue};

// =============================================================================
// Change notifications
// =============================================================================

/// A single mutation, reported to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Canonical path that was written.
    pub path: String,
    /// Value before the write, `None` if the path was absent.
    pub old: Option<StateValue>,
    /// Value after the write, `None` if the path was removed.
    pub new: Option<StateValue>,
}

type Callback = Rc<RefCell<Box<dyn FnMut(&StateChange)>>>;

struct Subscriber {
    active: Rc<Cell<bool>>,
    callback: Callback,
}

/// Handle returned by [`StateStore::subscribe`].
///
/// The callback stays registered until the handle is dropped or cancelled.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    active: Rc<Cell<bool>>,
}

impl Subscription {
    pub fn cancel(self) {}

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.active.get())
            .finish()
    }
}

/// How [`StateStore::remove_from_array`] picks the element to drop.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayRemoval {
    /// Remove the element at this index.
    At(usize),
    /// Remove the first element equal to this value.
    Value(StateValue),
}

// =============================================================================
// Store
// =============================================================================

/// Path-addressed state tree with dirty tracking and change notification.
pub struct StateStore {
    root: RefCell<StateValue>,
    dirty: RefCell<BTreeSet<String>>,
    subscribers: RefCell<Vec<Subscriber>>,
    queue: RefCell<VecDeque<StateChange>>,
    notifying: Cell<bool>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            root: RefCell::new(StateValue::object()),
            dirty: RefCell::new(BTreeSet::new()),
            subscribers: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            notifying: Cell::new(false),
        }
    }

    /// Store seeded with `initial`. Initial values are not dirty.
    ///
    /// A non-object root is replaced with an empty object.
    pub fn with_initial(initial: StateValue) -> Self {
        let store = Self::new();
        match initial {
            StateValue::Object(_) => *store.root.borrow_mut() = initial,
            other => {
                tracing::warn!(kind = other.kind(), "initial state is not an object, starting empty");
            }
        }
        store
    }

    /// Store seeded from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self::with_initial(value.into()))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Value at `path`, or `None` if absent or the path is malformed.
    ///
    /// The read is recorded by the active dependency tracker.
    pub fn get(&self, path: &str) -> Option<StateValue> {
        let parsed = match StatePath::parse(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(path, %err, "get on malformed path");
                return None;
            }
        };
        tracker::track_read(&parsed.to_string());
        parsed.lookup(&self.root.borrow()).cloned()
    }

    /// True if a value exists at `path`. Tracked like [`get`](Self::get).
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path)?.as_i64()
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_f64()
    }

    pub fn get_str(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            StateValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_array(&self, path: &str) -> Option<Vec<StateValue>> {
        match self.get(path)? {
            StateValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Copy of the whole state tree. Not tracked.
    pub fn snapshot(&self) -> StateValue {
        self.root.borrow().clone()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `value` at `path`, creating intermediate containers.
    ///
    /// Malformed paths and writes that would pad an array too far are ignored.
    pub fn set(&self, path: &str, value: impl Into<StateValue>) {
        let Some(parsed) = parse_for_write(path) else {
            return;
        };
        let value = value.into();
        let Some(old) = self.assign(&parsed, value.clone()) else {
            return;
        };
        self.commit(parsed, old, Some(value));
    }

    /// Remove the value at `path`. Absent paths are a no-op.
    pub fn remove(&self, path: &str) {
        let Some(parsed) = parse_for_write(path) else {
            return;
        };
        let old = parsed.remove_from(&mut self.root.borrow_mut());
        if old.is_some() {
            self.commit(parsed, old, None);
        }
    }

    /// Shallow-merge `entries` into the object at `path`.
    ///
    /// A missing or non-object target becomes an object.
    pub fn merge(&self, path: &str, entries: StateMap) {
        let Some(parsed) = parse_for_write(path) else {
            return;
        };
        let current = parsed.lookup(&self.root.borrow()).cloned();
        let mut merged = match &current {
            Some(StateValue::Object(map)) => map.clone(),
            _ => StateMap::new(),
        };
        merged.extend(entries);
        let new = StateValue::Object(merged);
        if self.assign(&parsed, new.clone()).is_none() {
            return;
        }
        self.commit(parsed, current, Some(new));
    }

    /// Append `value` to the array at `path`.
    ///
    /// An absent or non-array value is treated as an empty array.
    pub fn append_to_array(&self, path: &str, value: impl Into<StateValue>) {
        let value = value.into();
        self.update_array(path, |items| {
            items.push(value);
            true
        });
    }

    /// Remove one element from the array at `path`.
    ///
    /// Missing values and out-of-range indices leave the array untouched.
    pub fn remove_from_array(&self, path: &str, removal: ArrayRemoval) {
        self.update_array(path, |items| {
            let index = match &removal {
                ArrayRemoval::At(index) => Some(*index).filter(|&i| i < items.len()),
                ArrayRemoval::Value(value) => items.iter().position(|item| item == value),
            };
            match index {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        });
    }

    /// Remove the first element equal to `value`, or append it if absent.
    pub fn toggle_in_array(&self, path: &str, value: impl Into<StateValue>) {
        let value = value.into();
        self.update_array(path, |items| {
            match items.iter().position(|item| *item == value) {
                Some(index) => {
                    items.remove(index);
                }
                None => items.push(value),
            }
            true
        });
    }

    /// Apply `edit` to a copy of the array at `path`; commit if it reports a change.
    fn update_array(&self, path: &str, edit: impl FnOnce(&mut Vec<StateValue>) -> bool) {
        let Some(parsed) = parse_for_write(path) else {
            return;
        };
        let old = parsed.lookup(&self.root.borrow()).cloned();
        let mut items = match &old {
            Some(StateValue::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        if !edit(&mut items) {
            return;
        }
        let new = StateValue::Array(items);
        if self.assign(&parsed, new.clone()).is_none() {
            return;
        }
        self.commit(parsed, old, Some(new));
    }

    /// Write into the root, `None` if the path refuses the write.
    fn assign(&self, path: &StatePath, value: StateValue) -> Option<Option<StateValue>> {
        let result = path.assign(&mut self.root.borrow_mut(), value);
        result
            .map_err(|err| tracing::warn!(path = %path, %err, "write ignored"))
            .ok()
    }

    fn commit(&self, path: StatePath, old: Option<StateValue>, new: Option<StateValue>) {
        let path = path.to_string();
        tracker::track_write(&path);
        tracing::trace!(path = %path, "state changed");
        self.dirty.borrow_mut().insert(path.clone());
        self.notify(StateChange { path, old, new });
    }

    // =========================================================================
    // Dirty paths
    // =========================================================================

    /// Paths written since the last [`consume_dirty_paths`](Self::consume_dirty_paths).
    pub fn dirty_paths(&self) -> BTreeSet<String> {
        self.dirty.borrow().clone()
    }

    /// Take and clear the dirty set.
    pub fn consume_dirty_paths(&self) -> BTreeSet<String> {
        mem::take(&mut *self.dirty.borrow_mut())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Evaluate an expression against current state.
    ///
    /// Errors are logged and yield `null`.
    pub fn evaluate(&self, source: &str) -> StateValue {
        self.try_evaluate(source).unwrap_or_else(|err| {
            tracing::warn!(expression = source, %err, "expression evaluation failed");
            StateValue::Null
        })
    }

    /// Evaluate an expression, surfacing parse and type errors.
    pub fn try_evaluate(&self, source: &str) -> Result<StateValue, EvalError> {
        expression::evaluate(source, &|path| self.get(path))
    }

    /// Expand `${...}` placeholders in `template`.
    pub fn interpolate(&self, template: &str) -> String {
        expression::interpolate(template, &|path| self.get(path))
    }

    // =========================================================================
    // Subscribers
    // =========================================================================

    /// Register `callback` for every change. Runs synchronously.
    pub fn subscribe(&self, callback: impl FnMut(&StateChange) + 'static) -> Subscription {
        let active = Rc::new(Cell::new(true));
        self.subscribers.borrow_mut().push(Subscriber {
            active: active.clone(),
            callback: Rc::new(RefCell::new(Box::new(callback))),
        });
        Subscription { active }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|s| s.active.get())
            .count()
    }

    fn notify(&self, change: StateChange) {
        self.queue.borrow_mut().push_back(change);
        if self.notifying.replace(true) {
            return;
        }

        loop {
            let Some(change) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            // Snapshot so callbacks may subscribe or cancel while we iterate
            let callbacks: Vec<Callback> = {
                let mut subscribers = self.subscribers.borrow_mut();
                subscribers.retain(|s| s.active.get());
                subscribers.iter().map(|s| s.callback.clone()).collect()
            };
            for callback in callbacks {
                match callback.try_borrow_mut() {
                    Ok(mut callback) => callback(&change),
                    Err(_) => tracing::warn!(path = %change.path, "skipping re-entrant subscriber"),
                }
            }
        }

        self.notifying.set(false);
    }
}

fn parse_for_write(path: &str) -> Option<StatePath> {
    match StatePath::parse(path) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(path, %err, "write to malformed path ignored");
            None
        }
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("root", &self.root.borrow())
            .field("dirty", &self.dirty.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
