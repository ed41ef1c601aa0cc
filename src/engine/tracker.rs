//! Dependency Tracker - Records which state paths a computation touches.
//!
//! Tracking contexts form a stack so view construction can nest: building a
//! child while its parent is still being built records the child's reads into
//! the child's context only.
//!
//! # Example
//!
//! ```ignore
//! use scals_core::engine::tracker;
//!
//! let (text, deps) = tracker::track(|| store.interpolate("Hi ${user.name}"));
//! assert!(deps.reads.contains("user.name"));
//! ```
//!
//! Reads made outside any context are dropped.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

/// Qualifier shown before local-state paths in diagnostics (`local.<path>`).
pub const LOCAL_QUALIFIER: &str = "local";

/// Paths read and written during one tracking context.
///
/// Global store paths and local-state paths are kept apart, so a store key
/// named `local` never aliases a local read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedDependencies {
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
    /// Local-state paths, relative to the reader's nearest scope.
    pub local_reads: BTreeSet<String>,
    pub local_writes: BTreeSet<String>,
}

impl TrackedDependencies {
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
            && self.writes.is_empty()
            && self.local_reads.is_empty()
            && self.local_writes.is_empty()
    }
}

// =============================================================================
// Tracker State
// =============================================================================

thread_local! {
    /// Active tracking contexts, innermost last.
    static TRACKING_STACK: RefCell<Vec<TrackedDependencies>> = const { RefCell::new(Vec::new()) };

    /// Depth of nested `untracked` calls.
    static UNTRACKED_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Open a new tracking context.
pub fn begin_tracking() {
    TRACKING_STACK.with(|stack| stack.borrow_mut().push(TrackedDependencies::default()));
}

/// Close the innermost context and return what it recorded.
///
/// Returns an empty set if no context was open.
pub fn end_tracking() -> TrackedDependencies {
    TRACKING_STACK.with(|stack| stack.borrow_mut().pop()).unwrap_or_else(|| {
        tracing::warn!("end_tracking called without an open context");
        TrackedDependencies::default()
    })
}

/// True if reads would currently be recorded.
pub fn is_tracking() -> bool {
    UNTRACKED_DEPTH.with(Cell::get) == 0 && TRACKING_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Number of open contexts.
pub fn depth() -> usize {
    TRACKING_STACK.with(|stack| stack.borrow().len())
}

/// Record a read of a canonical global path.
pub fn track_read(path: &str) {
    record(path, |deps| &mut deps.reads);
}

/// Record a write of a canonical global path.
pub fn track_write(path: &str) {
    record(path, |deps| &mut deps.writes);
}

/// Record a read of local state at canonical `path`.
pub fn track_local_read(path: &str) {
    record(path, |deps| &mut deps.local_reads);
}

/// Record a write of local state at canonical `path`.
pub fn track_local_write(path: &str) {
    record(path, |deps| &mut deps.local_writes);
}

/// Display form of a local path (`local.<path>`).
pub fn local_dependency_key(path: &str) -> String {
    format!("{LOCAL_QUALIFIER}.{path}")
}

fn record(path: &str, field: impl FnOnce(&mut TrackedDependencies) -> &mut BTreeSet<String>) {
    if UNTRACKED_DEPTH.with(Cell::get) > 0 {
        return;
    }
    TRACKING_STACK.with(|stack| {
        if let Some(top) = stack.borrow_mut().last_mut() {
            field(top).insert(path.to_string());
        }
    });
}

/// Run `f` inside a fresh context and return its result with the recorded paths.
pub fn track<R>(f: impl FnOnce() -> R) -> (R, TrackedDependencies) {
    let scope = TrackingScope::new();
    let result = f();
    (result, scope.finish())
}

/// Run `f` without recording any reads or writes.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    struct Restore;
    impl Drop for Restore {
        fn drop(&mut self) {
            UNTRACKED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
        }
    }

    UNTRACKED_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let _restore = Restore;
    f()
}

/// Clear all contexts. For tests.
pub fn reset_tracking() {
    TRACKING_STACK.with(|stack| stack.borrow_mut().clear());
    UNTRACKED_DEPTH.with(|depth| depth.set(0));
}

// =============================================================================
// Scope guard
// =============================================================================

/// Guard that opens a context on creation and closes it on drop.
///
/// Use [`finish`](Self::finish) to collect the recorded paths. Dropping the
/// guard without finishing discards them, which keeps the stack balanced when
/// the tracked code panics or returns early.
pub struct TrackingScope {
    finished: bool,
}

impl TrackingScope {
    pub fn new() -> Self {
        begin_tracking();
        Self { finished: false }
    }

    pub fn finish(mut self) -> TrackedDependencies {
        self.finished = true;
        end_tracking()
    }
}

impl Default for TrackingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        if !self.finished {
            TRACKING_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_outside_context_are_dropped() {
        reset_tracking();
        track_read("a");
        assert!(!is_tracking());
        assert_eq!(end_tracking(), TrackedDependencies::default());
    }

    #[test]
    fn test_nested_contexts_are_isolated() {
        reset_tracking();
        let ((), outer) = track(|| {
            track_read("outer");
            let ((), inner) = track(|| track_read("inner"));
            assert_eq!(inner.reads.iter().collect::<Vec<_>>(), vec!["inner"]);
            track_write("written");
        });
        assert!(outer.reads.contains("outer"));
        assert!(!outer.reads.contains("inner"));
        assert!(outer.writes.contains("written"));
        assert_eq!(depth(), 0);
    }

    #[test]
    fn test_untracked() {
        reset_tracking();
        let ((), deps) = track(|| {
            untracked(|| track_read("hidden"));
            track_read("seen");
        });
        assert!(!deps.reads.contains("hidden"));
        assert!(deps.reads.contains("seen"));
    }

    #[test]
    fn test_local_reads() {
        reset_tracking();
        let ((), deps) = track(|| {
            track_local_read("expanded");
            track_read("items");
        });
        assert_eq!(deps.local_reads.iter().collect::<Vec<_>>(), vec!["expanded"]);
        assert_eq!(deps.reads.iter().collect::<Vec<_>>(), vec!["items"]);
        assert_eq!(local_dependency_key("expanded"), "local.expanded");
    }

    #[test]
    fn test_global_local_key_is_not_a_local_read() {
        reset_tracking();
        let ((), deps) = track(|| {
            track_read("local.theme");
            track_write("local.theme");
            track_local_write("theme");
        });
        assert!(deps.reads.contains("local.theme"));
        assert!(deps.local_reads.is_empty());
        assert!(deps.writes.contains("local.theme"));
        assert!(deps.local_writes.contains("theme"));
        assert!(!deps.is_empty());
    }

    #[test]
    fn test_scope_guard_balances_on_drop() {
        reset_tracking();
        {
            let _scope = TrackingScope::new();
            assert_eq!(depth(), 1);
        }
        assert_eq!(depth(), 0);
    }
}
