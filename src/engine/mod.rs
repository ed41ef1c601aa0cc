//! Engine - Dependency tracking and incremental view updates.
//!
//! - Tracker: thread-local stack of read/write recorders
//! - Tree: arena of view nodes with generational handles
//! - Index: reverse map from state paths to reading nodes
//! - Updater: turns store notifications into pending node updates
//!
//! # Architecture
//!
//! ```text
//! resolve node:  begin_tracking → store.get / style.resolve → end_tracking → node.set_dependencies
//! mutate state:  store.set → updater → index.nodes_affected_by → pending → renderer
//! ```
//!
//! Nodes are handles into the tree's arena. The index and the pending set
//! only ever hold handles, never nodes.

pub mod tracker;
mod index;
mod node;
mod tree;
mod updater;

pub use index::DependencyIndex;
pub use node::{NodeId, ViewNode};
pub use tracker::{begin_tracking, end_tracking, track, untracked, TrackedDependencies};
pub use tree::{LocalChange, ViewTree};
pub use updater::{UpdaterPhase, ViewTreeUpdater};
