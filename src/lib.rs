//! # scals-core
//!
//! Reactive state and incremental view updates for document-driven UI.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for renderer-facing reactivity.
//!
//! ## Architecture
//!
//! A document is resolved into a tree of view nodes. While a node resolves,
//! every state path and style it reads is recorded. Those recordings feed a
//! reverse index, so when an action writes a path the engine knows exactly
//! which nodes to refresh:
//!
//! ```text
//! StateStore ──set──▶ ViewTreeUpdater ──▶ DependencyIndex ──▶ pending nodes ──▶ renderer
//!     ▲                                                                          │
//!     └────────────── get / interpolate (tracked) ◀── resolve node ◀─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`] - Path-addressed store, expressions, interpolation
//! - [`engine`] - Dependency tracker, view tree, index, updater
//! - [`theme`] - Style resolution, design-system presets
//! - [`types`] - Colors and font traits
//! - [`config`] - Engine configuration

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod theme;
pub mod types;

pub use config::{EngineConfig, NotificationMode, PathMatchRule};
pub use error::{ConfigError, EvalError, IndexError, PathError};
pub use types::{Color, FontTraits};

pub use engine::{
    begin_tracking, end_tracking, track, untracked, DependencyIndex, LocalChange, NodeId,
    TrackedDependencies, UpdaterPhase, ViewNode, ViewTree, ViewTreeUpdater,
};

pub use state::{ArrayRemoval, StateChange, StatePath, StateStore, StateValue, Subscription};

pub use theme::{
    get_preset, style_dependency_key, DesignSystemProvider, PresetDesignSystem, ResolvedStyle,
    StyleDefinition, StyleProp, StyleResolver,
};
