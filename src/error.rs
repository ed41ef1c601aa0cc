//! Error types.
//!
//! The engine degrades instead of failing: public operations such as
//! [`StateStore::get`](crate::state::StateStore::get) return absent values and
//! mutations on malformed paths are no-ops. These types surface only through the
//! explicitly fallible entry points (`parse`, `try_*`, `check_*`, `from_json`).

use thiserror::Error;

use crate::engine::NodeId;

/// A state path could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("empty segment at byte {position} in `{path}`")]
    EmptySegment { path: String, position: usize },
    #[error("unterminated index in `{path}`")]
    UnterminatedIndex { path: String },
    #[error("invalid index `{index}` in `{path}`")]
    InvalidIndex { path: String, index: String },
    #[error("unexpected `{found}` at byte {position} in `{path}`")]
    UnexpectedChar {
        path: String,
        found: char,
        position: usize,
    },
    #[error("`{path}` must start with a key, not an index")]
    LeadingIndex { path: String },
    #[error("index {index} in `{path}` is too far past the end of an array of length {len}")]
    IndexTooFar { path: String, index: usize, len: usize },
}

/// An expression could not be parsed or evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token `{token}` at byte {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("unterminated string literal starting at byte {position}")]
    UnterminatedString { position: usize },
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("invalid path in expression: {0}")]
    Path(#[from] PathError),
    #[error("division by zero")]
    DivisionByZero,
    #[error("operator `{op}` cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("operator `-` cannot be applied to {0}")]
    InvalidNegation(&'static str),
    #[error("integer overflow")]
    Overflow,
}

/// The dependency index disagrees with the view tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("node {node} is live but not registered")]
    Unregistered { node: NodeId },
    #[error("node {node} is registered but no longer in the tree")]
    Orphaned { node: NodeId },
    #[error("registration of node {node} is stale: registered {registered:?}, reads {current:?}")]
    Stale {
        node: NodeId,
        registered: Vec<String>,
        current: Vec<String>,
    },
    #[error("path `{path}` lists node {node} without a matching registration")]
    Dangling { path: String, node: NodeId },
    #[error("node {node} is indexed under local scope {registered:?}, nearest scope is {current:?}")]
    ScopeMismatch {
        node: NodeId,
        registered: Option<NodeId>,
        current: Option<NodeId>,
    },
}

/// Engine configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Json(#[from] serde_json::Error),
}
