//! State Module - Path-addressed document state
//!
//! - **Value** - The JSON-shaped [`StateValue`] held in the tree
//! - **Path** - Dot/bracket path parsing and canonical form
//! - **Store** - Reads, writes, array helpers, dirty set, subscribers
//! - **Expression** - Computed values and `${...}` interpolation

mod expression;
mod path;
mod store;
mod value;

pub use expression::{evaluate, interpolate};
pub use path::{canonicalize, Segment, StatePath, MAX_ARRAY_PADDING};
pub use store::{ArrayRemoval, StateChange, StateStore, Subscription};
pub use value::{StateMap, StateValue};
