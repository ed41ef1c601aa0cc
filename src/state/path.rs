//! State paths - `items[2].name` style addressing into the state tree.
//!
//! A path is a list of segments. Keys are separated by dots, array indices are
//! written in brackets. A purely numeric dotted key (`items.2`) addresses an
//! array element when the container is an array, and canonicalizes to the
//! bracket form so `items.2` and `items[2]` are the same dependency.
//!
//! ```text
//! "user.name"        -> [Key("user"), Key("name")]
//! "items[2].name"    -> [Key("items"), Index(2), Key("name")]
//! "grid[0][1]"       -> [Key("grid"), Index(0), Index(1)]
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::PathError;
use super::value::StateValue;

/// Most `null` slots a single write may add past the end of an array.
pub const MAX_ARRAY_PADDING: usize = 1024;

// =============================================================================
// Segment
// =============================================================================

/// One step of a state path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key (`.name`).
    Key(String),
    /// Array index (`[2]`).
    Index(usize),
}

impl Segment {
    /// Index this segment addresses when applied to an array.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(k) if !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()) => k.parse().ok(),
            Self::Key(_) => None,
        }
    }

    /// Key this segment addresses when applied to an object.
    pub fn key(&self) -> Cow<'_, str> {
        match self {
            Self::Key(k) => Cow::Borrowed(k),
            Self::Index(i) => Cow::Owned(i.to_string()),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

// =============================================================================
// StatePath
// =============================================================================

/// A parsed state path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    segments: Vec<Segment>,
}

impl StatePath {
    /// Parse a dot/bracket path.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let path = input.trim();
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let bytes = path.as_bytes();
        let mut segments = Vec::new();
        let mut pos = 0;
        // True at the start and after a '.', where a key must follow
        let mut expect_key = true;

        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => {
                    if pos == 0 {
                        return Err(PathError::LeadingIndex {
                            path: path.to_string(),
                        });
                    }
                    if expect_key {
                        return Err(PathError::EmptySegment {
                            path: path.to_string(),
                            position: pos,
                        });
                    }
                    let close = path[pos + 1..]
                        .find(']')
                        .map(|offset| pos + 1 + offset)
                        .ok_or_else(|| PathError::UnterminatedIndex {
                            path: path.to_string(),
                        })?;
                    let raw = path[pos + 1..close].trim();
                    let index = raw.parse::<usize>().map_err(|_| PathError::InvalidIndex {
                        path: path.to_string(),
                        index: raw.to_string(),
                    })?;
                    segments.push(Segment::Index(index));
                    pos = close + 1;
                    expect_key = false;

                    if pos < bytes.len() && !matches!(bytes[pos], b'.' | b'[') {
                        return Err(unexpected(path, pos));
                    }
                }
                b'.' => {
                    if expect_key {
                        return Err(PathError::EmptySegment {
                            path: path.to_string(),
                            position: pos,
                        });
                    }
                    expect_key = true;
                    pos += 1;
                    if pos == bytes.len() {
                        return Err(PathError::EmptySegment {
                            path: path.to_string(),
                            position: pos,
                        });
                    }
                }
                b']' => return Err(unexpected(path, pos)),
                _ => {
                    if !expect_key {
                        return Err(unexpected(path, pos));
                    }
                    let end = path[pos..]
                        .find(|c: char| matches!(c, '.' | '[' | ']'))
                        .map_or(path.len(), |offset| pos + offset);
                    if bytes.get(end) == Some(&b']') {
                        return Err(unexpected(path, end));
                    }
                    segments.push(Segment::Key(path[pos..end].to_string()));
                    pos = end;
                    expect_key = false;
                }
            }
        }

        Ok(Self { segments })
    }

    /// Build a path from segments. Returns `None` for an empty list.
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        (!segments.is_empty()).then_some(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path with the last segment dropped, `None` for single-segment paths.
    pub fn parent(&self) -> Option<Self> {
        Self::from_segments(self.segments[..self.segments.len().saturating_sub(1)].to_vec())
    }

    /// Canonical strings of every prefix, shortest first, ending with `self`.
    ///
    /// `items[2].name` yields `items`, `items[2]`, `items[2].name`.
    pub fn prefixes(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.segments.len());
        let mut current = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            write_segment(&mut current, segment, i == 0);
            out.push(current.clone());
        }
        out
    }

    /// True if `self` equals `other` or is an ancestor of it.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| segments_match(a, b))
    }

    /// True if one path is a prefix of the other.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Value at this path, or `None` if a segment is missing or mismatched.
    pub fn lookup<'a>(&self, root: &'a StateValue) -> Option<&'a StateValue> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| child(current, segment))
    }

    /// Mutable value at this path without creating anything.
    pub fn lookup_mut<'a>(&self, root: &'a mut StateValue) -> Option<&'a mut StateValue> {
        let mut current = root;
        for segment in &self.segments {
            current = child_mut(current, segment)?;
        }
        Some(current)
    }

    /// Write `value` at this path, creating intermediate containers.
    ///
    /// Key segments create objects, index segments create arrays padded with
    /// `null`. Intermediate values of the wrong shape are replaced. Returns
    /// the previous value if one existed.
    ///
    /// Fails without touching `root` when the path starts with an index or
    /// would pad an array by more than [`MAX_ARRAY_PADDING`] slots.
    pub fn assign(
        &self,
        root: &mut StateValue,
        value: StateValue,
    ) -> Result<Option<StateValue>, PathError> {
        self.check_writable(root)?;
        let old = self.lookup(root).cloned();
        let mut current = root;
        for segment in &self.segments {
            current = slot_mut(current, segment);
        }
        *current = value;
        Ok(old)
    }

    /// Dry run of [`assign`](Self::assign) against the current shape of `root`.
    fn check_writable(&self, root: &StateValue) -> Result<(), PathError> {
        if self.segments.first().is_some_and(Segment::is_index) {
            return Err(PathError::LeadingIndex {
                path: self.to_string(),
            });
        }

        let mut current = Some(root);
        for segment in &self.segments {
            let array_len = match current {
                Some(StateValue::Array(items)) => Some(items.len()),
                _ => None,
            };
            let array_index = segment
                .as_index()
                .filter(|_| segment.is_index() || array_len.is_some());
            if let Some(index) = array_index {
                // Containers that get reshaped or created start empty
                let len = array_len.unwrap_or(0);
                if index.saturating_sub(len) > MAX_ARRAY_PADDING {
                    return Err(PathError::IndexTooFar {
                        path: self.to_string(),
                        index,
                        len,
                    });
                }
            }
            current = current.and_then(|value| child(value, segment));
        }
        Ok(())
    }

    /// Remove the value at this path from its container.
    pub fn remove_from(&self, root: &mut StateValue) -> Option<StateValue> {
        let (last, parents) = self.segments.split_last()?;
        let mut container = root;
        for segment in parents {
            container = child_mut(container, segment)?;
        }
        match container {
            StateValue::Object(map) => map.remove(last.key().as_ref()),
            StateValue::Array(items) => {
                let index = last.as_index().filter(|&i| i < items.len())?;
                Some(items.remove(index))
            }
            _ => None,
        }
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            write_segment(&mut out, segment, i == 0);
        }
        f.write_str(&out)
    }
}

impl FromStr for StatePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form of a path string (`items.2.name` -> `items[2].name`).
pub fn canonicalize(path: &str) -> Result<String, PathError> {
    StatePath::parse(path).map(|p| p.to_string())
}

// =============================================================================
// Helpers
// =============================================================================

fn unexpected(path: &str, pos: usize) -> PathError {
    PathError::UnexpectedChar {
        path: path.to_string(),
        found: path[pos..].chars().next().unwrap_or('?'),
        position: pos,
    }
}

fn write_segment(out: &mut String, segment: &Segment, first: bool) {
    match segment.as_index() {
        Some(index) if segment.is_index() || !first => {
            out.push('[');
            out.push_str(&index.to_string());
            out.push(']');
        }
        _ => {
            if !first {
                out.push('.');
            }
            out.push_str(&segment.key());
        }
    }
}

fn segments_match(a: &Segment, b: &Segment) -> bool {
    match (a.as_index(), b.as_index()) {
        (Some(x), Some(y)) => x == y,
        _ => a.key() == b.key(),
    }
}

fn child<'a>(current: &'a StateValue, segment: &Segment) -> Option<&'a StateValue> {
    match current {
        StateValue::Object(map) => map.get(segment.key().as_ref()),
        StateValue::Array(items) => segment.as_index().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(current: &'a mut StateValue, segment: &Segment) -> Option<&'a mut StateValue> {
    match current {
        StateValue::Object(map) => map.get_mut(segment.key().as_ref()),
        StateValue::Array(items) => segment.as_index().and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Slot for `segment` inside `container`, reshaping `container` if needed.
fn slot_mut<'a>(container: &'a mut StateValue, segment: &Segment) -> &'a mut StateValue {
    let array_index = segment
        .as_index()
        .filter(|_| segment.is_index() || matches!(container, StateValue::Array(_)));

    match array_index {
        Some(index) => {
            if !matches!(container, StateValue::Array(_)) {
                *container = StateValue::Array(Vec::new());
            }
            match container {
                StateValue::Array(items) => {
                    if items.len() <= index {
                        items.resize(index.saturating_add(1), StateValue::Null);
                    }
                    &mut items[index]
                }
                _ => unreachable!("container was reshaped into an array"),
            }
        }
        None => {
            if !matches!(container, StateValue::Object(_)) {
                *container = StateValue::object();
            }
            match container {
                StateValue::Object(map) => map.entry(segment.key().into_owned()).or_default(),
                _ => unreachable!("container was reshaped into an object"),
            }
        }
    }
}
