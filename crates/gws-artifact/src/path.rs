//! State paths for addressing within artifact state
//!
//! Provides [`StatePath`] for locating the region of an artifact's state a
//! mutation touched, plus the read/write primitives used by the applier and
//! by undo.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// One step of a [`StatePath`]: an object key or an array index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Array position
    Index(usize),
    /// Object key
    Key(String),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => write!(f, "{k}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Path within an artifact's state tree
///
/// Persisted as an ordered list of keys and indices, e.g. `["steps", 1]`.
///
/// # Examples
/// - `["steps", 1]` → `steps.1`
/// - `["title"]` → `title`
/// - `[]` → the whole state (root)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatePath(Vec<PathSegment>);

impl StatePath {
    /// Create path from a single key
    #[inline]
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(key.into())])
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Read the value at this path
    #[must_use]
    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(root, |current, segment| match (segment, current) {
            (PathSegment::Key(k), Value::Object(map)) => map.get(k),
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i),
            _ => None,
        })
    }

    /// Mutable access to the value at this path
    pub fn get_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        self.0
            .iter()
            .try_fold(root, |current, segment| match (segment, current) {
                (PathSegment::Key(k), Value::Object(map)) => map.get_mut(k),
                (PathSegment::Index(i), Value::Array(items)) => items.get_mut(*i),
                _ => None,
            })
    }

    /// Overwrite the value at this path, returning what was there
    ///
    /// The root path replaces the whole value. A missing final object key is
    /// inserted; intermediate segments must already exist.
    ///
    /// # Errors
    /// Returns error if the parent does not exist or has the wrong shape
    pub fn set(&self, root: &mut Value, value: Value) -> Result<Option<Value>, PathError> {
        let Some(last) = self.0.last() else {
            return Ok(Some(std::mem::replace(root, value)));
        };
        let parent = self.parent_mut(root)?;
        match (last, parent) {
            (PathSegment::Key(k), Value::Object(map)) => Ok(map.insert(k.clone(), value)),
            (PathSegment::Index(i), Value::Array(items)) => match items.get_mut(*i) {
                Some(slot) => Ok(Some(std::mem::replace(slot, value))),
                None => Err(PathError::IndexOutOfBounds {
                    path: self.to_string(),
                    index: *i,
                    len: items.len(),
                }),
            },
            _ => Err(PathError::ShapeMismatch(self.to_string())),
        }
    }

    /// Insert into the array addressed by this path's parent
    ///
    /// The final segment must be an index in `0..=len`.
    ///
    /// # Errors
    /// Returns error if the parent is not an array or the index is past the end
    pub fn insert(&self, root: &mut Value, value: Value) -> Result<(), PathError> {
        let Some(PathSegment::Index(index)) = self.0.last() else {
            return Err(PathError::ShapeMismatch(self.to_string()));
        };
        let index = *index;
        let display = self.to_string();
        match self.parent_mut(root)? {
            Value::Array(items) if index <= items.len() => {
                items.insert(index, value);
                Ok(())
            }
            Value::Array(items) => Err(PathError::IndexOutOfBounds {
                path: display,
                index,
                len: items.len(),
            }),
            _ => Err(PathError::ShapeMismatch(display)),
        }
    }

    /// Remove the value at this path, returning it
    ///
    /// # Errors
    /// Returns error if nothing exists at the path
    pub fn remove(&self, root: &mut Value) -> Result<Value, PathError> {
        let display = self.to_string();
        let Some(last) = self.0.last() else {
            return Err(PathError::ShapeMismatch(display));
        };
        match (last, self.parent_mut(root)?) {
            (PathSegment::Key(k), Value::Object(map)) => {
                map.shift_remove(k).ok_or(PathError::NotFound(display))
            }
            (PathSegment::Index(i), Value::Array(items)) if *i < items.len() => Ok(items.remove(*i)),
            (PathSegment::Index(i), Value::Array(items)) => Err(PathError::IndexOutOfBounds {
                path: display,
                index: *i,
                len: items.len(),
            }),
            _ => Err(PathError::ShapeMismatch(display)),
        }
    }

    fn parent_mut<'v>(&self, root: &'v mut Value) -> Result<&'v mut Value, PathError> {
        let parent = self.parent().unwrap_or_default();
        parent
            .get_mut(root)
            .ok_or_else(|| PathError::NotFound(parent.to_string()))
    }
}

impl Display for StatePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", joined.join("."))
    }
}

/// Errors related to state paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing at the addressed location
    #[error("nothing at path '{0}'")]
    NotFound(String),

    /// Index past the end of an array
    #[error("index {index} out of bounds at '{path}' (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// Segment kind does not match the value it addresses
    #[error("path '{0}' does not match the state shape")]
    ShapeMismatch(String),
}
