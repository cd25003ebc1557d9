//! Mutation audit records
//!
//! A [`Mutation`] is the immutable record of one state change, carrying the
//! prior value needed to invert it.

use crate::id::{ArtifactId, MutationId};
use crate::path::StatePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOperation {
    /// Insert an element into a collection
    AddItem,
    /// Remove one element, or every element matching a condition
    RemoveItem,
    /// Change fields of one element
    UpdateItem,
    /// Change a top-level field
    UpdateProperty,
    /// Move one element to another position
    ReorderItems,
    /// Replace the whole state (AI rewrites)
    BulkUpdate,
}

impl MutationOperation {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddItem => "add_item",
            Self::RemoveItem => "remove_item",
            Self::UpdateItem => "update_item",
            Self::UpdateProperty => "update_property",
            Self::ReorderItems => "reorder_items",
            Self::BulkUpdate => "bulk_update",
        }
    }

    /// Check if operation targets a collection element
    #[inline]
    #[must_use]
    pub fn targets_item(&self) -> bool {
        matches!(self, Self::RemoveItem | Self::UpdateItem | Self::ReorderItems)
    }
}

impl fmt::Display for MutationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who asked for the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MutationSource {
    /// Natural-language command typed by the user
    #[default]
    User,
    /// Model-produced edit
    Ai,
}

impl fmt::Display for MutationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Ai => f.write_str("ai"),
        }
    }
}

/// Immutable record of one state change
///
/// # Invariants
/// - `previous_value` is present for every mutation produced by this crate
///   family; `None` only appears for legacy records and blocks undo
/// - For `remove_item` by condition, `previous_value` is the array of removed
///   elements and `value` holds `{"removedIndices": [...]}` (ascending)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    pub id: MutationId,

    pub artifact_id: ArtifactId,

    pub operation: MutationOperation,

    pub path: StatePath,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub previous_value: Option<Value>,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub source: MutationSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Mutation {
    /// Create mutation record stamped now
    #[must_use]
    pub fn new(
        artifact_id: ArtifactId,
        operation: MutationOperation,
        path: StatePath,
        source: MutationSource,
    ) -> Self {
        Self {
            id: MutationId::new(),
            artifact_id,
            operation,
            path,
            value: None,
            previous_value: None,
            timestamp: Utc::now(),
            source,
            reason: None,
        }
    }

    /// Set new value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Set prior value
    #[inline]
    #[must_use]
    pub fn with_previous(mut self, previous: Value) -> Self {
        self.previous_value = Some(previous);
        self
    }

    /// Set provenance text
    #[inline]
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Check if this record carries enough to be undone
    #[inline]
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.previous_value.is_some()
    }

    /// Indices removed by a conditional `remove_item`, ascending
    #[must_use]
    pub fn removed_indices(&self) -> Option<Vec<usize>> {
        let indices = self.value.as_ref()?.get("removedIndices")?.as_array()?;
        indices
            .iter()
            .map(|v| v.as_u64().and_then(|i| usize::try_from(i).ok()))
            .collect()
    }
}

/// Keeps an explicit JSON `null` as `Some(Value::Null)`
///
/// A property whose prior value was `null` is still invertible; only an absent
/// field means "unknown".
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
