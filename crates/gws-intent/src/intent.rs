//! Structured mutation intents
//!
//! A [`MutationIntent`] says *what* change was asked for, independent of the
//! artifact it will land on. Positions stay symbolic ([`ItemIndex::Last`])
//! until they are resolved against the live array at apply time.

use gws_artifact::MutationOperation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Position within a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemIndex {
    /// Zero-based position
    At(usize),
    /// Final element, whatever the length is when applied
    Last,
}

impl ItemIndex {
    /// Position of an existing element in an array of `len`
    #[must_use]
    pub fn resolve(self, len: usize) -> Option<usize> {
        match self {
            Self::At(i) if i < len => Some(i),
            Self::Last if len > 0 => Some(len - 1),
            _ => None,
        }
    }

    /// Insertion point in an array of `len` (`Last` appends)
    #[must_use]
    pub fn resolve_insert(self, len: usize) -> Option<usize> {
        match self {
            Self::At(i) if i <= len => Some(i),
            Self::Last => Some(len),
            _ => None,
        }
    }

    /// One-based form for messages
    #[must_use]
    pub fn describe(self) -> String {
        match self {
            Self::At(i) => (i + 1).to_string(),
            Self::Last => "last".to_string(),
        }
    }
}

/// Predicate selecting collection elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    /// `status` is complete/completed/done, or `completed`/`done` is true
    Completed,
    /// `status` equals the given word (case and separator insensitive)
    StatusIs(String),
}

const COMPLETED_STATUSES: [&str; 4] = ["complete", "completed", "done", "finished"];

impl ItemCondition {
    /// Check if the predicate can be evaluated
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Completed => true,
            Self::StatusIs(status) => !status.trim().is_empty(),
        }
    }

    /// Evaluate against one element
    #[must_use]
    pub fn matches(&self, item: &Value) -> bool {
        let status = item
            .get("status")
            .and_then(Value::as_str)
            .map(normalize_word);
        match self {
            Self::Completed => {
                let flagged = ["completed", "done"]
                    .iter()
                    .any(|key| item.get(*key).and_then(Value::as_bool) == Some(true));
                flagged
                    || status
                        .as_deref()
                        .is_some_and(|s| COMPLETED_STATUSES.contains(&s))
            }
            Self::StatusIs(wanted) => status.as_deref() == Some(normalize_word(wanted).as_str()),
        }
    }
}

impl fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::StatusIs(status) => write!(f, "status {status}"),
        }
    }
}

fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Which element(s) an item operation addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemTarget {
    /// One element by position
    Index(ItemIndex),
    /// Every element matching a predicate
    Condition(ItemCondition),
}

/// A requested change, not yet bound to an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationIntent {
    pub operation: MutationOperation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ItemTarget>,

    /// Field to change (item field for `update_item`, top-level otherwise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Insertion point for `add_item`, new position for `reorder_items`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<ItemIndex>,

    /// Collection named in the command ("steps" for "remove step 2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl MutationIntent {
    /// Create empty intent for an operation
    #[inline]
    #[must_use]
    pub fn new(operation: MutationOperation) -> Self {
        Self {
            operation,
            target: None,
            property: None,
            value: None,
            destination: None,
            collection: None,
        }
    }

    /// Target one element
    #[inline]
    #[must_use]
    pub fn with_index(mut self, index: ItemIndex) -> Self {
        self.target = Some(ItemTarget::Index(index));
        self
    }

    /// Target every matching element
    #[inline]
    #[must_use]
    pub fn with_condition(mut self, condition: ItemCondition) -> Self {
        self.target = Some(ItemTarget::Condition(condition));
        self
    }

    /// Set property name
    #[inline]
    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Set value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Set destination
    #[inline]
    #[must_use]
    pub fn with_destination(mut self, destination: ItemIndex) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Set collection hint
    #[inline]
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Indexed target, if any
    #[must_use]
    pub fn index(&self) -> Option<ItemIndex> {
        match &self.target {
            Some(ItemTarget::Index(index)) => Some(*index),
            _ => None,
        }
    }

    /// One-line description for logs and confirmations
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![self.operation.to_string()];
        match &self.target {
            Some(ItemTarget::Index(index)) => parts.push(format!("#{}", index.describe())),
            Some(ItemTarget::Condition(condition)) => parts.push(format!("where {condition}")),
            None => {}
        }
        if let Some(property) = &self.property {
            parts.push(property.clone());
        }
        if let Some(value) = &self.value {
            parts.push(format!("= {value}"));
        }
        if let Some(destination) = self.destination {
            parts.push(format!("-> {}", destination.describe()));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_resolution_against_length() {
        assert_eq!(ItemIndex::At(2).resolve(3), Some(2));
        assert_eq!(ItemIndex::At(3).resolve(3), None);
        assert_eq!(ItemIndex::Last.resolve(3), Some(2));
        assert_eq!(ItemIndex::Last.resolve(0), None);
        assert_eq!(ItemIndex::At(3).resolve_insert(3), Some(3));
        assert_eq!(ItemIndex::Last.resolve_insert(0), Some(0));
    }

    #[test]
    fn completed_condition_accepts_flags_and_statuses() {
        let cond = ItemCondition::Completed;
        assert!(cond.matches(&json!({"status": "complete"})));
        assert!(cond.matches(&json!({"status": "Done"})));
        assert!(cond.matches(&json!({"completed": true})));
        assert!(!cond.matches(&json!({"status": "pending"})));
        assert!(!cond.matches(&json!("plain string")));
    }

    #[test]
    fn status_condition_normalizes_separators() {
        let cond = ItemCondition::StatusIs("in progress".into());
        assert!(cond.matches(&json!({"status": "in_progress"})));
        assert!(!ItemCondition::StatusIs("  ".into()).is_well_formed());
    }

    #[test]
    fn intent_serde_shape() {
        let intent = MutationIntent::new(MutationOperation::RemoveItem)
            .with_index(ItemIndex::Last)
            .with_collection("steps");
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(
            json,
            json!({"operation": "remove_item", "target": {"index": "last"}, "collection": "steps"})
        );
        let back: MutationIntent = serde_json::from_value(json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn summary_mentions_parts() {
        let intent = MutationIntent::new(MutationOperation::UpdateItem)
            .with_index(ItemIndex::At(1))
            .with_property("status")
            .with_value(json!("complete"));
        assert_eq!(intent.summary(), "update_item #2 status = \"complete\"");
    }
}
