//! Validating and applying intents to artifacts
//!
//! Application is pure: the artifact is never touched, a new state and the
//! [`Mutation`] record describing the change come back together, or an error
//! and nothing else.

use crate::intent::{ItemCondition, ItemIndex, ItemTarget, MutationIntent};
use gws_artifact::{
    conform, Artifact, ArtifactSchema, Mutation, MutationOperation, MutationSource, PathError,
    StatePath,
};
use serde_json::{json, Map, Value};

/// Field names tried, in order, when looking for an artifact's list
pub const COLLECTION_PRIORITY: [&str; 6] = ["items", "steps", "tasks", "metrics", "list", "entries"];

/// Keys that hold an item's display label
const LABEL_KEYS: [&str; 4] = ["title", "label", "name", "text"];

/// Why an intent does not apply
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("artifact has no list to {0}")]
    NoCollection(MutationOperation),

    #[error("artifact has no '{0}' list")]
    MissingCollection(String),

    #[error("the list is empty")]
    EmptyCollection,

    #[error("position {position} is out of range (the list has {len} items)")]
    IndexOutOfRange { position: String, len: usize },

    #[error("no items are {0}")]
    NoMatch(String),

    #[error("condition '{0}' cannot be evaluated")]
    MalformedCondition(String),

    #[error("{0} needs an item to act on")]
    MissingTarget(MutationOperation),

    #[error("{0} needs a value")]
    MissingValue(MutationOperation),

    #[error("{0} needs a destination")]
    MissingDestination(MutationOperation),

    #[error("property '{0}' does not exist on this artifact")]
    UnknownProperty(String),

    #[error("ambiguous update: {0}")]
    Ambiguous(String),

    #[error("item is already at position {0}")]
    NoMove(usize),

    #[error("{0} cannot target items by condition")]
    ConditionalTarget(MutationOperation),

    #[error("artifact state is not an object")]
    NotAnObject,

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Outcome of a successful apply
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMutation {
    pub new_state: Value,
    pub mutation: Mutation,
}

/// Concrete change resolved against the current state
#[derive(Debug)]
enum Plan {
    Add {
        field: String,
        create: bool,
        index: usize,
        item: Value,
    },
    RemoveAt {
        field: String,
        index: usize,
    },
    RemoveWhere {
        field: String,
        indices: Vec<usize>,
    },
    UpdateItem {
        field: String,
        index: usize,
        item: Value,
    },
    SetProperty {
        key: String,
        value: Value,
    },
    Move {
        field: String,
        from: usize,
        to: usize,
    },
    Replace {
        state: Value,
    },
}

/// Check an intent applies without producing anything
///
/// # Errors
/// Returns the first reason the intent cannot be applied
pub fn validate_mutation(artifact: &Artifact, intent: &MutationIntent) -> Result<(), MutationError> {
    plan(artifact, intent).map(|_| ())
}

/// Compute the new state and the mutation record for an intent
///
/// # Errors
/// Returns error if validation fails; no state is produced in that case
pub fn apply_mutation(
    artifact: &Artifact,
    intent: &MutationIntent,
    source: MutationSource,
    reason: Option<&str>,
) -> Result<AppliedMutation, MutationError> {
    let plan = plan(artifact, intent)?;
    let (new_state, path, value, previous) = execute(&artifact.state, plan)?;

    let mut mutation = Mutation::new(artifact.id.clone(), intent.operation, path, source).with_previous(previous);
    if let Some(value) = value {
        mutation = mutation.with_value(value);
    }
    if let Some(reason) = reason {
        mutation = mutation.with_reason(reason);
    }
    tracing::debug!(
        artifact = %artifact.id,
        operation = %mutation.operation,
        path = %mutation.path,
        %source,
        "mutation applied"
    );
    Ok(AppliedMutation {
        new_state,
        mutation,
    })
}

fn plan(artifact: &Artifact, intent: &MutationIntent) -> Result<Plan, MutationError> {
    let state = &artifact.state;
    let operation = intent.operation;
    let hint = intent.collection.as_deref();

    match operation {
        MutationOperation::AddItem => {
            let value = intent.value.as_ref().ok_or(MutationError::MissingValue(operation))?;
            let (field, create) = match find_collection(state, hint) {
                Some(field) => (field, false),
                None => match artifact.schema.list_field() {
                    Some(field)
                        if hint.map_or(true, |h| h == field)
                            && state.is_object()
                            && state.get(field).map_or(true, Value::is_null) =>
                    {
                        (field.to_string(), true)
                    }
                    _ => return Err(missing(hint, operation)),
                },
            };
            let items = list(state, &field);
            let index = match intent.destination {
                None => items.len(),
                Some(destination) => destination
                    .resolve_insert(items.len())
                    .ok_or_else(|| out_of_range(destination, items.len()))?,
            };
            let item = build_item(artifact.schema.as_ref(), &field, items, value);
            Ok(Plan::Add {
                field,
                create,
                index,
                item,
            })
        }

        MutationOperation::RemoveItem => {
            let field = find_collection(state, hint).ok_or_else(|| missing(hint, operation))?;
            let items = list(state, &field);
            match intent.target.as_ref().ok_or(MutationError::MissingTarget(operation))? {
                ItemTarget::Index(index) => Ok(Plan::RemoveAt {
                    index: locate(*index, items.len())?,
                    field,
                }),
                ItemTarget::Condition(condition) => Ok(Plan::RemoveWhere {
                    indices: matching(condition, items)?,
                    field,
                }),
            }
        }

        MutationOperation::UpdateItem => {
            let field = find_collection(state, hint).ok_or_else(|| missing(hint, operation))?;
            let items = list(state, &field);
            let index = match intent.target.as_ref().ok_or(MutationError::MissingTarget(operation))? {
                ItemTarget::Index(index) => locate(*index, items.len())?,
                ItemTarget::Condition(_) => return Err(MutationError::ConditionalTarget(operation)),
            };
            let item = updated_item(&items[index], intent)?;
            Ok(Plan::UpdateItem { field, index, item })
        }

        MutationOperation::UpdateProperty => {
            let typed = intent
                .property
                .as_deref()
                .ok_or_else(|| MutationError::Ambiguous("no property named".into()))?;
            let value = intent.value.clone().ok_or(MutationError::MissingValue(operation))?;
            if !state.is_object() {
                return Err(MutationError::NotAnObject);
            }
            let key = match_property(state, typed).ok_or_else(|| MutationError::UnknownProperty(typed.to_string()))?;
            Ok(Plan::SetProperty { key, value })
        }

        MutationOperation::ReorderItems => {
            let field = find_collection(state, hint).ok_or_else(|| missing(hint, operation))?;
            let len = list(state, &field).len();
            let from = match intent.target.as_ref().ok_or(MutationError::MissingTarget(operation))? {
                ItemTarget::Index(index) => locate(*index, len)?,
                ItemTarget::Condition(_) => return Err(MutationError::ConditionalTarget(operation)),
            };
            let destination = intent.destination.ok_or(MutationError::MissingDestination(operation))?;
            let to = locate(destination, len)?;
            if from == to {
                return Err(MutationError::NoMove(from + 1));
            }
            Ok(Plan::Move { field, from, to })
        }

        MutationOperation::BulkUpdate => match &intent.value {
            Some(value @ Value::Object(_)) => Ok(Plan::Replace {
                state: conform(&artifact.id, artifact.schema.as_ref(), value.clone()),
            }),
            Some(_) => Err(MutationError::Ambiguous("bulk update needs a whole state object".into())),
            None => Err(MutationError::MissingValue(operation)),
        },
    }
}

/// New state, mutated path, recorded value and prior value
type Executed = (Value, StatePath, Option<Value>, Value);

fn execute(state: &Value, plan: Plan) -> Result<Executed, MutationError> {
    let mut next = state.clone();
    match plan {
        Plan::Add {
            field,
            create,
            index,
            item,
        } => {
            let path = StatePath::key(field);
            if create {
                path.set(&mut next, json!([]))?;
            }
            let previous = path.get(&next).cloned().unwrap_or_else(|| json!([]));
            path.child(index).insert(&mut next, item.clone())?;
            Ok((next, path, Some(item), previous))
        }
        Plan::RemoveAt { field, index } => {
            let path = StatePath::key(field).child(index);
            let removed = path.remove(&mut next)?;
            Ok((next, path, None, removed))
        }
        Plan::RemoveWhere { field, indices } => {
            let path = StatePath::key(field);
            let mut removed = Vec::with_capacity(indices.len());
            for &index in indices.iter().rev() {
                removed.push(path.child(index).remove(&mut next)?);
            }
            removed.reverse();
            let value = json!({ "removedIndices": indices });
            Ok((next, path, Some(value), Value::Array(removed)))
        }
        Plan::UpdateItem { field, index, item } => {
            let path = StatePath::key(field).child(index);
            let previous = path.set(&mut next, item.clone())?.unwrap_or(Value::Null);
            Ok((next, path, Some(item), previous))
        }
        Plan::SetProperty { key, value } => {
            let path = StatePath::key(key);
            let previous = path.set(&mut next, value.clone())?.unwrap_or(Value::Null);
            Ok((next, path, Some(value), previous))
        }
        Plan::Move { field, from, to } => {
            let path = StatePath::key(field);
            let previous = path.get(&next).cloned().unwrap_or_else(|| json!([]));
            let moved = path.child(from).remove(&mut next)?;
            path.child(to).insert(&mut next, moved)?;
            Ok((next, path, Some(json!({ "from": from, "to": to })), previous))
        }
        Plan::Replace { state: replacement } => {
            let previous = std::mem::replace(&mut next, replacement.clone());
            Ok((next, StatePath::root(), Some(replacement), previous))
        }
    }
}

/// Pick the array field an item operation works on
///
/// A collection named in the command must exist as an array, otherwise there
/// is no match. Without a name, the common names in [`COLLECTION_PRIORITY`]
/// are tried, then the first array-valued field. Artifacts with several lists
/// under unconventional names can resolve to the wrong one.
#[must_use]
pub fn find_collection(state: &Value, hint: Option<&str>) -> Option<String> {
    let map = state.as_object()?;
    if let Some(hint) = hint {
        let wanted = squash(hint);
        return map
            .iter()
            .find(|(k, v)| v.is_array() && squash(k) == wanted)
            .map(|(k, _)| k.clone());
    }
    COLLECTION_PRIORITY
        .iter()
        .find(|name| map.get(**name).is_some_and(Value::is_array))
        .map(|name| (*name).to_string())
        .or_else(|| map.iter().find(|(_, v)| v.is_array()).map(|(k, _)| k.clone()))
}

/// Check if an artifact has the list an intent names
///
/// Intents without a collection fit any artifact. An add also fits when the
/// named list is the kind's primary list and would be created.
#[must_use]
pub fn has_collection(artifact: &Artifact, intent: &MutationIntent) -> bool {
    let Some(hint) = intent.collection.as_deref() else {
        return true;
    };
    find_collection(&artifact.state, Some(hint)).is_some()
        || (intent.operation == MutationOperation::AddItem && artifact.schema.list_field() == Some(hint))
}

fn missing(hint: Option<&str>, operation: MutationOperation) -> MutationError {
    match hint {
        Some(hint) => MutationError::MissingCollection(hint.to_string()),
        None => MutationError::NoCollection(operation),
    }
}

/// Find the existing top-level key a typed property name refers to
///
/// Matching ignores case and separators ("overall status" → `overallStatus`),
/// drops leading qualifier words ("plan title" → `title`) and finally accepts
/// a unique key ending in the typed name ("status" → `overallStatus`).
#[must_use]
pub fn match_property(state: &Value, typed: &str) -> Option<String> {
    let map = state.as_object()?;
    if map.contains_key(typed) {
        return Some(typed.to_string());
    }
    let words: Vec<&str> = typed.split_whitespace().collect();
    for start in 0..words.len().max(1) {
        let wanted = squash(&words[start.min(words.len())..].join(" "));
        if wanted.is_empty() {
            break;
        }
        if let Some(key) = map.keys().find(|k| squash(k) == wanted) {
            return Some(key.clone());
        }
    }
    let wanted = squash(typed);
    if wanted.len() < 3 {
        return None;
    }
    let mut suffixed = map.keys().filter(|k| squash(k).ends_with(&wanted));
    match (suffixed.next(), suffixed.next()) {
        (Some(key), None) => Some(key.clone()),
        _ => None,
    }
}

/// Lowercase and drop everything but letters and digits
fn squash(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn camel_case(text: &str) -> String {
    let mut out = String::new();
    for (i, word) in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

fn list<'s>(state: &'s Value, field: &str) -> &'s [Value] {
    state
        .get(field)
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn out_of_range(index: ItemIndex, len: usize) -> MutationError {
    MutationError::IndexOutOfRange {
        position: index.describe(),
        len,
    }
}

fn locate(index: ItemIndex, len: usize) -> Result<usize, MutationError> {
    if len == 0 {
        return Err(MutationError::EmptyCollection);
    }
    index.resolve(len).ok_or_else(|| out_of_range(index, len))
}

fn matching(condition: &ItemCondition, items: &[Value]) -> Result<Vec<usize>, MutationError> {
    if !condition.is_well_formed() {
        return Err(MutationError::MalformedCondition(condition.to_string()));
    }
    let indices: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| condition.matches(item))
        .map(|(i, _)| i)
        .collect();
    if indices.is_empty() {
        return Err(MutationError::NoMatch(condition.to_string()));
    }
    Ok(indices)
}

/// Label key used by the items already in a list
fn label_key(items: &[Value]) -> &'static str {
    items
        .iter()
        .filter_map(Value::as_object)
        .find_map(|item| LABEL_KEYS.iter().copied().find(|k| item.contains_key(*k)))
        .unwrap_or("title")
}

/// Item to insert for an `add_item` value
fn build_item(schema: &dyn ArtifactSchema, field: &str, existing: &[Value], value: &Value) -> Value {
    if value.is_string() && existing.first().is_some_and(Value::is_string) {
        return value.clone();
    }
    let label = match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => LABEL_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        other => other.to_string(),
    };
    let mut item = if schema.list_field() == Some(field) {
        schema.new_item(&label)
    } else {
        let mut item = Map::new();
        item.insert(label_key(existing).to_string(), Value::String(label));
        Value::Object(item)
    };
    if let (Value::Object(target), Value::Object(patch)) = (&mut item, value) {
        for (key, v) in patch {
            target.insert(key.clone(), v.clone());
        }
    }
    item
}

/// Element after applying an `update_item` intent
fn updated_item(current: &Value, intent: &MutationIntent) -> Result<Value, MutationError> {
    let patch: Map<String, Value> = match (&intent.property, &intent.value) {
        (Some(property), Some(value)) => {
            if let Value::String(_) = current {
                // Plain string lists only have a label to change
                return if LABEL_KEYS.contains(&squash(property).as_str()) {
                    Ok(value.clone())
                } else {
                    Err(MutationError::Ambiguous(format!("item has no field '{property}'")))
                };
            }
            let key = item_key(current, property);
            let mut patch = Map::new();
            patch.insert(key, value.clone());
            patch
        }
        (None, Some(Value::Object(fields))) => fields.clone(),
        (None, Some(_)) => {
            return Err(MutationError::Ambiguous(
                "a bare value needs a property name".into(),
            ))
        }
        (_, None) => {
            return Err(MutationError::Ambiguous(
                "update names neither a property nor an object value".into(),
            ))
        }
    };

    let Value::Object(fields) = current else {
        return Err(MutationError::Ambiguous("item is not an object".into()));
    };
    let mut merged = fields.clone();
    for (key, value) in patch {
        merged.insert(key, value);
    }
    Ok(Value::Object(merged))
}

/// Key on an item matching a typed field name; unknown names become camelCase keys
fn item_key(item: &Value, typed: &str) -> String {
    let Some(map) = item.as_object() else {
        return camel_case(typed);
    };
    if map.contains_key(typed) {
        return typed.to_string();
    }
    let wanted = squash(typed);
    if let Some(key) = map.keys().find(|k| squash(k) == wanted) {
        return key.clone();
    }
    if LABEL_KEYS.contains(&wanted.as_str()) {
        if let Some(key) = LABEL_KEYS.iter().find(|k| map.contains_key(**k)) {
            return (*key).to_string();
        }
    }
    camel_case(typed)
}
