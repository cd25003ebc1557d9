//! Built-in artifact kind schemas
//!
//! Each kind is described by data: a JSON Schema for structural checks, a
//! default top-level object, and (optionally) a primary collection with an
//! item template.

use super::{ArtifactSchema, Normalized, SchemaError};
use crate::kind::ArtifactKind;
use jsonschema::JSONSchema;
use serde_json::{json, Map, Value};
use std::fmt;
use uuid::Uuid;

/// Primary collection description
#[derive(Debug, Clone)]
struct Collection {
    field: &'static str,
    label_key: &'static str,
    id_prefix: &'static str,
    item_defaults: Value,
}

/// Data-driven schema for a built-in kind
pub struct KindSchema {
    kind: ArtifactKind,
    defaults: Value,
    collection: Option<Collection>,
    compiled: Option<JSONSchema>,
}

impl fmt::Debug for KindSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindSchema")
            .field("kind", &self.kind)
            .field("collection", &self.collection.as_ref().map(|c| c.field))
            .field("compiled", &self.compiled.is_some())
            .finish_non_exhaustive()
    }
}

impl KindSchema {
    /// Create schema from JSON Schema rules and top-level defaults
    ///
    /// Rules that fail to compile leave the schema structural-check free;
    /// defaults still apply.
    #[must_use]
    pub fn new(kind: ArtifactKind, rules: &Value, defaults: Value) -> Self {
        let compiled = match JSONSchema::compile(rules) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "schema rules failed to compile");
                None
            }
        };
        Self {
            kind,
            defaults,
            collection: None,
            compiled,
        }
    }

    /// Declare the primary collection field and its item template
    #[must_use]
    pub fn with_collection(
        mut self,
        field: &'static str,
        label_key: &'static str,
        id_prefix: &'static str,
        item_defaults: Value,
    ) -> Self {
        self.collection = Some(Collection {
            field,
            label_key,
            id_prefix,
            item_defaults,
        });
        self
    }

    /// Schema for a built-in kind, `None` for [`ArtifactKind::Other`]
    #[must_use]
    pub fn builtin(kind: &ArtifactKind) -> Option<Self> {
        match kind {
            ArtifactKind::ExecutionPlan => Some(Self::execution_plan()),
            ArtifactKind::SystemStatusPanel => Some(Self::system_status_panel()),
            ArtifactKind::KanbanBoard => Some(Self::kanban_board()),
            ArtifactKind::CommandResultPanel => Some(Self::command_result_panel()),
            ArtifactKind::DecisionMatrix => Some(Self::decision_matrix()),
            ArtifactKind::Other(_) => None,
        }
    }

    /// Ordered steps with statuses
    #[must_use]
    pub fn execution_plan() -> Self {
        let rules = json!({
            "type": "object",
            "required": ["title", "steps"],
            "properties": {
                "title": {"type": "string"},
                "description": {"type": "string"},
                "steps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["title"],
                        "properties": {
                            "id": {"type": "string"},
                            "title": {"type": "string"},
                            "status": {"enum": ["pending", "in_progress", "complete", "failed", "skipped"]}
                        }
                    }
                }
            }
        });
        Self::new(
            ArtifactKind::ExecutionPlan,
            &rules,
            json!({"title": "Untitled plan", "steps": []}),
        )
        .with_collection("steps", "title", "step", json!({"status": "pending"}))
    }

    /// Metrics with an overall health status
    #[must_use]
    pub fn system_status_panel() -> Self {
        let rules = json!({
            "type": "object",
            "required": ["title", "overallStatus", "metrics"],
            "properties": {
                "title": {"type": "string"},
                "overallStatus": {"enum": ["healthy", "degraded", "down", "unknown"]},
                "metrics": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["label"],
                        "properties": {
                            "label": {"type": "string"},
                            "status": {"enum": ["healthy", "degraded", "down", "unknown"]}
                        }
                    }
                }
            }
        });
        Self::new(
            ArtifactKind::SystemStatusPanel,
            &rules,
            json!({"title": "System status", "overallStatus": "unknown", "metrics": []}),
        )
        .with_collection(
            "metrics",
            "label",
            "metric",
            json!({"value": null, "status": "unknown"}),
        )
    }

    /// Columns plus a flat task list keyed by column
    #[must_use]
    pub fn kanban_board() -> Self {
        let rules = json!({
            "type": "object",
            "required": ["title", "columns", "tasks"],
            "properties": {
                "title": {"type": "string"},
                "columns": {"type": "array", "items": {"type": "string"}},
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["title"],
                        "properties": {
                            "title": {"type": "string"},
                            "column": {"type": "string"},
                            "priority": {"enum": ["low", "medium", "high"]}
                        }
                    }
                }
            }
        });
        Self::new(
            ArtifactKind::KanbanBoard,
            &rules,
            json!({"title": "Board", "columns": ["todo", "in_progress", "done"], "tasks": []}),
        )
        .with_collection(
            "tasks",
            "title",
            "task",
            json!({"column": "todo", "priority": "medium"}),
        )
    }

    /// Command output with labelled entries
    #[must_use]
    pub fn command_result_panel() -> Self {
        let rules = json!({
            "type": "object",
            "required": ["title", "status", "entries"],
            "properties": {
                "title": {"type": "string"},
                "command": {"type": "string"},
                "status": {"enum": ["success", "error", "running"]},
                "output": {"type": "string"},
                "entries": {
                    "type": "array",
                    "items": {"type": "object", "required": ["label"]}
                }
            }
        });
        Self::new(
            ArtifactKind::CommandResultPanel,
            &rules,
            json!({"title": "Result", "command": "", "status": "success", "output": "", "entries": []}),
        )
        .with_collection("entries", "label", "entry", json!({"value": ""}))
    }

    /// Options scored against weighted criteria
    #[must_use]
    pub fn decision_matrix() -> Self {
        let rules = json!({
            "type": "object",
            "required": ["title", "options", "criteria"],
            "properties": {
                "title": {"type": "string"},
                "options": {
                    "type": "array",
                    "items": {"type": "object", "required": ["name"]}
                },
                "criteria": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {"weight": {"type": "number"}}
                    }
                },
                "recommendation": {"type": ["string", "null"]}
            }
        });
        Self::new(
            ArtifactKind::DecisionMatrix,
            &rules,
            json!({"title": "Decision", "options": [], "criteria": [], "recommendation": null}),
        )
        .with_collection("options", "name", "option", json!({"scores": {}}))
    }

    fn normalize_item(&self, collection: &Collection, item: Value, warnings: &mut Vec<String>) -> Value {
        match item {
            Value::String(label) => self.new_item(&label),
            Value::Object(mut map) => {
                if !map.contains_key("id") {
                    map.insert("id".into(), Value::String(item_id(collection.id_prefix)));
                }
                if let Value::Object(defaults) = &collection.item_defaults {
                    for (key, default) in defaults {
                        map.entry(key.clone()).or_insert_with(|| default.clone());
                    }
                }
                Value::Object(map)
            }
            other => {
                warnings.push(format!(
                    "{}: coerced non-object item {other} into an item",
                    collection.field
                ));
                self.new_item(&other.to_string())
            }
        }
    }
}

impl ArtifactSchema for KindSchema {
    fn kind(&self) -> ArtifactKind {
        self.kind.clone()
    }

    fn validate(&self, state: &Value) -> Result<(), SchemaError> {
        if !state.is_object() {
            return Err(SchemaError::NotAnObject {
                kind: self.kind.clone(),
            });
        }
        let Some(compiled) = &self.compiled else {
            return Ok(());
        };
        compiled.validate(state).map_err(|errors| SchemaError::Invalid {
            kind: self.kind.clone(),
            violations: errors
                .map(|e| {
                    let at = e.instance_path.to_string();
                    if at.is_empty() {
                        e.to_string()
                    } else {
                        format!("{at}: {e}")
                    }
                })
                .collect(),
        })
    }

    fn normalize(&self, state: Value) -> Normalized {
        let mut warnings = Vec::new();
        let mut map = match state {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                warnings.push(format!(
                    "{} state was {}, replaced with defaults",
                    self.kind,
                    type_name(&other)
                ));
                Map::new()
            }
        };

        if let Value::Object(defaults) = &self.defaults {
            for (key, default) in defaults {
                if !map.contains_key(key) {
                    warnings.push(format!("{key}: missing, defaulted"));
                    map.insert(key.clone(), default.clone());
                }
            }
        }

        if let Some(collection) = &self.collection {
            let slot = map
                .entry(collection.field)
                .or_insert_with(|| Value::Array(Vec::new()));
            *slot = match slot.take() {
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| self.normalize_item(collection, item, &mut warnings))
                        .collect(),
                ),
                other => {
                    warnings.push(format!(
                        "{}: expected array, found {}, reset to empty",
                        collection.field,
                        type_name(&other)
                    ));
                    Value::Array(Vec::new())
                }
            };
        }

        Normalized {
            state: Value::Object(map),
            warnings,
        }
    }

    fn list_field(&self) -> Option<&str> {
        self.collection.as_ref().map(|c| c.field)
    }

    fn new_item(&self, label: &str) -> Value {
        let Some(collection) = &self.collection else {
            return json!({ "title": label });
        };
        let mut item = Map::new();
        item.insert("id".into(), Value::String(item_id(collection.id_prefix)));
        item.insert(collection.label_key.into(), Value::String(label.to_string()));
        if let Value::Object(defaults) = &collection.item_defaults {
            for (key, default) in defaults {
                item.entry(key.clone()).or_insert_with(|| default.clone());
            }
        }
        Value::Object(item)
    }
}

fn item_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &simple[..6])
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
