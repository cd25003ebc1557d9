//! Persisted document shape and migrations
//!
//! Current layout (version 2):
//!
//! ```json
//! {
//!   "version": 2,
//!   "state": {
//!     "artifacts": { "<id>": { "id": "...", "type": "...", "state": {}, ... } },
//!     "mutations": [ { "id": "...", "artifactId": "...", ... } ],
//!     "relationships": [ { "id": "...", "sourceId": "...", ... } ]
//!   }
//! }
//! ```
//!
//! Older shapes:
//! - version 0: the bare state object, no wrapper, no relationships
//! - version 1: wrapped, mutations grouped per artifact under `history`

use crate::error::StorageError;
use gws_artifact::{Artifact, ArtifactId, Mutation, Relationship};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Newest document version this build writes
pub const DOCUMENT_VERSION: u64 = 2;

/// Owned store contents decoded from storage
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub artifacts: IndexMap<ArtifactId, Artifact>,
    #[serde(default)]
    pub mutations: Vec<Mutation>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u64,
    state: StateRef<'a>,
}

#[derive(Serialize)]
struct StateRef<'a> {
    artifacts: &'a IndexMap<ArtifactId, Artifact>,
    mutations: &'a [Mutation],
    relationships: &'a [Relationship],
}

/// Encode store contents as a current-version document
///
/// # Errors
/// Returns error if serialization fails
pub fn encode(
    artifacts: &IndexMap<ArtifactId, Artifact>,
    mutations: &[Mutation],
    relationships: &[Relationship],
) -> Result<String, StorageError> {
    let doc = DocumentRef {
        version: DOCUMENT_VERSION,
        state: StateRef {
            artifacts,
            mutations,
            relationships,
        },
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Decode a document of any known version
///
/// Schemas on the returned artifacts are unattached placeholders.
///
/// # Errors
/// Returns error if the text is not JSON, the version is newer than this
/// build, or a migration step fails
pub fn decode(raw: &str) -> Result<PersistedState, StorageError> {
    let mut doc: Value = serde_json::from_str(raw)?;
    let mut version = detect_version(&doc);
    if version > DOCUMENT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: version,
            supported: DOCUMENT_VERSION,
        });
    }

    while version < DOCUMENT_VERSION {
        doc = match version {
            0 => upgrade_v0(doc),
            _ => upgrade_v1(doc)?,
        };
        version += 1;
        tracing::info!(version, "migrated persisted workspace document");
    }

    let state = match doc {
        Value::Object(mut map) => map.remove("state").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    if state.is_null() {
        return Ok(PersistedState::default());
    }
    let mut decoded: PersistedState = serde_json::from_value(state)?;
    decoded.mutations.sort_by_key(|m| m.timestamp);
    Ok(decoded)
}

fn detect_version(doc: &Value) -> u64 {
    match doc.get("version").and_then(Value::as_u64) {
        Some(v) if doc.get("state").is_some() => v,
        _ => 0,
    }
}

/// v0 → v1: wrap, group mutations by artifact
fn upgrade_v0(doc: Value) -> Value {
    let Value::Object(mut bare) = doc else {
        return json!({"version": 1, "state": null});
    };
    let mut history: Map<String, Value> = Map::new();
    if let Some(Value::Array(mutations)) = bare.remove("mutations") {
        for mutation in mutations {
            let key = mutation
                .get("artifactId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if let Value::Array(list) = history.entry(key).or_insert_with(|| json!([])) {
                list.push(mutation);
            }
        }
    }
    json!({
        "version": 1,
        "state": {
            "artifacts": bare.remove("artifacts").unwrap_or_else(|| json!({})),
            "history": history,
        }
    })
}

/// v1 → v2: flatten per-artifact history into one log
fn upgrade_v1(doc: Value) -> Result<Value, StorageError> {
    let Value::Object(mut wrapper) = doc else {
        return Err(StorageError::Migration {
            from: 1,
            reason: "document is not an object".into(),
        });
    };
    let mut state = match wrapper.remove("state") {
        Some(Value::Object(state)) => state,
        Some(Value::Null) | None => Map::new(),
        Some(_) => {
            return Err(StorageError::Migration {
                from: 1,
                reason: "state is not an object".into(),
            })
        }
    };

    let mut mutations = Vec::new();
    match state.remove("history") {
        Some(Value::Object(history)) => {
            for (artifact_id, entries) in history {
                let Value::Array(entries) = entries else {
                    return Err(StorageError::Migration {
                        from: 1,
                        reason: format!("history for {artifact_id} is not a list"),
                    });
                };
                for mut entry in entries {
                    if let Value::Object(fields) = &mut entry {
                        fields
                            .entry("artifactId")
                            .or_insert_with(|| Value::String(artifact_id.clone()));
                    }
                    mutations.push(entry);
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(_) => {
            return Err(StorageError::Migration {
                from: 1,
                reason: "history is not an object".into(),
            })
        }
    }

    state.insert("mutations".into(), Value::Array(mutations));
    state
        .entry("relationships")
        .or_insert_with(|| Value::Array(Vec::new()));
    Ok(json!({"version": 2, "state": state}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gws_artifact::{ArtifactKind, MutationOperation, MutationSource, RelationshipKind, SchemaRegistry, StatePath};
    use pretty_assertions::assert_eq;

    fn sample() -> (IndexMap<ArtifactId, Artifact>, Vec<Mutation>, Vec<Relationship>) {
        let registry = SchemaRegistry::with_defaults();
        let plan = Artifact::with_id(
            ArtifactId::new("aaaa1111"),
            ArtifactKind::ExecutionPlan,
            json!({"title": "Launch", "steps": ["Design"]}),
            registry.resolve(&ArtifactKind::ExecutionPlan),
        );
        let panel = Artifact::with_id(
            ArtifactId::new("bbbb2222"),
            ArtifactKind::SystemStatusPanel,
            json!({"title": "Prod"}),
            registry.resolve(&ArtifactKind::SystemStatusPanel),
        );
        let mutation = Mutation::new(
            plan.id.clone(),
            MutationOperation::UpdateProperty,
            StatePath::key("title"),
            MutationSource::User,
        )
        .with_value(json!("Relaunch"))
        .with_previous(json!("Launch"));
        let edge = Relationship::new(plan.id.clone(), panel.id.clone(), RelationshipKind::References);

        let mut artifacts = IndexMap::new();
        artifacts.insert(plan.id.clone(), plan);
        artifacts.insert(panel.id.clone(), panel);
        (artifacts, vec![mutation], vec![edge])
    }

    #[test]
    fn encode_decode_current_version() {
        let (artifacts, mutations, relationships) = sample();
        let raw = encode(&artifacts, &mutations, &relationships).unwrap();

        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], json!(DOCUMENT_VERSION));
        assert!(value["state"]["artifacts"]["aaaa1111"].get("schema").is_none());

        let decoded = decode(&raw).unwrap();
        let ids: Vec<_> = decoded.artifacts.keys().map(ArtifactId::as_str).collect();
        assert_eq!(ids, vec!["aaaa1111", "bbbb2222"]);
        assert_eq!(decoded.mutations, mutations);
        assert_eq!(decoded.relationships, relationships);
        assert_eq!(
            decoded.artifacts["aaaa1111"].state,
            artifacts[&ArtifactId::new("aaaa1111")].state
        );
    }

    #[test]
    fn decode_v0_bare_state() {
        let raw = json!({
            "artifacts": {
                "aaaa1111": {
                    "id": "aaaa1111", "type": "ExecutionPlan",
                    "state": {"title": "Old", "steps": []},
                    "version": 3,
                    "createdAt": "2024-05-01T10:00:00Z",
                    "updatedAt": "2024-05-02T10:00:00Z"
                }
            },
            "mutations": [{
                "id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
                "artifactId": "aaaa1111",
                "operation": "update_property",
                "path": ["title"],
                "value": "Old",
                "previousValue": "Older",
                "timestamp": "2024-05-02T10:00:00Z"
            }]
        })
        .to_string();

        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded.artifacts.len(), 1);
        assert_eq!(decoded.artifacts["aaaa1111"].version, 3);
        assert_eq!(decoded.mutations.len(), 1);
        assert_eq!(decoded.mutations[0].artifact_id, ArtifactId::new("aaaa1111"));
        assert!(decoded.relationships.is_empty());
    }

    #[test]
    fn decode_v1_history_is_flattened_in_time_order() {
        let raw = json!({
            "version": 1,
            "state": {
                "artifacts": {},
                "history": {
                    "aaaa1111": [{
                        "id": "01ARZ3NDEKTSV4RRFFQ69G5FAW",
                        "operation": "update_property",
                        "path": ["title"],
                        "previousValue": "b",
                        "timestamp": "2024-05-03T10:00:00Z"
                    }],
                    "bbbb2222": [{
                        "id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
                        "operation": "update_property",
                        "path": ["title"],
                        "previousValue": "a",
                        "timestamp": "2024-05-01T10:00:00Z"
                    }]
                }
            }
        })
        .to_string();

        let decoded = decode(&raw).unwrap();
        let owners: Vec<_> = decoded
            .mutations
            .iter()
            .map(|m| m.artifact_id.as_str())
            .collect();
        assert_eq!(owners, vec!["bbbb2222", "aaaa1111"]);
    }

    #[test]
    fn decode_future_version_refused() {
        let raw = json!({"version": 99, "state": {}}).to_string();
        assert!(matches!(
            decode(&raw),
            Err(StorageError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn decode_garbage_is_error() {
        assert!(matches!(decode("not json"), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn decode_v1_bad_history_is_migration_error() {
        let raw = json!({"version": 1, "state": {"history": [1, 2]}}).to_string();
        assert!(matches!(decode(&raw), Err(StorageError::Migration { from: 1, .. })));
    }
}
