//! Testing utilities for the GWS workspace
//!
//! Shared fixtures, sample states and storage doubles.

#![allow(missing_docs)]

use gws_artifact::{Artifact, ArtifactId, ArtifactKind, SchemaRegistry};
use gws_store::{ArtifactStore, MemoryStorage, StorageBackend, StorageError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::with_defaults())
}

pub fn plan_state(steps: &[&str]) -> Value {
    json!({"title": "Launch plan", "steps": steps})
}

/// A plan whose steps carry explicit statuses
pub fn plan_with_statuses(steps: &[(&str, &str)]) -> Value {
    let steps: Vec<Value> = steps
        .iter()
        .map(|(title, status)| json!({"title": title, "status": status}))
        .collect();
    json!({"title": "Launch plan", "steps": steps})
}

/// A representative state for every built-in kind
pub fn sample_state(kind: &ArtifactKind) -> Value {
    match kind {
        ArtifactKind::ExecutionPlan => plan_state(&["Design", "Build", "Ship"]),
        ArtifactKind::SystemStatusPanel => json!({
            "title": "Production",
            "overallStatus": "healthy",
            "metrics": [
                {"label": "CPU", "value": "42%", "status": "healthy"},
                {"label": "Error rate", "value": "0.1%", "status": "healthy"}
            ]
        }),
        ArtifactKind::KanbanBoard => json!({
            "title": "Sprint board",
            "columns": ["todo", "in_progress", "done"],
            "tasks": [
                {"title": "Write docs", "column": "todo"},
                {"title": "Fix login", "column": "done", "priority": "high"}
            ]
        }),
        ArtifactKind::CommandResultPanel => json!({
            "title": "Latency analysis",
            "command": "analyze latency",
            "status": "success",
            "output": "p99 is 420ms",
            "entries": [{"label": "p50", "value": "80ms"}]
        }),
        ArtifactKind::DecisionMatrix => json!({
            "title": "Database choice",
            "options": [{"name": "Postgres"}, {"name": "SQLite"}],
            "criteria": [{"name": "Cost", "weight": 2}],
            "recommendation": null
        }),
        ArtifactKind::Other(_) => json!({"nodes": [{"id": 1}], "edges": []}),
    }
}

pub fn artifact(kind: ArtifactKind) -> Artifact {
    let registry = SchemaRegistry::with_defaults();
    let state = sample_state(&kind);
    let schema = registry.resolve(&kind);
    Artifact::new(kind, state, schema)
}

pub fn artifact_with_id(id: &str, kind: ArtifactKind, state: Value) -> Artifact {
    let registry = SchemaRegistry::with_defaults();
    let schema = registry.resolve(&kind);
    Artifact::with_id(ArtifactId::new(id), kind, state, schema)
}

/// In-memory store holding one sample artifact per kind, in the given order
pub fn store_with(kinds: &[ArtifactKind]) -> (ArtifactStore, Vec<ArtifactId>) {
    let registry = registry();
    let mut store = ArtifactStore::new(registry.clone());
    let ids = kinds
        .iter()
        .map(|kind| {
            store.create_artifact(kind.clone(), sample_state(kind), registry.resolve(kind), None)
        })
        .collect();
    (store, ids)
}

/// Backend whose reads take `delay` before answering
#[derive(Debug)]
pub struct SlowStorage {
    pub inner: MemoryStorage,
    pub delay: Duration,
}

impl SlowStorage {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStorage::new(),
            delay,
        }
    }
}

impl StorageBackend for SlowStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        std::thread::sleep(self.delay);
        self.inner.read(key)
    }

    fn write(&self, key: &str, document: &str) -> Result<(), StorageError> {
        self.inner.write(key, document)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

/// Backend that answers reads with a fixed document and refuses writes
#[derive(Debug, Default)]
pub struct FailingStorage {
    pub document: Option<String>,
    pub write_attempts: Mutex<usize>,
}

impl StorageBackend for FailingStorage {
    fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.document.clone())
    }

    fn write(&self, _key: &str, _document: &str) -> Result<(), StorageError> {
        *self.write_attempts.lock() += 1;
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only storage",
        )))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}
