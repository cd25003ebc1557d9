//! The authoritative artifact store
//!
//! [`ArtifactStore`] owns the artifact map, the append-only mutation log and
//! the relationship graph. Every state-changing call writes the whole store to
//! the configured [`StorageBackend`] as a side effect; write failures are
//! logged and the in-memory state stays authoritative.

use crate::backend::StorageBackend;
use crate::document::{self, PersistedState};
use crate::error::StorageError;
use crate::readiness::{HydrationOutcome, Readiness};
use crate::undo;
use gws_artifact::{
    conform, Artifact, ArtifactId, ArtifactKind, ArtifactSchema, Mutation, PermissiveSchema,
    Relationship, RelationshipKind, SchemaRegistry,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Default namespace under which the workspace document is stored
pub const DEFAULT_STORAGE_KEY: &str = "generative-workspace-artifacts";

/// Artifact map, mutation log and relationship graph for one session
///
/// # Invariants
/// - Artifact ids are unique; map order is insertion (creation) order
/// - Every mutation in the log belongs to an artifact in the map
/// - Relationship endpoints exist in the map (deletion cascades)
#[derive(Debug)]
pub struct ArtifactStore {
    registry: Arc<SchemaRegistry>,
    artifacts: IndexMap<ArtifactId, Artifact>,
    mutations: Vec<Mutation>,
    relationships: Vec<Relationship>,
    storage: Option<Arc<dyn StorageBackend>>,
    storage_key: String,
    hydrated: bool,
    /// Persisted document exists but was never read; writes would clobber it
    unread: bool,
}

impl ArtifactStore {
    /// Create an in-memory store (hydrated immediately, nothing persisted)
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            artifacts: IndexMap::new(),
            mutations: Vec::new(),
            relationships: Vec::new(),
            storage: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            hydrated: true,
            unread: false,
        }
    }

    /// Create a store backed by durable storage
    ///
    /// The store starts unhydrated: reads report [`Readiness::Loading`] and
    /// nothing is written until [`rehydrate`](Self::rehydrate) completes.
    #[must_use]
    pub fn with_storage(
        registry: Arc<SchemaRegistry>,
        storage: Arc<dyn StorageBackend>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            storage: Some(storage),
            storage_key: storage_key.into(),
            hydrated: false,
            unread: true,
            ..Self::new(registry)
        }
    }

    /// Schema registry used for rehydration
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Storage namespace
    #[inline]
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Check if persisted state has been read (or given up on)
    #[inline]
    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Check if the persisted document could not be read yet
    ///
    /// While this holds, nothing is written back, so a slow or failing read
    /// never ends with the stored workspace overwritten.
    #[inline]
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.hydrated && self.unread
    }

    /// Read persisted state and merge it into the store
    ///
    /// The read runs on the blocking pool and is raced against `timeout`.
    /// Whatever happens the store is hydrated afterwards; artifacts created in
    /// memory in the meantime win over persisted copies with the same id.
    /// After a timeout or a failed read the store is detached and calling
    /// this again retries the read.
    pub async fn rehydrate(&mut self, timeout: Duration) -> HydrationOutcome {
        if self.hydrated && !self.unread {
            return HydrationOutcome::AlreadyHydrated;
        }
        let Some(storage) = self.storage.clone() else {
            self.hydrated = true;
            self.unread = false;
            return HydrationOutcome::Empty;
        };

        let had_local = self.has_local_state();
        let key = self.storage_key.clone();
        let read = tokio::task::spawn_blocking(move || -> Result<Option<PersistedState>, StorageError> {
            storage
                .read(&key)?
                .map(|raw| document::decode(&raw))
                .transpose()
        });

        let outcome = match tokio::time::timeout(timeout, read).await {
            Ok(Ok(Ok(Some(persisted)))) => self.absorb(persisted),
            Ok(Ok(Ok(None))) => HydrationOutcome::Empty,
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, key = %self.storage_key, "failed to load persisted workspace");
                HydrationOutcome::Failed(e.to_string())
            }
            Ok(Err(join)) => {
                tracing::warn!(error = %join, "hydration task aborted");
                HydrationOutcome::Failed(join.to_string())
            }
            Err(_) => {
                tracing::warn!(timeout_ms = %timeout.as_millis(), "hydration timed out, continuing with in-memory state");
                HydrationOutcome::TimedOut
            }
        };

        self.hydrated = true;
        self.unread = matches!(outcome, HydrationOutcome::Failed(_) | HydrationOutcome::TimedOut);
        if self.unread {
            tracing::warn!(key = %self.storage_key, "persisted workspace unread, writes are held back");
        }
        tracing::info!(%outcome, artifacts = self.artifacts.len(), "artifact store hydrated");
        if had_local {
            self.persist();
        }
        outcome
    }

    /// Merge a decoded document, reattaching schemas from the registry
    fn absorb(&mut self, persisted: PersistedState) -> HydrationOutcome {
        let mut merged: IndexMap<ArtifactId, Artifact> = IndexMap::with_capacity(persisted.artifacts.len() + self.artifacts.len());
        let mut loaded = 0;
        let mut unknown_kinds = 0;

        for (id, mut artifact) in persisted.artifacts {
            if self.artifacts.contains_key(&id) {
                tracing::debug!(artifact = %id, "in-memory artifact shadows persisted copy");
                continue;
            }
            if artifact.id != id {
                tracing::warn!(key = %id, record = %artifact.id, "persisted artifact id disagrees with its key, using key");
                artifact.id = id.clone();
            }
            match self.registry.get(&artifact.kind) {
                Some(schema) => artifact.attach_schema(schema),
                None => {
                    tracing::warn!(artifact = %id, kind = %artifact.kind, "unknown artifact kind on rehydration, keeping with permissive schema");
                    unknown_kinds += 1;
                    artifact.attach_schema(Arc::new(PermissiveSchema::new(artifact.kind.clone())));
                }
            }
            if let Err(e) = artifact.validate() {
                tracing::warn!(artifact = %id, error = %e, "persisted artifact does not match schema");
            }
            merged.insert(id, artifact);
            loaded += 1;
        }
        let persisted_ids: HashSet<ArtifactId> = merged.keys().cloned().collect();
        merged.extend(self.artifacts.drain(..));
        self.artifacts = merged;

        let local_mutations = std::mem::take(&mut self.mutations);
        self.mutations = persisted
            .mutations
            .into_iter()
            .filter(|m| persisted_ids.contains(&m.artifact_id))
            .chain(local_mutations)
            .collect();
        self.mutations.sort_by_key(|m| m.timestamp);

        let local_edges = std::mem::take(&mut self.relationships);
        for edge in persisted.relationships.into_iter().chain(local_edges) {
            let endpoints_exist = self.artifacts.contains_key(&edge.source_id)
                && self.artifacts.contains_key(&edge.target_id);
            let duplicate = self
                .relationships
                .iter()
                .any(|e| e.same_edge(&edge.source_id, &edge.target_id, edge.kind));
            if endpoints_exist && !duplicate {
                self.relationships.push(edge);
            } else {
                tracing::debug!(edge = %edge.id, "dropping dangling or duplicate relationship");
            }
        }
        let known: HashSet<ArtifactId> = self.artifacts.keys().cloned().collect();
        for artifact in self.artifacts.values_mut() {
            artifact.related_ids.retain(|id| known.contains(id));
        }

        HydrationOutcome::Loaded {
            artifacts: loaded,
            unknown_kinds,
        }
    }

    fn has_local_state(&self) -> bool {
        !self.artifacts.is_empty() || !self.mutations.is_empty() || !self.relationships.is_empty()
    }

    /// Create an artifact with a fresh id
    ///
    /// The state is normalized through `schema`; validation problems are
    /// logged, never fatal.
    pub fn create_artifact(
        &mut self,
        kind: ArtifactKind,
        state: Value,
        schema: Arc<dyn ArtifactSchema>,
        title: Option<&str>,
    ) -> ArtifactId {
        let mut artifact = Artifact::new(kind, state, schema);
        while self.artifacts.contains_key(&artifact.id) {
            artifact.id = ArtifactId::generate();
        }
        if let Some(title) = title {
            artifact.title = Some(title.to_string());
        }
        let id = artifact.id.clone();
        tracing::info!(artifact = %id, kind = %artifact.kind, "artifact created");
        self.artifacts.insert(id.clone(), artifact);
        self.persist();
        id
    }

    /// Insert a fully formed record (template and bulk loads)
    ///
    /// Returns `false` if the id is already taken. A placeholder schema is
    /// swapped for the registered one when the kind is known.
    pub fn add_artifact(&mut self, mut artifact: Artifact) -> bool {
        if self.artifacts.contains_key(&artifact.id) {
            tracing::warn!(artifact = %artifact.id, "artifact id already in use");
            return false;
        }
        if artifact.schema.is_permissive() {
            if let Some(schema) = self.registry.get(&artifact.kind) {
                artifact.attach_schema(schema);
            }
        }
        tracing::info!(artifact = %artifact.id, kind = %artifact.kind, "artifact added");
        self.artifacts.insert(artifact.id.clone(), artifact);
        self.persist();
        true
    }

    /// Replace an artifact's whole state, bumping its version
    pub fn update_artifact(&mut self, id: &ArtifactId, state: Value) -> bool {
        let Some(artifact) = self.artifacts.get_mut(id) else {
            tracing::debug!(artifact = %id, "update of unknown artifact ignored");
            return false;
        };
        let state = conform(id, artifact.schema.as_ref(), state);
        artifact.replace_state(state);
        self.persist();
        true
    }

    /// Remove an artifact, its mutation history and every edge touching it
    pub fn delete_artifact(&mut self, id: &ArtifactId) -> bool {
        if self.artifacts.shift_remove(id).is_none() {
            return false;
        }
        self.mutations.retain(|m| &m.artifact_id != id);
        let before = self.relationships.len();
        self.relationships.retain(|r| !r.touches(id));
        for artifact in self.artifacts.values_mut() {
            artifact.related_ids.retain(|related| related != id);
        }
        tracing::info!(
            artifact = %id,
            relationships_removed = before - self.relationships.len(),
            "artifact deleted"
        );
        self.persist();
        true
    }

    /// Look up one artifact
    #[must_use]
    pub fn get_artifact(&self, id: &ArtifactId) -> Readiness<Option<&Artifact>> {
        if !self.hydrated {
            return Readiness::Loading;
        }
        Readiness::Ready(self.artifacts.get(id))
    }

    /// All artifacts in creation order
    #[must_use]
    pub fn artifacts(&self) -> Readiness<Vec<&Artifact>> {
        if !self.hydrated {
            return Readiness::Loading;
        }
        Readiness::Ready(self.artifacts.values().collect())
    }

    /// Number of artifacts held in memory
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Check if no artifacts are held in memory
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Append a mutation record to the log
    ///
    /// The artifact's state is left alone; use
    /// [`commit_mutation`](Self::commit_mutation) to apply and log together.
    pub fn add_mutation(&mut self, mutation: Mutation) -> bool {
        if !self.artifacts.contains_key(&mutation.artifact_id) {
            tracing::debug!(artifact = %mutation.artifact_id, "mutation for unknown artifact ignored");
            return false;
        }
        self.mutations.push(mutation);
        self.persist();
        true
    }

    /// Install the state a mutation produced and log the mutation
    pub fn commit_mutation(&mut self, mutation: Mutation, new_state: Value) -> bool {
        let Some(artifact) = self.artifacts.get_mut(&mutation.artifact_id) else {
            tracing::debug!(artifact = %mutation.artifact_id, "mutation for unknown artifact ignored");
            return false;
        };
        artifact.replace_state(new_state);
        if let Err(e) = artifact.validate() {
            tracing::warn!(artifact = %artifact.id, error = %e, "mutated state does not match schema");
        }
        tracing::debug!(
            artifact = %artifact.id,
            operation = %mutation.operation,
            path = %mutation.path,
            version = artifact.version,
            "mutation committed"
        );
        self.mutations.push(mutation);
        self.persist();
        true
    }

    /// Mutations of one artifact, oldest first
    #[must_use]
    pub fn get_mutations(&self, id: &ArtifactId) -> Vec<&Mutation> {
        self.mutations
            .iter()
            .filter(|m| &m.artifact_id == id)
            .collect()
    }

    /// Revert the newest mutation of an artifact
    ///
    /// The prior value is written back at the mutated path, the version moves
    /// up by one and the record leaves the log. Returns `false` if there is
    /// nothing to undo or the record cannot be inverted.
    pub fn undo_last_mutation(&mut self, id: &ArtifactId) -> bool {
        let Some(position) = self.mutations.iter().rposition(|m| &m.artifact_id == id) else {
            return false;
        };
        let Some(artifact) = self.artifacts.get_mut(id) else {
            return false;
        };

        let mut state = artifact.state.clone();
        if let Err(e) = undo::invert(&self.mutations[position], &mut state) {
            tracing::warn!(artifact = %id, error = %e, "undo failed");
            return false;
        }
        artifact.replace_state(state);
        let undone = self.mutations.remove(position);
        tracing::info!(
            artifact = %id,
            operation = %undone.operation,
            version = artifact.version,
            "mutation undone"
        );
        self.persist();
        true
    }

    /// Link two existing artifacts
    ///
    /// An identical edge (same ends and kind) is returned instead of being
    /// duplicated. Self-links and unknown ids yield `None`.
    pub fn add_relationship(
        &mut self,
        source: &ArtifactId,
        target: &ArtifactId,
        kind: RelationshipKind,
    ) -> Option<Relationship> {
        if source == target || !self.artifacts.contains_key(source) || !self.artifacts.contains_key(target) {
            return None;
        }
        if let Some(existing) = self.relationships.iter().find(|r| r.same_edge(source, target, kind)) {
            return Some(existing.clone());
        }

        let edge = Relationship::new(source.clone(), target.clone(), kind);
        self.link_cache(source, target);
        if edge.bidirectional {
            self.link_cache(target, source);
        }
        tracing::debug!(source = %source, target = %target, kind = %kind, "relationship added");
        self.relationships.push(edge.clone());
        self.persist();
        Some(edge)
    }

    fn link_cache(&mut self, from: &ArtifactId, to: &ArtifactId) {
        if let Some(artifact) = self.artifacts.get_mut(from) {
            if !artifact.related_ids.contains(to) {
                artifact.related_ids.push(to.clone());
            }
        }
    }

    /// All relationships
    #[inline]
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Relationships touching an artifact at either end
    #[must_use]
    pub fn relationships_of(&self, id: &ArtifactId) -> Vec<&Relationship> {
        self.relationships.iter().filter(|r| r.touches(id)).collect()
    }

    /// Artifacts reachable through an artifact's forward-edge cache
    #[must_use]
    pub fn get_related(&self, id: &ArtifactId) -> Vec<&Artifact> {
        self.artifacts
            .get(id)
            .map(|artifact| {
                artifact
                    .related_ids
                    .iter()
                    .filter_map(|related| self.artifacts.get(related))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop everything, including the persisted copy
    ///
    /// This is the one way to discard a document that could not be read.
    pub fn clear(&mut self) {
        self.artifacts.clear();
        self.mutations.clear();
        self.relationships.clear();
        tracing::info!("artifact store cleared");
        let Some(storage) = &self.storage else {
            return;
        };
        match storage.remove(&self.storage_key) {
            Ok(()) => self.unread = false,
            Err(e) => tracing::warn!(error = %e, key = %self.storage_key, "failed to remove persisted workspace"),
        }
    }

    /// Write the whole store to durable storage
    ///
    /// Skipped until the persisted document has been read, so an unread
    /// document is never clobbered.
    pub fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        if !self.hydrated || self.unread {
            tracing::debug!(key = %self.storage_key, "persist skipped, stored workspace not read yet");
            return;
        }
        let written = document::encode(&self.artifacts, &self.mutations, &self.relationships)
            .and_then(|doc| storage.write(&self.storage_key, &doc));
        if let Err(e) = written {
            tracing::warn!(error = %e, key = %self.storage_key, "failed to persist workspace");
        }
    }
}
