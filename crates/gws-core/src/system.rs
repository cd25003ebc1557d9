//! The workspace facade
//!
//! [`ArtifactSystem`] is the composition root: it owns the store and the
//! stateless parser, resolver and detector, and keeps the short list of
//! recently referenced artifacts the pronoun strategy reads.

use crate::config::SystemConfig;
use crate::context::{focused_context, workspace_context};
use crate::error::SystemError;
use crate::templates;
use gws_artifact::{
    Artifact, ArtifactId, ArtifactKind, ArtifactSchema, MutationId, MutationOperation, MutationSource, Relationship,
    RelationshipKind, SchemaRegistry,
};
use gws_intent::{apply_mutation, has_collection, MutationIntent, MutationIntentParser};
use gws_relate::{
    build_cross_artifact_context, chronological, detect_cross_artifact_query, CrossArtifactQuery, DetectedRelationship,
    ReferenceResolver, RelationshipDetector,
};
use gws_store::{ArtifactStore, HydrationOutcome, Readiness, StorageBackend};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// How a chat message should be handled
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Store still hydrating; the message cannot be classified yet
    Loading,
    /// A local edit; run it with [`ArtifactSystem::execute_mutation`]
    Mutation {
        artifact_id: ArtifactId,
        intent: MutationIntent,
    },
    /// Anything else goes to the model
    Conversation {
        /// Artifact the message points at, if one resolved
        referenced: Option<ArtifactId>,
        /// Multi-artifact question, if one was recognised
        cross_query: Option<CrossArtifactQuery>,
        /// Edges recorded from the message
        relationships: Vec<Relationship>,
    },
}

impl MessageOutcome {
    /// Check if the message is a local mutation
    #[inline]
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Mutation { .. })
    }
}

/// Result of a committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedMutation {
    pub artifact_id: ArtifactId,
    pub mutation_id: MutationId,
    pub operation: MutationOperation,
    /// Artifact version after the commit
    pub version: u64,
}

/// Session-wide artifact workspace
#[derive(Debug)]
pub struct ArtifactSystem {
    config: SystemConfig,
    store: ArtifactStore,
    parser: MutationIntentParser,
    resolver: ReferenceResolver,
    detector: RelationshipDetector,
    /// Most recent first
    recent: VecDeque<ArtifactId>,
}

impl ArtifactSystem {
    /// Create an in-memory workspace (ready immediately)
    #[must_use]
    pub fn new(config: SystemConfig) -> Self {
        let store = ArtifactStore::new(Arc::new(SchemaRegistry::with_defaults()));
        Self::from_store(config, store)
    }

    /// Create a workspace persisted to `backend`
    ///
    /// Call [`hydrate`](Self::hydrate) before use; until then reads report
    /// loading.
    #[must_use]
    pub fn with_backend(config: SystemConfig, backend: Arc<dyn StorageBackend>) -> Self {
        let registry = Arc::new(SchemaRegistry::with_defaults());
        let store = ArtifactStore::with_storage(registry, backend, config.storage_key.clone());
        Self::from_store(config, store)
    }

    /// Wrap an existing store
    #[must_use]
    pub fn from_store(config: SystemConfig, store: ArtifactStore) -> Self {
        Self {
            config,
            store,
            parser: MutationIntentParser::new(),
            resolver: ReferenceResolver::new(),
            detector: RelationshipDetector::new(),
            recent: VecDeque::new(),
        }
    }

    /// Load persisted state, giving up after the configured timeout
    pub async fn hydrate(&mut self) -> HydrationOutcome {
        let outcome = self.store.rehydrate(self.config.hydration_timeout()).await;
        tracing::info!(%outcome, artifacts = self.store.len(), "workspace hydrated");
        outcome
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Check if persisted state has been read
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.store.is_hydrated()
    }

    /// Recently referenced artifacts, most recent first
    #[must_use]
    pub fn recent_ids(&self) -> Vec<ArtifactId> {
        self.recent.iter().cloned().collect()
    }

    /// All artifacts in creation order
    #[must_use]
    pub fn artifacts(&self) -> Readiness<Vec<&Artifact>> {
        self.store.artifacts()
    }

    #[must_use]
    pub fn get_artifact(&self, id: &ArtifactId) -> Readiness<Option<&Artifact>> {
        self.store.get_artifact(id)
    }

    /// Create an artifact using the registered schema for its kind
    pub fn create_artifact(&mut self, kind: ArtifactKind, state: Value, title: Option<&str>) -> ArtifactId {
        let schema = self.store.registry().resolve(&kind);
        self.create_artifact_with_schema(kind, state, schema, title)
    }

    /// Create an artifact with an explicit schema
    ///
    /// With auto-linking on, the new artifact is linked to existing ones by
    /// kind affinity.
    pub fn create_artifact_with_schema(
        &mut self,
        kind: ArtifactKind,
        state: Value,
        schema: Arc<dyn ArtifactSchema>,
        title: Option<&str>,
    ) -> ArtifactId {
        let id = self.store.create_artifact(kind, state, schema, title);
        if self.config.auto_link_on_create {
            let edges = self.affinity_edges(&id);
            let linked = self.record_edges(edges).len();
            if linked > 0 {
                tracing::debug!(artifact = %id, linked, "artifact auto-linked");
            }
        }
        self.note_reference(&id);
        id
    }

    fn affinity_edges(&self, id: &ArtifactId) -> Vec<DetectedRelationship> {
        let Readiness::Ready(all) = self.store.artifacts() else {
            return Vec::new();
        };
        let Some(new) = all.iter().find(|a| &a.id == id) else {
            return Vec::new();
        };
        self.detector.detect_type_based_relationships(new, &all)
    }

    fn record_edges(&mut self, edges: Vec<DetectedRelationship>) -> Vec<Relationship> {
        edges
            .into_iter()
            .filter_map(|edge| {
                self.store
                    .add_relationship(&edge.source_id, &edge.target_id, edge.kind)
            })
            .collect()
    }

    /// Add every artifact and edge of a built-in template
    ///
    /// # Errors
    /// Returns error if no template has that name
    pub fn load_template(&mut self, name: &str) -> Result<Vec<ArtifactId>, SystemError> {
        let template = templates::builtin(name).ok_or_else(|| SystemError::UnknownTemplate(name.to_string()))?;

        let slots: Vec<Option<ArtifactId>> = template
            .artifacts
            .into_iter()
            .map(|entry| {
                let schema = self.store.registry().resolve(&entry.kind);
                let artifact = Artifact::new(entry.kind, entry.state, schema).with_title(entry.title);
                let id = artifact.id.clone();
                self.store.add_artifact(artifact).then_some(id)
            })
            .collect();
        for (source, target, kind) in template.links {
            if let (Some(Some(source)), Some(Some(target))) = (slots.get(source), slots.get(target)) {
                self.store.add_relationship(source, target, kind);
            }
        }
        let ids: Vec<ArtifactId> = slots.into_iter().flatten().collect();
        if let Some(last) = ids.last().cloned() {
            self.note_reference(&last);
        }
        tracing::info!(template = template.name, artifacts = ids.len(), "template loaded");
        Ok(ids)
    }

    /// Classify a chat message
    ///
    /// A recognised edit command with at least one artifact in the workspace
    /// becomes [`MessageOutcome::Mutation`]; the target is the resolved
    /// reference, else the most recently referenced artifact, else the
    /// newest. Unresolved commands that name a list ("step", "task") only
    /// fall back to artifacts holding that list. Anything else is
    /// conversation, with any stated relationships recorded on the way.
    pub fn process_message(&mut self, text: &str) -> MessageOutcome {
        let Readiness::Ready(all) = self.store.artifacts() else {
            tracing::debug!("message arrived before hydration");
            return MessageOutcome::Loading;
        };
        let recent = self.recent_ids();
        let resolved = self.resolver.resolve_reference(text, &all, &recent);

        if let Some(intent) = self.parser.detect_mutation(text, &all) {
            let fits: Vec<&Artifact> = all.iter().copied().filter(|a| has_collection(a, &intent)).collect();
            let target = resolved
                .clone()
                .or_else(|| recent.iter().find(|id| fits.iter().any(|a| &a.id == *id)).cloned())
                .or_else(|| chronological(&fits).last().map(|a| a.id.clone()));
            if let Some(artifact_id) = target {
                tracing::debug!(artifact = %artifact_id, intent = %intent.summary(), "message is a mutation");
                self.note_reference(&artifact_id);
                return MessageOutcome::Mutation { artifact_id, intent };
            }
        }

        let cross_query = detect_cross_artifact_query(text, &all);
        let detected = if self.config.detect_relationships_in_messages {
            self.detector.detect_relationships(text, resolved.as_ref(), &all)
        } else {
            Vec::new()
        };

        let relationships = self.record_edges(detected);
        if let Some(id) = &resolved {
            self.note_reference(id);
        }
        MessageOutcome::Conversation {
            referenced: resolved,
            cross_query,
            relationships,
        }
    }

    /// Apply a user intent to an artifact and log it
    ///
    /// # Errors
    /// Returns error if the workspace is loading, the artifact is unknown or
    /// the intent does not apply; the artifact is untouched in every case
    pub fn execute_mutation(
        &mut self,
        id: &ArtifactId,
        intent: &MutationIntent,
        original_text: &str,
    ) -> Result<ExecutedMutation, SystemError> {
        let reason = Some(original_text.trim()).filter(|t| !t.is_empty());
        self.commit(id, intent, MutationSource::User, reason)
    }

    /// Record a model-produced rewrite of the whole state
    ///
    /// # Errors
    /// Returns error if the workspace is loading, the artifact is unknown or
    /// the state is not an object
    pub fn apply_ai_update(
        &mut self,
        id: &ArtifactId,
        state: Value,
        reason: Option<&str>,
    ) -> Result<ExecutedMutation, SystemError> {
        let intent = MutationIntent::new(MutationOperation::BulkUpdate).with_value(state);
        self.commit(id, &intent, MutationSource::Ai, reason)
    }

    /// Apply a model-produced structured intent
    ///
    /// # Errors
    /// Same as [`execute_mutation`](Self::execute_mutation)
    pub fn apply_ai_intent(
        &mut self,
        id: &ArtifactId,
        intent: &MutationIntent,
        reason: Option<&str>,
    ) -> Result<ExecutedMutation, SystemError> {
        self.commit(id, intent, MutationSource::Ai, reason)
    }

    fn commit(
        &mut self,
        id: &ArtifactId,
        intent: &MutationIntent,
        source: MutationSource,
        reason: Option<&str>,
    ) -> Result<ExecutedMutation, SystemError> {
        let artifact = self.lookup(id)?;
        let applied = apply_mutation(artifact, intent, source, reason).map_err(|e| {
            tracing::debug!(artifact = %id, error = %e, "mutation rejected");
            SystemError::from(e)
        })?;

        let mutation_id = applied.mutation.id;
        let operation = applied.mutation.operation;
        if !self.store.commit_mutation(applied.mutation, applied.new_state) {
            return Err(SystemError::NotFound(id.clone()));
        }
        let version = self.lookup(id)?.version;
        tracing::info!(artifact = %id, %operation, %source, version, "mutation applied");
        self.note_reference(id);
        Ok(ExecutedMutation {
            artifact_id: id.clone(),
            mutation_id,
            operation,
            version,
        })
    }

    fn lookup(&self, id: &ArtifactId) -> Result<&Artifact, SystemError> {
        match self.store.get_artifact(id) {
            Readiness::Loading => Err(SystemError::NotHydrated),
            Readiness::Ready(None) => Err(SystemError::NotFound(id.clone())),
            Readiness::Ready(Some(artifact)) => Ok(artifact),
        }
    }

    /// Revert the newest mutation of an artifact
    ///
    /// # Errors
    /// Returns error if the artifact is unknown or has nothing to undo
    pub fn undo(&mut self, id: &ArtifactId) -> Result<u64, SystemError> {
        self.lookup(id)?;
        if !self.store.undo_last_mutation(id) {
            return Err(SystemError::NothingToUndo(id.clone()));
        }
        self.note_reference(id);
        Ok(self.lookup(id)?.version)
    }

    /// Delete an artifact with its history and edges
    pub fn delete_artifact(&mut self, id: &ArtifactId) -> bool {
        self.recent.retain(|recent| recent != id);
        self.store.delete_artifact(id)
    }

    /// Link two artifacts explicitly
    ///
    /// # Errors
    /// Returns error for a self-link or an unknown endpoint
    pub fn create_relationship(
        &mut self,
        source: &ArtifactId,
        target: &ArtifactId,
        kind: RelationshipKind,
    ) -> Result<Relationship, SystemError> {
        if source == target {
            return Err(SystemError::SelfLink(source.clone()));
        }
        self.lookup(source)?;
        self.lookup(target)?;
        self.store
            .add_relationship(source, target, kind)
            .ok_or_else(|| SystemError::NotFound(target.clone()))
    }

    /// Grounding text covering the whole workspace
    #[must_use]
    pub fn context_string(&self) -> Readiness<String> {
        self.store
            .artifacts()
            .map(|all| workspace_context(&all, self.store.relationships()))
    }

    /// Grounding text for one message
    ///
    /// A multi-artifact question gets the cross-artifact bundle, a message
    /// pointing at one artifact gets that artifact and its neighbours, and
    /// anything else gets the whole workspace.
    #[must_use]
    pub fn referenced_context(&self, text: &str) -> Readiness<String> {
        let Readiness::Ready(all) = self.store.artifacts() else {
            return Readiness::Loading;
        };
        if let Some(query) = detect_cross_artifact_query(text, &all) {
            return Readiness::Ready(build_cross_artifact_context(&query, &all));
        }
        let recent = self.recent_ids();
        let focus = self
            .resolver
            .resolve_reference(text, &all, &recent)
            .and_then(|id| all.iter().find(|a| a.id == id).copied());
        Readiness::Ready(match focus {
            Some(focus) => focused_context(focus, &self.store.get_related(&focus.id), self.store.relationships()),
            None => workspace_context(&all, self.store.relationships()),
        })
    }

    fn note_reference(&mut self, id: &ArtifactId) {
        self.recent.retain(|recent| recent != id);
        self.recent.push_front(id.clone());
        self.recent.truncate(self.config.recent_reference_limit);
    }
}
