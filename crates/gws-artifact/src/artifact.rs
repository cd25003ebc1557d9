//! The artifact record
//!
//! An [`Artifact`] is one versioned unit of generated workspace state. The
//! `state` tree is owned by the store; the attached schema is a live handle
//! that is never serialized.

use crate::id::ArtifactId;
use crate::kind::ArtifactKind;
use crate::schema::{self, ArtifactSchema, SchemaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Versioned, typed unit of workspace state
///
/// # Invariants
/// - `id` is immutable after creation
/// - `version` starts at 1 and moves up by exactly 1 per state change
/// - `created_at` never changes; `updated_at` advances with each change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,

    #[serde(rename = "type")]
    pub kind: ArtifactKind,

    pub state: Value,

    /// Live validation rule; re-derived from the kind tag on load
    #[serde(skip, default = "schema::unattached")]
    pub schema: Arc<dyn ArtifactSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub version: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ArtifactId>,

    /// Forward-edge cache of relationship targets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_ids: Vec<ArtifactId>,
}

impl Artifact {
    /// Create a version-1 artifact with a fresh id
    ///
    /// The state is normalized through the schema first; normalization and
    /// validation problems are logged, not returned.
    #[must_use]
    pub fn new(kind: ArtifactKind, state: Value, schema: Arc<dyn ArtifactSchema>) -> Self {
        Self::with_id(ArtifactId::generate(), kind, state, schema)
    }

    /// Create a version-1 artifact with a caller-chosen id
    #[must_use]
    pub fn with_id(
        id: ArtifactId,
        kind: ArtifactKind,
        state: Value,
        schema: Arc<dyn ArtifactSchema>,
    ) -> Self {
        let now = Utc::now();
        let state = conform(&id, schema.as_ref(), state);
        Self {
            id,
            kind,
            state,
            schema,
            title: None,
            description: None,
            tags: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            parent_id: None,
            related_ids: Vec::new(),
        }
    }

    /// Set display title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Display name: explicit title, else `state.title`, else the kind label
    #[must_use]
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| {
                self.state
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.kind.label())
    }

    /// Validate current state against the attached schema
    ///
    /// # Errors
    /// Returns the schema violations (advisory)
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.schema.validate(&self.state)
    }

    /// Replace state, bumping version and `updated_at`
    pub fn replace_state(&mut self, state: Value) {
        self.state = state;
        self.touch();
    }

    /// Record a state change: version + 1, `updated_at` = now
    pub fn touch(&mut self) {
        self.version += 1;
        let now = Utc::now();
        // Keep updated_at monotone even if the wall clock steps back.
        self.updated_at = now.max(self.updated_at);
    }

    /// Attach a live schema (used after deserialization)
    pub fn attach_schema(&mut self, schema: Arc<dyn ArtifactSchema>) {
        self.schema = schema;
    }
}

/// Normalize through the schema, logging what changed and what still fails
pub fn conform(id: &ArtifactId, schema: &dyn ArtifactSchema, state: Value) -> Value {
    let normalized = schema.normalize(state);
    for warning in &normalized.warnings {
        tracing::debug!(artifact = %id, %warning, "state normalized");
    }
    if let Err(e) = schema.validate(&normalized.state) {
        tracing::warn!(artifact = %id, error = %e, "artifact state does not match schema");
    }
    normalized.state
}
