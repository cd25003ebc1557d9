//! Runtime schemas for artifact state
//!
//! Artifact state is an arbitrary JSON tree whose expected shape depends on
//! the artifact's [`ArtifactKind`]. Schemas are advisory: they report
//! violations and fill defaults, they never reject data. Schemas are not
//! persisted; the [`SchemaRegistry`] re-derives them from the kind tag.

use crate::kind::ArtifactKind;
use serde_json::{json, Value};
use std::fmt::Debug;
use std::sync::Arc;

mod kinds;
mod registry;

pub use kinds::KindSchema;
pub use registry::SchemaRegistry;

/// Validation and defaulting rule for one artifact kind
///
/// # Contract
/// - `validate` never mutates and never panics on arbitrary input
/// - `normalize` returns a state whose top-level shape consumers can rely
///   on, reporting every substitution it made as a warning
pub trait ArtifactSchema: Send + Sync + Debug {
    /// Kind this schema governs
    fn kind(&self) -> ArtifactKind;

    /// Check state against the schema
    ///
    /// # Errors
    /// Returns every violation found
    fn validate(&self, state: &Value) -> Result<(), SchemaError>;

    /// Fill defaults and coerce loose input into the expected shape
    fn normalize(&self, state: Value) -> Normalized;

    /// Primary collection field, created on demand by `add_item`
    fn list_field(&self) -> Option<&str> {
        None
    }

    /// Build a new collection item from a free-text label
    fn new_item(&self, label: &str) -> Value {
        json!({ "title": label })
    }

    /// True for the accept-anything placeholder
    fn is_permissive(&self) -> bool {
        false
    }
}

/// Result of [`ArtifactSchema::normalize`]
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// State with defaults applied
    pub state: Value,
    /// Human-readable notes on what was substituted
    pub warnings: Vec<String>,
}

impl Normalized {
    /// Unchanged state, no warnings
    #[inline]
    #[must_use]
    pub fn unchanged(state: Value) -> Self {
        Self {
            state,
            warnings: Vec::new(),
        }
    }
}

/// Accept-anything schema for kinds the registry does not know
#[derive(Debug, Clone)]
pub struct PermissiveSchema {
    kind: ArtifactKind,
}

impl PermissiveSchema {
    /// Create placeholder for the given kind
    #[inline]
    #[must_use]
    pub fn new(kind: ArtifactKind) -> Self {
        Self { kind }
    }
}

impl ArtifactSchema for PermissiveSchema {
    fn kind(&self) -> ArtifactKind {
        self.kind.clone()
    }

    fn validate(&self, _state: &Value) -> Result<(), SchemaError> {
        Ok(())
    }

    fn normalize(&self, state: Value) -> Normalized {
        Normalized::unchanged(state)
    }

    fn is_permissive(&self) -> bool {
        true
    }
}

/// Default schema handle for freshly deserialized artifacts
///
/// Rehydration replaces it with the registry's schema for the artifact kind.
#[must_use]
pub fn unattached() -> Arc<dyn ArtifactSchema> {
    Arc::new(PermissiveSchema::new(ArtifactKind::Other("unattached".to_string())))
}

/// Schema violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// State is not a JSON object
    #[error("{kind} state must be an object")]
    NotAnObject { kind: ArtifactKind },

    /// One or more rule violations
    #[error("{kind} state has {} violation(s): {}", violations.len(), violations.join("; "))]
    Invalid {
        kind: ArtifactKind,
        violations: Vec<String>,
    },
}
