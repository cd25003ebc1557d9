//! Kind tag → schema lookup
//!
//! Provides [`SchemaRegistry`], the static table rehydration uses to reattach
//! live validation rules to artifacts loaded from storage.

use super::{ArtifactSchema, KindSchema, PermissiveSchema};
use crate::kind::ArtifactKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of schemas keyed by kind tag
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<dyn ArtifactSchema>>,
}

impl SchemaRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Create registry with the built-in kinds
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in ArtifactKind::BUILTIN {
            if let Some(schema) = KindSchema::builtin(&kind) {
                registry.register(Arc::new(schema));
            }
        }
        registry
    }

    /// Register (or replace) the schema for its kind
    pub fn register(&mut self, schema: Arc<dyn ArtifactSchema>) {
        self.schemas.insert(schema.kind().as_str().to_string(), schema);
    }

    /// Check if a kind has a registered schema
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: &ArtifactKind) -> bool {
        self.schemas.contains_key(kind.as_str())
    }

    /// Exact lookup
    #[inline]
    #[must_use]
    pub fn get(&self, kind: &ArtifactKind) -> Option<Arc<dyn ArtifactSchema>> {
        self.schemas.get(kind.as_str()).cloned()
    }

    /// Lookup with the accept-anything fallback
    ///
    /// Unknown kinds get a [`PermissiveSchema`] and a logged warning; the
    /// artifact is kept rather than dropped.
    #[must_use]
    pub fn resolve(&self, kind: &ArtifactKind) -> Arc<dyn ArtifactSchema> {
        self.get(kind).unwrap_or_else(|| {
            tracing::warn!(kind = %kind, "no schema registered for artifact kind, using permissive placeholder");
            Arc::new(PermissiveSchema::new(kind.clone()))
        })
    }

    /// Registered kind tags
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Get number of registered schemas
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
