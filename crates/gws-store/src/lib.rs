//! GWS Artifact Store
//!
//! Authoritative artifact map, mutation log and relationship graph, with
//! durable persistence and schema-aware rehydration.
//!
//! # Core Concepts
//!
//! - [`ArtifactStore`]: Owns artifacts, mutations and relationships for a session
//! - [`StorageBackend`]: Key → document storage ([`MemoryStorage`], [`FileStorage`])
//! - [`Readiness`]: Reads before hydration report `Loading`, never "empty"
//! - [`HydrationOutcome`]: What a rehydration pass found
//!
//! # Example
//!
//! ```rust
//! use gws_artifact::{ArtifactKind, SchemaRegistry};
//! use gws_store::ArtifactStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SchemaRegistry::with_defaults());
//! let mut store = ArtifactStore::new(registry.clone());
//!
//! let kind = ArtifactKind::ExecutionPlan;
//! let id = store.create_artifact(
//!     kind.clone(),
//!     json!({"title": "Launch", "steps": ["Design"]}),
//!     registry.resolve(&kind),
//!     None,
//! );
//!
//! assert!(store.update_artifact(&id, json!({"title": "Relaunch", "steps": []})));
//! let artifact = store.get_artifact(&id).flatten().unwrap();
//! assert_eq!(artifact.version, 2);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod backend;
mod document;
mod error;
mod readiness;
mod store;
mod undo;

// Re-exports
pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use document::{decode, encode, PersistedState, DOCUMENT_VERSION};
pub use error::StorageError;
pub use readiness::{HydrationOutcome, Readiness};
pub use store::{ArtifactStore, DEFAULT_STORAGE_KEY};
pub use undo::UndoError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
