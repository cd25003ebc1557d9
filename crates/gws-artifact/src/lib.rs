//! GWS Artifact System
//!
//! Typed, versioned workspace artifacts and the records that describe how
//! they change.
//!
//! # Core Concepts
//!
//! - [`Artifact`]: Versioned unit of generated state with a kind tag
//! - [`ArtifactKind`]: Closed set of known kinds plus a passthrough variant
//! - [`ArtifactSchema`]: Advisory validation/defaulting rule for a kind
//! - [`SchemaRegistry`]: Kind tag → schema lookup used on rehydration
//! - [`StatePath`]: Addressing within an artifact's state tree
//! - [`Mutation`]: Immutable, invertible record of one state change
//! - [`Relationship`]: Directed, typed edge between two artifacts
//!
//! # Example
//!
//! ```rust
//! use gws_artifact::{Artifact, ArtifactKind, SchemaRegistry};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::with_defaults();
//! let kind = ArtifactKind::ExecutionPlan;
//! let artifact = Artifact::new(
//!     kind.clone(),
//!     json!({"title": "Launch", "steps": ["Design", "Build", "Ship"]}),
//!     registry.resolve(&kind),
//! );
//!
//! assert_eq!(artifact.version, 1);
//! assert_eq!(artifact.state["steps"][1]["title"], "Build");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod id;
mod kind;
mod mutation;
mod path;
mod relationship;

/// Schema trait, built-in kinds and registry
pub mod schema;

// Re-exports
pub use artifact::{conform, Artifact};
pub use id::{ArtifactId, MutationId, RelationshipId, ARTIFACT_ID_LEN};
pub use kind::ArtifactKind;
pub use mutation::{Mutation, MutationOperation, MutationSource};
pub use path::{PathError, PathSegment, StatePath};
pub use relationship::{Relationship, RelationshipKind};
pub use schema::{ArtifactSchema, KindSchema, Normalized, PermissiveSchema, SchemaError, SchemaRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
