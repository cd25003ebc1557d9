//! GWS Mutation Intents
//!
//! Turns short edit commands ("remove step 3", "mark the last task as done")
//! into structured intents, and applies intents to artifacts as pure,
//! invertible state changes.
//!
//! # Core Concepts
//!
//! - [`MutationIntent`]: Requested change with symbolic positions
//! - [`MutationIntentParser`]: Ordered pattern table, first match wins
//! - [`validate_mutation`] / [`apply_mutation`]: Resolve an intent against live state
//! - [`AppliedMutation`]: New state plus the [`Mutation`](gws_artifact::Mutation) record that undoes it
//!
//! # Example
//!
//! ```rust
//! use gws_artifact::{Artifact, ArtifactKind, MutationSource, SchemaRegistry};
//! use gws_intent::{apply_mutation, MutationIntentParser};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::with_defaults();
//! let kind = ArtifactKind::ExecutionPlan;
//! let plan = Artifact::new(
//!     kind.clone(),
//!     json!({"title": "Launch", "steps": ["Design", "Build", "Ship"]}),
//!     registry.resolve(&kind),
//! );
//!
//! let intent = MutationIntentParser::new().parse("remove step 2").unwrap();
//! let applied = apply_mutation(&plan, &intent, MutationSource::User, None).unwrap();
//!
//! assert_eq!(applied.new_state["steps"].as_array().unwrap().len(), 2);
//! assert_eq!(applied.mutation.previous_value.unwrap()["title"], "Build");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod applier;
mod intent;
mod ordinal;
mod parser;

// Re-exports
pub use applier::{
    apply_mutation, find_collection, has_collection, match_property, validate_mutation, AppliedMutation,
    MutationError, COLLECTION_PRIORITY,
};
pub use intent::{ItemCondition, ItemIndex, ItemTarget, MutationIntent};
pub use ordinal::{parse_ordinal, parse_position};
pub use parser::{normalize_status, MutationIntentParser};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
