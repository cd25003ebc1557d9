//! GWS Core
//!
//! The workspace facade consumed by the chat and rendering layers.
//!
//! # Core Concepts
//!
//! - [`ArtifactSystem`]: Owns the store and routes chat messages
//! - [`MessageOutcome`]: Local mutation, conversation, or "still loading"
//! - [`SystemConfig`]: Storage key, hydration timeout and linking switches
//! - [`SystemError`]: Why a facade operation was refused
//! - Templates: Named starter sets of linked artifacts
//!
//! A message that parses as an edit command is applied locally and never
//! reaches the model. Everything else gets grounding text from
//! [`ArtifactSystem::referenced_context`].
//!
//! # Example
//!
//! ```rust
//! use gws_artifact::ArtifactKind;
//! use gws_core::{ArtifactSystem, MessageOutcome, SystemConfig};
//! use serde_json::json;
//!
//! let mut system = ArtifactSystem::new(SystemConfig::new());
//! let plan = system.create_artifact(
//!     ArtifactKind::ExecutionPlan,
//!     json!({"title": "Launch", "steps": ["Design", "Build", "Ship"]}),
//!     None,
//! );
//!
//! if let MessageOutcome::Mutation { artifact_id, intent } = system.process_message("remove step 2") {
//!     let done = system.execute_mutation(&artifact_id, &intent, "remove step 2").unwrap();
//!     assert_eq!(done.artifact_id, plan);
//!     assert_eq!(done.version, 2);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod context;
mod error;
mod system;
mod templates;

// Re-exports
pub use config::SystemConfig;
pub use context::{focused_context, workspace_context, EMPTY_WORKSPACE};
pub use error::SystemError;
pub use system::{ArtifactSystem, ExecutedMutation, MessageOutcome};
pub use templates::{builtin as builtin_template, Template, TemplateArtifact, TEMPLATE_NAMES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
