//! GWS Relate
//!
//! Works out which artifacts a message is about and how artifacts relate to
//! each other.
//!
//! # Core Concepts
//!
//! - [`ReferenceResolver`]: "#1a2b3c4d", "the second plan", "that" → an artifact id
//! - [`RelationshipDetector`]: Edges implied by a message or by artifact kinds
//! - [`CrossArtifactQuery`]: A question that needs several artifacts at once
//! - [`build_cross_artifact_context`]: Verbatim states plus provenance rules for the model
//!
//! # Example
//!
//! ```rust
//! use gws_artifact::{Artifact, ArtifactKind, SchemaRegistry};
//! use gws_relate::ReferenceResolver;
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::with_defaults();
//! let kind = ArtifactKind::ExecutionPlan;
//! let plan = Artifact::new(kind.clone(), json!({"title": "Launch"}), registry.resolve(&kind));
//!
//! let text = format!("remove step 1 from {}", plan.id.tag());
//! let id = ReferenceResolver::new().resolve_reference(&text, &[&plan], &[]);
//! assert_eq!(id, Some(plan.id.clone()));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod detector;
mod keywords;
mod query;
mod resolver;

// Re-exports
pub use detector::{
    affinity, find_mentions, infer_kind, DetectedRelationship, Mention, MentionKind, RelationshipDetector,
};
pub use keywords::kind_for_keyword;
pub use query::{
    build_cross_artifact_context, detect_cross_artifact_query, write_artifact_section, CrossArtifactQuery, QueryKind,
};
pub use resolver::{chronological, ReferenceResolver, Resolution, Strategy};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use gws_artifact::{Artifact, ArtifactKind, SchemaRegistry};
    use serde_json::json;

    #[test]
    fn resolve_then_relate() {
        let registry = SchemaRegistry::with_defaults();
        let plan_kind = ArtifactKind::ExecutionPlan;
        let panel_kind = ArtifactKind::SystemStatusPanel;
        let plan = Artifact::new(plan_kind.clone(), json!({"title": "Launch"}), registry.resolve(&plan_kind));
        let panel = Artifact::new(panel_kind.clone(), json!({"title": "Prod"}), registry.resolve(&panel_kind));
        let all = [&plan, &panel];

        let source = ReferenceResolver::new()
            .resolve_reference("the plan requires the dashboard", &all, &[])
            .unwrap();
        assert_eq!(source, plan.id);

        let edges = RelationshipDetector::new().detect_relationships(
            "the plan requires the dashboard",
            Some(&source),
            &all,
        );
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_id, panel.id);
        assert_eq!(edges[0].kind, gws_artifact::RelationshipKind::DependsOn);
    }
}
