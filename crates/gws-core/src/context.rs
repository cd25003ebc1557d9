//! Grounding text injected before model requests

use gws_artifact::{Artifact, Relationship};
use gws_relate::{chronological, write_artifact_section};
use std::fmt::Write as _;

/// Text shown when the workspace holds nothing
pub const EMPTY_WORKSPACE: &str = "The workspace has no artifacts yet.";

/// Every artifact, oldest first, followed by the relationship list
#[must_use]
pub fn workspace_context(artifacts: &[&Artifact], relationships: &[Relationship]) -> String {
    if artifacts.is_empty() {
        return EMPTY_WORKSPACE.to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Current workspace artifacts ({}):\n", artifacts.len());
    for artifact in chronological(artifacts) {
        write_artifact_section(&mut out, artifact);
    }
    write_relationships(&mut out, relationships);
    let _ = writeln!(
        out,
        "Treat these states as ground truth. Refer to artifacts by id and do not contradict them."
    );
    out
}

/// One focused artifact plus the artifacts it is related to
#[must_use]
pub fn focused_context(focus: &Artifact, related: &[&Artifact], relationships: &[Relationship]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Referenced artifact:\n");
    write_artifact_section(&mut out, focus);
    if !related.is_empty() {
        let _ = writeln!(out, "Related artifacts:\n");
        for artifact in related {
            write_artifact_section(&mut out, artifact);
        }
    }
    let touching: Vec<Relationship> = relationships
        .iter()
        .filter(|r| r.touches(&focus.id))
        .cloned()
        .collect();
    write_relationships(&mut out, &touching);
    let _ = writeln!(
        out,
        "Answer about {} using these states as ground truth.",
        focus.id.tag()
    );
    out
}

fn write_relationships(out: &mut String, relationships: &[Relationship]) {
    if relationships.is_empty() {
        return;
    }
    let _ = writeln!(out, "Relationships:");
    for edge in relationships {
        let arrow = if edge.bidirectional { "<->" } else { "->" };
        let _ = writeln!(
            out,
            "- {} {arrow} {} ({})",
            edge.source_id.tag(),
            edge.target_id.tag(),
            edge.kind
        );
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use gws_artifact::{ArtifactKind, RelationshipKind, SchemaRegistry};
    use serde_json::json;

    fn make(kind: ArtifactKind, title: &str) -> Artifact {
        let registry = SchemaRegistry::with_defaults();
        let schema = registry.resolve(&kind);
        Artifact::new(kind, json!({"title": title}), schema)
    }

    #[test]
    fn empty_workspace_says_so() {
        assert_eq!(workspace_context(&[], &[]), EMPTY_WORKSPACE);
    }

    #[test]
    fn workspace_context_lists_states_and_edges() {
        let plan = make(ArtifactKind::ExecutionPlan, "Launch");
        let panel = make(ArtifactKind::SystemStatusPanel, "Prod");
        let edge = Relationship::new(plan.id.clone(), panel.id.clone(), RelationshipKind::References);
        let text = workspace_context(&[&plan, &panel], &[edge]);

        assert!(text.starts_with("Current workspace artifacts (2):"));
        assert!(text.contains(&serde_json::to_string_pretty(&plan.state).unwrap()));
        assert!(text.contains(&format!("- {} -> {} (references)", plan.id.tag(), panel.id.tag())));
    }

    #[test]
    fn focused_context_keeps_only_touching_edges() {
        let plan = make(ArtifactKind::ExecutionPlan, "Launch");
        let panel = make(ArtifactKind::SystemStatusPanel, "Prod");
        let board = make(ArtifactKind::KanbanBoard, "Sprint");
        let edges = [
            Relationship::new(plan.id.clone(), panel.id.clone(), RelationshipKind::References),
            Relationship::new(board.id.clone(), panel.id.clone(), RelationshipKind::SimilarTo),
        ];
        let text = focused_context(&plan, &[&panel], &edges);
        assert!(text.contains(&plan.id.tag()));
        assert!(text.contains("Related artifacts:"));
        assert!(!text.contains(&board.id.tag()));
    }
}
