//! Resolution and detection against a populated store

use gws_artifact::{Artifact, ArtifactKind, RelationshipKind};
use gws_relate::{
    build_cross_artifact_context, detect_cross_artifact_query, QueryKind, ReferenceResolver, RelationshipDetector,
    Strategy,
};
use gws_test_utils::store_with;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const KINDS: [ArtifactKind; 3] = [
    ArtifactKind::ExecutionPlan,
    ArtifactKind::KanbanBoard,
    ArtifactKind::ExecutionPlan,
];

#[test]
fn explicit_id_beats_recency() {
    let (store, ids) = store_with(&KINDS);
    let all = store.artifacts().ready().unwrap();
    let resolver = ReferenceResolver::new();

    let text = format!("remove item 2 from {}", ids[0].tag());
    let resolved = resolver.resolve(&text, &all, &[]).unwrap();
    assert_eq!(resolved.id, ids[0]);
    assert_eq!(resolved.strategy, Strategy::ExplicitId);

    let text = format!("remove the latest step from artifact {}", ids[1]);
    assert_eq!(resolver.resolve_reference(&text, &all, &[]), Some(ids[1].clone()));
}

#[test]
fn kind_keyword_ignores_newer_artifacts_of_other_kinds() {
    let (store, ids) = store_with(&[ArtifactKind::ExecutionPlan, ArtifactKind::KanbanBoard]);
    let all = store.artifacts().ready().unwrap();
    let resolved = ReferenceResolver::new()
        .resolve("add a step called QA to the plan", &all, &[])
        .unwrap();
    assert_eq!(resolved.id, ids[0]);
    assert_eq!(resolved.strategy, Strategy::KindKeyword);
}

#[test]
fn pronoun_follows_recent_references() {
    let (store, ids) = store_with(&KINDS);
    let all = store.artifacts().ready().unwrap();
    let resolver = ReferenceResolver::new();
    assert_eq!(resolver.resolve_reference("rename it to Beta", &all, &[ids[1].clone()]), Some(ids[1].clone()));
    assert_eq!(resolver.resolve_reference("rename it to Beta", &all, &[]), Some(ids[2].clone()));
}

#[test]
fn titles_link_artifacts_in_message() {
    let (store, ids) = store_with(&[ArtifactKind::SystemStatusPanel, ArtifactKind::CommandResultPanel]);
    let all = store.artifacts().ready().unwrap();

    // Sample titles are "Production" and "Latency analysis"
    let edges = RelationshipDetector::new().detect_relationships(
        "the latency analysis contradicts production",
        None,
        &all,
    );
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_id, ids[1]);
    assert_eq!(edges[0].target_id, ids[0]);
    assert_eq!(edges[0].kind, RelationshipKind::ConflictsWith);
}

#[test]
fn cross_query_context_for_store_artifacts() {
    let (store, ids) = store_with(&KINDS);
    let all: Vec<&Artifact> = store.artifacts().ready().unwrap();
    let query = detect_cross_artifact_query("merge the two plans", &all).unwrap();
    assert_eq!(query.kind, QueryKind::Merge);

    let blob = build_cross_artifact_context(&query, &all);
    for id in &query.artifact_ids {
        let state = &store.get_artifact(id).flatten().unwrap().state;
        assert!(blob.contains(&serde_json::to_string_pretty(state).unwrap()));
    }
    assert_eq!(query.artifact_ids, vec![ids[0].clone(), ids[2].clone()]);
    assert_eq!(query.expected_output, Some(ArtifactKind::ExecutionPlan));
}

proptest! {
    #[test]
    fn ordinals_follow_creation_order(count in 1usize..6, pick in 0usize..5) {
        let kinds = vec![ArtifactKind::ExecutionPlan; count];
        let (store, ids) = store_with(&kinds);
        let all = store.artifacts().ready().unwrap();
        let words = ["first", "second", "third", "fourth", "fifth"];

        let text = format!("open the {} plan", words[pick]);
        let resolved = ReferenceResolver::new().resolve_reference(&text, &all, &[]);
        if pick < count {
            prop_assert_eq!(resolved, Some(ids[pick].clone()));
        } else {
            // Out-of-range ordinal falls through to the kind keyword
            prop_assert_eq!(resolved, Some(ids[count - 1].clone()));
        }
    }
}
