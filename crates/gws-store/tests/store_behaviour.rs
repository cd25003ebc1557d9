//! Store contract tests: soft failures, versioning, undo, relationships

use gws_artifact::{
    ArtifactId, ArtifactKind, Mutation, MutationOperation, MutationSource, RelationshipKind,
    StatePath,
};
use gws_store::ArtifactStore;
use gws_test_utils::{artifact_with_id, plan_state, plan_with_statuses, registry, store_with};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

fn state_of(store: &ArtifactStore, id: &ArtifactId) -> Value {
    store.get_artifact(id).flatten().unwrap().state.clone()
}

fn version_of(store: &ArtifactStore, id: &ArtifactId) -> u64 {
    store.get_artifact(id).flatten().unwrap().version
}

/// Remove one element through the store the way the applier does
fn remove_step(store: &mut ArtifactStore, id: &ArtifactId, index: usize) -> bool {
    let mut state = state_of(store, id);
    let path = StatePath::key("steps").child(index);
    let removed = path.remove(&mut state).unwrap();
    let mutation = Mutation::new(id.clone(), MutationOperation::RemoveItem, path, MutationSource::User)
        .with_previous(removed);
    store.commit_mutation(mutation, state)
}

#[test]
fn unknown_ids_fail_softly() {
    let mut store = ArtifactStore::new(registry());
    let ghost = ArtifactId::new("00000000");

    assert!(store.get_artifact(&ghost).flatten().is_none());
    assert!(!store.update_artifact(&ghost, json!({})));
    assert!(!store.delete_artifact(&ghost));
    assert!(!store.undo_last_mutation(&ghost));
    assert!(store.get_mutations(&ghost).is_empty());
    assert!(store.get_related(&ghost).is_empty());
    assert!(store
        .add_relationship(&ghost, &ghost, RelationshipKind::References)
        .is_none());
    let orphan = Mutation::new(
        ghost.clone(),
        MutationOperation::UpdateProperty,
        StatePath::key("title"),
        MutationSource::User,
    );
    assert!(!store.add_mutation(orphan));
}

#[test]
fn create_assigns_unique_short_ids() {
    let (store, ids) = store_with(&[
        ArtifactKind::ExecutionPlan,
        ArtifactKind::ExecutionPlan,
        ArtifactKind::KanbanBoard,
    ]);
    assert_eq!(store.len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert!(ids.iter().all(|id| id.as_str().len() == 8));

    let order: Vec<_> = store
        .artifacts()
        .ready()
        .unwrap()
        .into_iter()
        .map(|a| a.id.clone())
        .collect();
    assert_eq!(order, ids);
}

#[test]
fn create_sets_optional_title() {
    let registry = registry();
    let mut store = ArtifactStore::new(registry.clone());
    let kind = ArtifactKind::ExecutionPlan;
    let id = store.create_artifact(kind.clone(), plan_state(&["a"]), registry.resolve(&kind), Some("Q3 roadmap"));
    let artifact = store.get_artifact(&id).flatten().unwrap();
    assert_eq!(artifact.title.as_deref(), Some("Q3 roadmap"));
    assert_eq!(artifact.version, 1);
}

#[test]
fn add_artifact_rejects_duplicate_ids() {
    let mut store = ArtifactStore::new(registry());
    let first = artifact_with_id("aaaa1111", ArtifactKind::ExecutionPlan, plan_state(&["a"]));
    let second = artifact_with_id("aaaa1111", ArtifactKind::ExecutionPlan, plan_state(&["b"]));
    assert!(store.add_artifact(first));
    assert!(!store.add_artifact(second));
    let id = ArtifactId::new("aaaa1111");
    assert_eq!(state_of(&store, &id)["steps"][0]["title"], json!("a"));
}

#[test]
fn update_replaces_state_and_bumps_version() {
    let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan]);
    let id = &ids[0];
    assert!(store.update_artifact(id, plan_state(&["Only"])));
    assert_eq!(version_of(&store, id), 2);
    assert_eq!(state_of(&store, id)["steps"].as_array().unwrap().len(), 1);
    assert_eq!(state_of(&store, id)["steps"][0]["status"], json!("pending"));
}

#[test]
fn remove_step_scenario() {
    let registry = registry();
    let mut store = ArtifactStore::new(registry.clone());
    let kind = ArtifactKind::ExecutionPlan;
    let id = store.create_artifact(kind.clone(), plan_state(&["Design", "Build", "Ship"]), registry.resolve(&kind), None);

    assert!(remove_step(&mut store, &id, 1));

    let state = state_of(&store, &id);
    let titles: Vec<_> = state["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].clone())
        .collect();
    assert_eq!(titles, vec![json!("Design"), json!("Ship")]);
    assert_eq!(version_of(&store, &id), 2);

    let log = store.get_mutations(&id);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation, MutationOperation::RemoveItem);
    assert_eq!(log[0].previous_value.as_ref().unwrap()["title"], json!("Build"));
}

#[test]
fn undo_restores_path_and_increments_version() {
    let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan]);
    let id = &ids[0];
    let before = state_of(&store, id);

    assert!(remove_step(&mut store, id, 0));
    assert!(store.undo_last_mutation(id));

    assert_eq!(state_of(&store, id), before);
    assert_eq!(version_of(&store, id), 3);
    assert!(store.get_mutations(id).is_empty());
    assert!(!store.undo_last_mutation(id));
}

#[test]
fn undo_leaves_unrelated_fields_untouched() {
    let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan]);
    let id = &ids[0];
    assert!(remove_step(&mut store, id, 2));

    // Unlogged edit to another field after the mutation
    let mut state = state_of(&store, id);
    state["title"] = json!("Renamed");
    assert!(store.update_artifact(id, state));

    assert!(store.undo_last_mutation(id));
    let state = state_of(&store, id);
    assert_eq!(state["title"], json!("Renamed"));
    assert_eq!(state["steps"][2]["title"], json!("Ship"));
}

#[test]
fn undo_pops_one_mutation_at_a_time() {
    let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan]);
    let id = &ids[0];
    assert!(remove_step(&mut store, id, 0));
    assert!(remove_step(&mut store, id, 0));
    assert_eq!(state_of(&store, id)["steps"].as_array().unwrap().len(), 1);

    assert!(store.undo_last_mutation(id));
    assert_eq!(state_of(&store, id)["steps"][0]["title"], json!("Build"));
    assert!(store.undo_last_mutation(id));
    assert_eq!(state_of(&store, id)["steps"][0]["title"], json!("Design"));
    assert_eq!(version_of(&store, id), 5);
}

#[test]
fn undo_of_conditional_removal_restores_every_item() {
    let registry = registry();
    let mut store = ArtifactStore::new(registry.clone());
    let kind = ArtifactKind::ExecutionPlan;
    let id = store.create_artifact(
        kind.clone(),
        plan_with_statuses(&[("a", "complete"), ("b", "pending"), ("c", "complete")]),
        registry.resolve(&kind),
        None,
    );
    let before = state_of(&store, &id);

    let steps = before["steps"].as_array().unwrap().clone();
    let kept = json!([steps[1].clone()]);
    let mut state = before.clone();
    state["steps"] = kept;
    let mutation = Mutation::new(id.clone(), MutationOperation::RemoveItem, StatePath::key("steps"), MutationSource::User)
        .with_value(json!({"removedIndices": [0, 2]}))
        .with_previous(json!([steps[0].clone(), steps[2].clone()]));
    assert!(store.commit_mutation(mutation, state));

    assert!(store.undo_last_mutation(&id));
    assert_eq!(state_of(&store, &id), before);
}

#[test]
fn undo_without_previous_value_is_noop() {
    let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan]);
    let id = &ids[0];
    let legacy = Mutation::new(id.clone(), MutationOperation::UpdateProperty, StatePath::key("title"), MutationSource::User)
        .with_value(json!("x"));
    assert!(store.add_mutation(legacy));

    assert!(!store.undo_last_mutation(id));
    assert_eq!(version_of(&store, id), 1);
    assert_eq!(store.get_mutations(id).len(), 1);
}

#[test]
fn relationships_update_forward_cache_and_dedupe() {
    let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan, ArtifactKind::SystemStatusPanel]);
    let (plan, panel) = (&ids[0], &ids[1]);

    let edge = store.add_relationship(plan, panel, RelationshipKind::References).unwrap();
    let again = store.add_relationship(plan, panel, RelationshipKind::References).unwrap();
    assert_eq!(edge.id, again.id);
    assert_eq!(store.relationships().len(), 1);

    let related: Vec<_> = store.get_related(plan).into_iter().map(|a| a.id.clone()).collect();
    assert_eq!(related, vec![panel.clone()]);
    assert!(store.get_related(panel).is_empty());
    assert!(store.add_relationship(plan, plan, RelationshipKind::References).is_none());
}

#[test]
fn symmetric_relationship_caches_both_ends() {
    let (mut store, ids) = store_with(&[ArtifactKind::DecisionMatrix, ArtifactKind::DecisionMatrix]);
    let edge = store
        .add_relationship(&ids[0], &ids[1], RelationshipKind::ConflictsWith)
        .unwrap();
    assert!(edge.bidirectional);
    assert_eq!(store.get_related(&ids[1]).len(), 1);
    // Reverse orientation is the same edge
    assert!(store
        .add_relationship(&ids[1], &ids[0], RelationshipKind::ConflictsWith)
        .is_some());
    assert_eq!(store.relationships().len(), 1);
}

#[test]
fn delete_cascades_history_and_edges() {
    let (mut store, ids) = store_with(&[
        ArtifactKind::ExecutionPlan,
        ArtifactKind::SystemStatusPanel,
        ArtifactKind::KanbanBoard,
    ]);
    let (plan, panel, board) = (&ids[0], &ids[1], &ids[2]);
    store.add_relationship(plan, panel, RelationshipKind::References);
    store.add_relationship(board, plan, RelationshipKind::DerivedFrom);
    assert!(remove_step(&mut store, plan, 0));

    assert!(store.delete_artifact(plan));

    assert!(store.get_artifact(plan).flatten().is_none());
    assert!(store.get_mutations(plan).is_empty());
    assert!(store.relationships().is_empty());
    assert!(store.get_related(board).is_empty());
    assert_eq!(store.len(), 2);
}

#[test]
fn clear_empties_everything() {
    let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan, ArtifactKind::SystemStatusPanel]);
    store.add_relationship(&ids[0], &ids[1], RelationshipKind::References);
    store.clear();
    assert!(store.is_empty());
    assert!(store.relationships().is_empty());
    assert!(store.artifacts().ready().unwrap().is_empty());
}

proptest! {
    #[test]
    fn version_counts_every_change(removals in 0usize..3, undos in 0usize..3, updates in 0usize..4) {
        let (mut store, ids) = store_with(&[ArtifactKind::ExecutionPlan]);
        let id = &ids[0];

        for _ in 0..removals {
            prop_assert!(remove_step(&mut store, id, 0));
        }
        let undone = undos.min(removals);
        for _ in 0..undone {
            prop_assert!(store.undo_last_mutation(id));
        }
        for n in 0..updates {
            let title = format!("v{n}");
            let updated = store.update_artifact(id, json!({"title": title, "steps": []}));
            prop_assert!(updated);
        }

        let expected = 1 + removals + undone + updates;
        prop_assert_eq!(version_of(&store, id), expected as u64);
        prop_assert_eq!(store.get_mutations(id).len(), removals - undone);
    }
}
