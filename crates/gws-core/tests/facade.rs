//! Facade behaviour: message routing, mutations, undo, linking

use gws_artifact::{ArtifactId, ArtifactKind, MutationOperation, RelationshipKind};
use gws_core::{ArtifactSystem, MessageOutcome, SystemConfig, SystemError};
use gws_intent::{ItemIndex, MutationError, MutationIntent};
use gws_relate::QueryKind;
use gws_test_utils::{plan_state, plan_with_statuses, sample_state};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

fn system() -> ArtifactSystem {
    ArtifactSystem::new(SystemConfig::new())
}

fn state_of(system: &ArtifactSystem, id: &ArtifactId) -> Value {
    system.get_artifact(id).flatten().unwrap().state.clone()
}

fn titles(state: &Value, field: &str) -> Vec<String> {
    state[field]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Route a message and run it if it is a mutation
fn run(system: &mut ArtifactSystem, text: &str) -> Result<ArtifactId, SystemError> {
    match system.process_message(text) {
        MessageOutcome::Mutation { artifact_id, intent } => {
            system.execute_mutation(&artifact_id, &intent, text)?;
            Ok(artifact_id)
        }
        other => panic!("{text:?} was not routed as a mutation: {other:?}"),
    }
}

#[test]
fn remove_step_two_scenario() {
    let mut system = system();
    let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["Design", "Build", "Ship"]), None);

    assert_eq!(run(&mut system, "remove step 2").unwrap(), plan);

    let artifact = system.get_artifact(&plan).flatten().unwrap();
    assert_eq!(titles(&artifact.state, "steps"), vec!["Design", "Ship"]);
    assert_eq!(artifact.version, 2);

    let log = system.store().get_mutations(&plan);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation, MutationOperation::RemoveItem);
    assert_eq!(log[0].previous_value.as_ref().unwrap()["title"], json!("Build"));
}

#[test]
fn explicit_id_beats_recency_and_last_falls_back_to_newest() {
    let mut system = system();
    let a = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["A1", "A2", "A3"]), None);
    let _b = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["B1", "B2", "B3"]), None);
    let c = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["C1", "C2", "C3"]), None);

    match system.process_message("remove the last step") {
        MessageOutcome::Mutation { artifact_id, intent } => {
            assert_eq!(artifact_id, c);
            assert_eq!(intent.index(), Some(ItemIndex::Last));
        }
        other => panic!("unexpected {other:?}"),
    }

    match system.process_message(&format!("remove item 2 from {}", a.tag())) {
        MessageOutcome::Mutation { artifact_id, intent } => {
            assert_eq!(artifact_id, a);
            assert_eq!(intent.index(), Some(ItemIndex::At(1)));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(system.recent_ids()[0], a);
}

#[test]
fn last_step_targets_the_newest_even_after_another_is_referenced() {
    let mut system = system();
    let a = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["A1", "A2", "A3"]), None);
    let _b = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["B1", "B2", "B3"]), None);
    let c = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["C1", "C2", "C3"]), None);

    assert_eq!(run(&mut system, &format!("remove item 2 from {}", a.tag())).unwrap(), a);
    assert_eq!(system.recent_ids()[0], a);

    assert_eq!(run(&mut system, "remove the last step").unwrap(), c);
    assert_eq!(titles(&state_of(&system, &c), "steps"), vec!["C1", "C2"]);
    assert_eq!(titles(&state_of(&system, &a), "steps"), vec!["A1", "A3"]);
}

#[test]
fn item_edit_skips_artifacts_without_the_named_list() {
    let mut system = system();
    let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["Design", "Build"]), None);
    let panel = system.create_artifact(
        ArtifactKind::SystemStatusPanel,
        sample_state(&ArtifactKind::SystemStatusPanel),
        None,
    );
    let before = state_of(&system, &panel);

    assert_eq!(run(&mut system, "set the status of step 2 to done").unwrap(), plan);
    assert_eq!(state_of(&system, &plan)["steps"][1]["status"], json!("complete"));
    assert_eq!(state_of(&system, &panel), before);

    // An explicit target without that list is refused, not rerouted
    let text = format!("In {}, set the status of step 1 to done", panel.tag());
    let err = run(&mut system, &text).unwrap_err();
    assert!(matches!(err, SystemError::Mutation(MutationError::MissingCollection(_))));
    assert_eq!(state_of(&system, &panel), before);
}

#[test]
fn last_is_computed_against_the_current_array() {
    let mut system = system();
    let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["Design", "Build", "Ship"]), None);

    run(&mut system, "remove the last step").unwrap();
    run(&mut system, "remove the last step").unwrap();
    assert_eq!(titles(&state_of(&system, &plan), "steps"), vec!["Design"]);
}

#[test]
fn undo_restores_the_mutated_path_only() {
    let mut system = system();
    let panel = system.create_artifact(
        ArtifactKind::SystemStatusPanel,
        sample_state(&ArtifactKind::SystemStatusPanel),
        None,
    );
    let before = state_of(&system, &panel);

    run(&mut system, "remove metric 1").unwrap();
    assert_eq!(state_of(&system, &panel)["metrics"].as_array().unwrap().len(), 1);
    assert_eq!(state_of(&system, &panel)["overallStatus"], before["overallStatus"]);

    let version = system.undo(&panel).unwrap();
    assert_eq!(version, 3);
    assert_eq!(state_of(&system, &panel), before);
    assert!(system.store().get_mutations(&panel).is_empty());
}

#[test]
fn remove_completed_takes_both_in_one_mutation() {
    let mut system = system();
    let plan = system.create_artifact(
        ArtifactKind::ExecutionPlan,
        plan_with_statuses(&[("Design", "complete"), ("Build", "pending"), ("Ship", "complete")]),
        None,
    );

    run(&mut system, "remove completed").unwrap();
    assert_eq!(titles(&state_of(&system, &plan), "steps"), vec!["Build"]);

    let log = system.store().get_mutations(&plan);
    assert_eq!(log.len(), 1);
    let removed = log[0].previous_value.as_ref().unwrap().as_array().unwrap().clone();
    assert_eq!(removed.len(), 2);
    assert_eq!(removed[0]["title"], json!("Design"));
    assert_eq!(removed[1]["title"], json!("Ship"));

    system.undo(&plan).unwrap();
    assert_eq!(titles(&state_of(&system, &plan), "steps"), vec!["Design", "Build", "Ship"]);
}

#[test]
fn out_of_range_index_is_rejected_without_side_effects() {
    let mut system = system();
    let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["Design"]), None);

    let err = run(&mut system, "remove step 5").unwrap_err();
    assert!(matches!(err, SystemError::Mutation(_)));
    assert_eq!(system.get_artifact(&plan).flatten().unwrap().version, 1);
    assert!(system.store().get_mutations(&plan).is_empty());
}

#[test]
fn new_plan_links_to_existing_status_panel() {
    let mut system = system();
    let panel = system.create_artifact(
        ArtifactKind::SystemStatusPanel,
        sample_state(&ArtifactKind::SystemStatusPanel),
        None,
    );
    let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["Investigate"]), None);

    let edges = system.store().relationships_of(&plan);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_id, plan);
    assert_eq!(edges[0].target_id, panel);
    assert_eq!(edges[0].kind, RelationshipKind::References);
}

#[test]
fn auto_link_can_be_switched_off() {
    let mut system = ArtifactSystem::new(SystemConfig::new().with_auto_link(false));
    system.create_artifact(
        ArtifactKind::SystemStatusPanel,
        sample_state(&ArtifactKind::SystemStatusPanel),
        None,
    );
    system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["Investigate"]), None);
    assert!(system.store().relationships().is_empty());
}

#[test]
fn conversation_records_stated_relationships() {
    let mut system = ArtifactSystem::new(SystemConfig::new().with_auto_link(false));
    let panel = system.create_artifact(
        ArtifactKind::SystemStatusPanel,
        sample_state(&ArtifactKind::SystemStatusPanel),
        None,
    );
    let analysis = system.create_artifact(
        ArtifactKind::CommandResultPanel,
        sample_state(&ArtifactKind::CommandResultPanel),
        None,
    );

    let text = format!("{} contradicts {}", analysis.tag(), panel.tag());
    match system.process_message(&text) {
        MessageOutcome::Conversation { referenced, relationships, .. } => {
            assert_eq!(referenced, Some(analysis.clone()));
            assert_eq!(relationships.len(), 1);
            assert_eq!(relationships[0].source_id, analysis);
            assert_eq!(relationships[0].target_id, panel);
            assert_eq!(relationships[0].kind, RelationshipKind::ConflictsWith);
            assert!(relationships[0].bidirectional);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(system.store().relationships().len(), 1);
}

#[test]
fn comparison_question_gets_cross_artifact_context() {
    let mut system = system();
    let first = system.create_artifact(ArtifactKind::DecisionMatrix, sample_state(&ArtifactKind::DecisionMatrix), None);
    let second = system.create_artifact(
        ArtifactKind::DecisionMatrix,
        json!({"title": "Queue choice", "options": [{"name": "Kafka"}], "criteria": []}),
        None,
    );

    let text = format!("compare {} and {}", first.tag(), second.tag());
    match system.process_message(&text) {
        MessageOutcome::Conversation { cross_query: Some(query), .. } => {
            assert_eq!(query.kind, QueryKind::Comparison);
            assert_eq!(query.artifact_ids, vec![first.clone(), second.clone()]);
        }
        other => panic!("unexpected {other:?}"),
    }

    let context = system.referenced_context(&text).ready().unwrap();
    for id in [&first, &second] {
        let state = state_of(&system, id);
        assert!(context.contains(&serde_json::to_string_pretty(&state).unwrap()));
    }
}

#[test]
fn delete_cascades_to_edges_and_history() {
    let mut system = system();
    let panel = system.create_artifact(
        ArtifactKind::SystemStatusPanel,
        sample_state(&ArtifactKind::SystemStatusPanel),
        None,
    );
    let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["A", "B"]), None);
    run(&mut system, "remove step 1").unwrap();

    assert!(system.delete_artifact(&plan));
    assert!(system.store().relationships().is_empty());
    assert!(system.store().get_mutations(&plan).is_empty());
    assert!(system.get_artifact(&panel).flatten().unwrap().related_ids.is_empty());
    assert!(!system.delete_artifact(&plan));
}

#[test]
fn explicit_links_validate_endpoints() {
    let mut system = ArtifactSystem::new(SystemConfig::new().with_auto_link(false));
    let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["A"]), None);
    let board = system.create_artifact(ArtifactKind::KanbanBoard, sample_state(&ArtifactKind::KanbanBoard), None);

    let edge = system.create_relationship(&board, &plan, RelationshipKind::DerivedFrom).unwrap();
    assert!(!edge.bidirectional);
    let again = system.create_relationship(&board, &plan, RelationshipKind::DerivedFrom).unwrap();
    assert_eq!(again.id, edge.id);

    let ghost = ArtifactId::new("0badf00d");
    assert!(matches!(
        system.create_relationship(&plan, &ghost, RelationshipKind::References),
        Err(SystemError::NotFound(_))
    ));
}

#[test]
fn templates_load_linked_artifacts() {
    let mut system = system();
    let ids = system.load_template("product-launch").unwrap();
    assert_eq!(ids.len(), 3);

    let board = system.get_artifact(&ids[1]).flatten().unwrap();
    assert_eq!(board.kind, ArtifactKind::KanbanBoard);
    assert_eq!(board.title.as_deref(), Some("Launch board"));
    assert_eq!(board.related_ids, vec![ids[0].clone()]);

    // The template's newest artifact is the default mutation target
    run(&mut system, "remove option 3").unwrap();
    assert_eq!(system.get_artifact(&ids[2]).flatten().unwrap().version, 2);
}

#[test]
fn empty_workspace_context() {
    let system = system();
    assert_eq!(system.context_string().ready().unwrap(), gws_core::EMPTY_WORKSPACE);
}

proptest! {
    #[test]
    fn versions_count_mutations_and_undos(edits in 0usize..8, undos in 0usize..4) {
        let mut system = system();
        let plan = system.create_artifact(ArtifactKind::ExecutionPlan, plan_state(&["Design"]), None);

        for i in 0..edits {
            let intent = MutationIntent::new(MutationOperation::UpdateProperty)
                .with_property("title")
                .with_value(json!(format!("Title {i}")));
            let done = system.execute_mutation(&plan, &intent, "").unwrap();
            prop_assert_eq!(done.version, 2 + i as u64);
        }

        let undos = undos.min(edits);
        for _ in 0..undos {
            system.undo(&plan).unwrap();
        }
        let artifact = system.get_artifact(&plan).flatten().unwrap();
        prop_assert_eq!(artifact.version, 1 + (edits + undos) as u64);
        prop_assert_eq!(system.store().get_mutations(&plan).len(), edits - undos);

        let expected = if edits == undos {
            json!("Launch plan")
        } else {
            json!(format!("Title {}", edits - undos - 1))
        };
        prop_assert_eq!(&artifact.state["title"], &expected);
    }
}
