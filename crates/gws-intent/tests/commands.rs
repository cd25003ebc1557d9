//! Command → intent → new state, against every built-in kind

use gws_artifact::{Artifact, ArtifactKind, MutationOperation, MutationSource, StatePath};
use gws_intent::{
    apply_mutation, validate_mutation, AppliedMutation, MutationError, MutationIntent, MutationIntentParser,
};
use gws_test_utils::{artifact, artifact_with_id, plan_state, plan_with_statuses};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn run(artifact: &Artifact, command: &str) -> Result<AppliedMutation, MutationError> {
    let intent = MutationIntentParser::new()
        .detect_mutation(command, &[artifact])
        .unwrap_or_else(|| panic!("{command:?} was not recognised"));
    apply_mutation(artifact, &intent, MutationSource::User, None)
}

fn labels(applied: &AppliedMutation, field: &str, key: &str) -> Vec<String> {
    applied.new_state[field]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item[key].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn remove_step_two_from_plan() {
    let plan = artifact(ArtifactKind::ExecutionPlan);
    let applied = run(&plan, "remove step 2").unwrap();

    assert_eq!(labels(&applied, "steps", "title"), vec!["Design", "Ship"]);
    assert_eq!(applied.mutation.operation, MutationOperation::RemoveItem);
    assert_eq!(applied.mutation.path, StatePath::key("steps").child(1));
    assert_eq!(applied.mutation.previous_value.as_ref().unwrap()["title"], json!("Build"));
}

#[test]
fn set_overall_status_on_panel() {
    let panel = artifact(ArtifactKind::SystemStatusPanel);
    let applied = run(&panel, "Set overall status to Degraded").unwrap();
    assert_eq!(applied.new_state["overallStatus"], json!("degraded"));
    assert_eq!(applied.mutation.previous_value, Some(json!("healthy")));
}

#[test]
fn mark_last_task_done_on_board() {
    let board = artifact(ArtifactKind::KanbanBoard);
    let applied = run(&board, "mark the last task as done").unwrap();
    assert_eq!(applied.new_state["tasks"][1]["status"], json!("complete"));
    assert_eq!(applied.new_state["tasks"][1]["title"], json!("Fix login"));
}

#[test]
fn rename_option_uses_name_key() {
    let matrix = artifact(ArtifactKind::DecisionMatrix);
    let applied = run(&matrix, "rename option 2 to DuckDB").unwrap();
    assert_eq!(labels(&applied, "options", "name"), vec!["Postgres", "DuckDB"]);
}

#[test]
fn remove_criterion_targets_criteria_list() {
    let matrix = artifact(ArtifactKind::DecisionMatrix);
    let applied = run(&matrix, "remove criterion 1").unwrap();
    assert_eq!(applied.new_state["criteria"], json!([]));
    assert_eq!(applied.new_state["options"].as_array().unwrap().len(), 2);
}

#[test]
fn add_metric_gets_kind_defaults() {
    let panel = artifact(ArtifactKind::SystemStatusPanel);
    let applied = run(&panel, "add a metric called Memory").unwrap();
    assert_eq!(labels(&applied, "metrics", "label"), vec!["CPU", "Error rate", "Memory"]);
    assert_eq!(applied.new_state["metrics"][2]["status"], json!("unknown"));
    assert!(applied.new_state["metrics"][2]["id"].is_string());
}

#[test]
fn remove_completed_steps() {
    let plan = artifact_with_id(
        "aaaa0001",
        ArtifactKind::ExecutionPlan,
        plan_with_statuses(&[("Design", "complete"), ("Build", "in_progress"), ("Ship", "complete")]),
    );
    let applied = run(&plan, "remove completed steps").unwrap();
    assert_eq!(labels(&applied, "steps", "title"), vec!["Build"]);
    assert_eq!(applied.mutation.removed_indices(), Some(vec![0, 2]));
}

#[test]
fn swap_moves_the_first_item_into_the_second_slot() {
    let plan = artifact_with_id(
        "aaaa0002",
        ArtifactKind::ExecutionPlan,
        plan_state(&["Design", "Build", "Ship"]),
    );
    let applied = run(&plan, "swap step 1 and 3").unwrap();
    assert_eq!(labels(&applied, "steps", "title"), vec!["Build", "Ship", "Design"]);
}

#[test]
fn named_list_missing_from_the_artifact_is_rejected() {
    let panel = artifact(ArtifactKind::SystemStatusPanel);
    assert_eq!(
        run(&panel, "set the status of step 2 to done"),
        Err(MutationError::MissingCollection("steps".into()))
    );
}

#[test]
fn failures_produce_no_state() {
    let plan = artifact(ArtifactKind::ExecutionPlan);
    assert!(matches!(
        run(&plan, "remove step 9"),
        Err(MutationError::IndexOutOfRange { len: 3, .. })
    ));
    assert_eq!(
        run(&plan, "set the owner to sam"),
        Err(MutationError::UnknownProperty("owner".into()))
    );
    assert!(matches!(run(&plan, "remove completed steps"), Err(MutationError::NoMatch(_))));
}

#[test]
fn unknown_kind_with_a_list_is_editable() {
    let flow = artifact(ArtifactKind::from("Flowchart"));
    let applied = run(&flow, "remove item 1").unwrap();
    assert_eq!(applied.mutation.path, StatePath::key("nodes").child(0));
    assert_eq!(applied.new_state["nodes"], json!([]));
}

#[test]
fn intent_from_json_applies() {
    let plan = artifact(ArtifactKind::ExecutionPlan);
    let intent: MutationIntent = serde_json::from_value(json!({
        "operation": "update_item",
        "target": {"index": {"at": 0}},
        "property": "status",
        "value": "in_progress"
    }))
    .unwrap();
    validate_mutation(&plan, &intent).unwrap();
    let applied = apply_mutation(&plan, &intent, MutationSource::Ai, Some("agent update")).unwrap();
    assert_eq!(applied.new_state["steps"][0]["status"], json!("in_progress"));
    assert_eq!(applied.mutation.source, MutationSource::Ai);
}

#[test]
fn plain_chat_is_not_a_mutation() {
    let plan = artifact(ArtifactKind::ExecutionPlan);
    let parser = MutationIntentParser::new();
    assert!(parser.detect_mutation("what does step 2 involve?", &[&plan]).is_none());
    assert!(parser.detect_mutation("", &[&plan]).is_none());
    assert!(!parser.is_mutation_request("summarize the plan"));
}

proptest! {
    #[test]
    fn remove_step_n_removes_index_n_minus_one(len in 1usize..8, pick in 0usize..8) {
        let n = pick % len + 1;
        let titles: Vec<String> = (0..len).map(|i| format!("Step {i}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let plan = artifact_with_id("bbbb0001", ArtifactKind::ExecutionPlan, plan_state(&refs));

        let applied = run(&plan, &format!("remove step {n}")).unwrap();
        prop_assert_eq!(applied.mutation.path.clone(), StatePath::key("steps").child(n - 1));
        prop_assert_eq!(applied.new_state["steps"].as_array().unwrap().len(), len - 1);
        let expected = json!(format!("Step {}", n - 1));
        prop_assert_eq!(&applied.mutation.previous_value.unwrap()["title"], &expected);

        let last = run(&plan, "remove the last step").unwrap();
        prop_assert_eq!(last.mutation.path, StatePath::key("steps").child(len - 1));
    }
}
