// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{current_id, root_id, three_tasks};
use lineage_core::{Action, Annotation, NodeId, PartialArtifacts, ProvenanceError};
use lineage_dry_tests::{todo_session, TodoList, DEFAULT_EPOCH};
use serde_json::json;

#[test]
fn annotations_read_back_in_append_order_with_timestamps() {
    let mut session = three_tasks();
    let id = current_id(&session);
    assert!(session.get_extra_from_artifact(&id).unwrap().is_empty());

    session
        .add_extra_to_node_artifact(&id, "Hello, World".to_owned())
        .unwrap();
    session
        .add_extra_to_node_artifact(&id, "Second thought".to_owned())
        .unwrap();

    let notes = session.get_extra_from_artifact(&id).unwrap();
    let values: Vec<&str> = notes.iter().map(|a| a.value.as_str()).collect();
    assert_eq!(values, ["Hello, World", "Second thought"]);
    assert!(notes.iter().all(|a| a.time >= DEFAULT_EPOCH));
}

#[test]
fn annotating_does_not_move_the_cursor_or_touch_state() {
    let mut session = three_tasks();
    let tip = current_id(&session);
    let parent = session.current().parent().cloned().unwrap();
    let state_before = session.graph().get(&parent).unwrap().state().clone();

    session
        .add_extra_to_node_artifact(&parent, "older node".to_owned())
        .unwrap();
    assert_eq!(current_id(&session), tip);
    assert_eq!(session.graph().get(&parent).unwrap().state(), &state_before);
    assert_eq!(session.get_extra_from_artifact(&parent).unwrap().len(), 1);
    assert!(session.get_extra_from_artifact(&tip).unwrap().is_empty());
}

#[test]
fn root_has_no_annotations() {
    let mut session = three_tasks();
    let root = root_id(&session);
    assert!(matches!(
        session.add_extra_to_node_artifact(&root, "nope".to_owned()),
        Err(ProvenanceError::RootArtifact(_))
    ));
    assert!(matches!(
        session.get_extra_from_artifact(&root),
        Err(ProvenanceError::RootArtifact(_))
    ));
}

#[test]
fn unknown_ids_are_reported() {
    let mut session = todo_session();
    let ghost = NodeId::from("ghost");
    assert!(matches!(
        session.add_extra_to_node_artifact(&ghost, "x".to_owned()),
        Err(ProvenanceError::UnknownNode(_))
    ));
    assert!(matches!(
        session.get_extra_from_artifact(&ghost),
        Err(ProvenanceError::UnknownNode(_))
    ));
}

#[test]
fn action_can_seed_artifacts_and_metadata() {
    let mut session = todo_session();
    let action: Action<'_, TodoList, String> = Action::from_fn("Archive", |mut s: TodoList| {
        s.todos.clear();
        s.user.total_task = 0;
        s
    })
    .with_metadata("author", json!("kiran"))
    .with_event_kind("Archive")
    .with_artifacts(PartialArtifacts {
        diffs: None,
        extra: Some(vec![Annotation {
            time: 7,
            value: "bulk clear".to_owned(),
        }]),
    });
    session.apply_action(action).unwrap();

    let node = session.current();
    assert_eq!(node.metadata().kind.as_deref(), Some("Archive"));
    assert_eq!(node.metadata().extra.get("author"), Some(&json!("kiran")));
    let artifacts = node.artifacts().unwrap();
    assert_eq!(artifacts.extra.len(), 1);
    assert!(!artifacts.diffs.is_empty(), "diffs are still computed");
}
