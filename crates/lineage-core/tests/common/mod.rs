// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use lineage_core::{NodeId, Provenance};
use lineage_dry_tests::{add_task, todo, todo_session, TodoList, TodoStatus};

/// To-do session with two tasks added on top of the sample state
/// (three nodes: root, first add, second add).
pub fn three_tasks() -> Provenance<TodoList, String> {
    let mut session = todo_session();
    session
        .apply_action(add_task(
            "Adding new task",
            &todo("To check for coverage changes", TodoStatus::Ongoing),
        ))
        .expect("first task");
    session
        .apply_action(add_task("Adding 3rd task", &todo("Write Code", TodoStatus::Future)))
        .expect("second task");
    session
}

/// Id of the current node.
pub fn current_id<T, A>(session: &Provenance<T, A>) -> NodeId
where
    T: Clone + serde::Serialize + serde::de::DeserializeOwned,
    A: Clone + serde::Serialize + serde::de::DeserializeOwned,
{
    session.graph().current().clone()
}

/// Id of the root node.
pub fn root_id<T, A>(session: &Provenance<T, A>) -> NodeId
where
    T: Clone + serde::Serialize + serde::de::DeserializeOwned,
    A: Clone + serde::Serialize + serde::de::DeserializeOwned,
{
    session.graph().root().clone()
}
