// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixture states and actions.
//!
//! The to-do list mirrors a small interactive app: a user record plus a
//! task list, with actions that add tasks and rename the user. The counter
//! is the smallest state worth branching on.

use lineage_core::{Action, Provenance};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stamper::SequentialStamper;

/// Progress of a to-do item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
    /// Finished.
    Done,
    /// In progress.
    Ongoing,
    /// Not started.
    Future,
}

/// One to-do entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// What to do.
    pub task: String,
    /// When it was added.
    pub created_on: String,
    /// Progress.
    pub status: TodoStatus,
    /// When it was finished; empty until then.
    pub completed_on: String,
}

/// Owner of the list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Display name.
    pub name: String,
    /// Number of tasks on the list.
    pub total_task: usize,
}

/// To-do app state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    /// Owner record.
    pub user: User,
    /// Tasks in insertion order.
    pub todos: Vec<TodoItem>,
}

impl TodoList {
    /// One user with one ongoing task.
    pub fn sample() -> Self {
        Self {
            user: User {
                name: "Kiran".to_owned(),
                total_task: 1,
            },
            todos: vec![todo("Add unit tests", TodoStatus::Ongoing)],
        }
    }
}

/// A to-do entry with a fixed creation date.
pub fn todo(task: &str, status: TodoStatus) -> TodoItem {
    TodoItem {
        task: task.to_owned(),
        created_on: "2024-01-01T00:00:00.000Z".to_owned(),
        status,
        completed_on: String::new(),
    }
}

/// Appends `task` (passed as the action's argument) and updates the count.
/// Recorded with event kind `Add TODO`.
pub fn add_task(label: &str, task: &TodoItem) -> Action<'static, TodoList, String> {
    Action::new(label, |mut state: TodoList, args: &[Value]| {
        let task = args.first().cloned().ok_or("add_task needs a task argument")?;
        state.todos.push(serde_json::from_value(task)?);
        state.user.total_task = state.todos.len();
        Ok(state)
    })
    .with_args([serde_json::to_value(task).unwrap_or_default()])
    .with_event_kind("Add TODO")
}

/// Renames the user to `Hello`. Recorded with event kind `Name Change`.
pub fn change_name_to_hello() -> Action<'static, TodoList, String> {
    Action::from_fn("Change name to hello", |mut state: TodoList| {
        state.user.name = "Hello".to_owned();
        state
    })
    .with_event_kind("Name Change")
}

/// A to-do session with deterministic ids and timestamps.
pub fn todo_session() -> Provenance<TodoList, String> {
    Provenance::builder(TodoList::sample())
        .stamper(SequentialStamper::new())
        .build()
}

/// Single-field counter state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    /// Current count.
    pub counter: i64,
}

/// Sets the counter to `value`.
pub fn set_counter(label: &str, value: i64) -> Action<'static, Counter, String> {
    Action::from_fn(label, move |_: Counter| Counter { counter: value })
}

/// A counter session at zero with deterministic ids and timestamps.
pub fn counter_session() -> Provenance<Counter, String> {
    Provenance::builder(Counter::default())
        .stamper(SequentialStamper::new())
        .build()
}
