// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for lineage crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`fixtures`] - To-do list and counter states with ready-made actions
//! - [`observers`] - Recording and failing observer callbacks
//! - [`stamper`] - Deterministic node ids and timestamps
#![forbid(unsafe_code)]

pub mod config;
pub mod fixtures;
pub mod observers;
pub mod stamper;

pub use config::InMemoryConfigStore;
pub use fixtures::{
    add_task, change_name_to_hello, counter_session, set_counter, todo, todo_session, Counter,
    TodoItem, TodoList, TodoStatus, User,
};
pub use observers::{failing_observer, ObserverProbe};
pub use stamper::{SequentialStamper, DEFAULT_EPOCH};
