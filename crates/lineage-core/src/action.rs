// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Action requests: a labelled state transform plus the node details to record.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::ActionError;
use crate::node::{PartialArtifacts, TYPE_KEY};

type ApplyFn<'a, T> = Box<dyn FnOnce(T, &[Value]) -> Result<T, ActionError> + 'a>;

/// A state transform to record as a new node.
///
/// The transform receives an independent copy of the current state plus the
/// positional arguments given with [`Action::with_args`], and returns the
/// next state. It may mutate its input freely.
///
/// ```
/// use lineage_core::Action;
/// use serde_json::{json, Value};
///
/// let action: Action<'_, Value> = Action::new("set to 5", |mut s: Value, args| {
///     s["counter"] = args[0].clone();
///     Ok(s)
/// })
/// .with_args([json!(5)])
/// .with_event_kind("Set");
/// assert_eq!(action.label(), "set to 5");
/// ```
pub struct Action<'a, T, A = Value> {
    label: String,
    apply: ApplyFn<'a, T>,
    args: Vec<Value>,
    metadata: BTreeMap<String, Value>,
    event_kind: Option<String>,
    artifacts: PartialArtifacts<A>,
}

impl<'a, T, A> Action<'a, T, A> {
    /// Creates an action from a fallible transform.
    pub fn new<F>(label: impl Into<String>, apply: F) -> Self
    where
        F: FnOnce(T, &[Value]) -> Result<T, ActionError> + 'a,
    {
        Self {
            label: label.into(),
            apply: Box::new(apply),
            args: Vec::new(),
            metadata: BTreeMap::new(),
            event_kind: None,
            artifacts: PartialArtifacts::default(),
        }
    }

    /// Creates an action from a transform that cannot fail and takes no
    /// arguments.
    pub fn from_fn<F>(label: impl Into<String>, apply: F) -> Self
    where
        F: FnOnce(T) -> T + 'a,
    {
        Self::new(label, move |state, _| Ok(apply(state)))
    }

    /// Positional arguments handed to the transform.
    pub fn with_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Adds one metadata entry. A string under `"type"` sets the event kind.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Sets the event kind recorded as metadata `type`. Takes precedence over
    /// a `"type"` metadata entry.
    pub fn with_event_kind(mut self, kind: impl Into<String>) -> Self {
        self.event_kind = Some(kind.into());
        self
    }

    /// Overrides fields of the new node's artifacts.
    pub fn with_artifacts(mut self, artifacts: PartialArtifacts<A>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// The label the new node will carry.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn run(self, input: T) -> (Result<T, ActionError>, ActionRecord<A>) {
        let Self {
            label,
            apply,
            args,
            mut metadata,
            event_kind,
            artifacts,
        } = self;
        if let Some(kind) = event_kind {
            metadata.insert(TYPE_KEY.to_owned(), Value::String(kind));
        }
        let outcome = apply(input, &args);
        (
            outcome,
            ActionRecord {
                label,
                metadata,
                artifacts,
            },
        )
    }
}

impl<T, A: fmt::Debug> fmt::Debug for Action<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("label", &self.label)
            .field("args", &self.args)
            .field("metadata", &self.metadata)
            .field("event_kind", &self.event_kind)
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

// Node details carried from the request to the node that records it.
pub(crate) struct ActionRecord<A> {
    pub(crate) label: String,
    pub(crate) metadata: BTreeMap<String, Value>,
    pub(crate) artifacts: PartialArtifacts<A>,
}
