// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node records stored in a provenance graph.
//!
//! A graph holds exactly one [`RootNode`] (the initial state) and any number
//! of [`StateNode`]s, each produced by one action or import. The two kinds
//! are distinct variants of [`ProvenanceNode`], so root-only and state-only
//! fields (parent, artifacts) exist only where they are valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::Diff;
use crate::ident::{NodeId, Timestamp};

/// Metadata key holding the creation time.
pub const CREATED_ON_KEY: &str = "createdOn";
/// Metadata key holding the event kind discriminator.
pub const TYPE_KEY: &str = "type";

/// Descriptive metadata attached to every node.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Creation time of the node.
    #[serde(rename = "createdOn")]
    pub created_on: Timestamp,
    /// Event kind (`"Root"` for the root node, caller-chosen otherwise).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Arbitrary caller-supplied entries.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NodeMetadata {
    /// Metadata carrying only a creation time.
    pub fn stamped(created_on: Timestamp) -> Self {
        Self {
            created_on,
            kind: None,
            extra: BTreeMap::new(),
        }
    }

    /// Sets the event kind.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Merges caller-supplied entries over this metadata.
    ///
    /// A string under `"type"` becomes the event kind and wins over any kind
    /// already set; `"createdOn"` is owned by the engine and ignored.
    pub(crate) fn merge(&mut self, entries: BTreeMap<String, Value>) {
        for (key, value) in entries {
            match (key.as_str(), value) {
                (CREATED_ON_KEY, _) => {}
                (TYPE_KEY, Value::String(kind)) => self.kind = Some(kind),
                (TYPE_KEY, _) => {}
                (_, value) => {
                    self.extra.insert(key, value);
                }
            }
        }
    }
}

/// A caller annotation attached to a state node after the fact.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Annotation<A> {
    /// When the annotation was attached.
    pub time: Timestamp,
    /// The annotation payload.
    pub value: A,
}

/// Audit record carried by every state node.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Artifacts<A> {
    /// Differences between the parent's state (or the import baseline) and
    /// this node's state.
    pub diffs: Vec<Diff>,
    /// Annotations in the order they were attached.
    pub extra: Vec<Annotation<A>>,
}

/// Per-field overrides for a new node's [`Artifacts`].
#[derive(Clone, PartialEq, Debug)]
pub struct PartialArtifacts<A> {
    /// Replaces the computed diff list when set.
    pub diffs: Option<Vec<Diff>>,
    /// Replaces the initially empty annotation list when set.
    pub extra: Option<Vec<Annotation<A>>>,
}

impl<A> Default for PartialArtifacts<A> {
    fn default() -> Self {
        Self {
            diffs: None,
            extra: None,
        }
    }
}

impl<A> PartialArtifacts<A> {
    pub(crate) fn resolve(self, diffs: Vec<Diff>) -> Artifacts<A> {
        Artifacts {
            diffs: self.diffs.unwrap_or(diffs),
            extra: self.extra.unwrap_or_default(),
        }
    }
}

/// The single entry point of a graph, holding the initial state.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RootNode<T> {
    /// Node id.
    pub id: NodeId,
    /// Human-readable label.
    pub label: String,
    /// Node metadata.
    pub metadata: NodeMetadata,
    /// Child ids in branch creation order.
    pub children: Vec<NodeId>,
    /// The initial state.
    pub state: T,
}

/// A node produced by applying an action or importing a state.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StateNode<T, A> {
    /// Node id.
    pub id: NodeId,
    /// Human-readable label.
    pub label: String,
    /// Node metadata.
    pub metadata: NodeMetadata,
    /// Child ids in branch creation order.
    pub children: Vec<NodeId>,
    /// State after the action.
    pub state: T,
    /// The node this one was derived from.
    pub parent: NodeId,
    /// Diff record and annotations.
    pub artifacts: Artifacts<A>,
}

/// Either kind of node.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvenanceNode<T, A> {
    /// The root (initial state).
    Root(RootNode<T>),
    /// A derived state.
    State(StateNode<T, A>),
}

impl<T, A> ProvenanceNode<T, A> {
    /// Node id.
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Root(n) => &n.id,
            Self::State(n) => &n.id,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        match self {
            Self::Root(n) => &n.label,
            Self::State(n) => &n.label,
        }
    }

    /// Node metadata.
    pub fn metadata(&self) -> &NodeMetadata {
        match self {
            Self::Root(n) => &n.metadata,
            Self::State(n) => &n.metadata,
        }
    }

    /// Child ids in branch creation order.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Root(n) => &n.children,
            Self::State(n) => &n.children,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        match self {
            Self::Root(n) => &mut n.children,
            Self::State(n) => &mut n.children,
        }
    }

    /// The state recorded at this node.
    pub fn state(&self) -> &T {
        match self {
            Self::Root(n) => &n.state,
            Self::State(n) => &n.state,
        }
    }

    /// Parent id; `None` for the root.
    pub fn parent(&self) -> Option<&NodeId> {
        match self {
            Self::Root(_) => None,
            Self::State(n) => Some(&n.parent),
        }
    }

    /// Artifacts; `None` for the root.
    pub fn artifacts(&self) -> Option<&Artifacts<A>> {
        match self {
            Self::Root(_) => None,
            Self::State(n) => Some(&n.artifacts),
        }
    }

    /// Returns `true` for the root node.
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root(_))
    }

    /// Returns the state-node view, if this is one.
    pub fn as_state(&self) -> Option<&StateNode<T, A>> {
        match self {
            Self::Root(_) => None,
            Self::State(n) => Some(n),
        }
    }

    pub(crate) fn as_state_mut(&mut self) -> Option<&mut StateNode<T, A>> {
        match self {
            Self::Root(_) => None,
            Self::State(n) => Some(n),
        }
    }
}
