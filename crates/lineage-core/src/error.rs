// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types surfaced by graph functions and the session facade.

use thiserror::Error;

use crate::codec::CodecError;
use crate::ident::NodeId;

/// Error returned by a caller-supplied action.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by an observer callback.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Reasons a cursor move was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// Stepping back from the root.
    #[error("already at root")]
    AtRoot,
    /// Stepping forward from a node without children.
    #[error("already at the latest node in this branch")]
    NoChildren,
    /// The path to the root is shorter than the requested step count.
    #[error("cannot go back {requested} steps; reached root after {reached} steps")]
    NotEnoughHistory {
        /// Steps asked for.
        requested: usize,
        /// Steps that were possible before hitting the root.
        reached: usize,
    },
}

/// Errors produced by provenance operations.
///
/// Every failure is scoped to the call that produced it: the live graph is
/// left exactly as it was, except for [`ProvenanceError::Observer`], which is
/// raised after the transition has been committed.
#[derive(Debug, Error)]
pub enum ProvenanceError {
    /// The id is not present in the node table.
    #[error("no such node exists: {0}")]
    UnknownNode(NodeId),

    /// The requested cursor move is impossible from the current node.
    #[error(transparent)]
    InvalidNavigation(#[from] NavigationError),

    /// The root node carries no annotation list.
    #[error("root node {0} has no artifacts")]
    RootArtifact(NodeId),

    /// An observer path names a property missing from the current state.
    #[error("path {path} does not exist")]
    ObserverPathNotFound {
        /// The offending path, dot-joined.
        path: String,
    },

    /// No addressable location is available to seed the session from.
    #[error("no addressable location available; cannot load embedded state")]
    EnvironmentUnavailable,

    /// The caller-supplied action failed; nothing was committed.
    #[error("action failed: {0}")]
    Action(#[source] ActionError),

    /// An observer callback failed after the transition was committed.
    #[error("observer failed: {0}")]
    Observer(#[source] ObserverError),

    /// Compression or text encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A state could not be converted to or from the JSON value tree.
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A loaded graph violates the structural invariants.
    #[error("corrupt provenance graph: {0}")]
    CorruptGraph(String),
}

/// Result alias used across the crate.
pub type Result<T, E = ProvenanceError> = std::result::Result<T, E>;
