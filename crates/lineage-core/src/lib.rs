// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! lineage-core: branching provenance history for application state.
//!
//! Every change an application makes to its state is recorded as a node in
//! a tree rooted at the initial state. A cursor marks the current node;
//! moving it gives undo, redo, and branch switching. Each node carries the
//! structural diff that produced it plus free-form annotations, and both a
//! single state and the whole tree can round-trip through plain strings.
//!
//! The [`graph`] module holds the pure graph-in/graph-out functions; the
//! [`Provenance`] session owns one live graph, swaps in new graphs only on
//! success, and notifies observers about what changed.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod action;
/// Compressed, delimiter-wrapped encoding of exported states.
pub mod codec;
/// Session configuration and its storage port.
pub mod config;
/// Structural diff over JSON value trees.
pub mod diff;
mod error;
/// Pure functions that build and navigate provenance graphs.
pub mod graph;
mod ident;
mod location;
mod node;
/// Observer registries and change dispatch.
pub mod observer;
mod session;

pub use action::Action;
pub use codec::{CodecError, DeflateCodec, StateCodec, DEFAULT_DELIMITER};
pub use config::{ConfigError, ConfigService, ConfigStore, ProvenanceConfig};
pub use diff::{diff, diff_states, Diff, PathSegment};
pub use error::{ActionError, NavigationError, ObserverError, ProvenanceError, Result};
pub use graph::ProvenanceGraph;
pub use ident::{NodeId, Stamper, SystemStamper, Timestamp};
pub use location::{FixedLocation, LocationSource};
pub use node::{
    Annotation, Artifacts, NodeMetadata, PartialArtifacts, ProvenanceNode, RootNode, StateNode,
};
pub use observer::ObserverResult;
pub use session::{Provenance, ProvenanceBuilder};
