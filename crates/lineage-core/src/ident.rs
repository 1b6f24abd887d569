// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node identifiers, timestamps, and the stamping port that produces them.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a node in a provenance graph.
///
/// Ids are minted by a [`Stamper`] when the node is created and are unique
/// within the graph that owns them. Tooling must not assume any structure
/// in the string: the default stamper emits UUIDs, test stampers emit
/// sequential labels.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wraps a raw identifier string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Source of fresh node ids and creation timestamps.
///
/// The engine treats both as opaque; this trait is the seam where callers
/// inject deterministic providers (tests, replays) in place of the system
/// clock and random UUIDs.
pub trait Stamper: Send {
    /// Mints an id that has not been handed out before.
    fn next_id(&mut self) -> NodeId;

    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Default stamper: random v4 UUIDs and the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemStamper;

impl Stamper for SystemStamper {
    fn next_id(&mut self) -> NodeId {
        NodeId(Uuid::new_v4().to_string())
    }

    fn now(&self) -> Timestamp {
        // Clock errors (time before the epoch) fall back to 0.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Timestamp::try_from(d.as_millis()).unwrap_or(Timestamp::MAX))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_stamper_ids_are_unique() {
        let mut stamper = SystemStamper;
        let a = stamper.next_id();
        let b = stamper.next_id();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let id = NodeId::from("abc");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"abc\"");
        assert_eq!(id.to_string(), "abc");
    }
}
