// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic stamper for reproducible node ids and timestamps.

use lineage_core::{NodeId, Stamper, Timestamp};

/// Fixed clock origin used by [`SequentialStamper::new`].
pub const DEFAULT_EPOCH: Timestamp = 1_700_000_000_000;

/// Mints `node-0000`, `node-0001`, ... and a clock that advances by a fixed
/// step per minted id.
///
/// # Example
///
/// ```
/// use lineage_core::Stamper;
/// use lineage_dry_tests::SequentialStamper;
///
/// let mut stamper = SequentialStamper::with_clock(10, 5);
/// assert_eq!(stamper.now(), 10);
/// assert_eq!(stamper.next_id().as_str(), "node-0000");
/// assert_eq!(stamper.now(), 15);
/// ```
#[derive(Clone, Debug)]
pub struct SequentialStamper {
    minted: u64,
    epoch: Timestamp,
    step: Timestamp,
}

impl SequentialStamper {
    /// Starts at [`DEFAULT_EPOCH`], advancing one second per id.
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_EPOCH, 1_000)
    }

    /// Starts at `epoch`, advancing `step` per id.
    pub fn with_clock(epoch: Timestamp, step: Timestamp) -> Self {
        Self {
            minted: 0,
            epoch,
            step,
        }
    }

    /// Number of ids handed out so far.
    pub fn minted(&self) -> u64 {
        self.minted
    }
}

impl Default for SequentialStamper {
    fn default() -> Self {
        Self::new()
    }
}

impl Stamper for SequentialStamper {
    fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(format!("node-{:04}", self.minted));
        self.minted += 1;
        id
    }

    fn now(&self) -> Timestamp {
        self.epoch
            .saturating_add(self.minted.saturating_mul(self.step))
    }
}
