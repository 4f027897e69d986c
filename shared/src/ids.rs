//! Identifiers shared between the host and connected peers.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Index of one simulation step.
///
/// Tick indices start at 0 and grow by one per step. The recorded log is
/// addressed by this index, so there are never gaps between stored ticks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize,
    Deserialize,
)]
pub struct TickIndex(pub u64);

impl TickIndex {
    pub const ZERO: TickIndex = TickIndex(0);

    /// The tick that follows this one.
    pub const fn next(self) -> TickIndex {
        TickIndex(self.0 + 1)
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TickIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickIndex {
    fn from(v: u64) -> Self {
        TickIndex(v)
    }
}

/// Identity of an endpoint.
///
/// The transport assigns peer ids starting at 1; [`PeerId::HOST`] addresses
/// the host from a peer's point of view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct PeerId(pub u32);

impl PeerId {
    pub const HOST: PeerId = PeerId(0);

    pub const fn is_host(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}
