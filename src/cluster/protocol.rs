//! Rank Wire Protocol
//!
//! The remote operations exchanged between ranks. Each request targets a
//! *local* slot index on the receiving rank; the sender performs the
//! global-to-local translation before issuing the call.
//!
//! Messages are serialized with bincode and framed with a length prefix; see
//! `fabric` for the transport.

use serde::{Deserialize, Serialize};

use crate::kmer::types::KmerPair;

/// A remote operation sent to the rank owning a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FabricRequest {
    /// Reserve `slot` and, if the reservation wins, store `entry` in it.
    ///
    /// Bundling the compare-and-swap with the conditional entry write keeps
    /// an insert probe to a single round trip.
    InsertSlot { slot: u64, entry: KmerPair },

    /// Fetch the occupancy flag and (when occupied) the entry of `slot`.
    ///
    /// Bundling both keeps a find probe to a single round trip.
    ReadSlot { slot: u64 },

    /// Bare slot reservation: compare-and-swap the occupancy flag 0 -> 1.
    /// Exactly one concurrent caller per slot observes the win.
    ReserveSlot { slot: u64 },

    /// Announce arrival at the current barrier epoch. Only rank 0 answers;
    /// the reply is withheld until every rank has arrived.
    BarrierArrive { rank: u32 },
}

impl FabricRequest {
    /// The local slot the request addresses, if any.
    pub fn slot(&self) -> Option<u64> {
        match self {
            Self::InsertSlot { slot, .. } | Self::ReadSlot { slot } | Self::ReserveSlot { slot } => {
                Some(*slot)
            }
            Self::BarrierArrive { .. } => None,
        }
    }
}

/// The answer to a [`FabricRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FabricReply {
    /// The insert reserved the slot and stored the entry.
    Inserted,
    /// The slot was already reserved; the sender should probe onward.
    Occupied,
    /// Occupancy flag and entry of the requested slot. `entry` is `None`
    /// whenever `used` is false.
    Slot { used: bool, entry: Option<KmerPair> },
    /// Outcome of a bare reservation.
    Reserved { won: bool },
    /// All ranks arrived; the barrier is open.
    BarrierRelease,
    /// The receiving rank could not serve the request.
    Rejected { reason: String },
}
