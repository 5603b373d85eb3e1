//! Slot Partitioner
//!
//! Maps global slot indices to (rank, local offset) pairs and back. Block
//! partitioning keeps the translation to two integer operations, and every
//! rank computes the same mapping independently.

use anyhow::{Result, anyhow};

/// Target load factor of the table: the slot count is the expected key count
/// divided by this, so half the slots stay free and probe chains stay short.
pub const LOAD_FACTOR: f64 = 0.5;

/// Fixed-for-the-run partition geometry of the logical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPartitioner {
    slots_per_rank: u64,
    world: u32,
}

impl SlotPartitioner {
    /// Builds a partitioner for at least `requested_slots` total slots.
    ///
    /// The per-rank block is rounded up so every rank owns at least one slot;
    /// the actual table size is `slots_per_rank * world`.
    pub fn new(requested_slots: u64, world: u32) -> Self {
        let slots_per_rank = requested_slots.div_ceil(u64::from(world)).max(1);
        Self {
            slots_per_rank,
            world,
        }
    }

    /// Sizes the table for an expected key count at [`LOAD_FACTOR`].
    pub fn for_expected_keys(expected_keys: u64, world: u32) -> Self {
        let requested = (expected_keys as f64 / LOAD_FACTOR).ceil() as u64;
        Self::new(requested.max(1), world)
    }

    pub fn world(&self) -> u32 {
        self.world
    }

    pub fn slots_per_rank(&self) -> u64 {
        self.slots_per_rank
    }

    pub fn total_slots(&self) -> u64 {
        self.slots_per_rank * u64::from(self.world)
    }

    /// Owner rank and local offset of global slot `global`.
    pub fn locate(&self, global: u64) -> Result<(u32, u64)> {
        if global >= self.total_slots() {
            return Err(anyhow!(
                "global slot {} out of range (table has {} slots)",
                global,
                self.total_slots()
            ));
        }
        Ok((
            (global / self.slots_per_rank) as u32,
            global % self.slots_per_rank,
        ))
    }

    /// Global index of `local` on `rank`; inverse of [`locate`](Self::locate).
    pub fn global_index(&self, rank: u32, local: u64) -> Result<u64> {
        if rank >= self.world || local >= self.slots_per_rank {
            return Err(anyhow!(
                "rank {} local slot {} out of range ({} ranks, {} slots each)",
                rank,
                local,
                self.world,
                self.slots_per_rank
            ));
        }
        Ok(u64::from(rank) * self.slots_per_rank + local)
    }
}
