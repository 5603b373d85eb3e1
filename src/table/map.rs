use anyhow::{Result, anyhow};
use std::sync::Arc;

use super::partitioner::SlotPartitioner;
use crate::cluster::fabric::ClusterFabric;
use crate::cluster::protocol::{FabricReply, FabricRequest};
use crate::kmer::types::{KmerPair, PackedKmer};

/// The distributed k-mer table.
///
/// A thin client over the fabric: it owns no slots itself, only the partition
/// geometry and the probe loops. Collisions resolve by linear probing over
/// the global slot space, so a probe sequence freely crosses partition
/// boundaries; each probe is one remote round trip to the owning rank.
pub struct DistributedKmerMap {
    fabric: Arc<ClusterFabric>,
    partitioner: SlotPartitioner,
}

impl DistributedKmerMap {
    pub fn new(fabric: Arc<ClusterFabric>, partitioner: SlotPartitioner) -> Result<Self> {
        if fabric.world() != partitioner.world() {
            return Err(anyhow!(
                "fabric spans {} ranks but the partitioner expects {}",
                fabric.world(),
                partitioner.world()
            ));
        }
        if fabric.store().slots() != partitioner.slots_per_rank() {
            return Err(anyhow!(
                "local store holds {} slots but the partitioner expects {}",
                fabric.store().slots(),
                partitioner.slots_per_rank()
            ));
        }
        Ok(Self {
            fabric,
            partitioner,
        })
    }

    pub fn partitioner(&self) -> &SlotPartitioner {
        &self.partitioner
    }

    /// Inserts a k-mer, probing from its hash slot until a reservation wins.
    ///
    /// Exhausting all `M` probes means the table was sized for fewer keys
    /// than were inserted; the run cannot recover and the error is fatal.
    pub async fn insert(&self, entry: KmerPair) -> Result<()> {
        let total = self.partitioner.total_slots();
        let home = entry.kmer.hash64() % total;
        for probe in 0..total {
            let global = (home + probe) % total;
            let (owner, local) = self.partitioner.locate(global)?;
            match self
                .fabric
                .call(owner, FabricRequest::InsertSlot { slot: local, entry })
                .await?
            {
                FabricReply::Inserted => {
                    tracing::debug!(
                        "inserted {} at global slot {} (rank {}, local {})",
                        entry.kmer,
                        global,
                        owner,
                        local
                    );
                    return Ok(());
                }
                FabricReply::Occupied => {
                    tracing::debug!(
                        "slot {} occupied at probe {} for {}",
                        global,
                        probe,
                        entry.kmer
                    );
                }
                other => return Err(anyhow!("unexpected insert reply: {:?}", other)),
            }
        }
        Err(anyhow!(
            "table full: no free slot for {} after {} probes",
            entry.kmer,
            total
        ))
    }

    /// Looks a key up along its probe sequence.
    ///
    /// An empty slot proves absence: slots are write-once and never cleared,
    /// so every key sits in a gap-free run starting at its hash slot.
    pub async fn find(&self, key: &PackedKmer) -> Result<Option<KmerPair>> {
        let total = self.partitioner.total_slots();
        let home = key.hash64() % total;
        for probe in 0..total {
            let global = (home + probe) % total;
            let (owner, local) = self.partitioner.locate(global)?;
            match self
                .fabric
                .call(owner, FabricRequest::ReadSlot { slot: local })
                .await?
            {
                FabricReply::Slot { used: false, .. } => return Ok(None),
                FabricReply::Slot { used: true, entry } => {
                    let entry = entry
                        .ok_or_else(|| anyhow!("slot {} is reserved but carries no entry", global))?;
                    if entry.kmer == *key {
                        return Ok(Some(entry));
                    }
                }
                other => return Err(anyhow!("unexpected find reply: {:?}", other)),
            }
        }
        Ok(None)
    }

    /// Reserves global slot `global` on its owner. Returns whether this
    /// caller won the reservation; of any number of concurrent callers,
    /// exactly one does.
    pub async fn request_slot(&self, global: u64) -> Result<bool> {
        let (owner, local) = self.partitioner.locate(global)?;
        match self
            .fabric
            .call(owner, FabricRequest::ReserveSlot { slot: local })
            .await?
        {
            FabricReply::Reserved { won } => Ok(won),
            other => Err(anyhow!("unexpected reservation reply: {:?}", other)),
        }
    }
}
