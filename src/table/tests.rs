#[cfg(test)]
mod tests {
    use crate::cluster::fabric::{ClusterFabric, RankListener};
    use crate::kmer::types::{Extension, KmerPair, PackedKmer};
    use crate::table::map::DistributedKmerMap;
    use crate::table::partitioner::SlotPartitioner;
    use crate::table::store::SlotStore;
    use std::net::SocketAddr;
    use std::sync::Arc;

    struct TestRank {
        fabric: Arc<ClusterFabric>,
        map: DistributedKmerMap,
    }

    async fn spawn_table(world: u32, slots_per_rank: u64) -> Vec<TestRank> {
        let partitioner = SlotPartitioner::new(slots_per_rank * u64::from(world), world);
        assert_eq!(partitioner.slots_per_rank(), slots_per_rank);

        let mut listeners = Vec::new();
        let mut roster: Vec<SocketAddr> = Vec::new();
        for _ in 0..world {
            let listener = RankListener::bind("127.0.0.1:0".parse().unwrap())
                .await
                .unwrap();
            roster.push(listener.local_addr().unwrap());
            listeners.push(listener);
        }
        let mut ranks = Vec::new();
        for (rank, listener) in listeners.into_iter().enumerate() {
            let store = Arc::new(SlotStore::new(slots_per_rank));
            let fabric = listener.join(rank as u32, &roster, store).await.unwrap();
            let map = DistributedKmerMap::new(fabric.clone(), partitioner).unwrap();
            ranks.push(TestRank { fabric, map });
        }
        ranks
    }

    fn pair(bases: &str) -> KmerPair {
        KmerPair::new(
            PackedKmer::from_bases(bases).unwrap(),
            Extension::A,
            Extension::Stop,
        )
    }

    fn all_3mers() -> Vec<String> {
        let bases = ['A', 'C', 'G', 'T'];
        let mut kmers = Vec::with_capacity(64);
        for a in bases {
            for b in bases {
                for c in bases {
                    kmers.push(format!("{}{}{}", a, b, c));
                }
            }
        }
        kmers
    }

    /// Picks `count` 3-mers whose probe sequences start at the same global
    /// slot of a `total_slots`-slot table. Found by hashing rather than
    /// hard-coded, so the fixture survives a hash change.
    fn colliding_3mers(total_slots: u64, count: usize) -> Vec<String> {
        let mut buckets: std::collections::HashMap<u64, Vec<String>> =
            std::collections::HashMap::new();
        for bases in all_3mers() {
            let home = PackedKmer::from_bases(&bases).unwrap().hash64() % total_slots;
            buckets.entry(home).or_default().push(bases);
        }
        buckets
            .into_values()
            .find(|bucket| bucket.len() >= count)
            .map(|mut bucket| {
                bucket.truncate(count);
                bucket
            })
            .expect("no colliding bucket among all 3-mers")
    }

    // ============================================================
    // ROUND-TRIP AND ABSENCE
    // ============================================================

    #[tokio::test]
    async fn test_insert_then_find_round_trip() {
        let ranks = spawn_table(1, 16).await;
        let inserted: Vec<KmerPair> = all_3mers()[..6].iter().map(|b| pair(b)).collect();

        for entry in &inserted {
            ranks[0].map.insert(*entry).await.unwrap();
        }
        for entry in &inserted {
            let found = ranks[0].map.find(&entry.kmer).await.unwrap();
            assert_eq!(found.unwrap(), *entry);
        }
    }

    #[tokio::test]
    async fn test_find_absent_key_returns_none() {
        let ranks = spawn_table(1, 16).await;
        ranks[0].map.insert(pair("ATC")).await.unwrap();
        ranks[0].map.insert(pair("CGT")).await.unwrap();

        let absent = PackedKmer::from_bases("TCG").unwrap();
        assert!(ranks[0].map.find(&absent).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_from_a_non_owner_rank() {
        let ranks = spawn_table(2, 8).await;
        for bases in &all_3mers()[..8] {
            ranks[0].map.insert(pair(bases)).await.unwrap();
        }
        // Every key is visible from the rank that never inserted it.
        for bases in &all_3mers()[..8] {
            let key = PackedKmer::from_bases(bases).unwrap();
            let found = ranks[1].map.find(&key).await.unwrap();
            assert_eq!(found.unwrap().kmer_str(), *bases);
        }
    }

    // ============================================================
    // COLLISIONS AND CAPACITY
    // ============================================================

    #[tokio::test]
    async fn test_colliding_keys_probe_to_distinct_slots() {
        let ranks = spawn_table(1, 8).await;
        let colliding = colliding_3mers(8, 2);

        for bases in &colliding {
            ranks[0].map.insert(pair(bases)).await.unwrap();
        }
        for bases in &colliding {
            let key = PackedKmer::from_bases(bases).unwrap();
            let found = ranks[0].map.find(&key).await.unwrap();
            assert_eq!(found.unwrap().kmer_str(), *bases);
        }
        assert_eq!(ranks[0].fabric.store().occupied(), 2);
    }

    #[tokio::test]
    async fn test_collision_probes_across_partition_boundary() {
        // Two ranks, one slot each: the second colliding key must land on
        // the other rank's partition.
        let ranks = spawn_table(2, 1).await;
        let colliding = colliding_3mers(2, 2);

        for bases in &colliding {
            ranks[0].map.insert(pair(bases)).await.unwrap();
        }
        assert_eq!(ranks[0].fabric.store().occupied(), 1);
        assert_eq!(ranks[1].fabric.store().occupied(), 1);

        for bases in &colliding {
            let key = PackedKmer::from_bases(bases).unwrap();
            let found = ranks[1].map.find(&key).await.unwrap();
            assert_eq!(found.unwrap().kmer_str(), *bases);
        }
    }

    #[tokio::test]
    async fn test_insert_fails_when_table_is_full() {
        let ranks = spawn_table(1, 2).await;
        ranks[0].map.insert(pair("ATC")).await.unwrap();
        ranks[0].map.insert(pair("TCG")).await.unwrap();

        let err = ranks[0].map.insert(pair("CGT")).await.unwrap_err();
        assert!(err.to_string().contains("table full"), "{}", err);
    }

    // ============================================================
    // RESERVATION EXCLUSIVITY AND WRITE-ONCE
    // ============================================================

    #[tokio::test]
    async fn test_concurrent_reservations_have_one_winner() {
        let ranks = spawn_table(3, 4).await;
        let slot = 5u64;

        let (a, b, c) = tokio::join!(
            ranks[0].map.request_slot(slot),
            ranks[1].map.request_slot(slot),
            ranks[2].map.request_slot(slot),
        );
        let wins = [a.unwrap(), b.unwrap(), c.unwrap()]
            .iter()
            .filter(|won| **won)
            .count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_occupancy_is_write_once_across_lookups() {
        let ranks = spawn_table(2, 8).await;
        let inserted: Vec<KmerPair> = all_3mers()[..6].iter().map(|b| pair(b)).collect();
        for entry in &inserted {
            ranks[1].map.insert(*entry).await.unwrap();
        }

        let before: Vec<Vec<u32>> = ranks
            .iter()
            .map(|rank| rank.fabric.store().used_flags())
            .collect();
        let occupied: u64 = ranks
            .iter()
            .map(|rank| rank.fabric.store().occupied())
            .sum();
        assert_eq!(occupied, inserted.len() as u64);

        for entry in &inserted {
            ranks[0].map.find(&entry.kmer).await.unwrap();
        }
        ranks[0]
            .map
            .find(&PackedKmer::from_bases("TTT").unwrap())
            .await
            .unwrap();

        let after: Vec<Vec<u32>> = ranks
            .iter()
            .map(|rank| rank.fabric.store().used_flags())
            .collect();
        assert_eq!(before, after);
    }
}
