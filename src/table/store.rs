use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::kmer::types::KmerPair;

/// This rank's block of the logical table.
///
/// Occupancy flags are 32-bit atomics supporting the 0 -> 1 reservation CAS;
/// entries are written only by the reservation winner and only before the
/// insertion-phase barrier, after which the store is read-only. Relaxed
/// ordering suffices: a reader consults an entry only after observing its
/// flag set through this rank's dispatch path, and the phase barrier orders
/// all construction writes before all traversal reads.
///
/// Callers translate to local slot indices and bounds-check before touching
/// the store; the fabric dispatch rejects out-of-range slots.
pub struct SlotStore {
    used: Vec<AtomicU32>,
    entries: DashMap<u64, KmerPair>,
}

impl SlotStore {
    /// Allocates `slots` zero-initialized slots.
    pub fn new(slots: u64) -> Self {
        Self {
            used: (0..slots).map(|_| AtomicU32::new(0)).collect(),
            entries: DashMap::new(),
        }
    }

    pub fn slots(&self) -> u64 {
        self.used.len() as u64
    }

    /// Reserves `slot` if it is free. Exactly one concurrent caller wins.
    pub fn try_reserve(&self, slot: u64) -> bool {
        self.used[slot as usize]
            .compare_exchange(0, 1, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    /// Stores the entry for `slot`. Legal only after winning the reservation.
    pub fn write_entry(&self, slot: u64, entry: KmerPair) {
        self.entries.insert(slot, entry);
    }

    /// Occupancy flag and, when set, the entry of `slot`.
    pub fn read_slot(&self, slot: u64) -> (bool, Option<KmerPair>) {
        let used = self.used[slot as usize].load(Ordering::Relaxed) == 1;
        let entry = if used {
            self.entries.get(&slot).map(|entry| *entry.value())
        } else {
            None
        };
        (used, entry)
    }

    /// Number of reserved slots.
    pub fn occupied(&self) -> u64 {
        self.used
            .iter()
            .filter(|flag| flag.load(Ordering::Relaxed) == 1)
            .count() as u64
    }

    /// Snapshot of all occupancy flags, in local slot order.
    pub fn used_flags(&self) -> Vec<u32> {
        self.used
            .iter()
            .map(|flag| flag.load(Ordering::Relaxed))
            .collect()
    }
}
