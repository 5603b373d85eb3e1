//! Distributed K-mer Table
//!
//! One logical hash table of `M` slots split into contiguous per-rank blocks.
//!
//! ## Core Concepts
//! - **Partitioning**: Slot `g` lives on rank `g / L` at local offset
//!   `g mod L`, where `L` is the per-rank block size. The arithmetic is pure
//!   and identical on every rank.
//! - **Reservation**: A slot is claimed by an atomic 0 -> 1 compare-and-swap
//!   on its occupancy flag; the entry is written only by the reservation
//!   winner. Slots are write-once and never cleared.
//! - **Probing**: Collisions resolve by linear probing over the *global*
//!   slot space, crossing partition boundaries. A find that meets an empty
//!   slot stops: write-once occupancy makes the empty slot a proof of
//!   absence.

pub mod map;
pub mod partitioner;
pub mod store;

#[cfg(test)]
mod tests;
