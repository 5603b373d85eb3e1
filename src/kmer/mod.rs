//! K-mer Data Model
//!
//! Bit-packed DNA k-mers, the extension alphabet, and the k-mer file ingest.
//!
//! ## Core Concepts
//! - **Packing**: Each base occupies two bits, so equality and hashing work on
//!   the packed bytes instead of string renderings. The hash is deterministic
//!   across ranks, which the table's global probe sequence depends on.
//! - **Extensions**: Every k-mer carries a backward and a forward extension
//!   base; `F` marks a missing edge. A missing backward edge marks a start
//!   node, a missing forward edge terminates a contig.
//! - **Sharding**: `read_kmers` hands each rank a contiguous slice of the
//!   input file; the shards cover the file exactly once.

pub mod io;
pub mod types;

#[cfg(test)]
mod tests;
