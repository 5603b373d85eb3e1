//! Distributed De Bruijn Graph Assembler Library
//!
//! This library crate defines the core modules of the assembler. It serves as
//! the foundation for the binary executable (`main.rs`), which launches one
//! rank of the cooperating job.
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`kmer`**: The data model. Bit-packed DNA k-mers, extension alphabet,
//!   and the k-mer file ingest (sharded across ranks).
//! - **`cluster`**: The communication layer. A fixed-roster TCP mesh between
//!   ranks carrying length-prefixed binary remote operations, plus the
//!   epoch barrier that delimits the assembly phases.
//! - **`table`**: The distributed state layer. One logical hash table split
//!   into per-rank slot stores, with atomic slot reservation and linear
//!   probing across partition boundaries.
//! - **`assembly`**: The driver. Inserts each rank's k-mer shard, collects
//!   start nodes, and walks forward extensions into contigs.

pub mod assembly;
pub mod cluster;
pub mod kmer;
pub mod table;
