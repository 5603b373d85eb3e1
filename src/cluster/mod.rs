//! Rank Fabric Module
//!
//! The communication layer between ranks: a fixed-roster TCP mesh carrying
//! length-prefixed bincode frames, plus the epoch barrier that separates the
//! table construction phase from the traversal phase.
//!
//! ## Core Concepts
//! - **Static roster**: Every rank is launched with the same ordered address
//!   list; its rank id is its index in that list. There is no discovery and
//!   no failure detection.
//! - **Remote operations**: Each probe of the distributed table is one
//!   request/response round trip to the owning rank. Requests addressed to
//!   the local rank run through the identical dispatch path without touching
//!   a socket, so every slot mutation flows through one code path.
//! - **Barrier**: Rank 0 hosts an epoch-counting coordinator; a rank's
//!   barrier-arrive request is answered only once all ranks have arrived.

pub mod barrier;
pub mod fabric;
pub mod protocol;
