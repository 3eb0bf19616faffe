//! Membership Module
//!
//! Tracks which workers are alive and where each one sits on the ring.
//!
//! ## Core Mechanisms
//! - **Liveness**: Workers heartbeat the coordinator every 5 seconds; a worker silent for
//!   more than 15 seconds is evicted, lazily on reads and by a periodic sweep.
//! - **Membership view**: Each worker pulls the coordinator's live list and merges it into
//!   its own `LivenessRegistry` with the same insert-or-refresh rule.
//! - **Ring**: Identities sorted ascending form a ring; a worker replicates to its two
//!   successors and recovers from its two predecessors.

pub mod registry;
pub mod ring;
pub mod types;
