//! Distributed Key-Value Store Library
//!
//! This library crate defines the modules behind the `kvs` binary (`main.rs`), which runs
//! either a coordinator or a storage worker.
//!
//! ## Architecture Modules
//! - **`config`**: Process configuration and the cluster's timing constants.
//! - **`coordinator`**: The liveness service. Workers ping it and pull its list of live workers.
//! - **`membership`**: Worker identities, the liveness registry (shared by the coordinator and by
//!   each worker's local view) and the identifier-ordered ring used to pick replicas.
//! - **`storage`**: Rows, versioned in-memory tables, file-backed persistent tables and the
//!   table catalog.
//! - **`worker`**: The storage node: HTTP data plane, write replication to ring successors,
//!   membership loops and join-time recovery from ring predecessors.

pub mod config;
pub mod coordinator;
pub mod membership;
pub mod storage;
pub mod worker;
