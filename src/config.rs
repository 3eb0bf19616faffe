//! Runtime configuration for the coordinator and worker processes.
//!
//! Values come from the command line (see `main.rs`); timings default to the
//! cluster's liveness contract: heartbeats every 5 seconds, eviction after 15.

use std::path::PathBuf;
use std::time::Duration;

use crate::membership::registry::LIVENESS_WINDOW;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
pub const MEMBERSHIP_PULL_INTERVAL: Duration = Duration::from_secs(5);
pub const LIVENESS_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Timeout for pings and worker-list pulls.
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for a single replicated write.
pub const REPLICATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for bulk transfers during recovery.
pub const RECOVERY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub port: u16,
    pub liveness_window: Duration,
    pub sweep_interval: Duration,
}

impl CoordinatorConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            liveness_window: LIVENESS_WINDOW,
            sweep_interval: LIVENESS_SWEEP_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Port the data plane listens on, reported to the coordinator.
    pub port: u16,
    /// Root for the `id` file and persistent table directories.
    pub storage_dir: PathBuf,
    /// Coordinator `host:port`.
    pub coordinator: String,
    pub heartbeat_interval: Duration,
    pub pull_interval: Duration,
    pub sweep_interval: Duration,
    pub liveness_window: Duration,
    pub control_timeout: Duration,
    pub replication_timeout: Duration,
    pub recovery_timeout: Duration,
    /// Membership pulls attempted before join-time recovery gives up waiting
    /// for ring neighbours.
    pub recovery_view_attempts: usize,
}

impl WorkerConfig {
    pub fn new(port: u16, storage_dir: impl Into<PathBuf>, coordinator: impl Into<String>) -> Self {
        Self {
            port,
            storage_dir: storage_dir.into(),
            coordinator: coordinator.into(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            pull_interval: MEMBERSHIP_PULL_INTERVAL,
            sweep_interval: LIVENESS_SWEEP_INTERVAL,
            liveness_window: LIVENESS_WINDOW,
            control_timeout: CONTROL_TIMEOUT,
            replication_timeout: REPLICATION_TIMEOUT,
            recovery_timeout: RECOVERY_TIMEOUT,
            recovery_view_attempts: 3,
        }
    }
}
