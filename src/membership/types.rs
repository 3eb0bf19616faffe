use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Length of a generated worker identity.
const ID_LEN: usize = 5;

/// Identity of a worker process; its lexicographic order is its ring position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Generates a fresh random identity of lowercase ASCII letters.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..ID_LEN)
            .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A worker as seen by a liveness registry.
///
/// Two records are equal when they describe the same identity, whatever their
/// address or timestamps.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub ip: String,
    pub port: u16,
    pub created_at: Instant,
    pub last_seen: Instant,
}

impl WorkerRecord {
    pub fn new(id: WorkerId, ip: impl Into<String>, port: u16, now: Instant) -> Self {
        Self {
            id,
            ip: ip.into(),
            port,
            created_at: now,
            last_seen: now,
        }
    }

    /// `ip:port`, as used in worker URLs.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl PartialEq for WorkerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WorkerRecord {}

/// One `identity,ip:port` line of the worker list exchanged with the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEntry {
    pub id: WorkerId,
    pub ip: String,
    pub port: u16,
}
