use super::types::{WorkerEntry, WorkerId, WorkerRecord};

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Maximum silence before a worker is considered dead.
pub const LIVENESS_WINDOW: Duration = Duration::from_secs(15);

/// Map of live workers keyed by identity.
///
/// Used both by the coordinator (fed by pings) and by every worker as its
/// local membership view (fed by pulls of the coordinator's list). Expired
/// entries are removed lazily on every read and periodically by
/// [`LivenessRegistry::start_sweeper`]; a removed worker only comes back
/// through a new heartbeat, as a fresh record.
pub struct LivenessRegistry {
    workers: DashMap<WorkerId, WorkerRecord>,
    window: Duration,
}

impl LivenessRegistry {
    pub fn new(window: Duration) -> Arc<Self> {
        Arc::new(Self {
            workers: DashMap::new(),
            window,
        })
    }

    /// Registers `id` or refreshes its last-seen time.
    ///
    /// Returns `true` when the worker was not known before.
    pub fn heartbeat(&self, id: WorkerId, ip: &str, port: u16) -> bool {
        self.heartbeat_at(id, ip, port, Instant::now())
    }

    pub fn heartbeat_at(&self, id: WorkerId, ip: &str, port: u16, now: Instant) -> bool {
        if let Some(mut record) = self.workers.get_mut(&id) {
            if now.duration_since(record.last_seen) <= self.window {
                record.last_seen = now;
                if record.ip != ip || record.port != port {
                    tracing::info!(
                        "Worker {} moved from {} to {}:{}",
                        id,
                        record.addr(),
                        ip,
                        port
                    );
                    record.ip = ip.to_string();
                    record.port = port;
                }
                return false;
            }
        }

        tracing::info!("Registered worker {} at {}:{}", id, ip, port);
        self.workers
            .insert(id.clone(), WorkerRecord::new(id, ip, port, now));
        true
    }

    /// Removes every record not refreshed within the liveness window.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.workers.len();
        self.workers.retain(|id, record| {
            let alive = now.duration_since(record.last_seen) <= self.window;
            if !alive {
                tracing::info!(
                    "Evicting worker {} at {} (silent for {:?})",
                    id,
                    record.addr(),
                    now.duration_since(record.last_seen)
                );
            }
            alive
        });
        before.saturating_sub(self.workers.len())
    }

    /// Live workers, after pruning expired ones.
    pub fn snapshot(&self) -> Vec<WorkerRecord> {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> Vec<WorkerRecord> {
        self.evict_expired_at(now);
        self.workers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// The live record for `id`, if any.
    pub fn get(&self, id: &WorkerId) -> Option<WorkerRecord> {
        let record = self.workers.get(id)?;
        if Instant::now().duration_since(record.last_seen) > self.window {
            return None;
        }
        Some(record.clone())
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Renders the live set as `count\n` followed by `id,ip:port\n` lines.
    pub fn render_worker_list(&self) -> String {
        render_worker_list(&self.snapshot())
    }

    /// Spawns the periodic eviction sweep.
    pub fn start_sweeper(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let evicted = self.evict_expired();
                if evicted > 0 {
                    tracing::info!(
                        "Liveness sweep evicted {} worker(s), {} remaining",
                        evicted,
                        self.len()
                    );
                }
            }
        })
    }
}

pub fn render_worker_list(workers: &[WorkerRecord]) -> String {
    let mut out = format!("{}\n", workers.len());
    for worker in workers {
        out.push_str(&format!("{},{}:{}\n", worker.id, worker.ip, worker.port));
    }
    out
}

/// Parses the output of [`render_worker_list`].
///
/// The leading count is informational; malformed lines are skipped.
pub fn parse_worker_list(text: &str) -> Vec<WorkerEntry> {
    text.lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let entry = parse_worker_line(line);
            if entry.is_none() {
                tracing::warn!("Skipping malformed worker line {:?}", line);
            }
            entry
        })
        .collect()
}

fn parse_worker_line(line: &str) -> Option<WorkerEntry> {
    let (id, addr) = line.rsplit_once(',')?;
    let (ip, port) = addr.rsplit_once(':')?;
    let id = id.trim();
    if id.is_empty() || ip.trim().is_empty() {
        return None;
    }

    Some(WorkerEntry {
        id: WorkerId(id.to_string()),
        ip: ip.trim().to_string(),
        port: port.trim().parse().ok()?,
    })
}
