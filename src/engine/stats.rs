// ABOUTME: Introspection snapshot of a runner and its schedulers
// ABOUTME: Serializable counts by status plus per-scheduler queue state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time view of one scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub name: String,
    pub policy: String,
    pub queued: usize,
    pub cap: usize,
    pub running: bool,
}

/// Point-in-time view of a runner: registered task counts broken down by
/// status, plus every scheduler's queue state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerStats {
    pub generated_at: DateTime<Utc>,
    pub running: bool,
    pub total_tasks: usize,
    pub by_status: BTreeMap<String, usize>,
    pub schedulers: Vec<SchedulerStats>,
}

impl std::fmt::Display for RunnerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "runner: {} ({} registered tasks)",
            if self.running { "running" } else { "paused" },
            self.total_tasks
        )?;
        for (status, count) in &self.by_status {
            writeln!(f, "  {status}: {count}")?;
        }
        for scheduler in &self.schedulers {
            writeln!(
                f,
                "  [{}] {}: {} queued, cap {}, {}",
                scheduler.name,
                scheduler.policy,
                scheduler.queued,
                scheduler.cap,
                if scheduler.running { "running" } else { "paused" }
            )?;
        }
        Ok(())
    }
}
