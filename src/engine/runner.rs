// ABOUTME: The runner orchestrating named schedulers and the task registry
// ABOUTME: Accepts submissions, fans ticks out, and sweeps finished tasks

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::dependency::DependencyTracker;
use super::error::{Result, RunnerError};
use super::scheduler::{FrameScheduler, PriorityScheduler, Scheduler};
use super::stats::{RunnerStats, SchedulerStats};
use super::status::TaskStatus;
use super::task::{TaskHandle, TaskId};
use crate::pool::TaskPool;

/// Name of the frame-fair scheduler every runner starts with.
pub const DEFAULT_SCHEDULER: &str = "Default";
/// Name of the priority scheduler every runner starts with.
pub const PRIORITY_SCHEDULER: &str = "Priority";

struct Registration {
    task: TaskHandle,
    scheduler: String,
}

/// Owns a registration-ordered set of named schedulers, the global
/// identity registry, the dependency tracker, and the task pool. The host
/// drives everything through [`Runner::tick`].
pub struct Runner {
    schedulers: IndexMap<String, Box<dyn Scheduler>>,
    registry: HashMap<TaskId, Registration>,
    tracker: DependencyTracker,
    pool: TaskPool,
    running: bool,
}

impl Runner {
    /// A runner with the two canonical schedulers registered.
    pub fn new() -> Self {
        let mut schedulers: IndexMap<String, Box<dyn Scheduler>> = IndexMap::new();
        schedulers.insert(
            DEFAULT_SCHEDULER.to_string(),
            Box::new(FrameScheduler::new()),
        );
        schedulers.insert(
            PRIORITY_SCHEDULER.to_string(),
            Box::new(PriorityScheduler::new()),
        );
        Self {
            schedulers,
            registry: HashMap::new(),
            tracker: DependencyTracker::new(),
            pool: TaskPool::new(),
            running: true,
        }
    }

    /// Register (or replace, with a warning) a named scheduler.
    pub fn register_scheduler(&mut self, name: impl Into<String>, scheduler: Box<dyn Scheduler>) {
        let name = name.into();
        if self.schedulers.contains_key(&name) {
            warn!("scheduler {name} is already registered, replacing");
        }
        self.schedulers.insert(name, scheduler);
    }

    pub fn scheduler(&self, name: &str) -> Option<&dyn Scheduler> {
        self.schedulers.get(name).map(|boxed| boxed.as_ref())
    }

    pub fn scheduler_mut(&mut self, name: &str) -> Option<&mut (dyn Scheduler + 'static)> {
        self.schedulers.get_mut(name).map(|boxed| boxed.as_mut())
    }

    /// Submit to the default frame-fair scheduler.
    pub fn submit(&mut self, task: TaskHandle) -> Result<()> {
        self.submit_to(DEFAULT_SCHEDULER, task)
    }

    /// Submit to a named scheduler. Prerequisite edges are recorded at
    /// this point; prerequisites that were never submitted are accepted
    /// with a warning (the dependent simply stays gated).
    pub fn submit_to(&mut self, name: &str, task: TaskHandle) -> Result<()> {
        if !self.schedulers.contains_key(name) {
            warn!("submit to unknown scheduler {name}");
            return Err(RunnerError::UnknownScheduler {
                name: name.to_string(),
            });
        }
        let id = task.id();
        if self.registry.contains_key(&id) {
            warn!("task {id} is already submitted, ignoring");
            return Err(RunnerError::DuplicateTask { id });
        }

        for prerequisite in task.prerequisite_ids() {
            if !self.registry.contains_key(&prerequisite) {
                warn!(
                    "task {id} depends on task {prerequisite}, which was never submitted; \
                     it will stay pending until that task completes"
                );
            }
            self.tracker.record(prerequisite, id);
        }
        if self.tracker.has_cycle() {
            warn!("task {id} closes a dependency cycle; the tasks involved will never run");
        }

        debug!("submitting task {} ({}) to {}", id, task.kind(), name);
        if let Some(scheduler) = self.schedulers.get_mut(name) {
            scheduler.schedule(task.clone());
        }
        self.registry.insert(
            id,
            Registration {
                task,
                scheduler: name.to_string(),
            },
        );
        Ok(())
    }

    pub fn submit_all(&mut self, tasks: Vec<TaskHandle>) -> Result<()> {
        self.submit_all_to(DEFAULT_SCHEDULER, tasks)
    }

    pub fn submit_all_to(&mut self, name: &str, tasks: Vec<TaskHandle>) -> Result<()> {
        for task in tasks {
            self.submit_to(name, task)?;
        }
        Ok(())
    }

    /// Cancel a registered task and remove it from its scheduler.
    pub fn cancel(&mut self, id: TaskId) -> Result<()> {
        let Some(registration) = self.registry.remove(&id) else {
            return Err(RunnerError::TaskNotFound { id });
        };
        registration.task.cancel();
        if let Some(scheduler) = self.schedulers.get_mut(&registration.scheduler) {
            scheduler.remove(id);
        }
        self.tracker.prune(id);
        info!("cancelled task {id}");
        Ok(())
    }

    pub fn get(&self, id: TaskId) -> Option<TaskHandle> {
        self.registry
            .get(&id)
            .map(|registration| registration.task.clone())
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<TaskHandle> {
        self.registry
            .values()
            .filter(|registration| registration.task.status() == status)
            .map(|registration| registration.task.clone())
            .collect()
    }

    /// Number of registered (not yet swept) tasks.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Drop every task and all dependency records.
    pub fn clear(&mut self) {
        for scheduler in self.schedulers.values_mut() {
            scheduler.clear();
        }
        self.registry.clear();
        self.tracker.clear();
    }

    /// The pool this runner owns. `TaskPool` is a cheap-clone handle, so
    /// callers can keep their own reference.
    pub fn pool(&self) -> TaskPool {
        self.pool.clone()
    }

    /// Advance every scheduler by one tick (registration order), then
    /// unregister tasks that reached a terminal state.
    pub fn tick(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        for scheduler in self.schedulers.values_mut() {
            scheduler.tick(dt);
        }
        self.sweep();
    }

    fn sweep(&mut self) {
        // a task leaves the registry when it reaches a terminal state, or
        // when its scheduler already dropped it (auto-released tasks are
        // cleared back to Pending before the sweep runs)
        let finished: Vec<TaskId> = self
            .registry
            .iter()
            .filter(|(id, registration)| {
                registration.task.status().is_terminal()
                    || self
                        .schedulers
                        .get(&registration.scheduler)
                        .map_or(true, |scheduler| scheduler.get(**id).is_none())
            })
            .map(|(&id, _)| id)
            .collect();
        for id in finished {
            if let Some(registration) = self.registry.remove(&id) {
                debug!(
                    "unregistering task {} ({})",
                    id,
                    registration.task.status()
                );
                self.tracker.prune(id);
            }
        }
    }

    /// Serializable snapshot of the runner's current state.
    pub fn snapshot(&self) -> RunnerStats {
        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        for registration in self.registry.values() {
            *by_status
                .entry(registration.task.status().to_string())
                .or_insert(0) += 1;
        }
        RunnerStats {
            generated_at: chrono::Utc::now(),
            running: self.running,
            total_tasks: self.registry.len(),
            by_status,
            schedulers: self
                .schedulers
                .iter()
                .map(|(name, scheduler)| SchedulerStats {
                    name: name.clone(),
                    policy: scheduler.policy().to_string(),
                    queued: scheduler.len(),
                    cap: scheduler.max_per_tick(),
                    running: scheduler.is_running(),
                })
                .collect(),
        }
    }

    /// Human-readable statistics block.
    pub fn statistics(&self) -> String {
        self.snapshot().to_string()
    }

    /// The same snapshot rendered as pretty JSON.
    pub fn statistics_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}
