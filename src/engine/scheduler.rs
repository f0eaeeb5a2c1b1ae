// ABOUTME: Per-tick scheduling policies over submitted tasks
// ABOUTME: Frame-fair FIFO with re-enqueue and priority-ordered execution

use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::{debug, warn};

use super::task::{TaskHandle, TaskId};

/// Default number of tasks a scheduler services per tick.
pub const DEFAULT_MAX_PER_TICK: usize = 5;

/// A collection policy applied once per tick. Both implementations are
/// single-threaded and must not be mutated from inside task callbacks.
pub trait Scheduler {
    /// Short policy label used in statistics output.
    fn policy(&self) -> &'static str;

    fn schedule(&mut self, task: TaskHandle);

    fn schedule_all(&mut self, tasks: Vec<TaskHandle>) {
        for task in tasks {
            self.schedule(task);
        }
    }

    fn remove(&mut self, id: TaskId) -> Option<TaskHandle>;

    fn remove_task(&mut self, task: &TaskHandle) -> Option<TaskHandle> {
        self.remove(task.id())
    }

    fn get(&self, id: TaskId) -> Option<TaskHandle>;

    fn clear(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn is_running(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn max_per_tick(&self) -> usize;

    /// Set the per-tick cap. Clamped to a minimum of 1.
    fn set_max_per_tick(&mut self, cap: usize);

    /// Apply a priority change made outside `execute`. The base
    /// implementation just stores the new priority; order-sensitive
    /// schedulers re-sort their entry.
    fn reprioritize(&mut self, id: TaskId, priority: i32) {
        if let Some(task) = self.get(id) {
            task.set_priority(priority);
        }
    }

    /// Service up to `max_per_tick` tasks. Does nothing while paused.
    fn tick(&mut self, dt: f32);
}

/// FIFO scheduler giving every queued task a fair share of frames.
///
/// Each tick dequeues up to the cap, executes, and re-enqueues unfinished
/// tasks at the tail, so long-running tasks cannot starve later arrivals.
pub struct FrameScheduler {
    queue: VecDeque<TaskHandle>,
    index: HashMap<TaskId, TaskHandle>,
    running: bool,
    cap: usize,
    submitted: u64,
    completed: u64,
    on_drained: Option<Box<dyn FnOnce()>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_MAX_PER_TICK)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            index: HashMap::new(),
            running: true,
            cap: cap.max(1),
            submitted: 0,
            completed: 0,
            on_drained: None,
        }
    }

    /// Tasks accepted over this scheduler's lifetime.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Tasks dropped after reporting done.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// One-shot callback fired the first time the queue drains to empty
    /// during a tick. Consumed on fire; install a new callback to re-arm.
    pub fn set_on_drained(&mut self, callback: impl FnOnce() + 'static) {
        self.on_drained = Some(Box::new(callback));
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for FrameScheduler {
    fn policy(&self) -> &'static str {
        "frame-fair"
    }

    fn schedule(&mut self, task: TaskHandle) {
        let id = task.id();
        if self.index.contains_key(&id) {
            warn!("task {} is already scheduled, ignoring", id);
            return;
        }
        debug!("scheduling task {} ({})", id, task.kind());
        self.index.insert(id, task.clone());
        self.queue.push_back(task);
        self.submitted += 1;
    }

    fn remove(&mut self, id: TaskId) -> Option<TaskHandle> {
        let found = self.index.remove(&id)?;
        self.queue.retain(|task| task.id() != id);
        Some(found)
    }

    fn get(&self, id: TaskId) -> Option<TaskHandle> {
        self.index.get(&id).cloned()
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.index.clear();
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn resume(&mut self) {
        self.running = true;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn max_per_tick(&self) -> usize {
        self.cap
    }

    fn set_max_per_tick(&mut self, cap: usize) {
        self.cap = cap.max(1);
    }

    fn tick(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        let budget = self.cap.min(self.queue.len());
        for _ in 0..budget {
            let Some(task) = self.queue.pop_front() else {
                break;
            };
            if task.execute(dt) {
                debug!("task {} done ({}), dropping", task.id(), task.status());
                self.index.remove(&task.id());
                self.completed += 1;
            } else {
                self.queue.push_back(task);
            }
        }
        if self.queue.is_empty() {
            if let Some(callback) = self.on_drained.take() {
                debug!("frame scheduler drained, firing completion callback");
                callback();
            }
        }
    }
}

/// Sort key: priority descending, identity ascending on ties. The id
/// tie-break makes the ordering total, so insertion order is stable for
/// equal priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    priority: Reverse<i32>,
    id: TaskId,
}

impl OrderKey {
    fn new(priority: i32, id: TaskId) -> Self {
        Self {
            priority: Reverse(priority),
            id,
        }
    }
}

/// Priority-ordered scheduler servicing the highest-priority tasks first.
///
/// The tick captures its up-to-cap slice before executing anything, so
/// re-inserts during the tick cannot perturb iteration; a task that is not
/// done is re-inserted under its current priority, which honours priority
/// mutations made inside `execute`.
pub struct PriorityScheduler {
    order: BTreeSet<OrderKey>,
    index: HashMap<TaskId, (TaskHandle, i32)>,
    running: bool,
    cap: usize,
}

impl PriorityScheduler {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_MAX_PER_TICK)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            order: BTreeSet::new(),
            index: HashMap::new(),
            running: true,
            cap: cap.max(1),
        }
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for PriorityScheduler {
    fn policy(&self) -> &'static str {
        "priority"
    }

    fn schedule(&mut self, task: TaskHandle) {
        let id = task.id();
        if self.index.contains_key(&id) {
            warn!("task {} is already scheduled, ignoring", id);
            return;
        }
        let priority = task.priority();
        debug!(
            "scheduling task {} ({}) at priority {}",
            id,
            task.kind(),
            priority
        );
        self.order.insert(OrderKey::new(priority, id));
        self.index.insert(id, (task, priority));
    }

    fn remove(&mut self, id: TaskId) -> Option<TaskHandle> {
        let (task, priority) = self.index.remove(&id)?;
        self.order.remove(&OrderKey::new(priority, id));
        Some(task)
    }

    fn get(&self, id: TaskId) -> Option<TaskHandle> {
        self.index.get(&id).map(|(task, _)| task.clone())
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn resume(&mut self) {
        self.running = true;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn max_per_tick(&self) -> usize {
        self.cap
    }

    fn set_max_per_tick(&mut self, cap: usize) {
        self.cap = cap.max(1);
    }

    fn reprioritize(&mut self, id: TaskId, priority: i32) {
        let Some((task, recorded)) = self.index.get_mut(&id) else {
            warn!("reprioritize: task {} is not scheduled here", id);
            return;
        };
        let old_key = OrderKey::new(*recorded, id);
        task.set_priority(priority);
        *recorded = priority;
        self.order.remove(&old_key);
        self.order.insert(OrderKey::new(priority, id));
    }

    fn tick(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        let slice: SmallVec<[OrderKey; 8]> = self.order.iter().take(self.cap).copied().collect();
        for key in slice {
            let Some((task, _)) = self.index.get(&key.id).map(|entry| entry.clone()) else {
                continue;
            };
            self.order.remove(&key);
            if task.execute(dt) {
                debug!("task {} done ({}), dropping", task.id(), task.status());
                self.index.remove(&key.id);
            } else {
                let priority = task.priority();
                self.order.insert(OrderKey::new(priority, key.id));
                if let Some(entry) = self.index.get_mut(&key.id) {
                    entry.1 = priority;
                }
            }
        }
    }
}
