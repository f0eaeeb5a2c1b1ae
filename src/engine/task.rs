// ABOUTME: The uniform task protocol shared by leaf jobs and combinators
// ABOUTME: Owns identity, status, progress, retry, dependency gating, and lifecycle events

use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::error::TaskError;
use super::status::TaskStatus;
use crate::tasks::{StepOutcome, Work};

/// Process-unique task identity, assigned monotonically at construction.
pub type TaskId = u64;

/// Progress deltas below this threshold do not fire the progress event.
pub const PROGRESS_EPSILON: f32 = 1e-3;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> TaskId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

type StartedFn = Box<dyn FnMut(TaskId)>;
type CompletedFn = Box<dyn FnMut(TaskId)>;
type FailedFn = Box<dyn FnMut(TaskId, &TaskError)>;
type CancelledFn = Box<dyn FnMut(TaskId)>;
type ProgressFn = Box<dyn FnMut(TaskId, f32)>;

/// Lifecycle subscription slots. Append-only; `clear` drops them and bumps
/// the epoch so slots taken out for an in-flight emit are not spliced back.
#[derive(Default)]
struct EventSlots {
    started: SmallVec<[StartedFn; 1]>,
    completed: SmallVec<[CompletedFn; 1]>,
    failed: SmallVec<[FailedFn; 1]>,
    cancelled: SmallVec<[CancelledFn; 1]>,
    progress: SmallVec<[ProgressFn; 1]>,
    epoch: u64,
}

pub(crate) struct Task {
    id: TaskId,
    priority: i32,
    status: TaskStatus,
    progress: f32,
    last_reported: f32,
    prerequisites: SmallVec<[TaskHandle; 2]>,
    max_retries: u32,
    retries: u32,
    failure: Option<Rc<TaskError>>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    events: EventSlots,
    work: Box<dyn Work>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.work.kind())
            .field("status", &self.status)
            .field("priority", &self.priority)
            .field("progress", &self.progress)
            .finish()
    }
}

/// Shared handle to a task. The core is single-threaded, so handles are
/// plain `Rc` clones; a child may be held by a parent combinator and the
/// runner registry at the same time.
#[derive(Clone)]
pub struct TaskHandle(Rc<RefCell<Task>>);

/// Non-owning handle used where a strong reference would form a cycle
/// (e.g. a task subscribing a callback that refers back to itself).
#[derive(Clone)]
pub struct WeakTaskHandle(Weak<RefCell<Task>>);

impl WeakTaskHandle {
    pub fn upgrade(&self) -> Option<TaskHandle> {
        self.0.upgrade().map(TaskHandle)
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.borrow().fmt(f)
    }
}

impl TaskHandle {
    /// Wrap a concrete work unit into a schedulable task.
    pub fn new(work: impl Work + 'static) -> Self {
        Self::from_boxed(Box::new(work))
    }

    pub fn from_boxed(work: Box<dyn Work>) -> Self {
        Self(Rc::new(RefCell::new(Task {
            id: next_id(),
            priority: 0,
            status: TaskStatus::Pending,
            progress: 0.0,
            last_reported: 0.0,
            prerequisites: SmallVec::new(),
            max_retries: 0,
            retries: 0,
            failure: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            events: EventSlots::default(),
            work,
        })))
    }

    pub fn downgrade(&self) -> WeakTaskHandle {
        WeakTaskHandle(Rc::downgrade(&self.0))
    }

    pub fn id(&self) -> TaskId {
        self.0.borrow().id
    }

    /// Stable label of the underlying work kind (keys the task pool).
    pub fn kind(&self) -> &'static str {
        self.0.borrow().work.kind()
    }

    pub fn status(&self) -> TaskStatus {
        self.0.borrow().status
    }

    pub fn progress(&self) -> f32 {
        self.0.borrow().progress
    }

    pub fn priority(&self) -> i32 {
        self.0.borrow().priority
    }

    /// Mutate the priority in place. When the task sits in a priority
    /// scheduler and this is called outside `execute`, follow up with
    /// `PriorityScheduler::reprioritize` so the entry re-sorts.
    pub fn set_priority(&self, priority: i32) {
        self.0.borrow_mut().priority = priority;
    }

    pub fn max_retries(&self) -> u32 {
        self.0.borrow().max_retries
    }

    pub fn set_max_retries(&self, retries: u32) {
        self.0.borrow_mut().max_retries = retries;
    }

    pub fn retries(&self) -> u32 {
        self.0.borrow().retries
    }

    /// The stored cause once the task has reached `Failed`.
    pub fn failure(&self) -> Option<Rc<TaskError>> {
        self.0.borrow().failure.clone()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.0.borrow().created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.0.borrow().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.0.borrow().finished_at
    }

    /// Register a prerequisite: this task stays Pending until `dep` has
    /// completed. A task can never depend on itself.
    pub fn add_prerequisite(&self, dep: &TaskHandle) {
        if Rc::ptr_eq(&self.0, &dep.0) {
            warn!("task {} cannot depend on itself, ignoring", self.id());
            return;
        }
        self.0.borrow_mut().prerequisites.push(dep.clone());
    }

    pub fn prerequisite_ids(&self) -> Vec<TaskId> {
        self.0
            .borrow()
            .prerequisites
            .iter()
            .map(TaskHandle::id)
            .collect()
    }

    fn prerequisites_met(&self) -> bool {
        let task = self.0.borrow();
        task.prerequisites.iter().all(|dep| {
            if Rc::ptr_eq(&self.0, &dep.0) {
                return false;
            }
            dep.status() == TaskStatus::Completed
        })
    }

    /// Advance the task by one tick. Returns `true` when the task is done
    /// and should be dropped by its scheduler.
    ///
    /// This is the only driver of forward motion. Terminal tasks report
    /// done immediately, paused tasks and tasks with unmet prerequisites
    /// report not-done without advancing.
    pub fn execute(&self, dt: f32) -> bool {
        {
            let task = self.0.borrow();
            match task.status {
                TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Failed => return true,
                TaskStatus::Paused => return false,
                TaskStatus::Pending | TaskStatus::Running => {}
            }
        }
        if !self.prerequisites_met() {
            return false;
        }

        let newly_started = {
            let mut task = self.0.borrow_mut();
            if task.status == TaskStatus::Pending {
                task.status = TaskStatus::Running;
                task.started_at = Some(Utc::now());
                true
            } else {
                false
            }
        };
        if newly_started {
            self.emit_started();
        }

        let stepped = {
            let mut task = self.0.borrow_mut();
            task.work.step(dt)
        };

        match stepped {
            Ok(StepOutcome::Continue) => {
                if let Some(progress) = self.refresh_progress() {
                    self.emit_progress(progress);
                }
                false
            }
            Ok(StepOutcome::Complete) => {
                let report = {
                    let mut task = self.0.borrow_mut();
                    task.status = TaskStatus::Completed;
                    task.progress = 1.0;
                    task.finished_at = Some(Utc::now());
                    let changed = (1.0 - task.last_reported).abs() > PROGRESS_EPSILON;
                    task.last_reported = 1.0;
                    changed
                };
                if report {
                    self.emit_progress(1.0);
                }
                self.emit_completed();
                true
            }
            Ok(StepOutcome::Interrupt) => {
                {
                    let mut task = self.0.borrow_mut();
                    debug!("task {} interrupted by its own step, cancelling", task.id);
                    task.status = TaskStatus::Cancelled;
                    task.finished_at = Some(Utc::now());
                }
                self.emit_cancelled();
                true
            }
            Err(cause) => self.fail(cause),
        }
    }

    /// Consume one retry or transition to Failed with the cause.
    fn fail(&self, cause: TaskError) -> bool {
        let exhausted = {
            let mut task = self.0.borrow_mut();
            task.retries += 1;
            if task.retries <= task.max_retries {
                debug!(
                    "task {} failed (attempt {}/{}), retrying: {}",
                    task.id, task.retries, task.max_retries, cause
                );
                task.status = TaskStatus::Pending;
                task.progress = 0.0;
                task.last_reported = 0.0;
                task.started_at = None;
                task.work.on_reset();
                false
            } else {
                warn!("task {} failed: {}", task.id, cause);
                task.status = TaskStatus::Failed;
                task.finished_at = Some(Utc::now());
                task.failure = Some(Rc::new(cause));
                true
            }
        };
        if exhausted {
            self.emit_failed();
        }
        exhausted
    }

    /// Cancel the task. No-op on terminal tasks. Children of a cancelled
    /// composite are not cancelled automatically.
    pub fn cancel(&self) {
        {
            let mut task = self.0.borrow_mut();
            if task.status.is_terminal() {
                return;
            }
            task.status = TaskStatus::Cancelled;
            task.finished_at = Some(Utc::now());
        }
        self.emit_cancelled();
    }

    /// Suspend a running task. Anything else is a logged no-op.
    pub fn pause(&self) {
        let mut task = self.0.borrow_mut();
        if task.status == TaskStatus::Running {
            task.status = TaskStatus::Paused;
        } else {
            debug!("pause ignored for task {} ({})", task.id, task.status);
        }
    }

    /// Resume a paused task. Anything else is a logged no-op.
    pub fn resume(&self) {
        let mut task = self.0.borrow_mut();
        if task.status == TaskStatus::Paused {
            task.status = TaskStatus::Running;
        } else {
            debug!("resume ignored for task {} ({})", task.id, task.status);
        }
    }

    /// Restore the task to a fresh Pending state. Identity, priority,
    /// prerequisites, and subscribers survive; retry and progress state
    /// do not. Idempotent.
    pub fn reset(&self) {
        let mut task = self.0.borrow_mut();
        task.status = TaskStatus::Pending;
        task.progress = 0.0;
        task.last_reported = 0.0;
        task.retries = 0;
        task.failure = None;
        task.started_at = None;
        task.finished_at = None;
        task.work.on_reset();
    }

    /// Reset plus: drop priority, prerequisites, and all subscribers.
    /// The pool calls this before a task re-enters its freelist.
    pub fn clear(&self) {
        self.reset();
        let mut task = self.0.borrow_mut();
        task.priority = 0;
        task.prerequisites.clear();
        task.events.started.clear();
        task.events.completed.clear();
        task.events.failed.clear();
        task.events.cancelled.clear();
        task.events.progress.clear();
        task.events.epoch += 1;
    }

    fn refresh_progress(&self) -> Option<f32> {
        let mut task = self.0.borrow_mut();
        let progress = task.work.progress().clamp(0.0, 1.0);
        task.progress = progress;
        if (progress - task.last_reported).abs() > PROGRESS_EPSILON {
            task.last_reported = progress;
            Some(progress)
        } else {
            None
        }
    }

    // -- lifecycle subscriptions (append-only, chainable) --

    pub fn on_started(self, f: impl FnMut(TaskId) + 'static) -> Self {
        self.0.borrow_mut().events.started.push(Box::new(f));
        self
    }

    pub fn on_completed(self, f: impl FnMut(TaskId) + 'static) -> Self {
        self.0.borrow_mut().events.completed.push(Box::new(f));
        self
    }

    pub fn on_failed(self, f: impl FnMut(TaskId, &TaskError) + 'static) -> Self {
        self.0.borrow_mut().events.failed.push(Box::new(f));
        self
    }

    pub fn on_cancelled(self, f: impl FnMut(TaskId) + 'static) -> Self {
        self.0.borrow_mut().events.cancelled.push(Box::new(f));
        self
    }

    pub fn on_progress(self, f: impl FnMut(TaskId, f32) + 'static) -> Self {
        self.0.borrow_mut().events.progress.push(Box::new(f));
        self
    }

    // -- event emission --
    //
    // Slots are taken out of the cell, invoked with no borrow held, then
    // spliced back together with anything subscribed during the callbacks.
    // If `clear` ran in between (epoch bumped), the taken slots are dropped
    // instead of restored.

    fn emit_started(&self) {
        let (id, epoch, mut slots) = {
            let mut task = self.0.borrow_mut();
            (
                task.id,
                task.events.epoch,
                std::mem::take(&mut task.events.started),
            )
        };
        for cb in slots.iter_mut() {
            cb(id);
        }
        let mut task = self.0.borrow_mut();
        if task.events.epoch == epoch {
            let added = std::mem::replace(&mut task.events.started, slots);
            task.events.started.extend(added);
        }
    }

    fn emit_completed(&self) {
        let (id, epoch, mut slots) = {
            let mut task = self.0.borrow_mut();
            (
                task.id,
                task.events.epoch,
                std::mem::take(&mut task.events.completed),
            )
        };
        for cb in slots.iter_mut() {
            cb(id);
        }
        let mut task = self.0.borrow_mut();
        if task.events.epoch == epoch {
            let added = std::mem::replace(&mut task.events.completed, slots);
            task.events.completed.extend(added);
        }
    }

    fn emit_failed(&self) {
        let (id, epoch, cause, mut slots) = {
            let mut task = self.0.borrow_mut();
            let cause = match task.failure.clone() {
                Some(cause) => cause,
                None => return,
            };
            (
                task.id,
                task.events.epoch,
                cause,
                std::mem::take(&mut task.events.failed),
            )
        };
        for cb in slots.iter_mut() {
            cb(id, cause.as_ref());
        }
        let mut task = self.0.borrow_mut();
        if task.events.epoch == epoch {
            let added = std::mem::replace(&mut task.events.failed, slots);
            task.events.failed.extend(added);
        }
    }

    fn emit_cancelled(&self) {
        let (id, epoch, mut slots) = {
            let mut task = self.0.borrow_mut();
            (
                task.id,
                task.events.epoch,
                std::mem::take(&mut task.events.cancelled),
            )
        };
        for cb in slots.iter_mut() {
            cb(id);
        }
        let mut task = self.0.borrow_mut();
        if task.events.epoch == epoch {
            let added = std::mem::replace(&mut task.events.cancelled, slots);
            task.events.cancelled.extend(added);
        }
    }

    fn emit_progress(&self, progress: f32) {
        let (id, epoch, mut slots) = {
            let mut task = self.0.borrow_mut();
            (
                task.id,
                task.events.epoch,
                std::mem::take(&mut task.events.progress),
            )
        };
        for cb in slots.iter_mut() {
            cb(id, progress);
        }
        let mut task = self.0.borrow_mut();
        if task.events.epoch == epoch {
            let added = std::mem::replace(&mut task.events.progress, slots);
            task.events.progress.extend(added);
        }
    }
}
