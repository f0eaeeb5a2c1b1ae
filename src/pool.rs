// ABOUTME: Bounded per-kind freelists recycling task shells
// ABOUTME: Released tasks are cleared before re-entering circulation

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use crate::engine::task::TaskHandle;

/// Default upper bound on each kind's freelist.
pub const DEFAULT_POOL_CAP: usize = 100;

struct PoolInner {
    free: HashMap<&'static str, Vec<TaskHandle>>,
    cap: usize,
}

/// Recycler for task shells, keyed by the concrete work kind. A released
/// task is `clear`ed (default priority, no prerequisites, no subscribers)
/// before it re-enters circulation; releases beyond the per-kind cap are
/// cleared and discarded.
///
/// `TaskPool` is a cheap-clone handle over shared state so `auto_release`
/// callbacks and embedding code can hold their own reference. Like the
/// rest of the core it is single-threaded.
#[derive(Clone)]
pub struct TaskPool {
    inner: Rc<RefCell<PoolInner>>,
}

impl TaskPool {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_POOL_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PoolInner {
                free: HashMap::new(),
                cap: cap.max(1),
            })),
        }
    }

    /// Take a recycled task of the given kind, if one is available.
    pub fn acquire(&self, kind: &str) -> Option<TaskHandle> {
        self.inner
            .borrow_mut()
            .free
            .get_mut(kind)
            .and_then(Vec::pop)
    }

    /// Take a recycled task of the given kind, or build a fresh one.
    pub fn acquire_or(&self, kind: &str, build: impl FnOnce() -> TaskHandle) -> TaskHandle {
        self.acquire(kind).unwrap_or_else(build)
    }

    /// Clear the task and return it to its kind's freelist. Over-cap
    /// releases are discarded.
    pub fn release(&self, task: TaskHandle) {
        task.clear();
        let kind = task.kind();
        let mut inner = self.inner.borrow_mut();
        let cap = inner.cap;
        let freelist = inner.free.entry(kind).or_default();
        if freelist.len() < cap {
            freelist.push(task);
        } else {
            debug!("pool for {kind} is full, discarding task {}", task.id());
        }
    }

    /// Subscribe to the task's terminal events so it returns to this pool
    /// on completion, failure, or cancellation. The subscriptions hold
    /// only weak references, so an otherwise-dropped task is not kept
    /// alive by its own callback.
    pub fn auto_release(&self, task: &TaskHandle) {
        let hook = {
            let pool = self.clone();
            let weak = task.downgrade();
            move |_id| {
                if let Some(task) = weak.upgrade() {
                    pool.release(task);
                }
            }
        };
        let on_completed = hook.clone();
        let on_cancelled = hook.clone();
        let failed_hook = hook;
        let _ = task
            .clone()
            .on_completed(on_completed)
            .on_cancelled(on_cancelled)
            .on_failed(move |id, _| failed_hook(id));
    }

    /// Pre-populate a kind's freelist with `count` cleared tasks built by
    /// `build`. Clamped so the freelist never exceeds the cap.
    pub fn prewarm(&self, count: usize, build: impl Fn() -> TaskHandle) {
        for _ in 0..count {
            let task = build();
            task.clear();
            let kind = task.kind();
            let mut inner = self.inner.borrow_mut();
            let cap = inner.cap;
            let freelist = inner.free.entry(kind).or_default();
            if freelist.len() >= cap {
                break;
            }
            freelist.push(task);
        }
    }

    /// Number of recycled tasks currently available for a kind.
    pub fn size(&self, kind: &str) -> usize {
        self.inner
            .borrow()
            .free
            .get(kind)
            .map_or(0, Vec::len)
    }

    pub fn cap(&self) -> usize {
        self.inner.borrow().cap
    }

    pub fn clear_kind(&self, kind: &str) {
        self.inner.borrow_mut().free.remove(kind);
    }

    pub fn clear_all(&self) {
        self.inner.borrow_mut().free.clear();
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new()
    }
}
