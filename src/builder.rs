// ABOUTME: Fluent surface for assembling task trees
// ABOUTME: Free factories for every kind plus chainable combinator methods

use crate::engine::task::TaskHandle;
use crate::tasks::{
    ActionJob, Conditional, Delay, Parallel, PredicateJob, ProgressGauge, ProgressJob, Repeat,
    Sequence, StepwiseJob, Timeout,
};

/// A task running `action` once.
pub fn run(action: impl FnMut() + 'static) -> TaskHandle {
    TaskHandle::new(ActionJob::infallible(action))
}

/// A task running a fallible `action` once; errors feed the retry and
/// failure machinery.
pub fn run_fallible(action: impl FnMut() -> anyhow::Result<()> + 'static) -> TaskHandle {
    TaskHandle::new(ActionJob::new(action))
}

/// A task polling `predicate` until it holds.
pub fn wait_for(predicate: impl FnMut() -> bool + 'static) -> TaskHandle {
    TaskHandle::new(PredicateJob::new(predicate))
}

/// A task waiting `seconds` of accumulated tick time.
pub fn wait(seconds: f32) -> TaskHandle {
    TaskHandle::new(Delay::new(seconds))
}

/// A task waiting `seconds`, then running `follow` as its second phase.
pub fn wait_then(seconds: f32, follow: TaskHandle) -> TaskHandle {
    TaskHandle::new(Delay::then(seconds, follow))
}

/// A progress operation driven by `step`, which sees the current progress
/// and returns whether the operation finished.
pub fn track(step: impl FnMut(f32) -> anyhow::Result<bool> + 'static) -> TaskHandle {
    TaskHandle::new(ProgressJob::new(step))
}

/// An externally driven progress operation; completes when the returned
/// gauge is pushed to 1.
pub fn tracked() -> (TaskHandle, ProgressGauge) {
    let (job, gauge) = ProgressJob::external();
    (TaskHandle::new(job), gauge)
}

/// A task stepping through iterators produced by `source`, one item per
/// tick.
pub fn steps<I, F>(source: F) -> TaskHandle
where
    I: Iterator + 'static,
    F: Fn() -> I + 'static,
{
    TaskHandle::new(StepwiseJob::new(source))
}

/// Children executed one after another.
pub fn sequence(children: Vec<TaskHandle>) -> TaskHandle {
    TaskHandle::new(Sequence::new(children))
}

/// Children executed together; completes when all are done.
pub fn all_of(children: Vec<TaskHandle>) -> TaskHandle {
    TaskHandle::new(Parallel::all(children))
}

/// Children executed together; completes with the first one done.
pub fn any_of(children: Vec<TaskHandle>) -> TaskHandle {
    TaskHandle::new(Parallel::any(children))
}

/// Run `child` a fixed number of times (-1 repeats forever).
pub fn repeat(child: TaskHandle, count: i32) -> TaskHandle {
    TaskHandle::new(Repeat::times(child, count))
}

/// Run `child` until `predicate` holds.
pub fn repeat_until(child: TaskHandle, predicate: impl FnMut() -> bool + 'static) -> TaskHandle {
    TaskHandle::new(Repeat::until(child, predicate))
}

/// Run one of two tasks depending on `predicate`, evaluated on first tick.
pub fn branch(
    predicate: impl FnMut() -> bool + 'static,
    when_true: TaskHandle,
    when_false: TaskHandle,
) -> TaskHandle {
    TaskHandle::new(Conditional::branch(predicate, when_true, when_false))
}

/// Run `task` only when `predicate` holds on first tick.
pub fn when(predicate: impl FnMut() -> bool + 'static, task: TaskHandle) -> TaskHandle {
    TaskHandle::new(Conditional::when(predicate, task))
}

/// Chainable tree-building methods. These either mutate the handle in
/// place and hand it back, or wrap it in a new combinator task.
impl TaskHandle {
    /// Set the scheduling priority (larger runs earlier on the priority
    /// scheduler).
    #[must_use]
    pub fn with_priority(self, priority: i32) -> Self {
        self.set_priority(priority);
        self
    }

    /// Allow `retries` additional attempts after a failure.
    #[must_use]
    pub fn with_retry(self, retries: u32) -> Self {
        self.set_max_retries(retries);
        self
    }

    /// Gate this task on `dep` completing.
    #[must_use]
    pub fn depends_on(self, dep: &TaskHandle) -> Self {
        self.add_prerequisite(dep);
        self
    }

    /// Gate this task on every task in `deps` completing.
    #[must_use]
    pub fn depends_on_all<'a>(self, deps: impl IntoIterator<Item = &'a TaskHandle>) -> Self {
        for dep in deps {
            self.add_prerequisite(dep);
        }
        self
    }

    /// Wrap this task in a timeout of `seconds`.
    #[must_use]
    pub fn with_timeout(self, seconds: f32) -> TaskHandle {
        TaskHandle::new(Timeout::new(self, seconds))
    }

    /// This task, then `next`.
    #[must_use]
    pub fn then(self, next: TaskHandle) -> TaskHandle {
        sequence(vec![self, next])
    }

    /// This task, then a one-shot action.
    #[must_use]
    pub fn then_run(self, action: impl FnMut() + 'static) -> TaskHandle {
        self.then(run(action))
    }

    /// This task, then a delay of `seconds`.
    #[must_use]
    pub fn then_delay(self, seconds: f32) -> TaskHandle {
        self.then(wait(seconds))
    }

    /// Repeat this task `count` times (-1 forever).
    #[must_use]
    pub fn repeated(self, count: i32) -> TaskHandle {
        repeat(self, count)
    }

    /// Repeat this task until `predicate` holds.
    #[must_use]
    pub fn repeated_until(self, predicate: impl FnMut() -> bool + 'static) -> TaskHandle {
        repeat_until(self, predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::status::TaskStatus;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn drive(task: &TaskHandle, dt: f32, max_ticks: u32) -> u32 {
        for tick in 1..=max_ticks {
            if task.execute(dt) {
                return tick;
            }
        }
        panic!("task did not settle within {max_ticks} ticks");
    }

    #[test]
    fn test_then_builds_an_ordered_sequence() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&log);
        let second = Rc::clone(&log);

        let task = run(move || first.borrow_mut().push("first"))
            .then_run(move || second.borrow_mut().push("second"));

        drive(&task, 0.0, 10);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[test]
    fn test_then_delay_waits_between_stages() {
        let task = run(|| {}).then_delay(1.0);
        // action completes, delay has not started accumulating yet
        assert!(!task.execute(0.6));
        assert!(!task.execute(0.6));
        // delay reaches 1.2s of accumulated time
        assert!(task.execute(0.6));
    }

    #[test]
    fn test_with_priority_and_retry_configure_in_place() {
        let task = run(|| {}).with_priority(7).with_retry(2);
        assert_eq!(task.priority(), 7);
        assert_eq!(task.max_retries(), 2);
    }

    #[test]
    fn test_repeated_counts_iterations() {
        let hits = Rc::new(Cell::new(0));
        let probe = Rc::clone(&hits);
        let task = run(move || probe.set(probe.get() + 1)).repeated(4);

        drive(&task, 0.0, 10);
        assert_eq!(hits.get(), 4);
    }

    #[test]
    fn test_with_timeout_wraps_the_task() {
        let task = wait_for(|| false).with_timeout(0.5);
        assert_eq!(task.kind(), "timeout");
        assert!(!task.execute(0.3));
        assert!(task.execute(0.3));
        assert_eq!(task.status(), TaskStatus::Failed);
    }

    #[test]
    fn test_branch_selects_on_first_tick() {
        let chosen = Rc::new(Cell::new(false));
        let probe = Rc::clone(&chosen);
        let task = branch(
            || true,
            run(move || probe.set(true)),
            run(|| unreachable!("false branch must not run")),
        );

        drive(&task, 0.0, 10);
        assert!(chosen.get());
    }

    #[test]
    fn test_depends_on_all_records_every_prerequisite() {
        let dep_a = run(|| {});
        let dep_b = run(|| {});
        let task = run(|| {}).depends_on_all([&dep_a, &dep_b]);
        assert_eq!(task.prerequisite_ids().len(), 2);
    }
}
