// ABOUTME: Loop combinator re-running a single child task
// ABOUTME: Bounded by an iteration count or a break predicate

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;
use crate::engine::status::TaskStatus;
use crate::engine::task::TaskHandle;

/// Loop termination policy.
pub enum LoopMode {
    /// Run the child a fixed number of times; -1 repeats forever.
    Count(i32),
    /// Run until the predicate holds. Checked before each iteration and
    /// again after each child completion.
    Until(Box<dyn FnMut() -> bool>),
}

/// Repeats one child, resetting it between iterations. A child that ends
/// failed or cancelled interrupts the loop.
pub struct Repeat {
    child: TaskHandle,
    mode: LoopMode,
    iterations: u32,
}

impl Repeat {
    pub fn times(child: TaskHandle, count: i32) -> Self {
        Self {
            child,
            mode: LoopMode::Count(count),
            iterations: 0,
        }
    }

    pub fn forever(child: TaskHandle) -> Self {
        Self::times(child, -1)
    }

    pub fn until(child: TaskHandle, predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            child,
            mode: LoopMode::Until(Box::new(predicate)),
            iterations: 0,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn bound_reached(&mut self) -> bool {
        match &mut self.mode {
            LoopMode::Count(count) => *count >= 0 && self.iterations >= *count as u32,
            LoopMode::Until(predicate) => predicate(),
        }
    }
}

impl Work for Repeat {
    fn step(&mut self, dt: f32) -> Result<StepOutcome, TaskError> {
        // the bound is checked before an iteration starts, never mid-flight
        if self.child.status() == TaskStatus::Pending && self.bound_reached() {
            return Ok(StepOutcome::Complete);
        }
        if !self.child.execute(dt) {
            return Ok(StepOutcome::Continue);
        }
        match self.child.status() {
            TaskStatus::Completed => {
                self.iterations += 1;
                if self.bound_reached() {
                    Ok(StepOutcome::Complete)
                } else {
                    self.child.reset();
                    Ok(StepOutcome::Continue)
                }
            }
            _ => Ok(StepOutcome::Interrupt),
        }
    }

    fn progress(&self) -> f32 {
        match self.mode {
            LoopMode::Count(count) if count > 0 => {
                (self.iterations as f32 + self.child.progress()) / count as f32
            }
            // unbounded and predicate-driven loops have no defined total
            _ => 0.0,
        }
    }

    fn on_reset(&mut self) {
        self.iterations = 0;
        self.child.reset();
    }

    fn kind(&self) -> &'static str {
        "repeat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::action::ActionJob;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_task(hits: &Rc<Cell<u32>>) -> TaskHandle {
        let probe = Rc::clone(hits);
        TaskHandle::new(ActionJob::infallible(move || probe.set(probe.get() + 1)))
    }

    #[test]
    fn test_fixed_count_runs_child_n_times() {
        let hits = Rc::new(Cell::new(0));
        let mut repeat = Repeat::times(counting_task(&hits), 3);

        assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Continue);
        assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Continue);
        assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Complete);
        assert_eq!(hits.get(), 3);
        assert_eq!(repeat.iterations(), 3);
    }

    #[test]
    fn test_zero_count_completes_without_running_child() {
        let hits = Rc::new(Cell::new(0));
        let mut repeat = Repeat::times(counting_task(&hits), 0);
        assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Complete);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_break_predicate_stops_the_loop() {
        let hits = Rc::new(Cell::new(0u32));
        let probe = Rc::clone(&hits);
        let mut repeat = Repeat::until(counting_task(&hits), move || probe.get() >= 2);

        assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Continue);
        assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Complete);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_unbounded_loop_keeps_going() {
        let hits = Rc::new(Cell::new(0));
        let mut repeat = Repeat::forever(counting_task(&hits));
        for _ in 0..10 {
            assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Continue);
        }
        assert_eq!(hits.get(), 10);
        assert_eq!(repeat.progress(), 0.0);
    }

    #[test]
    fn test_dead_child_interrupts_loop() {
        let broken = TaskHandle::new(ActionJob::new(|| anyhow::bail!("broken")));
        let mut repeat = Repeat::times(broken, 5);
        assert_eq!(repeat.step(0.0).unwrap(), StepOutcome::Interrupt);
    }
}
