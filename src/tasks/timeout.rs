// ABOUTME: Timeout wrapper bounding a child task's wall-clock budget
// ABOUTME: Cancels the child and raises a timeout cause when the budget elapses

use tracing::warn;

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;
use crate::engine::status::TaskStatus;
use crate::engine::task::TaskHandle;

/// Wraps one child with a duration budget. The accumulator advances before
/// the child each tick; on expiry the child is cancelled and a timeout
/// cause is raised through the normal failure path, so the wrapper itself
/// participates in retry (a retried wrapper rewinds the clock and resets
/// the child).
pub struct Timeout {
    child: TaskHandle,
    limit: f32,
    elapsed: f32,
}

impl Timeout {
    pub fn new(child: TaskHandle, limit: f32) -> Self {
        Self {
            child,
            limit: limit.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }
}

impl Work for Timeout {
    fn step(&mut self, dt: f32) -> Result<StepOutcome, TaskError> {
        self.elapsed += dt;
        if self.elapsed >= self.limit {
            warn!(
                "task {} exceeded its {:.3}s budget, cancelling",
                self.child.id(),
                self.limit
            );
            self.child.cancel();
            return Err(TaskError::Timeout { limit: self.limit });
        }
        if self.child.execute(dt) {
            match self.child.status() {
                TaskStatus::Completed => Ok(StepOutcome::Complete),
                _ => Ok(StepOutcome::Interrupt),
            }
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    fn progress(&self) -> f32 {
        self.child.progress()
    }

    fn on_reset(&mut self) {
        self.elapsed = 0.0;
        self.child.reset();
    }

    fn kind(&self) -> &'static str {
        "timeout"
    }
}
