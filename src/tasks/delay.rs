// ABOUTME: Timed delay task accumulating tick deltas toward a duration
// ABOUTME: Optionally runs a follow-up child after the wait elapses

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;
use crate::engine::status::TaskStatus;
use crate::engine::task::TaskHandle;

/// Accumulates `dt` until it reaches the configured duration. A follow-up
/// child, when present, is executed on the ticks after the wait completes.
///
/// Progress always reserves half its range for the wait phase: a bare
/// delay reports `0.5 * elapsed/duration` until it completes, a delay with
/// a follow-up maps wait and child 50/50.
pub struct Delay {
    duration: f32,
    elapsed: f32,
    follow: Option<TaskHandle>,
}

impl Delay {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            elapsed: 0.0,
            follow: None,
        }
    }

    /// Attach a child task to run once the wait has elapsed.
    pub fn then(duration: f32, follow: TaskHandle) -> Self {
        Self {
            duration: duration.max(0.0),
            elapsed: 0.0,
            follow: Some(follow),
        }
    }

    fn wait_fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}

impl Work for Delay {
    fn step(&mut self, dt: f32) -> Result<StepOutcome, TaskError> {
        if self.elapsed < self.duration {
            self.elapsed += dt;
            if self.elapsed < self.duration {
                return Ok(StepOutcome::Continue);
            }
            // wait satisfied this tick; the follow-up starts on the next
            return match self.follow {
                Some(_) => Ok(StepOutcome::Continue),
                None => Ok(StepOutcome::Complete),
            };
        }
        match &self.follow {
            Some(child) => {
                if child.execute(dt) {
                    match child.status() {
                        TaskStatus::Completed => Ok(StepOutcome::Complete),
                        _ => Ok(StepOutcome::Interrupt),
                    }
                } else {
                    Ok(StepOutcome::Continue)
                }
            }
            None => Ok(StepOutcome::Complete),
        }
    }

    fn progress(&self) -> f32 {
        let child = self
            .follow
            .as_ref()
            .map(TaskHandle::progress)
            .unwrap_or(0.0);
        0.5 * self.wait_fraction() + 0.5 * child
    }

    fn on_reset(&mut self) {
        self.elapsed = 0.0;
        if let Some(child) = &self.follow {
            child.reset();
        }
    }

    fn kind(&self) -> &'static str {
        "delay"
    }
}
