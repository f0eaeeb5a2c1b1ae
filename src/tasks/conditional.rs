// ABOUTME: Conditional combinator selecting one of two branch tasks
// ABOUTME: Evaluates its predicate once, then delegates to the chosen branch

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;
use crate::engine::status::TaskStatus;
use crate::engine::task::TaskHandle;

enum Selection {
    NotEvaluated,
    Chosen(TaskHandle),
    Empty,
}

/// Evaluates a predicate on its first tick (absent predicate reads as
/// true), picks the matching branch, and delegates from then on. A missing
/// selected branch completes immediately.
pub struct Conditional {
    predicate: Option<Box<dyn FnMut() -> bool>>,
    when_true: Option<TaskHandle>,
    when_false: Option<TaskHandle>,
    selection: Selection,
}

impl Conditional {
    pub fn new(
        predicate: Option<Box<dyn FnMut() -> bool>>,
        when_true: Option<TaskHandle>,
        when_false: Option<TaskHandle>,
    ) -> Self {
        Self {
            predicate,
            when_true,
            when_false,
            selection: Selection::NotEvaluated,
        }
    }

    pub fn branch(
        predicate: impl FnMut() -> bool + 'static,
        when_true: TaskHandle,
        when_false: TaskHandle,
    ) -> Self {
        Self::new(
            Some(Box::new(predicate)),
            Some(when_true),
            Some(when_false),
        )
    }

    /// Run `task` only when the predicate holds on first tick.
    pub fn when(predicate: impl FnMut() -> bool + 'static, task: TaskHandle) -> Self {
        Self::new(Some(Box::new(predicate)), Some(task), None)
    }
}

impl Work for Conditional {
    fn step(&mut self, dt: f32) -> Result<StepOutcome, TaskError> {
        if matches!(self.selection, Selection::NotEvaluated) {
            let verdict = match &mut self.predicate {
                Some(predicate) => predicate(),
                None => true,
            };
            let branch = if verdict {
                self.when_true.clone()
            } else {
                self.when_false.clone()
            };
            self.selection = match branch {
                Some(task) => Selection::Chosen(task),
                None => Selection::Empty,
            };
        }
        match &self.selection {
            Selection::Empty => Ok(StepOutcome::Complete),
            Selection::Chosen(child) => {
                if child.execute(dt) {
                    match child.status() {
                        TaskStatus::Completed => Ok(StepOutcome::Complete),
                        _ => Ok(StepOutcome::Interrupt),
                    }
                } else {
                    Ok(StepOutcome::Continue)
                }
            }
            Selection::NotEvaluated => unreachable!("selection decided above"),
        }
    }

    fn progress(&self) -> f32 {
        match &self.selection {
            Selection::Chosen(child) => child.progress(),
            _ => 0.0,
        }
    }

    fn on_reset(&mut self) {
        self.selection = Selection::NotEvaluated;
        if let Some(child) = &self.when_true {
            child.reset();
        }
        if let Some(child) = &self.when_false {
            child.reset();
        }
    }

    fn kind(&self) -> &'static str {
        "conditional"
    }
}
