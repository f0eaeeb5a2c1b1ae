// ABOUTME: Parallel combinator fanning one tick out to several children
// ABOUTME: Completes when all children are done, or the first one in Any mode

use std::collections::HashSet;

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;
use crate::engine::task::{TaskHandle, TaskId};

/// How a [`Parallel`] decides it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    /// Complete once every child is done.
    #[default]
    All,
    /// Complete on the first tick any child is done.
    Any,
}

/// Executes its children in order within each tick, skipping the ones that
/// already finished. A child reaching any terminal state counts toward the
/// wait, so one failed child cannot stall an `All` group forever.
///
/// Completing in `Any` mode does not cancel still-running siblings; they
/// remain owned by this task and can be cancelled or reset by the caller.
pub struct Parallel {
    children: Vec<TaskHandle>,
    mode: WaitMode,
    finished: HashSet<TaskId>,
}

impl Parallel {
    pub fn new(children: Vec<TaskHandle>, mode: WaitMode) -> Self {
        Self {
            children,
            mode,
            finished: HashSet::new(),
        }
    }

    pub fn all(children: Vec<TaskHandle>) -> Self {
        Self::new(children, WaitMode::All)
    }

    pub fn any(children: Vec<TaskHandle>) -> Self {
        Self::new(children, WaitMode::Any)
    }

    pub fn mode(&self) -> WaitMode {
        self.mode
    }

    pub fn children(&self) -> &[TaskHandle] {
        &self.children
    }
}

impl Work for Parallel {
    fn step(&mut self, dt: f32) -> Result<StepOutcome, TaskError> {
        if self.children.is_empty() {
            return Ok(StepOutcome::Complete);
        }
        let mut any_done = false;
        for child in &self.children {
            if self.finished.contains(&child.id()) {
                continue;
            }
            if child.execute(dt) {
                self.finished.insert(child.id());
                any_done = true;
            }
        }
        let complete = match self.mode {
            WaitMode::Any => any_done,
            WaitMode::All => self.finished.len() == self.children.len(),
        };
        if complete {
            Ok(StepOutcome::Complete)
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    fn progress(&self) -> f32 {
        if self.children.is_empty() {
            return 1.0;
        }
        let sum: f32 = self.children.iter().map(TaskHandle::progress).sum();
        sum / self.children.len() as f32
    }

    fn on_reset(&mut self) {
        self.finished.clear();
        for child in &self.children {
            child.reset();
        }
    }

    fn kind(&self) -> &'static str {
        "parallel"
    }
}
