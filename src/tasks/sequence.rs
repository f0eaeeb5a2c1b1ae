// ABOUTME: Sequence combinator running children one after another
// ABOUTME: A failed or cancelled child cancels the remainder of the sequence

use tracing::debug;

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;
use crate::engine::status::TaskStatus;
use crate::engine::task::TaskHandle;

/// Ordered children behind a cursor. Each tick executes the child at the
/// cursor; a completed child advances it, a child that ends failed or
/// cancelled interrupts the whole sequence. Because a child with retries
/// left never reports done, the sequence only gives up once the child's
/// retry budget is truly exhausted.
pub struct Sequence {
    children: Vec<TaskHandle>,
    cursor: usize,
}

impl Sequence {
    pub fn new(children: Vec<TaskHandle>) -> Self {
        Self {
            children,
            cursor: 0,
        }
    }

    pub fn push(&mut self, child: TaskHandle) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Work for Sequence {
    fn step(&mut self, dt: f32) -> Result<StepOutcome, TaskError> {
        let Some(child) = self.children.get(self.cursor) else {
            return Ok(StepOutcome::Complete);
        };
        if !child.execute(dt) {
            return Ok(StepOutcome::Continue);
        }
        match child.status() {
            TaskStatus::Completed => {
                self.cursor += 1;
                if self.cursor >= self.children.len() {
                    Ok(StepOutcome::Complete)
                } else {
                    Ok(StepOutcome::Continue)
                }
            }
            status => {
                debug!(
                    "sequence child {} ended {}, interrupting sequence",
                    child.id(),
                    status
                );
                Ok(StepOutcome::Interrupt)
            }
        }
    }

    fn progress(&self) -> f32 {
        if self.children.is_empty() {
            return 1.0;
        }
        let current = self
            .children
            .get(self.cursor)
            .map(TaskHandle::progress)
            .unwrap_or(0.0);
        (self.cursor as f32 + current) / self.children.len() as f32
    }

    fn on_reset(&mut self) {
        self.cursor = 0;
        for child in &self.children {
            child.reset();
        }
    }

    fn kind(&self) -> &'static str {
        "sequence"
    }
}
