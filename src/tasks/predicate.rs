// ABOUTME: Predicate job, a polled wait condition
// ABOUTME: Completes on the first tick its predicate returns true

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;

/// Polls a predicate each tick until it holds.
pub struct PredicateJob {
    predicate: Box<dyn FnMut() -> bool>,
}

impl PredicateJob {
    pub fn new(predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Work for PredicateJob {
    fn step(&mut self, _dt: f32) -> Result<StepOutcome, TaskError> {
        if (self.predicate)() {
            Ok(StepOutcome::Complete)
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    fn kind(&self) -> &'static str {
        "predicate"
    }
}
