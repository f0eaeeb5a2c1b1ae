// ABOUTME: Adapter over a restartable iterator source
// ABOUTME: Advances the iterator one step per tick, completing on exhaustion

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;

type StepSource = Box<dyn Iterator<Item = ()>>;
type SourceFactory = Box<dyn Fn() -> StepSource>;

/// Wraps an iterator whose side effects are the work: each tick advances
/// one step, exhaustion completes the task. Reset rebuilds the iterator
/// from the factory so a retried or pooled task restarts from the top.
pub struct StepwiseJob {
    factory: SourceFactory,
    source: StepSource,
}

impl StepwiseJob {
    pub fn new<I, F>(factory: F) -> Self
    where
        I: Iterator + 'static,
        F: Fn() -> I + 'static,
    {
        let factory: SourceFactory = Box::new(move || Box::new(factory().map(|_| ())));
        let source = factory();
        Self { factory, source }
    }
}

impl Work for StepwiseJob {
    fn step(&mut self, _dt: f32) -> Result<StepOutcome, TaskError> {
        match self.source.next() {
            Some(()) => Ok(StepOutcome::Continue),
            None => Ok(StepOutcome::Complete),
        }
    }

    fn on_reset(&mut self) {
        self.source = (self.factory)();
    }

    fn kind(&self) -> &'static str {
        "stepwise"
    }
}
