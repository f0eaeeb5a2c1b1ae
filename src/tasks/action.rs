// ABOUTME: Action job, a one-shot unit of work
// ABOUTME: Runs a user thunk once and completes immediately after it returns

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;

type Thunk = Box<dyn FnMut() -> anyhow::Result<()>>;

/// Executes a supplied thunk once per run. Any error the thunk returns
/// flows into the task's failure/retry discipline; a retried action runs
/// the thunk again.
pub struct ActionJob {
    thunk: Thunk,
}

impl ActionJob {
    pub fn new(thunk: impl FnMut() -> anyhow::Result<()> + 'static) -> Self {
        Self {
            thunk: Box::new(thunk),
        }
    }

    /// Convenience constructor for thunks that cannot fail.
    pub fn infallible(mut thunk: impl FnMut() + 'static) -> Self {
        Self::new(move || {
            thunk();
            Ok(())
        })
    }
}

impl Work for ActionJob {
    fn step(&mut self, _dt: f32) -> Result<StepOutcome, TaskError> {
        (self.thunk)()?;
        Ok(StepOutcome::Complete)
    }

    fn kind(&self) -> &'static str {
        "action"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_runs_thunk_and_completes() {
        let hits = std::rc::Rc::new(std::cell::Cell::new(0));
        let probe = std::rc::Rc::clone(&hits);
        let mut job = ActionJob::infallible(move || probe.set(probe.get() + 1));

        assert_eq!(job.step(0.0).unwrap(), StepOutcome::Complete);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_step_surfaces_errors() {
        let mut job = ActionJob::new(|| anyhow::bail!("boom"));
        assert!(job.step(0.0).is_err());
    }
}
