// ABOUTME: Progress-reporting operation with an externally readable gauge
// ABOUTME: A step function observes current progress and signals completion

use std::cell::Cell;
use std::rc::Rc;

use super::{StepOutcome, Work};
use crate::engine::error::TaskError;

type ProgressStep = Box<dyn FnMut(f32) -> anyhow::Result<bool>>;

/// Writable view onto a [`ProgressJob`]'s progress value. External code
/// (an asset loader, a download callback) drives the gauge; the job's step
/// function decides when the operation is done.
#[derive(Clone)]
pub struct ProgressGauge(Rc<Cell<f32>>);

impl ProgressGauge {
    pub fn set(&self, value: f32) {
        self.0.set(value.clamp(0.0, 1.0));
    }

    pub fn get(&self) -> f32 {
        self.0.get()
    }
}

/// Invokes a function of the current progress each tick. The function
/// returns `true` once the operation is finished; progress is forced to 1
/// at that point. Progress may be advanced internally (the step closure
/// writes the gauge it captured) or externally via [`ProgressGauge`].
pub struct ProgressJob {
    step: ProgressStep,
    gauge: Rc<Cell<f32>>,
}

impl ProgressJob {
    pub fn new(step: impl FnMut(f32) -> anyhow::Result<bool> + 'static) -> Self {
        Self {
            step: Box::new(step),
            gauge: Rc::new(Cell::new(0.0)),
        }
    }

    /// A job that is purely externally driven: it completes once the gauge
    /// reaches 1.
    pub fn external() -> (Self, ProgressGauge) {
        let job = Self::new(|current| Ok(current >= 1.0));
        let gauge = job.gauge();
        (job, gauge)
    }

    pub fn gauge(&self) -> ProgressGauge {
        ProgressGauge(Rc::clone(&self.gauge))
    }
}

impl Work for ProgressJob {
    fn step(&mut self, _dt: f32) -> Result<StepOutcome, TaskError> {
        let done = (self.step)(self.gauge.get())?;
        if done {
            self.gauge.set(1.0);
            Ok(StepOutcome::Complete)
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    fn progress(&self) -> f32 {
        self.gauge.get().clamp(0.0, 1.0)
    }

    fn on_reset(&mut self) {
        self.gauge.set(0.0);
    }

    fn kind(&self) -> &'static str {
        "progress"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internally_driven_progress() {
        let mut job = ProgressJob::new(|current| Ok(current >= 0.75));
        let gauge = job.gauge();

        assert_eq!(job.step(0.0).unwrap(), StepOutcome::Continue);
        gauge.set(0.5);
        assert_eq!(job.step(0.0).unwrap(), StepOutcome::Continue);
        gauge.set(0.8);
        assert_eq!(job.step(0.0).unwrap(), StepOutcome::Complete);
        assert_eq!(job.progress(), 1.0);
    }

    #[test]
    fn test_gauge_clamps_writes() {
        let (job, gauge) = ProgressJob::external();
        gauge.set(3.5);
        assert_eq!(job.progress(), 1.0);
        gauge.set(-1.0);
        assert_eq!(job.progress(), 0.0);
    }

    #[test]
    fn test_reset_rewinds_gauge() {
        let (mut job, gauge) = ProgressJob::external();
        gauge.set(1.0);
        assert_eq!(job.step(0.0).unwrap(), StepOutcome::Complete);
        job.on_reset();
        assert_eq!(job.progress(), 0.0);
    }
}
