// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides probe tasks and tick drivers shared across test files

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use tickflow::builder::{run, run_fallible, wait_for};
use tickflow::{Runner, TaskHandle};

/// Install a compact tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Shared counter probes observe how often task bodies run.
pub type Counter = Rc<Cell<u32>>;

pub fn counter() -> Counter {
    Rc::new(Cell::new(0))
}

/// A task incrementing `hits` once and completing.
pub fn counting_task(hits: &Counter) -> TaskHandle {
    let probe = Rc::clone(hits);
    run(move || probe.set(probe.get() + 1))
}

/// A task that fails its first `failures` attempts, then succeeds.
pub fn flaky_task(failures: u32, attempts: &Counter) -> TaskHandle {
    let probe = Rc::clone(attempts);
    run_fallible(move || {
        probe.set(probe.get() + 1);
        if probe.get() <= failures {
            anyhow::bail!("attempt {} failed", probe.get());
        }
        Ok(())
    })
}

/// A predicate task that completes on its `frames`-th execution.
pub fn frames_task(frames: u32) -> TaskHandle {
    let seen = Cell::new(0u32);
    wait_for(move || {
        seen.set(seen.get() + 1);
        seen.get() >= frames
    })
}

/// Tick the runner until it has no registered tasks, with a safety bound.
pub fn tick_until_settled(runner: &mut Runner, dt: f32, max_ticks: u32) -> u32 {
    for tick in 1..=max_ticks {
        runner.tick(dt);
        if runner.is_empty() {
            return tick;
        }
    }
    panic!("runner did not settle within {max_ticks} ticks");
}
