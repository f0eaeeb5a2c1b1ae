// ABOUTME: Main library module for the tickflow scheduling core
// ABOUTME: Exports all core modules and provides the public API

pub mod builder;
pub mod engine;
pub mod pool;
pub mod tasks;

// Re-export commonly used types
pub use engine::{
    FrameScheduler, PriorityScheduler, Runner, RunnerError, RunnerStats, Scheduler, TaskError,
    TaskHandle, TaskId, TaskStatus,
};
pub use pool::TaskPool;
pub use tasks::{StepOutcome, WaitMode, Work};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
