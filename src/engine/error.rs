// ABOUTME: Error types for the scheduling engine
// ABOUTME: Defines task-level failure causes and runner-level configuration errors

use thiserror::Error;

use super::task::TaskId;

/// A cause carried through a task's failed event.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task step failed: {0}")]
    Step(#[from] anyhow::Error),

    #[error("timed out after {limit:.3}s")]
    Timeout { limit: f32 },
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("unknown scheduler: {name}")]
    UnknownScheduler { name: String },

    #[error("task {id} is already submitted")]
    DuplicateTask { id: TaskId },

    #[error("task not found: {id}")]
    TaskNotFound { id: TaskId },
}

pub type Result<T> = std::result::Result<T, RunnerError>;
