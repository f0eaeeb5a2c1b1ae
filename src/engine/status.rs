// ABOUTME: Task status enumeration and transition predicates
// ABOUTME: Defines the lifecycle states a task moves through while scheduled

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task has not started yet (or was reset for a retry)
    Pending,
    /// Task is being advanced by a scheduler
    Running,
    /// Task is suspended; execute re-queues without advancing
    Paused,
    /// Task finished successfully
    Completed,
    /// Task was cancelled, either externally or by a parent combinator
    Cancelled,
    /// Task failed and its retry budget is exhausted
    Failed,
}

impl TaskStatus {
    /// Check if the task is in a terminal state
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Failed
        )
    }

    /// Check if the task is active (running or paused mid-run)
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Running | TaskStatus::Paused)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}
