//! Port for the external task coordination service.

use crate::worker::task::{
    ClaimStrategy, NewTask, Task, TaskCompletion, TaskId, TaskType, WorkerId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by task coordinators.
#[derive(Debug, Clone, Error)]
pub enum CoordinatorError {
    /// The coordinator could not be reached.
    #[error("coordinator unavailable: {detail}")]
    Unavailable {
        /// What failed.
        detail: String,
        /// Underlying transport error, when there is one.
        #[source]
        cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    /// The coordinator answered with an error status.
    #[error("coordinator rejected the request (status {status}): {message}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The coordinator answered with something unreadable.
    #[error("invalid coordinator response: {0}")]
    InvalidResponse(String),

    /// The task is not known to the coordinator.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// The task is not currently claimed by the reporting worker.
    #[error("task {task_id} is not claimed by worker {worker_id}")]
    NotClaimed {
        /// Reported task.
        task_id: TaskId,
        /// Reporting worker.
        worker_id: WorkerId,
    },
}

impl CoordinatorError {
    /// Builds an [`CoordinatorError::Unavailable`] without a cause.
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable {
            detail: detail.into(),
            cause: None,
        }
    }

    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable {
            detail: err.to_string(),
            cause: Some(Arc::new(err)),
        }
    }
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Outcome of asking for one task of one type.
///
/// "No work" is [`ClaimOutcome::Empty`], never an error.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// A task was claimed for the requesting worker.
    Found(Box<Task>),
    /// No task of the type is available.
    Empty,
    /// The coordinator failed to answer.
    Error(CoordinatorError),
}

impl ClaimOutcome {
    /// Returns the claimed task, if any.
    #[must_use]
    pub fn into_task(self) -> Option<Task> {
        match self {
            Self::Found(task) => Some(*task),
            Self::Empty | Self::Error(_) => None,
        }
    }
}

/// External service that owns task queues and claim exclusivity.
///
/// At most one worker receives a given task id from `claim_task`.
#[async_trait]
pub trait TaskCoordinator: Send + Sync {
    /// Checks that the coordinator is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when it is not.
    async fn ping(&self) -> CoordinatorResult<()>;

    /// Claims one task of `task_type` ordered by `strategy`.
    async fn claim_task(
        &self,
        worker_id: &WorkerId,
        task_type: &TaskType,
        strategy: ClaimStrategy,
    ) -> ClaimOutcome;

    /// Reports the outcome of a claimed task.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when the report was not accepted.
    async fn complete_task(&self, completion: &TaskCompletion) -> CoordinatorResult<()>;

    /// Enqueues a new task and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when the task was not created.
    async fn create_task(&self, task: &NewTask) -> CoordinatorResult<TaskId>;
}
