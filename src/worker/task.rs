//! Task records exchanged with the coordination service.
//!
//! Tasks belong to the coordinator; a worker only holds one while it is in
//! flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error returned when an identifier is blank.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{0} must not be empty")]
pub struct EmptyIdentifierError(pub &'static str);

macro_rules! text_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps an identifier.
            ///
            /// # Errors
            ///
            /// Returns [`EmptyIdentifierError`] when `value` is blank.
            pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdentifierError> {
                let text = value.into();
                if text.trim().is_empty() {
                    return Err(EmptyIdentifierError($label));
                }
                Ok(Self(text))
            }

            /// Returns the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifierError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

text_identifier!(
    /// Coordinator-assigned task identifier.
    TaskId,
    "task id"
);

text_identifier!(
    /// Task type a worker registers for, such as `score_content`.
    TaskType,
    "task type"
);

impl TaskType {
    /// Wraps one of the crate's built-in, non-blank task type names.
    pub(crate) fn builtin(name: &'static str) -> Self {
        Self(name.to_owned())
    }
}

text_identifier!(
    /// Identity a worker claims tasks under.
    WorkerId,
    "worker id"
);

/// Coordinator-side task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be claimed.
    Queued,
    /// Handed to a worker.
    Claimed,
    /// Being processed by a worker.
    Processing,
    /// Finished successfully.
    Completed,
    /// Failed and out of retries.
    Failed,
}

impl TaskStatus {
    /// Returns `true` once the task can no longer change.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Field a claim is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Task creation time.
    CreatedAt,
    /// Task priority.
    Priority,
}

/// Direction a claim is ordered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// Ordering policy used to pick the next task of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStrategy {
    /// Oldest task first.
    #[default]
    Fifo,
    /// Newest task first.
    Lifo,
    /// Highest priority first.
    Priority,
}

impl ClaimStrategy {
    /// Returns the field the strategy sorts by.
    #[must_use]
    pub const fn sort_field(self) -> SortField {
        match self {
            Self::Fifo | Self::Lifo => SortField::CreatedAt,
            Self::Priority => SortField::Priority,
        }
    }

    /// Returns the direction the strategy sorts in.
    #[must_use]
    pub const fn sort_order(self) -> SortOrder {
        match self {
            Self::Fifo => SortOrder::Asc,
            Self::Lifo | Self::Priority => SortOrder::Desc,
        }
    }
}

/// A task as handed out by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Task type.
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Type-specific parameters.
    #[serde(default)]
    pub params: Value,
    /// Priority; larger runs first under [`ClaimStrategy::Priority`].
    #[serde(default)]
    pub priority: i32,
    /// Coordinator-side status.
    pub status: TaskStatus,
    /// Failed attempts so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Failed attempts allowed before the task fails for good.
    #[serde(default)]
    pub max_retries: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the current claim, if claimed.
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
}

/// Default retry budget of newly created tasks.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Request to create a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    /// Task type.
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Type-specific parameters.
    pub params: Value,
    /// Priority.
    pub priority: i32,
    /// Failed attempts allowed.
    pub max_retries: u32,
}

impl NewTask {
    /// Creates a request with priority 0 and the default retry budget.
    #[must_use]
    pub const fn new(task_type: TaskType, params: Value) -> Self {
        Self {
            task_type,
            params,
            priority: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Outcome of processing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Whether processing succeeded.
    pub success: bool,
    /// Result payload reported to the coordinator.
    pub data: Option<Value>,
    /// Error text for failed results.
    pub error: Option<String>,
    /// Number of items the task handled.
    pub items_processed: u32,
}

impl ProcessResult {
    /// Builds a successful result.
    #[must_use]
    pub const fn succeeded(data: Value, items_processed: u32) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            items_processed,
        }
    }

    /// Builds a failed result carrying `error`.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            items_processed: 0,
        }
    }
}

/// Completion report sent to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    /// Task being reported.
    pub task_id: TaskId,
    /// Worker that processed it.
    pub worker_id: WorkerId,
    /// Whether processing succeeded.
    pub success: bool,
    /// Result payload.
    pub result: Option<Value>,
    /// Error text.
    pub error: Option<String>,
}

impl TaskCompletion {
    /// Builds the report for `result`.
    #[must_use]
    pub fn from_result(task: &Task, worker_id: &WorkerId, result: &ProcessResult) -> Self {
        Self {
            task_id: task.id.clone(),
            worker_id: worker_id.clone(),
            success: result.success,
            result: result.data.clone(),
            error: result.error.clone(),
        }
    }
}
