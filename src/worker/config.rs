//! Worker configuration: raw serde settings and the validated form.

use super::task::{ClaimStrategy, EmptyIdentifierError, TaskType, WorkerId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default base poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
/// Default backoff ceiling in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 60_000;
/// Default backoff growth factor.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;
/// Default number of unscored items fetched per autoscore pass.
pub const DEFAULT_AUTOSCORE_BATCH_SIZE: u32 = 10;

/// Errors raised while validating worker settings.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkerConfigError {
    /// An identifier was blank.
    #[error(transparent)]
    EmptyIdentifier(#[from] EmptyIdentifierError),
    /// No task types were configured.
    #[error("at least one task type is required")]
    NoTaskTypes,
    /// The same task type was listed twice.
    #[error("task type {0} is listed more than once")]
    DuplicateTaskType(String),
    /// The poll interval was zero.
    #[error("poll interval must be positive")]
    ZeroPollInterval,
    /// The backoff ceiling was below the poll interval.
    #[error("max backoff ({max_ms} ms) is below the poll interval ({poll_ms} ms)")]
    MaxBelowPollInterval {
        /// Configured ceiling.
        max_ms: u64,
        /// Configured base interval.
        poll_ms: u64,
    },
    /// The multiplier was below one or not finite.
    #[error("backoff multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),
    /// The autoscore batch size was zero.
    #[error("autoscore batch size must be positive")]
    ZeroBatchSize,
}

/// Worker settings as read from configuration.
///
/// `worker_id` and `task_types` are required; every other field falls back
/// to the documented default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Identity used when claiming tasks.
    pub worker_id: String,
    /// Task types polled, in order.
    pub task_types: Vec<String>,
    /// Claim ordering.
    #[serde(default)]
    pub strategy: ClaimStrategy,
    /// Base poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff growth factor.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Unscored items fetched per autoscore pass.
    #[serde(default = "default_autoscore_batch_size")]
    pub autoscore_batch_size: u32,
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

const fn default_backoff_multiplier() -> f64 {
    DEFAULT_BACKOFF_MULTIPLIER
}

const fn default_autoscore_batch_size() -> u32 {
    DEFAULT_AUTOSCORE_BATCH_SIZE
}

impl WorkerSettings {
    /// Creates settings with default tuning for the given identity and types.
    #[must_use]
    pub fn new(worker_id: impl Into<String>, task_types: Vec<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            task_types,
            strategy: ClaimStrategy::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            autoscore_batch_size: DEFAULT_AUTOSCORE_BATCH_SIZE,
        }
    }
}

/// Validated worker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    worker_id: WorkerId,
    task_types: Vec<TaskType>,
    strategy: ClaimStrategy,
    poll_interval: Duration,
    max_backoff: Duration,
    backoff_multiplier: f64,
    autoscore_batch_size: u32,
}

impl WorkerConfig {
    /// Returns the worker identity.
    #[must_use]
    pub const fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Returns the task types in polling order.
    #[must_use]
    pub fn task_types(&self) -> &[TaskType] {
        &self.task_types
    }

    /// Returns the claim strategy.
    #[must_use]
    pub const fn strategy(&self) -> ClaimStrategy {
        self.strategy
    }

    /// Returns the base poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the backoff ceiling.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Returns the backoff growth factor.
    #[must_use]
    pub const fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Returns the autoscore batch size.
    #[must_use]
    pub const fn autoscore_batch_size(&self) -> u32 {
        self.autoscore_batch_size
    }
}

impl TryFrom<WorkerSettings> for WorkerConfig {
    type Error = WorkerConfigError;

    fn try_from(settings: WorkerSettings) -> Result<Self, Self::Error> {
        let worker_id = WorkerId::new(settings.worker_id)?;
        if settings.task_types.is_empty() {
            return Err(WorkerConfigError::NoTaskTypes);
        }
        let mut task_types: Vec<TaskType> = Vec::with_capacity(settings.task_types.len());
        for raw in settings.task_types {
            let task_type = TaskType::new(raw)?;
            if task_types.contains(&task_type) {
                return Err(WorkerConfigError::DuplicateTaskType(task_type.into()));
            }
            task_types.push(task_type);
        }
        if settings.poll_interval_ms == 0 {
            return Err(WorkerConfigError::ZeroPollInterval);
        }
        if settings.max_backoff_ms < settings.poll_interval_ms {
            return Err(WorkerConfigError::MaxBelowPollInterval {
                max_ms: settings.max_backoff_ms,
                poll_ms: settings.poll_interval_ms,
            });
        }
        if !settings.backoff_multiplier.is_finite() || settings.backoff_multiplier < 1.0 {
            return Err(WorkerConfigError::InvalidMultiplier(
                settings.backoff_multiplier,
            ));
        }
        if settings.autoscore_batch_size == 0 {
            return Err(WorkerConfigError::ZeroBatchSize);
        }

        Ok(Self {
            worker_id,
            task_types,
            strategy: settings.strategy,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            backoff_multiplier: settings.backoff_multiplier,
            autoscore_batch_size: settings.autoscore_batch_size,
        })
    }
}
