//! The claim, process, and report loop shared by every worker.
//!
//! A worker polls its task types in configuration order, hands the first
//! task found to its [`TaskProcessor`], and reports the outcome to the
//! coordinator. When every type is empty it sleeps for the current backoff
//! delay, which is the loop's only suspension point besides processing.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::backoff::Backoff;
use super::config::WorkerConfig;
use super::ports::{ClaimOutcome, CoordinatorError, TaskCoordinator};
use super::task::{ProcessResult, Task, TaskCompletion, TaskId};

/// Suspends the loop between empty polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What the loop does after an empty claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleAction {
    /// Sleep for the current backoff delay, then grow it.
    #[default]
    Sleep,
    /// Reset the backoff and claim again straight away.
    Retry,
}

/// How a failed completion report is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPolicy {
    /// Log the lost report and keep polling.
    #[default]
    LogAndContinue,
    /// Stop the worker with [`WorkerError::ReportLost`].
    Fatal,
}

/// Error raised by a processor. The loop turns it into a failed result.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The task parameters could not be understood.
    #[error("invalid task parameters: {0}")]
    InvalidParams(String),

    /// Processing failed.
    #[error("{0}")]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl ProcessError {
    /// Wraps an arbitrary processing error.
    pub fn failed(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Failed(Box::new(err))
    }
}

/// Task handling for one worker specialization.
#[async_trait]
pub trait TaskProcessor: Send + Sync + 'static {
    /// Processes a claimed task.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the task could not be processed; the
    /// loop reports it as a failed result.
    async fn process(&self, task: &Task) -> Result<ProcessResult, ProcessError>;

    /// Called when every task type came back empty.
    async fn on_idle(&self, _config: &WorkerConfig) -> IdleAction {
        IdleAction::Sleep
    }

    /// Returns how lost completion reports are handled.
    fn report_policy(&self) -> ReportPolicy {
        ReportPolicy::LogAndContinue
    }
}

/// Errors that stop a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The coordinator did not answer the startup ping.
    #[error("task coordinator unavailable at startup")]
    CoordinatorUnavailable(#[source] CoordinatorError),

    /// A completion report was lost under [`ReportPolicy::Fatal`].
    #[error("completion report for task {task_id} was lost")]
    ReportLost {
        /// Task whose report was lost.
        task_id: TaskId,
        /// Coordinator failure.
        source: CoordinatorError,
    },
}

/// Per-worker counters. They only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStats {
    /// Tasks processed successfully.
    pub tasks_processed: u64,
    /// Tasks whose processing failed.
    pub tasks_failed: u64,
    /// Loop iterations run.
    pub iterations: u64,
}

/// Cloneable handle that asks a running worker to stop.
///
/// The in-flight task, if any, finishes before the loop exits.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests a stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a single loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// A task was processed and reported.
    Processed {
        /// Processed task.
        task_id: TaskId,
        /// Whether processing succeeded.
        success: bool,
    },
    /// Nothing was claimed and the idle hook asked for an immediate retry.
    Retried,
    /// Nothing was claimed and the worker slept.
    Slept(Duration),
}

/// A polling worker bound to one coordinator and one processor.
#[derive(Debug)]
pub struct Worker<K: ?Sized, P, S = TokioSleeper> {
    config: WorkerConfig,
    coordinator: Arc<K>,
    processor: Arc<P>,
    sleeper: S,
    backoff: Backoff,
    stats: WorkerStats,
    stop: StopHandle,
}

impl<K, P> Worker<K, P, TokioSleeper>
where
    K: TaskCoordinator + ?Sized,
    P: TaskProcessor,
{
    /// Pings the coordinator and builds a worker sleeping on the tokio timer.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::CoordinatorUnavailable`] when the ping fails.
    pub async fn connect(
        config: WorkerConfig,
        coordinator: Arc<K>,
        processor: Arc<P>,
    ) -> Result<Self, WorkerError> {
        Self::connect_with_sleeper(config, coordinator, processor, TokioSleeper).await
    }
}

impl<K, P, S> Worker<K, P, S>
where
    K: TaskCoordinator + ?Sized,
    P: TaskProcessor,
    S: Sleeper,
{
    /// Pings the coordinator and builds a worker using `sleeper`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::CoordinatorUnavailable`] when the ping fails.
    pub async fn connect_with_sleeper(
        config: WorkerConfig,
        coordinator: Arc<K>,
        processor: Arc<P>,
        sleeper: S,
    ) -> Result<Self, WorkerError> {
        if let Err(err) = coordinator.ping().await {
            error!(
                worker_id = %config.worker_id(),
                error = %err,
                "task coordinator unreachable"
            );
            return Err(WorkerError::CoordinatorUnavailable(err));
        }
        info!(
            worker_id = %config.worker_id(),
            task_types = ?config.task_types(),
            strategy = ?config.strategy(),
            "worker connected"
        );
        Ok(Self {
            backoff: Backoff::from_config(&config),
            config,
            coordinator,
            processor,
            sleeper,
            stats: WorkerStats::default(),
            stop: StopHandle::default(),
        })
    }

    /// Returns the worker configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Returns the counters so far.
    #[must_use]
    pub const fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Returns the backoff schedule.
    #[must_use]
    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Returns a handle that stops [`Worker::run`].
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Asks the loop to stop after the current iteration.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Claims one task, trying each task type in configuration order.
    ///
    /// A coordinator error for one type is logged and treated as empty.
    pub async fn claim(&self) -> Option<Task> {
        let worker_id = self.config.worker_id();
        for task_type in self.config.task_types() {
            match self
                .coordinator
                .claim_task(worker_id, task_type, self.config.strategy())
                .await
            {
                ClaimOutcome::Found(task) => {
                    info!(
                        worker_id = %worker_id,
                        task_id = %task.id,
                        task_type = %task.task_type,
                        "claimed task"
                    );
                    return Some(*task);
                }
                ClaimOutcome::Empty => {
                    debug!(worker_id = %worker_id, task_type = %task_type, "no task available");
                }
                ClaimOutcome::Error(err) => {
                    warn!(
                        worker_id = %worker_id,
                        task_type = %task_type,
                        error = %err,
                        "claim failed, skipping task type this cycle"
                    );
                }
            }
        }
        None
    }

    /// Runs the processor on `task`.
    ///
    /// Errors and panics are converted into a failed result.
    pub async fn process(&self, task: &Task) -> ProcessResult {
        let processor = Arc::clone(&self.processor);
        let owned = task.clone();
        let handle = tokio::spawn(async move { processor.process(&owned).await });
        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => ProcessResult::failed(err.to_string()),
            Err(join_err) => ProcessResult::failed(format!("processor panicked: {join_err}")),
        }
    }

    /// Reports `result` for `task` to the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::ReportLost`] when the report fails and the
    /// processor's policy is [`ReportPolicy::Fatal`].
    pub async fn report(&self, task: &Task, result: &ProcessResult) -> Result<(), WorkerError> {
        let completion = TaskCompletion::from_result(task, self.config.worker_id(), result);
        let Err(err) = self.coordinator.complete_task(&completion).await else {
            return Ok(());
        };
        error!(
            worker_id = %self.config.worker_id(),
            task_id = %task.id,
            task_type = %task.task_type,
            error = %err,
            "completion report lost"
        );
        match self.processor.report_policy() {
            ReportPolicy::LogAndContinue => Ok(()),
            ReportPolicy::Fatal => Err(WorkerError::ReportLost {
                task_id: task.id.clone(),
                source: err,
            }),
        }
    }

    /// Runs one claim followed by either process and report, or the idle
    /// path.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] when a report loss is fatal.
    pub async fn run_once(&mut self) -> Result<Iteration, WorkerError> {
        self.stats.iterations = self.stats.iterations.saturating_add(1);
        let Some(task) = self.claim().await else {
            return Ok(self.idle().await);
        };

        self.backoff.reset();
        let result = self.process(&task).await;
        if result.success {
            self.stats.tasks_processed = self.stats.tasks_processed.saturating_add(1);
            info!(
                worker_id = %self.config.worker_id(),
                task_id = %task.id,
                task_type = %task.task_type,
                items_processed = result.items_processed,
                "task processed"
            );
        } else {
            self.stats.tasks_failed = self.stats.tasks_failed.saturating_add(1);
            warn!(
                worker_id = %self.config.worker_id(),
                task_id = %task.id,
                task_type = %task.task_type,
                error = result.error.as_deref().unwrap_or_default(),
                "task failed"
            );
        }
        self.report(&task, &result).await?;
        Ok(Iteration::Processed {
            task_id: task.id,
            success: result.success,
        })
    }

    async fn idle(&mut self) -> Iteration {
        match self.processor.on_idle(&self.config).await {
            IdleAction::Retry => {
                self.backoff.reset();
                Iteration::Retried
            }
            IdleAction::Sleep => {
                let delay = self.backoff.next_delay();
                debug!(
                    worker_id = %self.config.worker_id(),
                    delay = ?delay,
                    "idle, backing off"
                );
                self.sleeper.sleep(delay).await;
                Iteration::Slept(delay)
            }
        }
    }

    /// Loops until stopped or until `max_iterations` iterations have run.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] when a report loss is fatal.
    pub async fn run(&mut self, max_iterations: Option<u64>) -> Result<WorkerStats, WorkerError> {
        let mut ran: u64 = 0;
        while !self.stop.is_stopped() && max_iterations.is_none_or(|cap| ran < cap) {
            self.run_once().await?;
            ran = ran.saturating_add(1);
        }
        info!(
            worker_id = %self.config.worker_id(),
            tasks_processed = self.stats.tasks_processed,
            tasks_failed = self.stats.tasks_failed,
            "worker stopped"
        );
        Ok(self.stats)
    }
}
