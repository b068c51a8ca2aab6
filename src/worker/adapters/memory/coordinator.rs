//! In-memory task coordinator for tests and single-process use.
//!
//! One mutex guards the whole queue, so a claim is exclusive: at most one
//! worker receives a given task id.

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::worker::ports::{ClaimOutcome, CoordinatorError, CoordinatorResult, TaskCoordinator};
use crate::worker::task::{
    ClaimStrategy, NewTask, Task, TaskCompletion, TaskId, TaskStatus, TaskType, WorkerId,
};

#[derive(Debug)]
struct QueuedTask {
    task: Task,
    seq: u64,
    claimed_by: Option<WorkerId>,
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: Vec<QueuedTask>,
    next_seq: u64,
    completions: Vec<TaskCompletion>,
}

impl QueueState {
    fn position(&self, task_type: &TaskType, strategy: ClaimStrategy) -> Option<usize> {
        let queued = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry.task.status == TaskStatus::Queued && &entry.task.task_type == task_type
            });
        let chosen = match strategy {
            ClaimStrategy::Fifo => {
                queued.min_by_key(|(_, entry)| (entry.task.created_at, entry.seq))
            }
            ClaimStrategy::Lifo => {
                queued.max_by_key(|(_, entry)| (entry.task.created_at, entry.seq))
            }
            ClaimStrategy::Priority => queued.max_by_key(|(_, entry)| {
                (
                    entry.task.priority,
                    Reverse(entry.task.created_at),
                    Reverse(entry.seq),
                )
            }),
        };
        chosen.map(|(index, _)| index)
    }

    fn entry_mut(&mut self, task_id: &TaskId) -> CoordinatorResult<&mut QueuedTask> {
        self.tasks
            .iter_mut()
            .find(|entry| &entry.task.id == task_id)
            .ok_or_else(|| CoordinatorError::UnknownTask(task_id.clone()))
    }
}

/// Thread-safe in-memory task coordinator.
///
/// Failed tasks are re-queued until their retry budget is spent, then marked
/// [`TaskStatus::Failed`].
#[derive(Debug, Clone)]
pub struct InMemoryTaskCoordinator<C = DefaultClock> {
    state: Arc<Mutex<QueueState>>,
    available: Arc<AtomicBool>,
    clock: Arc<C>,
}

impl InMemoryTaskCoordinator<DefaultClock> {
    /// Creates an empty coordinator using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl Default for InMemoryTaskCoordinator<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> InMemoryTaskCoordinator<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty coordinator stamping tasks with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            available: Arc::new(AtomicBool::new(true)),
            clock,
        }
    }

    /// Makes every call fail as unreachable while `available` is `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns a snapshot of a task.
    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        let state = self.lock().ok()?;
        state
            .tasks
            .iter()
            .find(|entry| &entry.task.id == task_id)
            .map(|entry| entry.task.clone())
    }

    /// Returns snapshots of every task of `task_type`, in creation order.
    #[must_use]
    pub fn tasks_of_type(&self, task_type: &TaskType) -> Vec<Task> {
        self.lock().map_or_else(
            |_| Vec::new(),
            |state| {
                state
                    .tasks
                    .iter()
                    .filter(|entry| &entry.task.task_type == task_type)
                    .map(|entry| entry.task.clone())
                    .collect()
            },
        )
    }

    /// Returns every completion report received, in arrival order.
    #[must_use]
    pub fn completions(&self) -> Vec<TaskCompletion> {
        self.lock()
            .map_or_else(|_| Vec::new(), |state| state.completions.clone())
    }

    fn ensure_available(&self) -> CoordinatorResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoordinatorError::unavailable("coordinator is offline"))
        }
    }

    fn lock(&self) -> CoordinatorResult<MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|err| CoordinatorError::unavailable(err.to_string()))
    }

    fn claim(
        &self,
        worker_id: &WorkerId,
        task_type: &TaskType,
        strategy: ClaimStrategy,
    ) -> CoordinatorResult<Option<Task>> {
        self.ensure_available()?;
        let mut state = self.lock()?;
        let Some(index) = state.position(task_type, strategy) else {
            return Ok(None);
        };
        let now = self.clock.utc();
        let Some(entry) = state.tasks.get_mut(index) else {
            return Ok(None);
        };
        entry.task.status = TaskStatus::Claimed;
        entry.task.claimed_at = Some(now);
        entry.claimed_by = Some(worker_id.clone());
        Ok(Some(entry.task.clone()))
    }
}

#[async_trait]
impl<C> TaskCoordinator for InMemoryTaskCoordinator<C>
where
    C: Clock + Send + Sync,
{
    async fn ping(&self) -> CoordinatorResult<()> {
        self.ensure_available()
    }

    async fn claim_task(
        &self,
        worker_id: &WorkerId,
        task_type: &TaskType,
        strategy: ClaimStrategy,
    ) -> ClaimOutcome {
        match self.claim(worker_id, task_type, strategy) {
            Ok(Some(task)) => ClaimOutcome::Found(Box::new(task)),
            Ok(None) => ClaimOutcome::Empty,
            Err(err) => ClaimOutcome::Error(err),
        }
    }

    async fn complete_task(&self, completion: &TaskCompletion) -> CoordinatorResult<()> {
        self.ensure_available()?;
        let mut state = self.lock()?;
        let entry = state.entry_mut(&completion.task_id)?;
        let claimed = matches!(
            entry.task.status,
            TaskStatus::Claimed | TaskStatus::Processing
        );
        if !claimed || entry.claimed_by.as_ref() != Some(&completion.worker_id) {
            return Err(CoordinatorError::NotClaimed {
                task_id: completion.task_id.clone(),
                worker_id: completion.worker_id.clone(),
            });
        }

        entry.claimed_by = None;
        if completion.success {
            entry.task.status = TaskStatus::Completed;
        } else {
            entry.task.retry_count = entry.task.retry_count.saturating_add(1);
            if entry.task.retry_count >= entry.task.max_retries {
                entry.task.status = TaskStatus::Failed;
            } else {
                entry.task.status = TaskStatus::Queued;
                entry.task.claimed_at = None;
            }
        }
        state.completions.push(completion.clone());
        Ok(())
    }

    async fn create_task(&self, new_task: &NewTask) -> CoordinatorResult<TaskId> {
        self.ensure_available()?;
        let id = TaskId::new(Uuid::new_v4().to_string())
            .map_err(|err| CoordinatorError::InvalidResponse(err.to_string()))?;
        let task = Task {
            id: id.clone(),
            task_type: new_task.task_type.clone(),
            params: new_task.params.clone(),
            priority: new_task.priority,
            status: TaskStatus::Queued,
            retry_count: 0,
            max_retries: new_task.max_retries,
            created_at: self.clock.utc(),
            claimed_at: None,
        };

        let mut state = self.lock()?;
        let seq = state.next_seq;
        state.next_seq = seq.saturating_add(1);
        state.tasks.push(QueuedTask {
            task,
            seq,
            claimed_by: None,
        });
        Ok(id)
    }
}
