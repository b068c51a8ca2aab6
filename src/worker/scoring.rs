//! Scoring worker: scores content items and feeds its own queue.
//!
//! When the queue is empty the processor reserves a batch of unscored items
//! and creates one `score_content` task per reserved item, then asks the
//! loop to claim again without sleeping. Reservations keep two workers from
//! creating tasks for the same item.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::WorkerConfig;
use super::engine::{IdleAction, ProcessError, ReportPolicy, TaskProcessor};
use super::ports::{ItemId, ItemScorer, ScoreStore, ScoreStoreError, TaskCoordinator};
use super::task::{NewTask, ProcessResult, Task, TaskType, WorkerId};

/// Task type handled by [`ScoringProcessor`].
pub const SCORE_CONTENT_TASK: &str = "score_content";

#[derive(Debug, Deserialize)]
struct ScoreParams {
    item_id: ItemId,
}

/// Processor for `score_content` tasks.
#[derive(Debug)]
pub struct ScoringProcessor<K: ?Sized, St: ?Sized, Sc: ?Sized> {
    coordinator: Arc<K>,
    store: Arc<St>,
    scorer: Arc<Sc>,
}

impl<K, St, Sc> ScoringProcessor<K, St, Sc>
where
    K: TaskCoordinator + ?Sized,
    St: ScoreStore + ?Sized,
    Sc: ItemScorer + ?Sized,
{
    /// Creates a processor writing scores to `store`.
    #[must_use]
    pub const fn new(coordinator: Arc<K>, store: Arc<St>, scorer: Arc<Sc>) -> Self {
        Self {
            coordinator,
            store,
            scorer,
        }
    }

    /// Returns the task type this processor handles.
    #[must_use]
    pub fn task_type() -> TaskType {
        TaskType::builtin(SCORE_CONTENT_TASK)
    }

    /// Reserves up to `limit` unscored items and creates a task for each.
    ///
    /// Returns the number of tasks created. A reservation whose task could
    /// not be created is released again.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreStoreError`] when the unscored batch cannot be read.
    pub async fn autoscore(
        &self,
        worker_id: &WorkerId,
        limit: u32,
    ) -> Result<u32, ScoreStoreError> {
        let candidates = self.store.fetch_unscored(limit).await?;
        let mut created: u32 = 0;
        for candidate in candidates {
            if self.enqueue(worker_id, candidate.item_id).await {
                created = created.saturating_add(1);
            }
        }
        if created > 0 {
            info!(worker_id = %worker_id, created, "autoscore queued tasks");
        }
        Ok(created)
    }

    async fn enqueue(&self, worker_id: &WorkerId, item_id: ItemId) -> bool {
        match self.store.reserve_for_autoscore(&item_id, worker_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(worker_id = %worker_id, item_id = %item_id, "item already reserved");
                return false;
            }
            Err(err) => {
                warn!(
                    worker_id = %worker_id,
                    item_id = %item_id,
                    error = %err,
                    "reservation failed"
                );
                return false;
            }
        }

        let task = NewTask::new(Self::task_type(), json!({ "item_id": item_id }));
        match self.coordinator.create_task(&task).await {
            Ok(task_id) => {
                debug!(
                    worker_id = %worker_id,
                    item_id = %item_id,
                    task_id = %task_id,
                    "scoring task created"
                );
                true
            }
            Err(err) => {
                warn!(
                    worker_id = %worker_id,
                    item_id = %item_id,
                    error = %err,
                    "task creation failed"
                );
                if let Err(release_err) = self.store.release_reservation(&item_id, worker_id).await
                {
                    warn!(item_id = %item_id, error = %release_err, "reservation release failed");
                }
                false
            }
        }
    }
}

#[async_trait]
impl<K, St, Sc> TaskProcessor for ScoringProcessor<K, St, Sc>
where
    K: TaskCoordinator + ?Sized + 'static,
    St: ScoreStore + ?Sized + 'static,
    Sc: ItemScorer + ?Sized + 'static,
{
    async fn process(&self, task: &Task) -> Result<ProcessResult, ProcessError> {
        let params: ScoreParams = serde_json::from_value(task.params.clone())
            .map_err(|err| ProcessError::InvalidParams(err.to_string()))?;
        let item = self
            .store
            .find(&params.item_id)
            .await
            .map_err(ProcessError::failed)?
            .ok_or_else(|| ProcessError::failed(ScoreStoreError::NotFound(params.item_id)))?;

        let evaluation = self
            .scorer
            .score_item(&item.candidate())
            .await
            .map_err(ProcessError::failed)?;
        self.store
            .write_score(&item.item_id, evaluation.score)
            .await
            .map_err(ProcessError::failed)?;

        info!(
            task_id = %task.id,
            item_id = %item.item_id,
            score = evaluation.score.value(),
            "item scored"
        );
        Ok(ProcessResult::succeeded(
            json!({
                "item_id": item.item_id,
                "score": evaluation.score,
                "feedback": evaluation.text,
            }),
            1,
        ))
    }

    async fn on_idle(&self, config: &WorkerConfig) -> IdleAction {
        match self
            .autoscore(config.worker_id(), config.autoscore_batch_size())
            .await
        {
            Ok(0) => IdleAction::Sleep,
            Ok(_) => IdleAction::Retry,
            Err(err) => {
                warn!(worker_id = %config.worker_id(), error = %err, "autoscore fetch failed");
                IdleAction::Sleep
            }
        }
    }

    fn report_policy(&self) -> ReportPolicy {
        ReportPolicy::Fatal
    }
}
