//! Review worker: runs story reviews from `story_review` tasks.
//!
//! Task parameters name either a story (`{"story_id": ...}`) or a review
//! stage (`{"stage": "awaiting_title_review"}`); a stage reviews the story
//! that has waited longest in it.

use async_trait::async_trait;
use mockable::Clock;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use super::engine::{ProcessError, TaskProcessor};
use super::task::{ProcessResult, Task, TaskType};
use crate::story::domain::{StoryId, StoryState};
use crate::story::ports::{ContentEvaluator, StoryRepository};
use crate::story::services::{ReviewOutcome, StoryWorkflowService};

/// Task type handled by [`ReviewProcessor`].
pub const STORY_REVIEW_TASK: &str = "story_review";

#[derive(Debug, Deserialize)]
struct ReviewParams {
    #[serde(default)]
    story_id: Option<StoryId>,
    #[serde(default)]
    stage: Option<StoryState>,
}

/// Processor for `story_review` tasks.
pub struct ReviewProcessor<R, C, E: ?Sized>
where
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    service: StoryWorkflowService<R, C>,
    evaluator: Arc<E>,
}

impl<R, C, E> ReviewProcessor<R, C, E>
where
    R: StoryRepository,
    C: Clock + Send + Sync,
    E: ContentEvaluator + ?Sized,
{
    /// Creates a processor reviewing through `service` with `evaluator`.
    #[must_use]
    pub const fn new(service: StoryWorkflowService<R, C>, evaluator: Arc<E>) -> Self {
        Self { service, evaluator }
    }

    /// Returns the task type this processor handles.
    #[must_use]
    pub fn task_type() -> TaskType {
        TaskType::builtin(STORY_REVIEW_TASK)
    }

    /// Returns the workflow service.
    #[must_use]
    pub const fn service(&self) -> &StoryWorkflowService<R, C> {
        &self.service
    }
}

fn outcome_data(outcome: &ReviewOutcome) -> Value {
    json!({
        "reviewed": true,
        "story_id": outcome.story.id(),
        "review_id": outcome.review.id(),
        "score": outcome.review.score(),
        "threshold": outcome.threshold,
        "accepted": outcome.accepted(),
        "from": outcome.previous_state,
        "to": outcome.story.state(),
    })
}

#[async_trait]
impl<R, C, E> TaskProcessor for ReviewProcessor<R, C, E>
where
    R: StoryRepository + 'static,
    C: Clock + Send + Sync + 'static,
    E: ContentEvaluator + ?Sized + 'static,
{
    async fn process(&self, task: &Task) -> Result<ProcessResult, ProcessError> {
        let params: ReviewParams = serde_json::from_value(task.params.clone())
            .map_err(|err| ProcessError::InvalidParams(err.to_string()))?;

        let outcome = match (params.story_id, params.stage) {
            (Some(story_id), _) => Some(
                self.service
                    .review_story(story_id, &*self.evaluator)
                    .await
                    .map_err(ProcessError::failed)?,
            ),
            (None, Some(stage)) => self
                .service
                .review_next(stage, &*self.evaluator)
                .await
                .map_err(ProcessError::failed)?,
            (None, None) => {
                return Err(ProcessError::InvalidParams(
                    "expected a story_id or a stage".to_owned(),
                ));
            }
        };

        Ok(outcome.map_or_else(
            || {
                debug!(task_id = %task.id, "no story waiting for review");
                ProcessResult::succeeded(json!({ "reviewed": false }), 0)
            },
            |reviewed| ProcessResult::succeeded(outcome_data(&reviewed), 1),
        ))
    }
}
