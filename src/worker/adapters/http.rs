//! HTTP client for the task coordination service.
//!
//! Routes, relative to the base URL:
//!
//! - `GET /health`
//! - `POST /tasks/claim`, answering 200 with a task or 204/404 when empty
//! - `POST /tasks/{id}/complete`
//! - `POST /tasks`, answering with `{"id": ...}`

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::worker::ports::{ClaimOutcome, CoordinatorError, CoordinatorResult, TaskCoordinator};
use crate::worker::task::{
    ClaimStrategy, NewTask, SortField, SortOrder, Task, TaskCompletion, TaskId, TaskType,
    WorkerId,
};

/// Request timeout used when none is configured.
pub const DEFAULT_COORDINATOR_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ClaimRequest<'a> {
    worker_id: &'a WorkerId,
    task_type: &'a TaskType,
    sort_by: SortField,
    sort_order: SortOrder,
}

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    worker_id: &'a WorkerId,
    success: bool,
    result: Option<&'a Value>,
    error: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreatedTask {
    id: TaskId,
}

/// Task coordinator reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTaskCoordinator {
    client: Client,
    base_url: Url,
}

impl HttpTaskCoordinator {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Unavailable`] when `base_url` is not an
    /// absolute HTTP URL or the HTTP client cannot be built.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> CoordinatorResult<Self> {
        let raw = base_url.as_ref();
        let parsed = Url::parse(raw).map_err(|err| {
            CoordinatorError::unavailable(format!("invalid coordinator url {raw}: {err}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(CoordinatorError::unavailable(format!(
                "coordinator url {raw} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(CoordinatorError::transport)?;
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Returns the service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> CoordinatorResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CoordinatorError::unavailable("coordinator url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn claim(
        &self,
        worker_id: &WorkerId,
        task_type: &TaskType,
        strategy: ClaimStrategy,
    ) -> CoordinatorResult<Option<Task>> {
        let request = ClaimRequest {
            worker_id,
            task_type,
            sort_by: strategy.sort_field(),
            sort_order: strategy.sort_order(),
        };
        let response = self
            .client
            .post(self.url(&["tasks", "claim"])?)
            .json(&request)
            .send()
            .await
            .map_err(CoordinatorError::transport)?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            _ => {
                let body = success_body(response).await?;
                serde_json::from_str::<Task>(&body)
                    .map(Some)
                    .map_err(|err| CoordinatorError::InvalidResponse(err.to_string()))
            }
        }
    }
}

async fn success_body(response: Response) -> CoordinatorResult<String> {
    let status = response.status();
    let body = response.text().await.map_err(CoordinatorError::transport)?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(CoordinatorError::Rejected {
            status: status.as_u16(),
            message: body,
        })
    }
}

#[async_trait]
impl TaskCoordinator for HttpTaskCoordinator {
    async fn ping(&self) -> CoordinatorResult<()> {
        let response = self
            .client
            .get(self.url(&["health"])?)
            .send()
            .await
            .map_err(CoordinatorError::transport)?;
        success_body(response).await.map(|_| ())
    }

    async fn claim_task(
        &self,
        worker_id: &WorkerId,
        task_type: &TaskType,
        strategy: ClaimStrategy,
    ) -> ClaimOutcome {
        match self.claim(worker_id, task_type, strategy).await {
            Ok(Some(task)) => ClaimOutcome::Found(Box::new(task)),
            Ok(None) => ClaimOutcome::Empty,
            Err(err) => ClaimOutcome::Error(err),
        }
    }

    async fn complete_task(&self, completion: &TaskCompletion) -> CoordinatorResult<()> {
        let request = CompleteRequest {
            worker_id: &completion.worker_id,
            success: completion.success,
            result: completion.result.as_ref(),
            error: completion.error.as_deref(),
        };
        let response = self
            .client
            .post(self.url(&["tasks", completion.task_id.as_str(), "complete"])?)
            .json(&request)
            .send()
            .await
            .map_err(CoordinatorError::transport)?;
        success_body(response).await.map(|_| ())
    }

    async fn create_task(&self, task: &NewTask) -> CoordinatorResult<TaskId> {
        let response = self
            .client
            .post(self.url(&["tasks"])?)
            .json(task)
            .send()
            .await
            .map_err(CoordinatorError::transport)?;
        let body = success_body(response).await?;
        serde_json::from_str::<CreatedTask>(&body)
            .map(|created| created.id)
            .map_err(|err| CoordinatorError::InvalidResponse(err.to_string()))
    }
}
