//! HTTP client for a remote reviewer service.
//!
//! The reviewer receives `{"content": ..., "context": {...}}` as JSON and
//! answers with `{"text": ..., "score": 0..=100}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::story::ports::{ContentEvaluator, Evaluation, EvaluationContext, EvaluatorError};

/// Request timeout used when none is configured.
pub const DEFAULT_EVALUATOR_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct EvaluationRequest<'a, C: ?Sized> {
    content: &'a str,
    context: &'a C,
}

/// Evaluator backed by a remote HTTP reviewer.
#[derive(Debug, Clone)]
pub struct RemoteEvaluator {
    client: Client,
    endpoint: String,
}

impl RemoteEvaluator {
    /// Creates a client posting evaluations to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError::Unavailable`] when the HTTP client cannot be
    /// built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, EvaluatorError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(EvaluatorError::unavailable)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Returns the reviewer endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts `content` with an arbitrary serializable context.
    ///
    /// Used by callers whose context is not a story revision, such as the
    /// scoring worker.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] on transport failure, an error status, or a
    /// body that is not an evaluation.
    pub async fn evaluate_with<C>(
        &self,
        content: &str,
        context: &C,
    ) -> Result<Evaluation, EvaluatorError>
    where
        C: Serialize + Sync + ?Sized,
    {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EvaluationRequest { content, context })
            .send()
            .await
            .map_err(EvaluatorError::unavailable)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(EvaluatorError::unavailable)?;
        if !status.is_success() {
            return Err(EvaluatorError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str::<Evaluation>(&body)
            .map_err(|err| EvaluatorError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl ContentEvaluator for RemoteEvaluator {
    async fn evaluate(
        &self,
        content: &str,
        context: &EvaluationContext,
    ) -> Result<Evaluation, EvaluatorError> {
        self.evaluate_with(content, context).await
    }
}
