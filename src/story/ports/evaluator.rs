//! Port for the external content evaluator.

use crate::story::domain::{ContentKind, ContentVersion, ReviewType, Score, StoryId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// What the evaluator is looking at, besides the text itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Story the content belongs to.
    pub story_id: StoryId,
    /// Title or script.
    pub kind: ContentKind,
    /// Version being evaluated.
    pub version: ContentVersion,
    /// Kind of review requested.
    pub review_type: ReviewType,
}

/// Feedback and score returned by an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Reviewer feedback.
    pub text: String,
    /// Score in `0..=100`.
    pub score: Score,
}

/// Errors returned by evaluators.
#[derive(Debug, Clone, Error)]
pub enum EvaluatorError {
    /// The evaluator could not be reached.
    #[error("evaluator unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),

    /// The evaluator answered with an error status.
    #[error("evaluator rejected the request (status {status}): {message}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The evaluator answered with something that is not an evaluation.
    #[error("invalid evaluator response: {0}")]
    InvalidResponse(String),
}

impl EvaluatorError {
    /// Wraps a transport error.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}

/// Scores and comments on generated content.
///
/// Implementations may be heuristics, local models, or remote reviewers; the
/// workflow depends only on the returned score and text.
#[async_trait]
pub trait ContentEvaluator: Send + Sync {
    /// Evaluates `content`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] when no evaluation could be produced.
    async fn evaluate(
        &self,
        content: &str,
        context: &EvaluationContext,
    ) -> Result<Evaluation, EvaluatorError>;
}
