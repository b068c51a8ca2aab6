//! Deterministic evaluator returning a configured score.

use async_trait::async_trait;

use crate::story::domain::Score;
use crate::story::ports::{ContentEvaluator, Evaluation, EvaluationContext, EvaluatorError};

/// Evaluator that gives every piece of content the same score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedScoreEvaluator {
    score: Score,
    feedback: String,
}

impl FixedScoreEvaluator {
    /// Creates an evaluator that always returns `score`.
    #[must_use]
    pub fn new(score: Score) -> Self {
        Self {
            score,
            feedback: format!("fixed score {score}"),
        }
    }

    /// Replaces the feedback text returned with the score.
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    /// Returns the evaluation handed out for every input.
    #[must_use]
    pub fn evaluation(&self) -> Evaluation {
        Evaluation {
            text: self.feedback.clone(),
            score: self.score,
        }
    }
}

#[async_trait]
impl ContentEvaluator for FixedScoreEvaluator {
    async fn evaluate(
        &self,
        _content: &str,
        _context: &EvaluationContext,
    ) -> Result<Evaluation, EvaluatorError> {
        Ok(self.evaluation())
    }
}
