//! [`ItemScorer`] implementations on top of the story evaluators.

use async_trait::async_trait;

use crate::story::adapters::evaluator::{FixedScoreEvaluator, RemoteEvaluator};
use crate::story::ports::{Evaluation, EvaluatorError};
use crate::worker::ports::{ItemScorer, ScoringCandidate};

#[async_trait]
impl ItemScorer for FixedScoreEvaluator {
    async fn score_item(&self, _item: &ScoringCandidate) -> Result<Evaluation, EvaluatorError> {
        Ok(self.evaluation())
    }
}

/// Posts `{"content": ..., "context": {"item_id": ..., "content": ...}}`.
#[async_trait]
impl ItemScorer for RemoteEvaluator {
    async fn score_item(&self, item: &ScoringCandidate) -> Result<Evaluation, EvaluatorError> {
        self.evaluate_with(&item.content, item).await
    }
}
