//! Ports for the scoring specialization: the content store holding scored
//! items and the scorer that rates them.

use crate::story::domain::Score;
use crate::story::ports::{Evaluation, EvaluatorError};
use crate::worker::task::WorkerId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a content item awaiting a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content handed to the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringCandidate {
    /// Item being scored.
    pub item_id: ItemId,
    /// Text to score.
    pub content: String,
}

/// Stored view of a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredItem {
    /// Item identifier.
    pub item_id: ItemId,
    /// Item text.
    pub content: String,
    /// Score, once written.
    pub score: Option<Score>,
    /// Worker holding the autoscore reservation, if any.
    pub reserved_by: Option<WorkerId>,
}

impl ScoredItem {
    /// Returns the candidate handed to a scorer.
    #[must_use]
    pub fn candidate(&self) -> ScoringCandidate {
        ScoringCandidate {
            item_id: self.item_id,
            content: self.content.clone(),
        }
    }
}

/// Errors returned by score stores.
#[derive(Debug, Clone, Error)]
pub enum ScoreStoreError {
    /// The item does not exist.
    #[error("content item not found: {0}")]
    NotFound(ItemId),

    /// The store could not be reached.
    #[error("score store unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

/// Result type for score store operations.
pub type ScoreStoreResult<T> = Result<T, ScoreStoreError>;

/// Content store the scoring worker reads from and writes scores to.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Returns up to `limit` items with no score and no reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreStoreError`] when the store cannot be read.
    async fn fetch_unscored(&self, limit: u32) -> ScoreStoreResult<Vec<ScoringCandidate>>;

    /// Marks `item_id` as queued for scoring by `worker_id`.
    ///
    /// Returns `false` when the item is already reserved or scored, so at
    /// most one worker creates a task per item.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreStoreError::NotFound`] for an unknown item.
    async fn reserve_for_autoscore(
        &self,
        item_id: &ItemId,
        worker_id: &WorkerId,
    ) -> ScoreStoreResult<bool>;

    /// Drops a reservation held by `worker_id`. Other holders are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreStoreError::NotFound`] for an unknown item.
    async fn release_reservation(
        &self,
        item_id: &ItemId,
        worker_id: &WorkerId,
    ) -> ScoreStoreResult<()>;

    /// Stores `score` on the item. Writing the same score twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreStoreError::NotFound`] for an unknown item.
    async fn write_score(&self, item_id: &ItemId, score: Score) -> ScoreStoreResult<()>;

    /// Looks up an item.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreStoreError`] when the store cannot be read.
    async fn find(&self, item_id: &ItemId) -> ScoreStoreResult<Option<ScoredItem>>;
}

/// Rates content items for the scoring worker.
#[async_trait]
pub trait ItemScorer: Send + Sync {
    /// Scores `item`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] when no score could be produced.
    async fn score_item(&self, item: &ScoringCandidate) -> Result<Evaluation, EvaluatorError>;
}
