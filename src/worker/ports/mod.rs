//! Port contracts for task coordination and item scoring.

mod coordinator;
mod score_store;

pub use coordinator::{ClaimOutcome, CoordinatorError, CoordinatorResult, TaskCoordinator};
pub use score_store::{
    ItemId, ItemScorer, ScoreStore, ScoreStoreError, ScoreStoreResult, ScoredItem,
    ScoringCandidate,
};
