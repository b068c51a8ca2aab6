//! Port contracts for story persistence and content evaluation.

mod evaluator;
mod repository;

pub use evaluator::{ContentEvaluator, Evaluation, EvaluationContext, EvaluatorError};
pub use repository::{ReviewCandidate, ReviewCommit, StoryRepository};
