//! Shared world state for story review BDD scenarios.

use std::sync::Arc;

use eyre::OptionExt;
use mockable::DefaultClock;
use rstest::fixture;
use storyloom::story::{
    adapters::{evaluator::FixedScoreEvaluator, memory::InMemoryStoryRepository},
    domain::{AcceptanceThresholds, Score, StoryId},
    services::{ReviewOutcome, StoryWorkflowError, StoryWorkflowService},
};

/// Service type used by the BDD world.
pub type TestStoryService = StoryWorkflowService<InMemoryStoryRepository, DefaultClock>;

/// Scenario world for story review behaviour tests.
pub struct StoryReviewWorld {
    pub service: TestStoryService,
    pub story_id: Option<StoryId>,
    pub last_outcome: Option<ReviewOutcome>,
    pub last_review_result: Option<Result<ReviewOutcome, StoryWorkflowError>>,
}

impl StoryReviewWorld {
    /// Creates a world using the default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            service: service_with(AcceptanceThresholds::default()),
            story_id: None,
            last_outcome: None,
            last_review_result: None,
        }
    }

    /// Replaces the service with one using a uniform `threshold`.
    pub fn use_threshold(&mut self, threshold: Score) {
        self.service = service_with(AcceptanceThresholds::uniform(threshold));
    }

    /// Returns the story created by the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if no story has been created yet.
    pub fn story_id(&self) -> eyre::Result<StoryId> {
        self.story_id.ok_or_eyre("missing story in scenario world")
    }

    /// Reviews the scenario story with a fixed `score`.
    ///
    /// # Errors
    ///
    /// Returns an error if no story has been created yet; the review result
    /// itself is returned as the inner value.
    pub async fn review(
        &self,
        score: Score,
    ) -> eyre::Result<Result<ReviewOutcome, StoryWorkflowError>> {
        let story_id = self.story_id()?;
        let evaluator = FixedScoreEvaluator::new(score)
            .with_feedback(format!("reviewed at {}", score.value()));
        Ok(self.service.review_story(story_id, &evaluator).await)
    }
}

impl Default for StoryReviewWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn service_with(thresholds: AcceptanceThresholds) -> TestStoryService {
    StoryWorkflowService::with_thresholds(
        Arc::new(InMemoryStoryRepository::new()),
        Arc::new(DefaultClock),
        thresholds,
    )
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> StoryReviewWorld {
    StoryReviewWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Parses a score from a step argument.
///
/// # Errors
///
/// Returns an error if `value` is outside `0..=100`.
pub fn score(value: u32) -> eyre::Result<Score> {
    Score::new(i64::from(value)).map_err(|err| eyre::eyre!("invalid score in scenario: {err}"))
}
