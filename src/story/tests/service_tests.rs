//! Service orchestration tests for the story workflow.

use std::sync::Arc;
use std::time::Duration;

use crate::storage::StorageError;
use crate::story::{
    adapters::{evaluator::FixedScoreEvaluator, memory::InMemoryStoryRepository},
    domain::{
        AcceptanceThresholds, ContentKind, IdeaId, ReviewType, Score, StoryDomainError, StoryId,
        StoryState,
    },
    ports::{ContentEvaluator, Evaluation, EvaluationContext, EvaluatorError},
    services::{StoryWorkflowError, StoryWorkflowService},
};
use async_trait::async_trait;
use eyre::{OptionExt, ensure};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

type TestService = StoryWorkflowService<InMemoryStoryRepository, DefaultClock>;

#[fixture]
fn service() -> TestService {
    StoryWorkflowService::with_thresholds(
        Arc::new(InMemoryStoryRepository::new()),
        Arc::new(DefaultClock),
        AcceptanceThresholds::uniform(Score::clamped(85)),
    )
}

fn evaluator(score: u8) -> FixedScoreEvaluator {
    FixedScoreEvaluator::new(Score::clamped(score)).with_feedback(format!("scored {score}"))
}

struct UnavailableEvaluator;

#[async_trait]
impl ContentEvaluator for UnavailableEvaluator {
    async fn evaluate(
        &self,
        _content: &str,
        _context: &EvaluationContext,
    ) -> Result<Evaluation, EvaluatorError> {
        Err(EvaluatorError::unavailable(std::io::Error::other(
            "reviewer offline",
        )))
    }
}

async fn story_awaiting_title_review(service: &TestService) -> eyre::Result<StoryId> {
    let story = service.create_story(IdeaId::new()).await?;
    service.submit_title(story.id(), "A Cautious Title", None).await?;
    Ok(story.id())
}

#[rstest]
#[case(90, StoryState::ScriptDraft)]
#[case(80, StoryState::TitleRefinement)]
#[tokio::test(flavor = "multi_thread")]
async fn title_review_moves_story_by_threshold(
    service: TestService,
    #[case] score: u8,
    #[case] expected: StoryState,
) -> eyre::Result<()> {
    let story_id = story_awaiting_title_review(&service).await?;

    let outcome = service.review_story(story_id, &evaluator(score)).await?;

    ensure!(outcome.story.state() == expected);
    ensure!(outcome.previous_state == StoryState::TitleReview);
    ensure!(outcome.accepted() == (expected == StoryState::ScriptDraft));
    ensure!(outcome.link.review_type == ReviewType::TitleReadability);
    ensure!(outcome.link.version.value() == 1);
    let stored = service.find_story(story_id).await?.ok_or_eyre("story missing")?;
    ensure!(stored.state() == expected);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_title_is_refined_with_the_next_version(
    service: TestService,
) -> eyre::Result<()> {
    let story_id = story_awaiting_title_review(&service).await?;
    let rejection = service.review_story(story_id, &evaluator(40)).await?;

    let refined = service
        .submit_title(story_id, "A Bolder Title", Some(rejection.review.id()))
        .await?;

    ensure!(refined.version().value() == 2);
    ensure!(refined.review_id() == Some(rejection.review.id()));
    let titles = service.revisions(story_id, ContentKind::Title).await?;
    let versions: Vec<u32> = titles.iter().map(|t| t.version().value()).collect();
    ensure!(versions == [1, 2], "versions were {versions:?}");
    let story = service.find_story(story_id).await?.ok_or_eyre("story missing")?;
    ensure!(story.state() == StoryState::TitleReview);
    ensure!(story.current_title_id() == Some(refined.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn full_cycle_reaches_published(service: TestService) -> eyre::Result<()> {
    let story_id = story_awaiting_title_review(&service).await?;
    let accept = evaluator(95);

    service.review_story(story_id, &accept).await?;
    service.submit_script(story_id, "Scene one.", None).await?;
    service.review_story(story_id, &accept).await?;
    let expert = service.review_story(story_id, &accept).await?;

    ensure!(expert.previous_state == StoryState::ExpertReview);
    ensure!(expert.story.state() == StoryState::Published);
    let history = service.review_history(story_id).await?;
    let types: Vec<ReviewType> = history.iter().map(|r| r.link.review_type).collect();
    ensure!(
        types
            == [
                ReviewType::TitleReadability,
                ReviewType::ScriptReadability,
                ReviewType::ExpertReview
            ],
        "history was {types:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_next_picks_the_oldest_current_revision(service: TestService) -> eyre::Result<()> {
    let first = story_awaiting_title_review(&service).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = story_awaiting_title_review(&service).await?;

    let reviewed = service
        .review_next(StoryState::TitleReview, &evaluator(90))
        .await?
        .ok_or_eyre("a story should be waiting")?;
    let next = service
        .review_next(StoryState::TitleReview, &evaluator(90))
        .await?
        .ok_or_eyre("a second story should be waiting")?;
    let empty = service
        .review_next(StoryState::TitleReview, &evaluator(90))
        .await?;

    ensure!(reviewed.story.id() == first);
    ensure!(next.story.id() == second);
    ensure!(empty.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_next_rejects_generation_stages(service: TestService) {
    let result = service
        .review_next(StoryState::ScriptDraft, &evaluator(90))
        .await;

    assert!(matches!(
        result,
        Err(StoryWorkflowError::NotAReviewStage(StoryState::ScriptDraft))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn evaluator_failure_leaves_the_story_untouched(service: TestService) -> eyre::Result<()> {
    let story_id = story_awaiting_title_review(&service).await?;

    let result = service.review_story(story_id, &UnavailableEvaluator).await;

    ensure!(matches!(result, Err(StoryWorkflowError::Evaluator(_))));
    let story = service.find_story(story_id).await?.ok_or_eyre("story missing")?;
    ensure!(story.state() == StoryState::TitleReview);
    ensure!(service.review_history(story_id).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn script_submission_in_title_draft_is_a_domain_error(
    service: TestService,
) -> eyre::Result<()> {
    let story = service.create_story(IdeaId::new()).await?;

    let result = service.submit_script(story.id(), "Too early", None).await;

    ensure!(matches!(
        result,
        Err(StoryWorkflowError::Domain(
            StoryDomainError::RevisionNotAccepted { .. }
        ))
    ));
    ensure!(
        service
            .revisions(story.id(), ContentKind::Script)
            .await?
            .is_empty()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_story_is_reported(service: TestService) {
    let missing = StoryId::new();

    let result = service.review_story(missing, &evaluator(90)).await;

    assert!(matches!(
        result,
        Err(StoryWorkflowError::StoryNotFound(id)) if id == missing
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn archive_is_final(service: TestService) -> eyre::Result<()> {
    let story_id = story_awaiting_title_review(&service).await?;

    let archived = service.archive(story_id).await?;
    let again = service.archive(story_id).await;
    let review = service.review_story(story_id, &evaluator(90)).await;

    ensure!(archived.state() == StoryState::Archived);
    ensure!(matches!(again, Err(StoryWorkflowError::Domain(_))));
    ensure!(matches!(review, Err(StoryWorkflowError::Domain(_))));
    ensure!(
        service
            .stories_in(StoryState::Archived)
            .await?
            .iter()
            .any(|s| s.id() == story_id)
    );
    Ok(())
}

#[rstest]
fn concurrent_update_errors_are_recognised() {
    let err = StoryWorkflowError::Storage(StorageError::invalid_transition(
        crate::storage::EntityKind::Story,
        "id",
        "archived",
        "script_draft",
    ));

    assert!(err.is_concurrent_update());
    assert!(!StoryWorkflowError::NotAReviewStage(StoryState::Published).is_concurrent_update());
}
