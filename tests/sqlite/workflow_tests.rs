//! Workflow service tests over a real `SQLite` store.

use std::sync::Arc;

use crate::sqlite::helpers::{SqliteService, TestDatabase};
use eyre::ensure;
use mockable::DefaultClock;
use rstest::rstest;
use storyloom::story::adapters::evaluator::FixedScoreEvaluator;
use storyloom::storage::StorageError;
use storyloom::story::domain::{
    AcceptanceThresholds, ContentKind, IdeaId, Score, StoryDomainError, StoryId, StoryState,
};
use storyloom::story::services::StoryWorkflowError;
use tokio::task::JoinSet;

fn evaluator(score: u8) -> FixedScoreEvaluator {
    FixedScoreEvaluator::new(Score::clamped(score)).with_feedback(format!("scored {score}"))
}

async fn titled_story(service: &SqliteService) -> eyre::Result<StoryId> {
    let story = service.create_story(IdeaId::new()).await?;
    service
        .submit_title(story.id(), "Salt Roads of the North", None)
        .await?;
    Ok(story.id())
}

#[rstest]
#[case(90, StoryState::ScriptDraft)]
#[case(80, StoryState::TitleRefinement)]
#[tokio::test(flavor = "multi_thread")]
async fn title_review_against_eighty_five_moves_the_story(
    #[case] score: u8,
    #[case] expected: StoryState,
) -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let service = SqliteService::with_thresholds(
        Arc::new(database.repository()?),
        Arc::new(DefaultClock),
        AcceptanceThresholds::uniform(Score::clamped(85)),
    );
    let story_id = titled_story(&service).await?;

    let outcome = service.review_story(story_id, &evaluator(score)).await?;

    ensure!(outcome.story.state() == expected);
    let history = service.review_history(story_id).await?;
    ensure!(history.len() == 1);
    ensure!(
        history
            .first()
            .is_some_and(|record| record.review.score() == Score::clamped(score))
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_story_is_refined_and_published() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let service = database.service()?;
    let story_id = titled_story(&service).await?;

    let rejected = service.review_story(story_id, &evaluator(20)).await?;
    service
        .submit_title(story_id, "Salt Roads", Some(rejected.review.id()))
        .await?;
    service.review_story(story_id, &evaluator(90)).await?;
    service
        .submit_script(story_id, "The caravan left at dawn.", None)
        .await?;
    service.review_story(story_id, &evaluator(90)).await?;
    let published = service.review_story(story_id, &evaluator(90)).await?;

    ensure!(published.story.state() == StoryState::Published);
    let titles = service.revisions(story_id, ContentKind::Title).await?;
    let versions: Vec<u32> = titles.iter().map(|t| t.version().value()).collect();
    ensure!(versions == [1, 2], "title versions were {versions:?}");
    ensure!(
        titles
            .last()
            .and_then(|title| title.review_id())
            .is_some_and(|id| id == rejected.review.id())
    );
    ensure!(service.review_history(story_id).await?.len() == 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn racing_reviews_commit_exactly_once() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let first = database.service()?;
    let second = database.service()?;
    let story_id = titled_story(&first).await?;
    let (accept_a, accept_b) = (evaluator(90), evaluator(90));

    let (a, b) = tokio::join!(
        first.review_story(story_id, &accept_a),
        second.review_story(story_id, &accept_b),
    );

    ensure!(
        a.is_ok() != b.is_ok(),
        "exactly one review should commit: {a:?} / {b:?}"
    );
    ensure!(first.review_history(story_id).await?.len() == 1);
    Ok(())
}

/// Outcomes a losing writer may see when another writer got there first.
fn is_lost_race(error: &StoryWorkflowError) -> bool {
    matches!(
        error,
        StoryWorkflowError::Storage(
            StorageError::DuplicateEntity { .. } | StorageError::InvalidStateTransition { .. }
        ) | StoryWorkflowError::Domain(StoryDomainError::RevisionNotAccepted { .. })
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_title_submissions_lose_with_typed_errors() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let primary = database.service()?;
    let mut writers = Vec::new();
    for _ in 0..4 {
        writers.push(database.service()?);
    }
    let mut story_ids = Vec::new();
    for _ in 0..10 {
        story_ids.push(primary.create_story(IdeaId::new()).await?.id());
    }

    let mut submissions = JoinSet::new();
    for story_id in &story_ids {
        for (slot, writer) in writers.iter().enumerate() {
            let writer = writer.clone();
            let story_id = *story_id;
            submissions.spawn(async move {
                let outcome = writer
                    .submit_title(story_id, format!("Lanterns Over the Weir {slot}"), None)
                    .await;
                (story_id, outcome)
            });
        }
    }

    let mut accepted = Vec::new();
    while let Some(joined) = submissions.join_next().await {
        let (story_id, outcome) = joined?;
        match outcome {
            Ok(_) => accepted.push(story_id),
            Err(err) => ensure!(is_lost_race(&err), "unexpected submission error {err:?}"),
        }
    }

    ensure!(accepted.len() == story_ids.len());
    for story_id in &story_ids {
        ensure!(accepted.contains(story_id), "no submission landed for {story_id}");
        let titles = primary.revisions(*story_id, ContentKind::Title).await?;
        ensure!(titles.len() == 1);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn review_next_drains_a_stage_over_sqlite() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let service = database.service()?;
    titled_story(&service).await?;
    let accept = evaluator(75);

    let reviewed = service
        .review_next(StoryState::TitleReview, &accept)
        .await?;
    let drained = service
        .review_next(StoryState::TitleReview, &accept)
        .await?;

    ensure!(reviewed.is_some_and(|outcome| outcome.accepted()));
    ensure!(drained.is_none());
    ensure!(service.stories_in(StoryState::ScriptDraft).await?.len() == 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn archived_story_leaves_every_stage_listing() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let service = database.service()?;
    let story_id = titled_story(&service).await?;

    let archived = service.archive(story_id).await?;

    ensure!(archived.state() == StoryState::Archived);
    ensure!(service.stories_in(StoryState::TitleReview).await?.is_empty());
    ensure!(service.stories_in(StoryState::Archived).await?.len() == 1);
    Ok(())
}
