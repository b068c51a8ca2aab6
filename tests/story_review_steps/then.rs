//! Then steps for story review BDD scenarios.

use super::world::{StoryReviewWorld, run_async};
use eyre::{OptionExt, ensure};
use rstest_bdd_macros::then;
use storyloom::story::{
    domain::{ContentKind, StoryDomainError, StoryState},
    services::StoryWorkflowError,
};

#[then(r#"the story is in stage "{stage}""#)]
fn story_in_stage(world: &StoryReviewWorld, stage: String) -> Result<(), eyre::Report> {
    let expected = StoryState::try_from(stage.as_str())
        .map_err(|err| eyre::eyre!("invalid expected stage in scenario: {err}"))?;
    let story = run_async(world.service.find_story(world.story_id()?))?
        .ok_or_eyre("story missing from repository")?;

    ensure!(
        story.state() == expected,
        "expected stage {expected}, found {}",
        story.state()
    );
    Ok(())
}

#[then("the review is linked to title version {version:u32}")]
fn review_linked_to_version(world: &StoryReviewWorld, version: u32) -> Result<(), eyre::Report> {
    let outcome = world
        .last_outcome
        .as_ref()
        .ok_or_eyre("missing review outcome")?;

    ensure!(outcome.link.version.value() == version);
    ensure!(outcome.link.review_id == outcome.review.id());
    Ok(())
}

#[then("the story has {count:usize} title versions")]
fn story_has_title_versions(world: &StoryReviewWorld, count: usize) -> Result<(), eyre::Report> {
    let titles = run_async(
        world
            .service
            .revisions(world.story_id()?, ContentKind::Title),
    )?;
    let versions: Vec<u32> = titles.iter().map(|title| title.version().value()).collect();
    let expected: Vec<u32> = (1..).take(count).collect();

    ensure!(versions == expected, "title versions were {versions:?}");
    Ok(())
}

#[then("the latest title answers the previous review")]
fn latest_title_answers_review(world: &StoryReviewWorld) -> Result<(), eyre::Report> {
    let review_id = world
        .last_outcome
        .as_ref()
        .map(|outcome| outcome.review.id())
        .ok_or_eyre("missing review outcome")?;
    let titles = run_async(
        world
            .service
            .revisions(world.story_id()?, ContentKind::Title),
    )?;
    let latest = titles.last().ok_or_eyre("story has no titles")?;

    ensure!(latest.review_id() == Some(review_id));
    Ok(())
}

#[then("the story has {count:usize} reviews")]
fn story_has_reviews(world: &StoryReviewWorld, count: usize) -> Result<(), eyre::Report> {
    let history = run_async(world.service.review_history(world.story_id()?))?;

    ensure!(history.len() == count, "found {} reviews", history.len());
    Ok(())
}

#[then("the review fails because the story is not under review")]
fn review_fails_outside_review_stage(world: &StoryReviewWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_review_result
        .as_ref()
        .ok_or_eyre("missing review result")?;

    ensure!(
        matches!(
            result,
            Err(StoryWorkflowError::Domain(
                StoryDomainError::NotAReviewStage { .. }
            ))
        ),
        "expected NotAReviewStage error, got {result:?}"
    );
    Ok(())
}
