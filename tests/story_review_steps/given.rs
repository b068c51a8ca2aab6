//! Given steps for story review BDD scenarios.

use super::world::{StoryReviewWorld, run_async, score};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use storyloom::story::domain::IdeaId;

#[given("an acceptance threshold of {threshold:u32}")]
fn acceptance_threshold(world: &mut StoryReviewWorld, threshold: u32) -> Result<(), eyre::Report> {
    world.use_threshold(score(threshold)?);
    Ok(())
}

#[given(r#"a story titled "{title}""#)]
fn story_titled(world: &mut StoryReviewWorld, title: String) -> Result<(), eyre::Report> {
    let story = run_async(world.service.create_story(IdeaId::new()))
        .wrap_err("create story for review scenario")?;
    run_async(world.service.submit_title(story.id(), title, None))
        .wrap_err("submit first title")?;
    world.story_id = Some(story.id());
    Ok(())
}

#[given("the story was reviewed with a score of {value:u32}")]
fn story_was_reviewed(world: &mut StoryReviewWorld, value: u32) -> Result<(), eyre::Report> {
    let outcome = run_async(world.review(score(value)?))?.wrap_err("review in scenario setup")?;
    world.last_outcome = Some(outcome);
    Ok(())
}

#[given("the story has reached expert review")]
fn story_reached_expert_review(world: &mut StoryReviewWorld) -> Result<(), eyre::Report> {
    let story_id = world.story_id()?;
    let accept = score(100)?;
    run_async(world.review(accept))?.wrap_err("accept title")?;
    run_async(world.service.submit_script(
        story_id,
        "The ice sang under the sledges all night.",
        None,
    ))
    .wrap_err("submit script")?;
    let outcome = run_async(world.review(accept))?.wrap_err("accept script")?;
    world.last_outcome = Some(outcome);
    Ok(())
}
