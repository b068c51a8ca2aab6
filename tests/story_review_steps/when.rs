//! When steps for story review BDD scenarios.

use super::world::{StoryReviewWorld, run_async, score};
use rstest_bdd_macros::when;

#[when("the story is reviewed with a score of {value:u32}")]
fn story_is_reviewed(world: &mut StoryReviewWorld, value: u32) -> Result<(), eyre::Report> {
    let result = run_async(world.review(score(value)?))?;
    if let Ok(ref outcome) = result {
        world.last_outcome = Some(outcome.clone());
    }
    world.last_review_result = Some(result);
    Ok(())
}

#[when(r#"a revised title "{title}" is submitted"#)]
fn revised_title_submitted(world: &mut StoryReviewWorld, title: String) -> Result<(), eyre::Report> {
    let story_id = world.story_id()?;
    let prompted_by = world
        .last_outcome
        .as_ref()
        .map(|outcome| outcome.review.id());
    run_async(world.service.submit_title(story_id, title, prompted_by))?;
    Ok(())
}
