//! Repository contract tests against a real `SQLite` file.

use crate::sqlite::helpers::TestDatabase;
use eyre::{OptionExt, ensure};
use mockable::DefaultClock;
use storyloom::storage::StorageError;
use storyloom::story::adapters::sqlite::SqliteStoryRepository;
use storyloom::story::domain::{
    ContentKind, ContentRevision, ContentVersion, IdeaId, Review, ReviewType, Score, Story,
    StoryReview, StoryState,
};
use storyloom::story::ports::{ReviewCommit, StoryRepository};

fn title(story: &Story, version: i64, text: &str) -> eyre::Result<ContentRevision> {
    Ok(ContentRevision::new(
        story.id(),
        ContentKind::Title,
        ContentVersion::new(version)?,
        text,
        None,
        &DefaultClock,
    )?)
}

/// Stores a story and its first title, returning both.
async fn story_with_title(
    repository: &SqliteStoryRepository,
) -> eyre::Result<(Story, Story, ContentRevision)> {
    let draft = Story::new(IdeaId::new(), &DefaultClock);
    repository.store(&draft).await?;
    let revision = title(&draft, 1, "The Lighthouse Keeper's Ledger")?;
    let mut titled = draft.clone();
    titled.attach_revision(&revision, &DefaultClock)?;
    repository
        .append_revision(&revision, &titled, StoryState::TitleDraft)
        .await?;
    Ok((draft, titled, revision))
}

#[tokio::test(flavor = "multi_thread")]
async fn stored_story_round_trips() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let story = Story::new(IdeaId::new(), &DefaultClock);

    repository.store(&story).await?;
    let found = repository
        .find_by_id(story.id())
        .await?
        .ok_or_eyre("story missing")?;

    ensure!(found.id() == story.id());
    ensure!(found.idea_id() == story.idea_id());
    ensure!(found.state() == StoryState::TitleDraft);
    ensure!(found.current_title_id().is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn storing_a_story_twice_is_a_duplicate() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let story = Story::new(IdeaId::new(), &DefaultClock);
    repository.store(&story).await?;

    let result = repository.store(&story).await;

    ensure!(
        matches!(result, Err(StorageError::DuplicateEntity { .. })),
        "expected DuplicateEntity, got {result:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn appended_title_becomes_current() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;

    let (_, titled, revision) = story_with_title(&repository).await?;

    let stored = repository
        .find_by_id(titled.id())
        .await?
        .ok_or_eyre("story missing")?;
    ensure!(stored.state() == StoryState::TitleReview);
    ensure!(stored.current_title_id() == Some(revision.id()));
    let latest = repository
        .latest_revision(titled.id(), ContentKind::Title)
        .await?
        .ok_or_eyre("latest title missing")?;
    ensure!(latest.id() == revision.id());
    ensure!(latest.text() == "The Lighthouse Keeper's Ledger");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn reused_version_is_a_duplicate_and_writes_nothing() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let (draft, _, _) = story_with_title(&repository).await?;
    let duplicate = title(&draft, 1, "A Competing Title")?;
    let mut stale = draft.clone();
    stale.attach_revision(&duplicate, &DefaultClock)?;

    let result = repository
        .append_revision(&duplicate, &stale, StoryState::TitleDraft)
        .await;

    ensure!(
        matches!(result, Err(StorageError::DuplicateEntity { .. })),
        "expected DuplicateEntity, got {result:?}"
    );
    let titles = repository.revisions(draft.id(), ContentKind::Title).await?;
    ensure!(titles.len() == 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn version_gap_is_an_integrity_violation() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let draft = Story::new(IdeaId::new(), &DefaultClock);
    repository.store(&draft).await?;
    let skipped = title(&draft, 2, "Skipping Ahead")?;
    let mut titled = draft.clone();
    titled.attach_revision(&skipped, &DefaultClock)?;

    let result = repository
        .append_revision(&skipped, &titled, StoryState::TitleDraft)
        .await;

    ensure!(
        matches!(result, Err(StorageError::DataIntegrityViolation { .. })),
        "expected DataIntegrityViolation, got {result:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn revision_for_unknown_story_is_a_foreign_key_violation() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let mut unsaved = Story::new(IdeaId::new(), &DefaultClock);
    let orphan = title(&unsaved, 1, "Nobody's Title")?;
    unsaved.attach_revision(&orphan, &DefaultClock)?;

    let result = repository
        .append_revision(&orphan, &unsaved, StoryState::TitleDraft)
        .await;

    ensure!(
        matches!(result, Err(StorageError::ForeignKeyViolation { .. })),
        "expected ForeignKeyViolation, got {result:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn review_commit_against_a_moved_story_writes_nothing() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let (_, titled, revision) = story_with_title(&repository).await?;

    let mut archived = titled.clone();
    archived.archive(&DefaultClock)?;
    repository
        .update_state(&archived, StoryState::TitleReview)
        .await?;

    let review = Review::new("Crisp and evocative.", Score::clamped(92), &DefaultClock);
    let mut reviewed = titled.clone();
    reviewed.apply_review(review.score(), Score::clamped(70), &DefaultClock)?;
    let commit = ReviewCommit {
        link: StoryReview {
            story_id: titled.id(),
            review_id: review.id(),
            version: revision.version(),
            review_type: ReviewType::TitleReadability,
        },
        review,
        story: reviewed,
        expected_state: StoryState::TitleReview,
    };

    let result = repository.commit_review(&commit).await;

    ensure!(
        matches!(result, Err(StorageError::InvalidStateTransition { .. })),
        "expected InvalidStateTransition, got {result:?}"
    );
    ensure!(repository.review_history(titled.id()).await?.is_empty());
    let stored = repository
        .find_by_id(titled.id())
        .await?
        .ok_or_eyre("story missing")?;
    ensure!(stored.state() == StoryState::Archived);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn update_of_unknown_story_is_not_found() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let mut unsaved = Story::new(IdeaId::new(), &DefaultClock);
    unsaved.archive(&DefaultClock)?;

    let result = repository
        .update_state(&unsaved, StoryState::TitleDraft)
        .await;

    ensure!(
        matches!(result, Err(StorageError::EntityNotFound { .. })),
        "expected EntityNotFound, got {result:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn next_for_review_orders_by_current_revision_age() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let repository = database.repository()?;
    let (_, first, _) = story_with_title(&repository).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let (_, second, _) = story_with_title(&repository).await?;

    let candidate = repository
        .next_for_review(StoryState::TitleReview, ContentKind::Title)
        .await?
        .ok_or_eyre("no candidate")?;
    let nothing = repository
        .next_for_review(StoryState::ScriptReview, ContentKind::Script)
        .await?;

    ensure!(candidate.story.id() == first.id());
    ensure!(candidate.story.id() != second.id());
    ensure!(nothing.is_none());
    Ok(())
}
