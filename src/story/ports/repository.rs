//! Repository port for the versioned workflow store.

use crate::storage::StorageResult;
use crate::story::domain::{
    ContentKind, ContentRevision, Review, ReviewRecord, Story, StoryId, StoryReview, StoryState,
};
use async_trait::async_trait;

/// A story waiting in a review stage together with the revision to review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCandidate {
    /// Story selected for review.
    pub story: Story,
    /// Its current revision of the stage's content kind.
    pub revision: ContentRevision,
}

/// Everything written when a review is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCommit {
    /// The new review record.
    pub review: Review,
    /// Link between the review and the evaluated version.
    pub link: StoryReview,
    /// The story after the transition was applied.
    pub story: Story,
    /// The stage the story must still be in for the commit to apply.
    pub expected_state: StoryState,
}

/// Persistence contract for stories, revisions, and reviews.
///
/// Multi-row operations are atomic: either every row is written or none is.
/// Story updates are guarded by the stage the caller last observed, so a
/// concurrent writer that moved the story first causes
/// [`StorageError::InvalidStateTransition`](crate::storage::StorageError::InvalidStateTransition).
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Stores a new story.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntity` when the identifier already exists.
    async fn store(&self, story: &Story) -> StorageResult<()>;

    /// Finds a story by identifier.
    async fn find_by_id(&self, id: StoryId) -> StorageResult<Option<Story>>;

    /// Lists stories currently in `state`, oldest first.
    async fn list_by_state(&self, state: StoryState) -> StorageResult<Vec<Story>>;

    /// Appends `revision` and saves `story`, which must already point at it.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntity` when the version is taken,
    /// `DataIntegrityViolation` when it would leave a gap,
    /// `ForeignKeyViolation` for unknown stories or reviews, and
    /// `InvalidStateTransition` when the story left `expected_state`.
    async fn append_revision(
        &self,
        revision: &ContentRevision,
        story: &Story,
        expected_state: StoryState,
    ) -> StorageResult<()>;

    /// Returns the highest-versioned revision of `kind`.
    async fn latest_revision(
        &self,
        story_id: StoryId,
        kind: ContentKind,
    ) -> StorageResult<Option<ContentRevision>>;

    /// Returns every revision of `kind`, ordered by version.
    async fn revisions(
        &self,
        story_id: StoryId,
        kind: ContentKind,
    ) -> StorageResult<Vec<ContentRevision>>;

    /// Selects the story in `state` whose current `kind` revision is oldest.
    ///
    /// Ties are broken by revision identifier. Stories without a current
    /// revision of `kind` are skipped.
    async fn next_for_review(
        &self,
        state: StoryState,
        kind: ContentKind,
    ) -> StorageResult<Option<ReviewCandidate>>;

    /// Writes the review, its link, and the story update in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the story left
    /// `commit.expected_state`; nothing is written in that case.
    async fn commit_review(&self, commit: &ReviewCommit) -> StorageResult<()>;

    /// Returns the reviews recorded for a story, oldest first.
    async fn review_history(&self, story_id: StoryId) -> StorageResult<Vec<ReviewRecord>>;

    /// Saves a state change made outside a review.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` for unknown stories and
    /// `InvalidStateTransition` when the story left `expected_state`.
    async fn update_state(&self, story: &Story, expected_state: StoryState) -> StorageResult<()>;
}
