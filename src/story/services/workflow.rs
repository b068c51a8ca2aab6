//! Orchestration of the generate, review, accept/reject cycle.

use crate::storage::{EntityKind, StorageError};
use crate::story::{
    domain::{
        AcceptanceThresholds, ContentKind, ContentRevision, ContentVersion, IdeaId, Review,
        ReviewId, ReviewRecord, Score, Story, StoryDomainError, StoryId, StoryReview, StoryState,
    },
    ports::{
        ContentEvaluator, EvaluationContext, EvaluatorError, ReviewCandidate, ReviewCommit,
        StoryRepository,
    },
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum StoryWorkflowError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] StoryDomainError),

    /// The store rejected the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The evaluator could not produce a review.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    /// The story does not exist.
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),

    /// The stage has no review rule.
    #[error("{0} is not a review stage")]
    NotAReviewStage(StoryState),

    /// The story is in a review stage but has nothing to review.
    #[error("story {story_id} has no {kind} to review")]
    MissingContent {
        /// Story under review.
        story_id: StoryId,
        /// Content kind the stage reviews.
        kind: ContentKind,
    },
}

/// Result type for workflow service operations.
pub type StoryWorkflowResult<T> = Result<T, StoryWorkflowError>;

/// Everything a committed review changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    /// The story after the transition.
    pub story: Story,
    /// The stored review.
    pub review: Review,
    /// The stored link row.
    pub link: StoryReview,
    /// Stage the story was reviewed in.
    pub previous_state: StoryState,
    /// Threshold the score was compared with.
    pub threshold: Score,
}

impl ReviewOutcome {
    /// Returns `true` when the review moved the story forward.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.review.score() >= self.threshold
    }
}

/// Story workflow orchestration service.
pub struct StoryWorkflowService<R, C>
where
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    thresholds: AcceptanceThresholds,
}

impl<R, C> Clone for StoryWorkflowService<R, C>
where
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            thresholds: self.thresholds,
        }
    }
}

impl<R, C> StoryWorkflowService<R, C>
where
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    /// Creates a service using the default acceptance thresholds.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self::with_thresholds(repository, clock, AcceptanceThresholds::default())
    }

    /// Creates a service with explicit acceptance thresholds.
    #[must_use]
    pub const fn with_thresholds(
        repository: Arc<R>,
        clock: Arc<C>,
        thresholds: AcceptanceThresholds,
    ) -> Self {
        Self {
            repository,
            clock,
            thresholds,
        }
    }

    /// Returns the configured thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &AcceptanceThresholds {
        &self.thresholds
    }

    /// Starts a story for `idea_id` in the initial stage.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::Storage`] when persistence fails.
    pub async fn create_story(&self, idea_id: IdeaId) -> StoryWorkflowResult<Story> {
        let story = Story::new(idea_id, &*self.clock);
        self.repository.store(&story).await?;
        info!(story_id = %story.id(), idea_id = %idea_id, "story created");
        Ok(story)
    }

    /// Appends a title revision and moves the story to title review.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_revision`].
    pub async fn submit_title(
        &self,
        story_id: StoryId,
        text: impl Into<String> + Send,
        prompted_by: Option<ReviewId>,
    ) -> StoryWorkflowResult<ContentRevision> {
        self.submit_revision(story_id, ContentKind::Title, text, prompted_by)
            .await
    }

    /// Appends a script revision and moves the story to script review.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_revision`].
    pub async fn submit_script(
        &self,
        story_id: StoryId,
        text: impl Into<String> + Send,
        prompted_by: Option<ReviewId>,
    ) -> StoryWorkflowResult<ContentRevision> {
        self.submit_revision(story_id, ContentKind::Script, text, prompted_by)
            .await
    }

    /// Appends the next revision of `kind`.
    ///
    /// The version is one past the latest stored version; the store's
    /// uniqueness constraint decides if a concurrent writer got there first.
    /// `prompted_by` names the review whose feedback produced the revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::StoryNotFound`] for unknown stories,
    /// [`StoryWorkflowError::Domain`] when the stage does not accept the
    /// revision, and [`StoryWorkflowError::Storage`] when the store rejects
    /// it (for example `DuplicateEntity` after a concurrent append).
    pub async fn submit_revision(
        &self,
        story_id: StoryId,
        kind: ContentKind,
        text: impl Into<String> + Send,
        prompted_by: Option<ReviewId>,
    ) -> StoryWorkflowResult<ContentRevision> {
        let mut story = self.load_story(story_id).await?;
        let version = match self.repository.latest_revision(story_id, kind).await? {
            Some(latest) => latest.version().next()?,
            None => ContentVersion::FIRST,
        };
        let revision =
            ContentRevision::new(story_id, kind, version, text, prompted_by, &*self.clock)?;

        let expected_state = story.state();
        story.attach_revision(&revision, &*self.clock)?;
        self.repository
            .append_revision(&revision, &story, expected_state)
            .await?;

        info!(
            story_id = %story_id,
            kind = %kind,
            version = version.value(),
            state = %story.state(),
            "revision appended"
        );
        Ok(revision)
    }

    /// Reviews the story that has waited longest in `stage`.
    ///
    /// Returns `Ok(None)` when no story is waiting.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::NotAReviewStage`] for generation and
    /// terminal stages, plus the errors of [`Self::review_story`].
    pub async fn review_next<E>(
        &self,
        stage: StoryState,
        evaluator: &E,
    ) -> StoryWorkflowResult<Option<ReviewOutcome>>
    where
        E: ContentEvaluator + ?Sized,
    {
        let rule = stage
            .review_rule()
            .ok_or(StoryWorkflowError::NotAReviewStage(stage))?;
        let Some(candidate) = self
            .repository
            .next_for_review(stage, rule.content_kind)
            .await?
        else {
            debug!(stage = %stage, "no story waiting for review");
            return Ok(None);
        };
        self.review_candidate(candidate, evaluator).await.map(Some)
    }

    /// Reviews one story in its current review stage.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::StoryNotFound`],
    /// [`StoryWorkflowError::Domain`] outside review stages,
    /// [`StoryWorkflowError::MissingContent`] when nothing was submitted,
    /// [`StoryWorkflowError::Evaluator`] when evaluation fails, and
    /// [`StoryWorkflowError::Storage`] when the commit is rejected. A story
    /// moved by another writer in the meantime yields
    /// `StorageError::InvalidStateTransition` and nothing is written.
    pub async fn review_story<E>(
        &self,
        story_id: StoryId,
        evaluator: &E,
    ) -> StoryWorkflowResult<ReviewOutcome>
    where
        E: ContentEvaluator + ?Sized,
    {
        let story = self.load_story(story_id).await?;
        let kind = story.review_rule()?.content_kind;
        let revision = self
            .repository
            .latest_revision(story_id, kind)
            .await?
            .ok_or(StoryWorkflowError::MissingContent { story_id, kind })?;
        self.review_candidate(ReviewCandidate { story, revision }, evaluator)
            .await
    }

    async fn review_candidate<E>(
        &self,
        candidate: ReviewCandidate,
        evaluator: &E,
    ) -> StoryWorkflowResult<ReviewOutcome>
    where
        E: ContentEvaluator + ?Sized,
    {
        let ReviewCandidate {
            mut story,
            revision,
        } = candidate;
        let rule = story.review_rule()?;
        let previous_state = rule.stage;
        let threshold = self
            .thresholds
            .for_stage(previous_state)
            .ok_or(StoryWorkflowError::NotAReviewStage(previous_state))?;

        let context = EvaluationContext {
            story_id: story.id(),
            kind: rule.content_kind,
            version: revision.version(),
            review_type: rule.review_type,
        };
        let evaluation = evaluator.evaluate(revision.text(), &context).await?;

        let review = Review::new(evaluation.text, evaluation.score, &*self.clock);
        story.apply_review(review.score(), threshold, &*self.clock)?;
        let link = StoryReview {
            story_id: story.id(),
            review_id: review.id(),
            version: revision.version(),
            review_type: rule.review_type,
        };
        let commit = ReviewCommit {
            review,
            link,
            story,
            expected_state: previous_state,
        };
        self.repository.commit_review(&commit).await?;

        let ReviewCommit {
            review, story, link, ..
        } = commit;
        info!(
            story_id = %story.id(),
            score = review.score().value(),
            threshold = threshold.value(),
            from = %previous_state,
            to = %story.state(),
            "review committed"
        );
        Ok(ReviewOutcome {
            story,
            review,
            link,
            previous_state,
            threshold,
        })
    }

    /// Withdraws a story from the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::StoryNotFound`],
    /// [`StoryWorkflowError::Domain`] for terminal stories, and
    /// [`StoryWorkflowError::Storage`] when the guarded update fails.
    pub async fn archive(&self, story_id: StoryId) -> StoryWorkflowResult<Story> {
        let mut story = self.load_story(story_id).await?;
        let expected_state = story.state();
        story.archive(&*self.clock)?;
        self.repository.update_state(&story, expected_state).await?;
        info!(story_id = %story_id, from = %expected_state, "story archived");
        Ok(story)
    }

    /// Finds a story by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::Storage`] when the lookup fails.
    pub async fn find_story(&self, story_id: StoryId) -> StoryWorkflowResult<Option<Story>> {
        Ok(self.repository.find_by_id(story_id).await?)
    }

    /// Lists the stories waiting in `state`.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::Storage`] when the lookup fails.
    pub async fn stories_in(&self, state: StoryState) -> StoryWorkflowResult<Vec<Story>> {
        Ok(self.repository.list_by_state(state).await?)
    }

    /// Returns every revision of `kind`, ordered by version.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::Storage`] when the lookup fails.
    pub async fn revisions(
        &self,
        story_id: StoryId,
        kind: ContentKind,
    ) -> StoryWorkflowResult<Vec<ContentRevision>> {
        Ok(self.repository.revisions(story_id, kind).await?)
    }

    /// Returns the reviews recorded for a story, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoryWorkflowError::Storage`] when the lookup fails.
    pub async fn review_history(&self, story_id: StoryId) -> StoryWorkflowResult<Vec<ReviewRecord>> {
        Ok(self.repository.review_history(story_id).await?)
    }

    async fn load_story(&self, story_id: StoryId) -> StoryWorkflowResult<Story> {
        self.repository
            .find_by_id(story_id)
            .await?
            .ok_or(StoryWorkflowError::StoryNotFound(story_id))
    }
}

impl StoryWorkflowError {
    /// Returns `true` when a concurrent writer moved the story first.
    #[must_use]
    pub const fn is_concurrent_update(&self) -> bool {
        matches!(
            self,
            Self::Storage(StorageError::InvalidStateTransition {
                entity: EntityKind::Story,
                ..
            })
        )
    }
}
