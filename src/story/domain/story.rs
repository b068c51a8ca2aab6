//! Story aggregate root.

use super::{
    ContentKind, ContentRevision, IdeaId, RevisionId, Score, StageRule, StoryDomainError,
    StoryId, StoryState,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Story aggregate root.
///
/// The story is the only mutable workflow record: it tracks the current
/// stage and points at the latest title and script revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    id: StoryId,
    idea_id: IdeaId,
    current_title_id: Option<RevisionId>,
    current_script_id: Option<RevisionId>,
    state: StoryState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedStoryData {
    /// Persisted story identifier.
    pub id: StoryId,
    /// Originating idea.
    pub idea_id: IdeaId,
    /// Current title revision, if any.
    pub current_title_id: Option<RevisionId>,
    /// Current script revision, if any.
    pub current_script_id: Option<RevisionId>,
    /// Persisted workflow stage.
    pub state: StoryState,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Story {
    /// Creates a story in [`StoryState::TitleDraft`].
    #[must_use]
    pub fn new(idea_id: IdeaId, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: StoryId::new(),
            idea_id,
            current_title_id: None,
            current_script_id: None,
            state: StoryState::TitleDraft,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a story from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedStoryData) -> Self {
        Self {
            id: data.id,
            idea_id: data.idea_id,
            current_title_id: data.current_title_id,
            current_script_id: data.current_script_id,
            state: data.state,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the story identifier.
    #[must_use]
    pub const fn id(&self) -> StoryId {
        self.id
    }

    /// Returns the originating idea.
    #[must_use]
    pub const fn idea_id(&self) -> IdeaId {
        self.idea_id
    }

    /// Returns the current title revision, if any.
    #[must_use]
    pub const fn current_title_id(&self) -> Option<RevisionId> {
        self.current_title_id
    }

    /// Returns the current script revision, if any.
    #[must_use]
    pub const fn current_script_id(&self) -> Option<RevisionId> {
        self.current_script_id
    }

    /// Returns the current revision of `kind`, if any.
    #[must_use]
    pub const fn current_revision_id(&self, kind: ContentKind) -> Option<RevisionId> {
        match kind {
            ContentKind::Title => self.current_title_id,
            ContentKind::Script => self.current_script_id,
        }
    }

    /// Returns the workflow stage.
    #[must_use]
    pub const fn state(&self) -> StoryState {
        self.state
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the story along a workflow edge.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::InvalidStateTransition`] when the stage
    /// has no edge to `target`; the story is left unchanged.
    pub fn transition_to(
        &mut self,
        target: StoryState,
        clock: &impl Clock,
    ) -> Result<(), StoryDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(StoryDomainError::InvalidStateTransition {
                story_id: self.id,
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.touch(clock);
        Ok(())
    }

    /// Makes `revision` current and enters the matching review stage.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::ForeignRevision`] when the revision belongs
    /// to another story, or [`StoryDomainError::RevisionNotAccepted`] when the
    /// current stage does not expect a revision of that kind.
    pub fn attach_revision(
        &mut self,
        revision: &ContentRevision,
        clock: &impl Clock,
    ) -> Result<(), StoryDomainError> {
        if revision.story_id() != self.id {
            return Err(StoryDomainError::ForeignRevision {
                expected: self.id,
                actual: revision.story_id(),
            });
        }
        let Some(next) = self.state.after_submission(revision.kind()) else {
            return Err(StoryDomainError::RevisionNotAccepted {
                story_id: self.id,
                state: self.state,
                kind: revision.kind(),
            });
        };
        match revision.kind() {
            ContentKind::Title => self.current_title_id = Some(revision.id()),
            ContentKind::Script => self.current_script_id = Some(revision.id()),
        }
        self.state = next;
        self.touch(clock);
        Ok(())
    }

    /// Returns the rule of the review stage the story is waiting in.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::NotAReviewStage`] outside review stages.
    pub const fn review_rule(&self) -> Result<StageRule, StoryDomainError> {
        match self.state.review_rule() {
            Some(rule) => Ok(rule),
            None => Err(StoryDomainError::NotAReviewStage {
                story_id: self.id,
                state: self.state,
            }),
        }
    }

    /// Applies a review score and returns the stage entered.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::NotAReviewStage`] outside review stages.
    pub fn apply_review(
        &mut self,
        score: Score,
        threshold: Score,
        clock: &impl Clock,
    ) -> Result<StoryState, StoryDomainError> {
        let next = self.review_rule()?.resolve(score, threshold);
        self.transition_to(next, clock)?;
        Ok(next)
    }

    /// Withdraws the story from the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::InvalidStateTransition`] when the story is
    /// already terminal.
    pub fn archive(&mut self, clock: &impl Clock) -> Result<(), StoryDomainError> {
        self.transition_to(StoryState::Archived, clock)
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
