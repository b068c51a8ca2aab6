//! Error types for story domain validation and parsing.

use super::{ContentKind, StoryId, StoryState};
use thiserror::Error;

/// Errors returned while constructing or mutating story domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoryDomainError {
    /// The score lies outside `0..=100`.
    #[error("invalid score {0}, expected a value between 0 and 100")]
    InvalidScore(i64),

    /// The content version is not a positive integer.
    #[error("invalid content version {0}, expected a positive integer")]
    InvalidVersion(i64),

    /// The revision text is empty after trimming.
    #[error("{0} text must not be empty")]
    EmptyContent(ContentKind),

    /// The requested state change is not an edge of the workflow.
    #[error("invalid state transition for story {story_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Story being transitioned.
        story_id: StoryId,
        /// Current state.
        from: StoryState,
        /// Requested state.
        to: StoryState,
    },

    /// The story is not waiting for a review.
    #[error("story {story_id} is in {state}, which is not a review stage")]
    NotAReviewStage {
        /// Story that was asked for a review.
        story_id: StoryId,
        /// Its current state.
        state: StoryState,
    },

    /// The story does not accept a revision of this kind in its current state.
    #[error("story {story_id} does not accept a {kind} revision while in {state}")]
    RevisionNotAccepted {
        /// Story receiving the revision.
        story_id: StoryId,
        /// Its current state.
        state: StoryState,
        /// Kind of the rejected revision.
        kind: ContentKind,
    },

    /// The revision belongs to another story.
    #[error("revision for story {actual} cannot be attached to story {expected}")]
    ForeignRevision {
        /// Story the revision was attached to.
        expected: StoryId,
        /// Story the revision was written for.
        actual: StoryId,
    },
}

/// Error returned while parsing story states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown story state: {0}")]
pub struct ParseStoryStateError(pub String);

/// Error returned while parsing review types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown review type: {0}")]
pub struct ParseReviewTypeError(pub String);
