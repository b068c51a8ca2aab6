//! Domain model for the story workflow.
//!
//! A story moves through title and script stages. Every title or script is an
//! immutable, versioned revision; every evaluation is an immutable review.
//! Only the story itself changes, and only along the edges of
//! [`StoryState::can_transition_to`].

mod content;
mod error;
mod ids;
mod review;
mod stage;
mod story;

pub use content::{ContentKind, ContentRevision, ContentVersion, PersistedRevisionData};
pub use error::{ParseReviewTypeError, ParseStoryStateError, StoryDomainError};
pub use ids::{IdeaId, ReviewId, RevisionId, StoryId};
pub use review::{MAX_SCORE, Review, ReviewRecord, Score, StoryReview};
pub use stage::{
    AcceptanceThresholds, DEFAULT_ACCEPTANCE_THRESHOLD, ReviewType, StageRule, StoryState,
    resolve_transition,
};
pub use story::{PersistedStoryData, Story};
