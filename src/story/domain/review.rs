//! Review audit records and scores.

use super::{ContentVersion, ReviewId, ReviewType, StoryDomainError, StoryId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest score a review can give.
pub const MAX_SCORE: u8 = 100;

/// Review score in `0..=100`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Validates a score.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::InvalidScore`] outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, StoryDomainError> {
        u8::try_from(value)
            .ok()
            .filter(|score| *score <= MAX_SCORE)
            .map(Self)
            .ok_or(StoryDomainError::InvalidScore(value))
    }

    /// Builds a score, saturating at [`MAX_SCORE`].
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > MAX_SCORE {
            Self(MAX_SCORE)
        } else {
            Self(value)
        }
    }

    /// Returns the numeric score.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = StoryDomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable review record produced by an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    text: String,
    score: Score,
    created_at: DateTime<Utc>,
}

impl Review {
    /// Records a new review.
    #[must_use]
    pub fn new(text: impl Into<String>, score: Score, clock: &impl Clock) -> Self {
        Self {
            id: ReviewId::new(),
            text: text.into(),
            score,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a review from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: ReviewId,
        text: String,
        score: Score,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            text,
            score,
            created_at,
        }
    }

    /// Returns the review identifier.
    #[must_use]
    pub const fn id(&self) -> ReviewId {
        self.id
    }

    /// Returns the reviewer feedback.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the score.
    #[must_use]
    pub const fn score(&self) -> Score {
        self.score
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Links a review to the story content version it evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryReview {
    /// Reviewed story.
    pub story_id: StoryId,
    /// Review record.
    pub review_id: ReviewId,
    /// Content version the review evaluated.
    pub version: ContentVersion,
    /// Kind of review performed.
    pub review_type: ReviewType,
}

/// A review together with the link describing what it evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    /// The review itself.
    pub review: Review,
    /// What the review evaluated.
    pub link: StoryReview,
}
