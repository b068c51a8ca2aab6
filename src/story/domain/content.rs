//! Append-only title and script revisions.

use super::{ReviewId, RevisionId, StoryDomainError, StoryId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of generated content attached to a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// A story title.
    Title,
    /// A story script.
    Script,
}

impl ContentKind {
    /// Returns the lowercase label of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Script => "script",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positive, per-story revision number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "u32")]
pub struct ContentVersion(u32);

impl ContentVersion {
    /// The version of the first revision.
    pub const FIRST: Self = Self(1);

    /// Validates a persisted or caller-supplied version.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::InvalidVersion`] unless `value` is in
    /// `1..=u32::MAX`.
    pub fn new(value: i64) -> Result<Self, StoryDomainError> {
        u32::try_from(value)
            .ok()
            .filter(|version| *version > 0)
            .map(Self)
            .ok_or(StoryDomainError::InvalidVersion(value))
    }

    /// Returns the version after this one.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::InvalidVersion`] when the counter would
    /// overflow.
    pub fn next(self) -> Result<Self, StoryDomainError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| StoryDomainError::InvalidVersion(i64::from(self.0) + 1))
    }

    /// Returns the numeric version.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for ContentVersion {
    type Error = StoryDomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentVersion> for u32 {
    fn from(version: ContentVersion) -> Self {
        version.0
    }
}

impl fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One immutable version of a story's title or script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRevision {
    id: RevisionId,
    story_id: StoryId,
    kind: ContentKind,
    version: ContentVersion,
    text: String,
    review_id: Option<ReviewId>,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRevisionData {
    /// Persisted revision identifier.
    pub id: RevisionId,
    /// Owning story.
    pub story_id: StoryId,
    /// Title or script.
    pub kind: ContentKind,
    /// Persisted version.
    pub version: ContentVersion,
    /// Persisted text.
    pub text: String,
    /// Review whose feedback produced the revision.
    pub review_id: Option<ReviewId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ContentRevision {
    /// Creates a new revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::EmptyContent`] when `text` is blank.
    pub fn new(
        story_id: StoryId,
        kind: ContentKind,
        version: ContentVersion,
        text: impl Into<String>,
        review_id: Option<ReviewId>,
        clock: &impl Clock,
    ) -> Result<Self, StoryDomainError> {
        let body = text.into();
        if body.trim().is_empty() {
            return Err(StoryDomainError::EmptyContent(kind));
        }
        Ok(Self {
            id: RevisionId::new(),
            story_id,
            kind,
            version,
            text: body,
            review_id,
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a revision from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedRevisionData) -> Self {
        Self {
            id: data.id,
            story_id: data.story_id,
            kind: data.kind,
            version: data.version,
            text: data.text,
            review_id: data.review_id,
            created_at: data.created_at,
        }
    }

    /// Returns the revision identifier.
    #[must_use]
    pub const fn id(&self) -> RevisionId {
        self.id
    }

    /// Returns the owning story.
    #[must_use]
    pub const fn story_id(&self) -> StoryId {
        self.story_id
    }

    /// Returns whether this is a title or a script.
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Returns the revision version.
    #[must_use]
    pub const fn version(&self) -> ContentVersion {
        self.version
    }

    /// Returns the revision text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the review whose feedback produced this revision.
    #[must_use]
    pub const fn review_id(&self) -> Option<ReviewId> {
        self.review_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
