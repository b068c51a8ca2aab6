//! Workflow stages, review rules, and the state transition resolver.

use super::{ContentKind, ParseReviewTypeError, ParseStoryStateError, Score, StoryDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow stage of a story.
///
/// Generation stages wait for a new title or script revision, review stages
/// wait for an evaluation, and terminal stages accept nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    /// Initial stage; the first title has not been written yet.
    TitleDraft,
    /// The current title is waiting for a readability review.
    #[serde(rename = "awaiting_title_review")]
    TitleReview,
    /// The title was rejected and a new version is expected.
    TitleRefinement,
    /// The title was accepted; the first script has not been written yet.
    ScriptDraft,
    /// The current script is waiting for a readability review.
    #[serde(rename = "awaiting_script_review")]
    ScriptReview,
    /// The script was rejected and a new version is expected.
    ScriptRefinement,
    /// The script passed readability and waits for an expert review.
    #[serde(rename = "awaiting_expert_review")]
    ExpertReview,
    /// The story has been accepted for publication.
    Published,
    /// The story was withdrawn from the workflow.
    Archived,
}

impl StoryState {
    /// Every stage, in workflow order.
    pub const ALL: [Self; 9] = [
        Self::TitleDraft,
        Self::TitleReview,
        Self::TitleRefinement,
        Self::ScriptDraft,
        Self::ScriptReview,
        Self::ScriptRefinement,
        Self::ExpertReview,
        Self::Published,
        Self::Archived,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TitleDraft => "title_draft",
            Self::TitleReview => "awaiting_title_review",
            Self::TitleRefinement => "title_refinement",
            Self::ScriptDraft => "script_draft",
            Self::ScriptReview => "awaiting_script_review",
            Self::ScriptRefinement => "script_refinement",
            Self::ExpertReview => "awaiting_expert_review",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Returns `true` when no transition leaves this stage.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Archived)
    }

    /// Returns `true` when the stage waits for an evaluation.
    #[must_use]
    pub const fn is_review_stage(self) -> bool {
        self.review_rule().is_some()
    }

    /// Returns the accept/reject rule of a review stage.
    #[must_use]
    pub const fn review_rule(self) -> Option<StageRule> {
        match self {
            Self::TitleReview => Some(StageRule {
                stage: self,
                content_kind: ContentKind::Title,
                review_type: ReviewType::TitleReadability,
                forward: Self::ScriptDraft,
                refinement: Self::TitleRefinement,
            }),
            Self::ScriptReview => Some(StageRule {
                stage: self,
                content_kind: ContentKind::Script,
                review_type: ReviewType::ScriptReadability,
                forward: Self::ExpertReview,
                refinement: Self::ScriptRefinement,
            }),
            Self::ExpertReview => Some(StageRule {
                stage: self,
                content_kind: ContentKind::Script,
                review_type: ReviewType::ExpertReview,
                forward: Self::Published,
                refinement: Self::ScriptRefinement,
            }),
            _ => None,
        }
    }

    /// Returns the review stage entered when a revision of `kind` is
    /// appended, or `None` when this stage does not accept one.
    #[must_use]
    pub const fn after_submission(self, kind: ContentKind) -> Option<Self> {
        match (self, kind) {
            (Self::TitleDraft | Self::TitleRefinement, ContentKind::Title) => {
                Some(Self::TitleReview)
            }
            (Self::ScriptDraft | Self::ScriptRefinement, ContentKind::Script) => {
                Some(Self::ScriptReview)
            }
            _ => None,
        }
    }

    /// Returns whether the workflow has an edge from `self` to `target`.
    ///
    /// Review stages have exactly an accept and a reject edge, generation
    /// stages have their submission edge, and every non-terminal stage may be
    /// archived.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == Self::Archived {
            return true;
        }
        if let Some(rule) = self.review_rule() {
            return target == rule.forward || target == rule.refinement;
        }
        self.after_submission(ContentKind::Title) == Some(target)
            || self.after_submission(ContentKind::Script) == Some(target)
    }
}

impl fmt::Display for StoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StoryState {
    type Error = ParseStoryStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| ParseStoryStateError(value.to_owned()))
    }
}

/// Kind of review recorded against a content version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    /// Readability review of a title.
    TitleReadability,
    /// Readability review of a script.
    ScriptReadability,
    /// Expert review of a script.
    ExpertReview,
}

impl ReviewType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TitleReadability => "title_readability",
            Self::ScriptReadability => "script_readability",
            Self::ExpertReview => "expert_review",
        }
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReviewType {
    type Error = ParseReviewTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "title_readability" => Ok(Self::TitleReadability),
            "script_readability" => Ok(Self::ScriptReadability),
            "expert_review" => Ok(Self::ExpertReview),
            _ => Err(ParseReviewTypeError(value.to_owned())),
        }
    }
}

/// Accept and reject edges of one review stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRule {
    /// The review stage this rule belongs to.
    pub stage: StoryState,
    /// Kind of content evaluated in the stage.
    pub content_kind: ContentKind,
    /// Kind of review recorded for the evaluation.
    pub review_type: ReviewType,
    /// Stage entered when the score reaches the threshold.
    pub forward: StoryState,
    /// Stage entered when the score falls short.
    pub refinement: StoryState,
}

impl StageRule {
    /// Applies [`resolve_transition`] to this rule.
    #[must_use]
    pub const fn resolve(&self, score: Score, threshold: Score) -> StoryState {
        resolve_transition(self, score, threshold)
    }
}

/// Maps a review score to the next stage.
///
/// A score at or above `threshold` moves forward; anything lower moves to
/// the refinement stage. No other input affects the result.
#[must_use]
pub const fn resolve_transition(rule: &StageRule, score: Score, threshold: Score) -> StoryState {
    if score.value() >= threshold.value() {
        rule.forward
    } else {
        rule.refinement
    }
}

/// Threshold used for every review stage unless configured otherwise.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: Score = Score::clamped(70);

/// Minimum scores needed to leave each review stage forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceThresholds {
    /// Threshold for [`StoryState::TitleReview`].
    pub title_review: Score,
    /// Threshold for [`StoryState::ScriptReview`].
    pub script_review: Score,
    /// Threshold for [`StoryState::ExpertReview`].
    pub expert_review: Score,
}

impl Default for AcceptanceThresholds {
    fn default() -> Self {
        Self::uniform(DEFAULT_ACCEPTANCE_THRESHOLD)
    }
}

impl AcceptanceThresholds {
    /// Uses the same threshold for every review stage.
    #[must_use]
    pub const fn uniform(threshold: Score) -> Self {
        Self {
            title_review: threshold,
            script_review: threshold,
            expert_review: threshold,
        }
    }

    /// Returns the threshold for `stage`, or `None` for non-review stages.
    #[must_use]
    pub const fn for_stage(&self, stage: StoryState) -> Option<Score> {
        match stage {
            StoryState::TitleReview => Some(self.title_review),
            StoryState::ScriptReview => Some(self.script_review),
            StoryState::ExpertReview => Some(self.expert_review),
            _ => None,
        }
    }

    /// Replaces the threshold of one review stage. Non-review stages are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::InvalidScore`] when `threshold` is out of
    /// range.
    pub fn with_stage(
        mut self,
        stage: StoryState,
        threshold: i64,
    ) -> Result<Self, StoryDomainError> {
        let score = Score::new(threshold)?;
        match stage {
            StoryState::TitleReview => self.title_review = score,
            StoryState::ScriptReview => self.script_review = score,
            StoryState::ExpertReview => self.expert_review = score,
            _ => {}
        }
        Ok(self)
    }
}
