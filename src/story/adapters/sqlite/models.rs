//! Diesel row models for story persistence.

use crate::storage::schema::{reviews, stories, story_reviews};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text, Timestamp};

/// Query and insert row for stories.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = stories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoryRow {
    /// Story identifier.
    pub id: String,
    /// Originating idea.
    pub idea_id: String,
    /// Current title revision.
    pub current_title_id: Option<String>,
    /// Current script revision.
    pub current_script_id: Option<String>,
    /// Workflow stage.
    pub state: String,
    /// Creation timestamp (UTC).
    pub created_at: NaiveDateTime,
    /// Last update timestamp (UTC).
    pub updated_at: NaiveDateTime,
}

/// Title or script row, read through raw SQL because both tables share a
/// layout.
#[derive(Debug, Clone, QueryableByName)]
pub struct RevisionRow {
    /// Revision identifier.
    #[diesel(sql_type = Text)]
    pub id: String,
    /// Owning story.
    #[diesel(sql_type = Text)]
    pub story_id: String,
    /// Version number.
    #[diesel(sql_type = Integer)]
    pub version: i32,
    /// Content text.
    #[diesel(sql_type = Text)]
    pub text: String,
    /// Review that prompted the revision.
    #[diesel(sql_type = Nullable<Text>)]
    pub review_id: Option<String>,
    /// Creation timestamp (UTC).
    #[diesel(sql_type = Timestamp)]
    pub created_at: NaiveDateTime,
}

/// Query and insert row for reviews.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewRow {
    /// Review identifier.
    pub id: String,
    /// Reviewer feedback.
    pub text: String,
    /// Score.
    pub score: i32,
    /// Creation timestamp (UTC).
    pub created_at: NaiveDateTime,
}

/// Query and insert row for story-review links.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = story_reviews)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoryReviewRow {
    /// Reviewed story.
    pub story_id: String,
    /// Review record.
    pub review_id: String,
    /// Evaluated version.
    pub version: i32,
    /// Review type.
    pub review_type: String,
}

/// Single-column row holding a story identifier.
#[derive(Debug, Clone, QueryableByName)]
pub struct StoryIdRow {
    /// Story identifier.
    #[diesel(sql_type = Text)]
    pub story_id: String,
}

/// Single-column row holding an optional maximum version.
#[derive(Debug, Clone, QueryableByName)]
pub struct MaxVersionRow {
    /// Highest stored version, `NULL` when there is none.
    #[diesel(sql_type = Nullable<Integer>)]
    pub max_version: Option<i32>,
}
