//! Diesel schema for the workflow store.

diesel::table! {
    /// Review audit records.
    reviews (id) {
        /// Review identifier.
        id -> Text,
        /// Reviewer feedback.
        text -> Text,
        /// Score between 0 and 100.
        score -> Integer,
        /// Creation timestamp.
        created_at -> Timestamp,
    }
}

diesel::table! {
    /// Story aggregate rows.
    stories (id) {
        /// Story identifier.
        id -> Text,
        /// Reference to the originating idea.
        idea_id -> Text,
        /// Current title revision, if any.
        current_title_id -> Nullable<Text>,
        /// Current script revision, if any.
        current_script_id -> Nullable<Text>,
        /// Workflow stage.
        state -> Text,
        /// Creation timestamp.
        created_at -> Timestamp,
        /// Last update timestamp.
        updated_at -> Timestamp,
    }
}

diesel::table! {
    /// Append-only title revisions.
    titles (id) {
        /// Revision identifier.
        id -> Text,
        /// Owning story.
        story_id -> Text,
        /// Version, contiguous from 1 per story.
        version -> Integer,
        /// Title text.
        text -> Text,
        /// Review whose feedback produced this revision.
        review_id -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamp,
    }
}

diesel::table! {
    /// Append-only script revisions.
    scripts (id) {
        /// Revision identifier.
        id -> Text,
        /// Owning story.
        story_id -> Text,
        /// Version, contiguous from 1 per story.
        version -> Integer,
        /// Script text.
        text -> Text,
        /// Review whose feedback produced this revision.
        review_id -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamp,
    }
}

diesel::table! {
    /// Links a review to the story content version it evaluated.
    story_reviews (story_id, review_id) {
        /// Reviewed story.
        story_id -> Text,
        /// Review record.
        review_id -> Text,
        /// Content version the review evaluated.
        version -> Integer,
        /// Kind of review performed.
        review_type -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(reviews, stories, titles, scripts, story_reviews);
