//! `SQLite` repository implementation for the versioned workflow store.

use super::models::{MaxVersionRow, ReviewRow, RevisionRow, StoryIdRow, StoryReviewRow, StoryRow};
use crate::storage::{
    EntityKind, ErrorContext, SqlitePool, StorageError, StorageResult,
    pool::run_blocking,
    schema::{reviews, stories, story_reviews},
    translate,
};
use crate::story::{
    domain::{
        ContentKind, ContentRevision, ContentVersion, IdeaId, PersistedRevisionData,
        PersistedStoryData, Review, ReviewId, ReviewRecord, ReviewType, RevisionId, Score, Story,
        StoryId, StoryReview, StoryState,
    },
    ports::{ReviewCandidate, ReviewCommit, StoryRepository},
};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text, Timestamp};
use diesel::sqlite::SqliteConnection;

/// `SQLite`-backed story repository.
#[derive(Debug, Clone)]
pub struct SqliteStoryRepository {
    pool: SqlitePool,
}

impl SqliteStoryRepository {
    /// Creates a repository over an initialized database.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryRepository for SqliteStoryRepository {
    async fn store(&self, story: &Story) -> StorageResult<()> {
        let row = story_to_row(story);
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(stories::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| translate(err, &story_context(&row.id)))?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: StoryId) -> StorageResult<Option<Story>> {
        run_blocking(&self.pool, move |connection| {
            find_story(connection, &id.to_string())?
                .as_ref()
                .map(row_to_story)
                .transpose()
        })
        .await
    }

    async fn list_by_state(&self, state: StoryState) -> StorageResult<Vec<Story>> {
        run_blocking(&self.pool, move |connection| {
            stories::table
                .filter(stories::state.eq(state.as_str()))
                .order((stories::created_at.asc(), stories::id.asc()))
                .select(StoryRow::as_select())
                .load(connection)
                .map_err(|err| translate(err, &ErrorContext::new(EntityKind::Story)))?
                .iter()
                .map(row_to_story)
                .collect()
        })
        .await
    }

    async fn append_revision(
        &self,
        revision: &ContentRevision,
        story: &Story,
        expected_state: StoryState,
    ) -> StorageResult<()> {
        let kind = revision.kind();
        let version = revision.version();
        let revision_row = revision_to_row(revision)?;
        let story_row = story_to_row(story);

        run_blocking(&self.pool, move |connection| {
            // Write lock first, so a losing writer waits out the busy timeout.
            connection.immediate_transaction::<_, StorageError, _>(|tx| {
                let latest = max_version(tx, kind, &revision_row.story_id)?;
                check_next_version(kind, latest, version)?;
                insert_revision(tx, kind, &revision_row)?;
                guarded_update(tx, &story_row, expected_state)
            })
        })
        .await
    }

    async fn latest_revision(
        &self,
        story_id: StoryId,
        kind: ContentKind,
    ) -> StorageResult<Option<ContentRevision>> {
        run_blocking(&self.pool, move |connection| {
            let query = format!(
                "SELECT {REVISION_COLUMNS} FROM {} WHERE story_id = ? \
                 ORDER BY version DESC LIMIT 1",
                revision_table(kind)
            );
            diesel::sql_query(query)
                .bind::<Text, _>(story_id.to_string())
                .get_result::<RevisionRow>(connection)
                .optional()
                .map_err(|err| translate(err, &ErrorContext::new(entity_for(kind))))?
                .map(|row| row_to_revision(row, kind))
                .transpose()
        })
        .await
    }

    async fn revisions(
        &self,
        story_id: StoryId,
        kind: ContentKind,
    ) -> StorageResult<Vec<ContentRevision>> {
        run_blocking(&self.pool, move |connection| {
            let query = format!(
                "SELECT {REVISION_COLUMNS} FROM {} WHERE story_id = ? ORDER BY version ASC",
                revision_table(kind)
            );
            diesel::sql_query(query)
                .bind::<Text, _>(story_id.to_string())
                .load::<RevisionRow>(connection)
                .map_err(|err| translate(err, &ErrorContext::new(entity_for(kind))))?
                .into_iter()
                .map(|row| row_to_revision(row, kind))
                .collect()
        })
        .await
    }

    async fn next_for_review(
        &self,
        state: StoryState,
        kind: ContentKind,
    ) -> StorageResult<Option<ReviewCandidate>> {
        run_blocking(&self.pool, move |connection| {
            connection.immediate_transaction::<_, StorageError, _>(|tx| {
                let query = format!(
                    "SELECT s.id AS story_id FROM stories s \
                     JOIN {table} c ON c.id = s.{column} \
                     WHERE s.state = ? ORDER BY c.created_at ASC, c.id ASC LIMIT 1",
                    table = revision_table(kind),
                    column = current_column(kind),
                );
                let Some(selected) = diesel::sql_query(query)
                    .bind::<Text, _>(state.as_str())
                    .get_result::<StoryIdRow>(tx)
                    .optional()
                    .map_err(|err| translate(err, &ErrorContext::new(EntityKind::Story)))?
                else {
                    return Ok(None);
                };

                let story_row = find_story(tx, &selected.story_id)?.ok_or_else(|| {
                    StorageError::not_found(EntityKind::Story, selected.story_id.clone())
                })?;
                let story = row_to_story(&story_row)?;
                let revision_id = story.current_revision_id(kind).ok_or_else(|| {
                    StorageError::integrity(
                        EntityKind::Story,
                        format!("story {} lost its current {kind}", story.id()),
                    )
                })?;
                let revision = find_revision(tx, kind, &revision_id.to_string())?;
                Ok(Some(ReviewCandidate { story, revision }))
            })
        })
        .await
    }

    async fn commit_review(&self, commit: &ReviewCommit) -> StorageResult<()> {
        let review_row = review_to_row(&commit.review);
        let link_row = link_to_row(&commit.link)?;
        let story_row = story_to_row(&commit.story);
        let expected_state = commit.expected_state;

        run_blocking(&self.pool, move |connection| {
            connection.immediate_transaction::<_, StorageError, _>(|tx| {
                diesel::insert_into(reviews::table)
                    .values(&review_row)
                    .execute(tx)
                    .map_err(|err| {
                        translate(
                            err,
                            &ErrorContext::new(EntityKind::Review).with_value(&review_row.id),
                        )
                    })?;
                diesel::insert_into(story_reviews::table)
                    .values(&link_row)
                    .execute(tx)
                    .map_err(|err| {
                        translate(err, &ErrorContext::new(EntityKind::StoryReview))
                    })?;
                guarded_update(tx, &story_row, expected_state)
            })
        })
        .await
    }

    async fn review_history(&self, story_id: StoryId) -> StorageResult<Vec<ReviewRecord>> {
        run_blocking(&self.pool, move |connection| {
            story_reviews::table
                .inner_join(reviews::table.on(reviews::id.eq(story_reviews::review_id)))
                .filter(story_reviews::story_id.eq(story_id.to_string()))
                .order((reviews::created_at.asc(), reviews::id.asc()))
                .select((StoryReviewRow::as_select(), ReviewRow::as_select()))
                .load::<(StoryReviewRow, ReviewRow)>(connection)
                .map_err(|err| translate(err, &ErrorContext::new(EntityKind::StoryReview)))?
                .into_iter()
                .map(|(link, review)| {
                    Ok(ReviewRecord {
                        review: row_to_review(review)?,
                        link: row_to_link(&link)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn update_state(&self, story: &Story, expected_state: StoryState) -> StorageResult<()> {
        let row = story_to_row(story);
        run_blocking(&self.pool, move |connection| {
            guarded_update(connection, &row, expected_state)
        })
        .await
    }
}

const REVISION_COLUMNS: &str = "id, story_id, version, text, review_id, created_at";

const fn revision_table(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Title => "titles",
        ContentKind::Script => "scripts",
    }
}

const fn current_column(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Title => "current_title_id",
        ContentKind::Script => "current_script_id",
    }
}

const fn entity_for(kind: ContentKind) -> EntityKind {
    match kind {
        ContentKind::Title => EntityKind::Title,
        ContentKind::Script => EntityKind::Script,
    }
}

fn story_context(id: &str) -> ErrorContext {
    ErrorContext::new(EntityKind::Story)
        .with_table("stories")
        .with_value(id)
}

fn find_story(connection: &mut SqliteConnection, id: &str) -> StorageResult<Option<StoryRow>> {
    stories::table
        .filter(stories::id.eq(id))
        .select(StoryRow::as_select())
        .first(connection)
        .optional()
        .map_err(|err| translate(err, &story_context(id)))
}

fn find_revision(
    connection: &mut SqliteConnection,
    kind: ContentKind,
    id: &str,
) -> StorageResult<ContentRevision> {
    let query = format!(
        "SELECT {REVISION_COLUMNS} FROM {} WHERE id = ?",
        revision_table(kind)
    );
    let row = diesel::sql_query(query)
        .bind::<Text, _>(id)
        .get_result::<RevisionRow>(connection)
        .map_err(|err| translate(err, &ErrorContext::new(entity_for(kind)).with_value(id)))?;
    row_to_revision(row, kind)
}

fn max_version(
    connection: &mut SqliteConnection,
    kind: ContentKind,
    story_id: &str,
) -> StorageResult<Option<i32>> {
    let query = format!(
        "SELECT MAX(version) AS max_version FROM {} WHERE story_id = ?",
        revision_table(kind)
    );
    let row = diesel::sql_query(query)
        .bind::<Text, _>(story_id)
        .get_result::<MaxVersionRow>(connection)
        .map_err(|err| translate(err, &ErrorContext::new(entity_for(kind))))?;
    Ok(row.max_version)
}

/// Rejects versions that are taken or that would leave a gap.
///
/// The unique constraint on `(story_id, version)` stays the source of truth;
/// this check only adds the contiguity rule it cannot express.
fn check_next_version(
    kind: ContentKind,
    latest: Option<i32>,
    version: ContentVersion,
) -> StorageResult<()> {
    let requested = i64::from(version.value());
    let expected = latest.map_or(1, |max| i64::from(max) + 1);
    if requested < expected {
        return Err(StorageError::DuplicateEntity {
            entity: entity_for(kind),
            column: Some("version".to_owned()),
            value: Some(requested.to_string()),
            cause: None,
        });
    }
    if requested > expected {
        return Err(StorageError::integrity(
            entity_for(kind),
            format!("version {requested} would leave a gap, next version is {expected}"),
        ));
    }
    Ok(())
}

fn insert_revision(
    connection: &mut SqliteConnection,
    kind: ContentKind,
    row: &RevisionRow,
) -> StorageResult<()> {
    let table = revision_table(kind);
    let query = format!("INSERT INTO {table} ({REVISION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)");
    diesel::sql_query(query)
        .bind::<Text, _>(&row.id)
        .bind::<Text, _>(&row.story_id)
        .bind::<Integer, _>(row.version)
        .bind::<Text, _>(&row.text)
        .bind::<Nullable<Text>, _>(row.review_id.as_deref())
        .bind::<Timestamp, _>(row.created_at)
        .execute(connection)
        .map_err(|err| translate(err, &ErrorContext::new(entity_for(kind)).with_table(table)))?;
    Ok(())
}

/// Saves `row` only if the stored story is still in `expected`.
fn guarded_update(
    connection: &mut SqliteConnection,
    row: &StoryRow,
    expected: StoryState,
) -> StorageResult<()> {
    let updated = diesel::update(
        stories::table
            .filter(stories::id.eq(&row.id))
            .filter(stories::state.eq(expected.as_str())),
    )
    .set((
        stories::current_title_id.eq(&row.current_title_id),
        stories::current_script_id.eq(&row.current_script_id),
        stories::state.eq(&row.state),
        stories::updated_at.eq(row.updated_at),
    ))
    .execute(connection)
    .map_err(|err| translate(err, &story_context(&row.id)))?;
    if updated == 1 {
        return Ok(());
    }

    let stored = stories::table
        .filter(stories::id.eq(&row.id))
        .select(stories::state)
        .first::<String>(connection)
        .optional()
        .map_err(|err| translate(err, &story_context(&row.id)))?;
    match stored {
        None => Err(StorageError::not_found(EntityKind::Story, row.id.clone())),
        Some(actual) => Err(StorageError::invalid_transition(
            EntityKind::Story,
            row.id.clone(),
            actual,
            row.state.clone(),
        )),
    }
}

fn story_to_row(story: &Story) -> StoryRow {
    StoryRow {
        id: story.id().to_string(),
        idea_id: story.idea_id().to_string(),
        current_title_id: story.current_title_id().map(|id| id.to_string()),
        current_script_id: story.current_script_id().map(|id| id.to_string()),
        state: story.state().as_str().to_owned(),
        created_at: story.created_at().naive_utc(),
        updated_at: story.updated_at().naive_utc(),
    }
}

fn row_to_story(row: &StoryRow) -> StorageResult<Story> {
    let corrupt = |err| StorageError::corrupt(EntityKind::Story, err);
    let state = StoryState::try_from(row.state.as_str())
        .map_err(|err| StorageError::corrupt(EntityKind::Story, err))?;
    Ok(Story::from_persisted(PersistedStoryData {
        id: StoryId::parse(&row.id).map_err(corrupt)?,
        idea_id: IdeaId::parse(&row.idea_id).map_err(corrupt)?,
        current_title_id: parse_optional(row.current_title_id.as_deref(), RevisionId::parse)
            .map_err(corrupt)?,
        current_script_id: parse_optional(row.current_script_id.as_deref(), RevisionId::parse)
            .map_err(corrupt)?,
        state,
        created_at: row.created_at.and_utc(),
        updated_at: row.updated_at.and_utc(),
    }))
}

fn parse_optional<T>(
    value: Option<&str>,
    parse: fn(&str) -> Result<T, uuid::Error>,
) -> Result<Option<T>, uuid::Error> {
    value.map(parse).transpose()
}

fn revision_to_row(revision: &ContentRevision) -> StorageResult<RevisionRow> {
    let entity = entity_for(revision.kind());
    Ok(RevisionRow {
        id: revision.id().to_string(),
        story_id: revision.story_id().to_string(),
        version: i32::try_from(revision.version().value())
            .map_err(|err| StorageError::corrupt(entity, err))?,
        text: revision.text().to_owned(),
        review_id: revision.review_id().map(|id| id.to_string()),
        created_at: revision.created_at().naive_utc(),
    })
}

fn row_to_revision(row: RevisionRow, kind: ContentKind) -> StorageResult<ContentRevision> {
    let entity = entity_for(kind);
    let corrupt = |err| StorageError::corrupt(entity, err);
    Ok(ContentRevision::from_persisted(PersistedRevisionData {
        id: RevisionId::parse(&row.id).map_err(corrupt)?,
        story_id: StoryId::parse(&row.story_id).map_err(corrupt)?,
        kind,
        version: ContentVersion::new(i64::from(row.version))
            .map_err(|err| StorageError::corrupt(entity, err))?,
        text: row.text,
        review_id: parse_optional(row.review_id.as_deref(), ReviewId::parse).map_err(corrupt)?,
        created_at: row.created_at.and_utc(),
    }))
}

fn review_to_row(review: &Review) -> ReviewRow {
    ReviewRow {
        id: review.id().to_string(),
        text: review.text().to_owned(),
        score: i32::from(review.score().value()),
        created_at: review.created_at().naive_utc(),
    }
}

fn row_to_review(row: ReviewRow) -> StorageResult<Review> {
    let corrupt = |err| StorageError::corrupt(EntityKind::Review, err);
    Ok(Review::from_persisted(
        ReviewId::parse(&row.id).map_err(corrupt)?,
        row.text,
        Score::new(i64::from(row.score))
            .map_err(|err| StorageError::corrupt(EntityKind::Review, err))?,
        row.created_at.and_utc(),
    ))
}

fn link_to_row(link: &StoryReview) -> StorageResult<StoryReviewRow> {
    Ok(StoryReviewRow {
        story_id: link.story_id.to_string(),
        review_id: link.review_id.to_string(),
        version: i32::try_from(link.version.value())
            .map_err(|err| StorageError::corrupt(EntityKind::StoryReview, err))?,
        review_type: link.review_type.as_str().to_owned(),
    })
}

fn row_to_link(row: &StoryReviewRow) -> StorageResult<StoryReview> {
    let entity = EntityKind::StoryReview;
    Ok(StoryReview {
        story_id: StoryId::parse(&row.story_id)
            .map_err(|err| StorageError::corrupt(entity, err))?,
        review_id: ReviewId::parse(&row.review_id)
            .map_err(|err| StorageError::corrupt(entity, err))?,
        version: ContentVersion::new(i64::from(row.version))
            .map_err(|err| StorageError::corrupt(entity, err))?,
        review_type: ReviewType::try_from(row.review_type.as_str())
            .map_err(|err| StorageError::corrupt(entity, err))?,
    })
}
