//! In-memory story repository for tests and single-process use.
//!
//! Writes take one lock for their whole duration, which gives the same
//! all-or-nothing behaviour as the database transactions, and the checks
//! mirror the table constraints so callers see the same error variants.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::storage::{EntityKind, StorageError, StorageResult};
use crate::story::{
    domain::{
        ContentKind, ContentRevision, Review, ReviewId, ReviewRecord, Story, StoryId,
        StoryReview, StoryState,
    },
    ports::{ReviewCandidate, ReviewCommit, StoryRepository},
};

/// Thread-safe in-memory story repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoryRepository {
    state: Arc<RwLock<InMemoryStoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoryState {
    stories: HashMap<StoryId, Story>,
    titles: HashMap<StoryId, Vec<ContentRevision>>,
    scripts: HashMap<StoryId, Vec<ContentRevision>>,
    reviews: HashMap<ReviewId, Review>,
    links: Vec<StoryReview>,
}

impl InMemoryStoryState {
    const fn revisions(&self, kind: ContentKind) -> &HashMap<StoryId, Vec<ContentRevision>> {
        match kind {
            ContentKind::Title => &self.titles,
            ContentKind::Script => &self.scripts,
        }
    }

    const fn revisions_mut(
        &mut self,
        kind: ContentKind,
    ) -> &mut HashMap<StoryId, Vec<ContentRevision>> {
        match kind {
            ContentKind::Title => &mut self.titles,
            ContentKind::Script => &mut self.scripts,
        }
    }

    fn find_revision(&self, story: &Story, kind: ContentKind) -> Option<&ContentRevision> {
        let current = story.current_revision_id(kind)?;
        self.revisions(kind)
            .get(&story.id())
            .and_then(|revisions| revisions.iter().find(|revision| revision.id() == current))
    }

    /// Checks the guard on a story update without changing anything.
    fn check_guard(&self, story: &Story, expected_state: StoryState) -> StorageResult<()> {
        let stored = self
            .stories
            .get(&story.id())
            .ok_or_else(|| StorageError::not_found(EntityKind::Story, story.id().to_string()))?;
        if stored.state() != expected_state {
            return Err(StorageError::invalid_transition(
                EntityKind::Story,
                story.id().to_string(),
                stored.state().as_str(),
                story.state().as_str(),
            ));
        }
        Ok(())
    }

    fn check_revision(&self, revision: &ContentRevision) -> StorageResult<()> {
        let entity = entity_for(revision.kind());
        if !self.stories.contains_key(&revision.story_id()) {
            return Err(foreign_key(entity, "story_id", revision.story_id().to_string()));
        }
        if let Some(review_id) = revision.review_id()
            && !self.reviews.contains_key(&review_id)
        {
            return Err(foreign_key(entity, "review_id", review_id.to_string()));
        }

        let existing = self
            .revisions(revision.kind())
            .get(&revision.story_id())
            .map_or(&[][..], Vec::as_slice);
        if existing.iter().any(|stored| stored.id() == revision.id()) {
            return Err(duplicate(entity, "id", revision.id().to_string()));
        }
        if existing
            .iter()
            .any(|stored| stored.version() == revision.version())
        {
            return Err(duplicate(entity, "version", revision.version().value().to_string()));
        }
        let expected = existing
            .last()
            .map_or(1, |latest| u64::from(latest.version().value()) + 1);
        if u64::from(revision.version().value()) != expected {
            return Err(StorageError::integrity(
                entity,
                format!(
                    "version {} would leave a gap after version {}",
                    revision.version().value(),
                    expected - 1
                ),
            ));
        }
        Ok(())
    }
}

const fn entity_for(kind: ContentKind) -> EntityKind {
    match kind {
        ContentKind::Title => EntityKind::Title,
        ContentKind::Script => EntityKind::Script,
    }
}

fn duplicate(entity: EntityKind, column: &str, value: String) -> StorageError {
    StorageError::DuplicateEntity {
        entity,
        column: Some(column.to_owned()),
        value: Some(value),
        cause: None,
    }
}

fn foreign_key(entity: EntityKind, column: &str, value: String) -> StorageError {
    StorageError::ForeignKeyViolation {
        entity,
        detail: format!("{column} references missing row {value}"),
        cause: None,
    }
}

impl InMemoryStoryRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, InMemoryStoryState>> {
        self.state
            .read()
            .map_err(|err| StorageError::connection(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, InMemoryStoryState>> {
        self.state
            .write()
            .map_err(|err| StorageError::connection(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn store(&self, story: &Story) -> StorageResult<()> {
        let mut state = self.write()?;
        if state.stories.contains_key(&story.id()) {
            return Err(duplicate(EntityKind::Story, "id", story.id().to_string()));
        }
        state.stories.insert(story.id(), story.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: StoryId) -> StorageResult<Option<Story>> {
        Ok(self.read()?.stories.get(&id).cloned())
    }

    async fn list_by_state(&self, target: StoryState) -> StorageResult<Vec<Story>> {
        let state = self.read()?;
        let mut stories: Vec<Story> = state
            .stories
            .values()
            .filter(|story| story.state() == target)
            .cloned()
            .collect();
        stories.sort_by_key(|story| (story.created_at(), story.id()));
        Ok(stories)
    }

    async fn append_revision(
        &self,
        revision: &ContentRevision,
        story: &Story,
        expected_state: StoryState,
    ) -> StorageResult<()> {
        let mut state = self.write()?;
        state.check_revision(revision)?;
        state.check_guard(story, expected_state)?;

        state
            .revisions_mut(revision.kind())
            .entry(revision.story_id())
            .or_default()
            .push(revision.clone());
        state.stories.insert(story.id(), story.clone());
        Ok(())
    }

    async fn latest_revision(
        &self,
        story_id: StoryId,
        kind: ContentKind,
    ) -> StorageResult<Option<ContentRevision>> {
        let state = self.read()?;
        Ok(state
            .revisions(kind)
            .get(&story_id)
            .and_then(|revisions| revisions.iter().max_by_key(|revision| revision.version()))
            .cloned())
    }

    async fn revisions(
        &self,
        story_id: StoryId,
        kind: ContentKind,
    ) -> StorageResult<Vec<ContentRevision>> {
        let state = self.read()?;
        let mut revisions = state
            .revisions(kind)
            .get(&story_id)
            .cloned()
            .unwrap_or_default();
        revisions.sort_by_key(ContentRevision::version);
        Ok(revisions)
    }

    async fn next_for_review(
        &self,
        target: StoryState,
        kind: ContentKind,
    ) -> StorageResult<Option<ReviewCandidate>> {
        let state = self.read()?;
        let candidate = state
            .stories
            .values()
            .filter(|story| story.state() == target)
            .filter_map(|story| {
                state
                    .find_revision(story, kind)
                    .map(|revision| (story, revision))
            })
            .min_by_key(|(_, revision)| (revision.created_at(), revision.id()))
            .map(|(story, revision)| ReviewCandidate {
                story: story.clone(),
                revision: revision.clone(),
            });
        Ok(candidate)
    }

    async fn commit_review(&self, commit: &ReviewCommit) -> StorageResult<()> {
        let mut state = self.write()?;
        let review_id = commit.review.id();
        if state.reviews.contains_key(&review_id) {
            return Err(duplicate(EntityKind::Review, "id", review_id.to_string()));
        }
        if !state.stories.contains_key(&commit.link.story_id) {
            return Err(foreign_key(
                EntityKind::StoryReview,
                "story_id",
                commit.link.story_id.to_string(),
            ));
        }
        state.check_guard(&commit.story, commit.expected_state)?;

        state.reviews.insert(review_id, commit.review.clone());
        state.links.push(commit.link);
        state.stories.insert(commit.story.id(), commit.story.clone());
        Ok(())
    }

    async fn review_history(&self, story_id: StoryId) -> StorageResult<Vec<ReviewRecord>> {
        let state = self.read()?;
        let mut records: Vec<ReviewRecord> = state
            .links
            .iter()
            .filter(|link| link.story_id == story_id)
            .filter_map(|link| {
                state.reviews.get(&link.review_id).map(|review| ReviewRecord {
                    review: review.clone(),
                    link: *link,
                })
            })
            .collect();
        records.sort_by_key(|record| (record.review.created_at(), record.review.id()));
        Ok(records)
    }

    async fn update_state(&self, story: &Story, expected_state: StoryState) -> StorageResult<()> {
        let mut state = self.write()?;
        state.check_guard(story, expected_state)?;
        state.stories.insert(story.id(), story.clone());
        Ok(())
    }
}
