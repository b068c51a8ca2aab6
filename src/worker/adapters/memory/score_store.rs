//! In-memory content store for the scoring worker.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::story::domain::Score;
use crate::worker::ports::{
    ItemId, ScoreStore, ScoreStoreError, ScoreStoreResult, ScoredItem, ScoringCandidate,
};
use crate::worker::task::WorkerId;

/// Thread-safe in-memory score store. Items keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScoreStore {
    items: Arc<Mutex<Vec<ScoredItem>>>,
}

impl InMemoryScoreStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unscored item and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreStoreError::Unavailable`] when the store lock is
    /// poisoned.
    pub fn insert(&self, content: impl Into<String>) -> ScoreStoreResult<ItemId> {
        let item_id = ItemId::new();
        self.lock()?.push(ScoredItem {
            item_id,
            content: content.into(),
            score: None,
            reserved_by: None,
        });
        Ok(item_id)
    }

    fn lock(&self) -> ScoreStoreResult<MutexGuard<'_, Vec<ScoredItem>>> {
        self.items.lock().map_err(|err| {
            ScoreStoreError::Unavailable(Arc::new(std::io::Error::other(err.to_string())))
        })
    }
}

fn find_mut<'a>(
    items: &'a mut [ScoredItem],
    item_id: &ItemId,
) -> ScoreStoreResult<&'a mut ScoredItem> {
    items
        .iter_mut()
        .find(|item| &item.item_id == item_id)
        .ok_or(ScoreStoreError::NotFound(*item_id))
}

#[async_trait]
impl ScoreStore for InMemoryScoreStore {
    async fn fetch_unscored(&self, limit: u32) -> ScoreStoreResult<Vec<ScoringCandidate>> {
        let items = self.lock()?;
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(items
            .iter()
            .filter(|item| item.score.is_none() && item.reserved_by.is_none())
            .take(take)
            .map(ScoredItem::candidate)
            .collect())
    }

    async fn reserve_for_autoscore(
        &self,
        item_id: &ItemId,
        worker_id: &WorkerId,
    ) -> ScoreStoreResult<bool> {
        let mut items = self.lock()?;
        let item = find_mut(&mut items, item_id)?;
        if item.score.is_some() || item.reserved_by.is_some() {
            return Ok(false);
        }
        item.reserved_by = Some(worker_id.clone());
        Ok(true)
    }

    async fn release_reservation(
        &self,
        item_id: &ItemId,
        worker_id: &WorkerId,
    ) -> ScoreStoreResult<()> {
        let mut items = self.lock()?;
        let item = find_mut(&mut items, item_id)?;
        if item.reserved_by.as_ref() == Some(worker_id) {
            item.reserved_by = None;
        }
        Ok(())
    }

    async fn write_score(&self, item_id: &ItemId, score: Score) -> ScoreStoreResult<()> {
        let mut items = self.lock()?;
        find_mut(&mut items, item_id)?.score = Some(score);
        Ok(())
    }

    async fn find(&self, item_id: &ItemId) -> ScoreStoreResult<Option<ScoredItem>> {
        Ok(self
            .lock()?
            .iter()
            .find(|item| &item.item_id == item_id)
            .cloned())
    }
}
