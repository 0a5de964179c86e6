use crate::traits::PersistenceBackend;
use crate::types::{AggregatorError, ClearOutcome, FavoriteRecord, NewFavorite, Result};
use interfaces::{ContentItem, ContentKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// The user's pinned items, independent of pagination and search.
///
/// Records are cached from the last listing so `is_favorite` can answer
/// without a round trip. The cache is updated before the remote call on
/// toggle and is not rolled back when that call fails.
pub struct FavoritesStore {
    backend: Arc<dyn PersistenceBackend>,
    records: Vec<FavoriteRecord>,
}

impl FavoritesStore {
    pub fn new(backend: Arc<dyn PersistenceBackend>) -> Self {
        Self { backend, records: Vec::new() }
    }

    /// Reload the cached records from the backend.
    pub async fn refresh(&mut self) -> Result<&[FavoriteRecord]> {
        let stored = self.backend.list_favorites().await?;
        let total = stored.len();
        self.records = stored.into_iter().filter_map(FavoriteRecord::from_stored).collect();
        if self.records.len() != total {
            warn!("Skipped {} favorites with an unknown content type", total - self.records.len());
        }
        Ok(&self.records)
    }

    /// All favorites, most recently added first.
    pub async fn list(&mut self) -> Result<Vec<FavoriteRecord>> {
        Ok(self.refresh().await?.to_vec())
    }

    pub async fn add(&mut self, item: &ContentItem) -> Result<()> {
        self.backend.add_favorite(&NewFavorite::from_item(item)).await?;
        if !self.is_favorite(&item.id) {
            self.records.insert(0, pending_record(item));
        }
        info!("Added {} to favorites", item.id);
        if let Err(e) = self.refresh().await {
            warn!("Could not reload favorites after adding {}: {}", item.id, e);
        }
        Ok(())
    }

    /// Remove by server-assigned record id. Not idempotent: a second call
    /// for the same id is `NotFound`.
    pub async fn remove(&mut self, record_id: &str) -> Result<()> {
        self.backend.remove_favorite(record_id).await?;
        self.records.retain(|r| r.id != record_id);
        info!("Removed favorite record {}", record_id);
        Ok(())
    }

    /// Remove every favorite one by one. Partial failure leaves the rest in
    /// place and is reported in the outcome.
    pub async fn clear_all(&mut self) -> Result<ClearOutcome> {
        let records = self.list().await?;
        let mut outcome = ClearOutcome::default();

        for record in records {
            match self.backend.remove_favorite(&record.id).await {
                Ok(()) => outcome.removed += 1,
                Err(e) => {
                    warn!("Failed to remove favorite {}: {}", record.id, e);
                    outcome.failed += 1;
                }
            }
        }

        if let Err(e) = self.refresh().await {
            warn!("Could not reload favorites after clear: {}", e);
        }
        info!("Cleared {} favorites ({} failed)", outcome.removed, outcome.failed);
        Ok(outcome)
    }

    /// Favorite the item when absent, otherwise remove it. Returns whether
    /// the item is pinned afterwards.
    pub async fn toggle(&mut self, item: &ContentItem) -> Result<bool> {
        match self.record_id_for(&item.id).await? {
            Some(record_id) => {
                self.records.retain(|r| r.id != record_id);
                self.backend.remove_favorite(&record_id).await?;
                info!("Unpinned {}", item.id);
                Ok(false)
            }
            None => {
                self.records.insert(0, pending_record(item));
                match self.backend.add_favorite(&NewFavorite::from_item(item)).await {
                    Ok(()) | Err(AggregatorError::AlreadyFavorited { .. }) => {}
                    Err(e) => return Err(e),
                }
                // Pick up the server-assigned record id.
                if let Err(e) = self.refresh().await {
                    warn!("Could not reload favorites after pinning {}: {}", item.id, e);
                }
                info!("Pinned {}", item.id);
                Ok(true)
            }
        }
    }

    pub fn is_favorite(&self, content_id: &str) -> bool {
        self.records.iter().any(|r| r.content_id == content_id)
    }

    pub fn records(&self) -> &[FavoriteRecord] {
        &self.records
    }

    /// Cached favorites projected back into renderable items.
    pub fn items(&self) -> Vec<ContentItem> {
        self.records.iter().map(|r| r.content_snapshot.clone()).collect()
    }

    pub fn count_by_kind(&self) -> HashMap<ContentKind, usize> {
        let mut counts = HashMap::new();
        for record in &self.records {
            *counts.entry(record.content_type).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn record_id_for(&mut self, content_id: &str) -> Result<Option<String>> {
        if let Some(record) = self.records.iter().find(|r| r.content_id == content_id) {
            if !record.id.is_empty() {
                return Ok(Some(record.id.clone()));
            }
        }
        let refreshed = self.refresh().await?;
        Ok(refreshed.iter().find(|r| r.content_id == content_id).map(|r| r.id.clone()))
    }
}

/// Local placeholder until the backend assigns a record id.
fn pending_record(item: &ContentItem) -> FavoriteRecord {
    FavoriteRecord {
        id: String::new(),
        content_id: item.id.clone(),
        content_type: item.kind,
        content_snapshot: item.clone(),
        created_at: None,
    }
}
