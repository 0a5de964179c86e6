use crate::traits::PersistenceBackend;
use crate::types::{AggregatorError, NewFavorite, OrderState, Result, StoredFavorite};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Inner {
    favorites: Vec<StoredFavorite>,
    next_id: u64,
    order: Option<OrderState>,
    order_saves: usize,
    fail_order_saves: bool,
    fail_listing: bool,
    fail_removals: HashSet<String>,
}

/// In-process backend for offline runs and tests. Behaves like the remote
/// API: duplicate content ids are rejected and unknown record ids are
/// `NotFound`.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(order: OrderState) -> Self {
        Self { inner: Mutex::new(Inner { order: Some(order), ..Default::default() }) }
    }

    /// Make every subsequent `save_order` fail.
    pub async fn fail_order_saves(&self, fail: bool) {
        self.inner.lock().await.fail_order_saves = fail;
    }

    /// Make every subsequent `list_favorites` fail.
    pub async fn fail_listing(&self, fail: bool) {
        self.inner.lock().await.fail_listing = fail;
    }

    /// Make removal of one record id fail with a server-side error.
    pub async fn fail_removal_of(&self, record_id: impl Into<String>) {
        self.inner.lock().await.fail_removals.insert(record_id.into());
    }

    pub async fn stored_order(&self) -> Option<OrderState> {
        self.inner.lock().await.order.clone()
    }

    pub async fn order_save_count(&self) -> usize {
        self.inner.lock().await.order_saves
    }
}

#[async_trait]
impl PersistenceBackend for MemoryBackend {
    async fn list_favorites(&self) -> Result<Vec<StoredFavorite>> {
        let inner = self.inner.lock().await;
        if inner.fail_listing {
            return Err(AggregatorError::General("favorites listing unavailable".to_string()));
        }
        Ok(inner.favorites.iter().rev().cloned().collect())
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.favorites.iter().any(|f| f.content_id == favorite.content_id) {
            return Err(AggregatorError::AlreadyFavorited { content_id: favorite.content_id.clone() });
        }

        inner.next_id += 1;
        let record = StoredFavorite {
            id: inner.next_id.to_string(),
            content_id: favorite.content_id.clone(),
            content_type: favorite.content_type.clone(),
            content_data: favorite.content_data.clone(),
            created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        };
        debug!("Stored favorite {} as record {}", record.content_id, record.id);
        inner.favorites.push(record);
        Ok(())
    }

    async fn remove_favorite(&self, record_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_removals.contains(record_id) {
            return Err(AggregatorError::Rejected { status: 500, message: "Internal server error".to_string() });
        }
        let before = inner.favorites.len();
        inner.favorites.retain(|f| f.id != record_id);
        if inner.favorites.len() == before {
            return Err(AggregatorError::NotFound { id: record_id.to_string() });
        }
        Ok(())
    }

    async fn load_order(&self) -> Result<OrderState> {
        Ok(self.inner.lock().await.order.clone().unwrap_or_default())
    }

    async fn save_order(&self, order: &OrderState) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_order_saves {
            return Err(AggregatorError::OrderPersistFailure("storage unavailable".to_string()));
        }
        inner.order = Some(order.clone());
        inner.order_saves += 1;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
