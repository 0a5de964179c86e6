mod common;

use async_trait::async_trait;
use common::{init_tracing, item};
use content_aggregator::{
    AggregatorError, MemoryBackend, NewFavorite, OrderReconciler, OrderState, OrderStatus, PersistenceBackend, Result,
    StoredFavorite,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn rendered() -> Vec<content_aggregator::ContentItem> {
    vec![item("news-1", "a"), item("movie-1", "b"), item("social-1", "c")]
}

#[tokio::test]
async fn test_failed_write_keeps_local_order_and_reports() {
    init_tracing();

    let backend = Arc::new(MemoryBackend::new());
    backend.fail_order_saves(true).await;
    let mut reconciler = OrderReconciler::new(backend.clone());

    reconciler.drag_end(&rendered(), 0, 1).unwrap();
    assert_eq!(reconciler.flush().await, OrderStatus::Dirty);
    assert_eq!(reconciler.order().ids(), ["movie-1", "news-1", "social-1"]);

    let failures = reconciler.take_failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], AggregatorError::OrderPersistFailure(_)));
    assert!(reconciler.take_failures().is_empty());
    assert!(backend.stored_order().await.is_none());
}

#[tokio::test]
async fn test_load_failure_starts_empty() {
    init_tracing();

    struct Unreachable;

    #[async_trait]
    impl PersistenceBackend for Unreachable {
        async fn list_favorites(&self) -> Result<Vec<StoredFavorite>> {
            Err(AggregatorError::General("offline".to_string()))
        }
        async fn add_favorite(&self, _: &NewFavorite) -> Result<()> {
            Err(AggregatorError::General("offline".to_string()))
        }
        async fn remove_favorite(&self, _: &str) -> Result<()> {
            Err(AggregatorError::General("offline".to_string()))
        }
        async fn load_order(&self) -> Result<OrderState> {
            Err(AggregatorError::General("offline".to_string()))
        }
        async fn save_order(&self, _: &OrderState) -> Result<()> {
            Err(AggregatorError::General("offline".to_string()))
        }
        fn backend_name(&self) -> &'static str {
            "unreachable"
        }
    }

    let mut reconciler = OrderReconciler::new(Arc::new(Unreachable));
    assert!(reconciler.load().await.is_empty());
    assert_eq!(reconciler.status(), OrderStatus::Clean);
}

/// Backend whose n-th write takes `delays[n]`.
struct ScriptedDelays {
    delays: Vec<Duration>,
    calls: Mutex<usize>,
}

#[async_trait]
impl PersistenceBackend for ScriptedDelays {
    async fn list_favorites(&self) -> Result<Vec<StoredFavorite>> {
        Ok(Vec::new())
    }
    async fn add_favorite(&self, _: &NewFavorite) -> Result<()> {
        Ok(())
    }
    async fn remove_favorite(&self, id: &str) -> Result<()> {
        Err(AggregatorError::NotFound { id: id.to_string() })
    }
    async fn load_order(&self) -> Result<OrderState> {
        Ok(OrderState::default())
    }
    async fn save_order(&self, _: &OrderState) -> Result<()> {
        let delay = {
            let mut calls = self.calls.lock().await;
            let delay = self.delays.get(*calls).copied().unwrap_or_default();
            *calls += 1;
            delay
        };
        tokio::time::sleep(delay).await;
        Ok(())
    }
    fn backend_name(&self) -> &'static str {
        "scripted-delays"
    }
}

#[tokio::test(start_paused = true)]
async fn test_stale_ack_does_not_mark_clean() {
    init_tracing();

    let backend = Arc::new(ScriptedDelays {
        delays: vec![Duration::from_millis(100), Duration::from_millis(300)],
        calls: Mutex::new(0),
    });
    let mut reconciler = OrderReconciler::new(backend);

    let first = reconciler.drag_end(&rendered(), 0, 2).unwrap();
    reconciler.drag_end(&first, 0, 1).unwrap();
    assert_eq!(reconciler.revision(), 2);

    // Revision 1 is stored, revision 2 is still in flight.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(reconciler.drain_acks(), 1);
    assert_eq!(reconciler.status(), OrderStatus::Dirty);

    assert_eq!(reconciler.flush().await, OrderStatus::Clean);
}

#[tokio::test]
async fn test_reconcile_drops_unknown_and_appends_unlisted() {
    init_tracing();

    let backend = Arc::new(MemoryBackend::with_order(OrderState::new(vec![
        "gone-1".to_string(),
        "social-1".to_string(),
    ])));
    let mut reconciler = OrderReconciler::new(backend);
    reconciler.load().await;

    let ids: Vec<String> = reconciler.reconcile(rendered()).into_iter().map(|i| i.id).collect();
    assert_eq!(ids, ["social-1", "news-1", "movie-1"]);
}
