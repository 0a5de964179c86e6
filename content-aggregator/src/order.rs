use crate::aggregator::apply_order;
use crate::traits::PersistenceBackend;
use crate::types::{AggregatorError, OrderState, Result};
use interfaces::ContentItem;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// The stored order matches the local one.
    Clean,
    /// A local reorder has not been acknowledged by storage yet.
    Dirty,
}

struct OrderAck {
    revision: u64,
    result: Result<()>,
}

/// Owns the manual id sequence for one session.
///
/// Every drag replaces the sequence and is applied synchronously. Storage
/// happens on a spawned task and reports back through a channel; the local
/// order is never reverted when it fails.
pub struct OrderReconciler {
    backend: Arc<dyn PersistenceBackend>,
    order: OrderState,
    status: OrderStatus,
    revision: u64,
    ack_tx: mpsc::UnboundedSender<OrderAck>,
    ack_rx: mpsc::UnboundedReceiver<OrderAck>,
    in_flight: Vec<JoinHandle<()>>,
    failures: Vec<AggregatorError>,
}

impl OrderReconciler {
    pub fn new(backend: Arc<dyn PersistenceBackend>) -> Self {
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            order: OrderState::default(),
            status: OrderStatus::Clean,
            revision: 0,
            ack_tx,
            ack_rx,
            in_flight: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Read the stored order once at session start. A failed read leaves the
    /// order empty.
    pub async fn load(&mut self) -> &OrderState {
        match self.backend.load_order().await {
            Ok(order) => {
                info!("Loaded content order with {} ids from {}", order.len(), self.backend.backend_name());
                self.order = order;
            }
            Err(e) => {
                warn!("Could not load content order, starting empty: {}", e);
                self.order = OrderState::default();
            }
        }
        self.status = OrderStatus::Clean;
        &self.order
    }

    pub fn order(&self) -> &OrderState {
        &self.order
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Arrange `items` by the current order.
    pub fn reconcile(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        apply_order(items, &self.order)
    }

    /// Move the item at `from` to `to` within the rendered list. The full
    /// resulting id sequence becomes the new order and is persisted in the
    /// background. Must be called inside a tokio runtime.
    pub fn drag_end(&mut self, rendered: &[ContentItem], from: usize, to: usize) -> Result<Vec<ContentItem>> {
        let len = rendered.len();
        if from >= len || to >= len {
            return Err(AggregatorError::InvalidMove { from, to, len });
        }

        let mut items = rendered.to_vec();
        let moved = items.remove(from);
        items.insert(to, moved);

        self.replace(OrderState::new(items.iter().map(|i| i.id.clone()).collect()));
        debug!("Moved item {} -> {} (revision {})", from, to, self.revision);
        Ok(items)
    }

    /// Replace the order wholesale and persist it in the background.
    pub fn replace(&mut self, order: OrderState) {
        self.drain_acks();
        self.order = order;
        self.revision += 1;
        self.status = OrderStatus::Dirty;
        self.spawn_persist();
    }

    fn spawn_persist(&mut self) {
        let backend = self.backend.clone();
        let order = self.order.clone();
        let revision = self.revision;
        let ack_tx = self.ack_tx.clone();

        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(tokio::spawn(async move {
            let result = backend.save_order(&order).await;
            // The receiver only goes away with the reconciler.
            let _ = ack_tx.send(OrderAck { revision, result });
        }));
    }

    /// Apply every acknowledgment that has already arrived.
    pub fn drain_acks(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(ack) = self.ack_rx.try_recv() {
            self.apply_ack(ack);
            applied += 1;
        }
        applied
    }

    /// Wait for all in-flight writes, then apply their acknowledgments.
    pub async fn flush(&mut self) -> OrderStatus {
        for handle in self.in_flight.drain(..) {
            if let Err(e) = handle.await {
                warn!("Order persistence task ended abnormally: {}", e);
            }
        }
        self.drain_acks();
        self.status
    }

    /// Persistence failures reported since the last call.
    pub fn take_failures(&mut self) -> Vec<AggregatorError> {
        std::mem::take(&mut self.failures)
    }

    fn apply_ack(&mut self, ack: OrderAck) {
        match ack.result {
            Ok(()) if ack.revision == self.revision => {
                debug!("Order revision {} stored", ack.revision);
                self.status = OrderStatus::Clean;
            }
            Ok(()) => {
                debug!("Ignoring stale ack for revision {} (current {})", ack.revision, self.revision);
            }
            Err(e) => {
                warn!("Failed to persist order revision {}: {}", ack.revision, e);
                self.failures.push(match e {
                    AggregatorError::OrderPersistFailure(_) | AggregatorError::AuthRejected { .. } => e,
                    other => AggregatorError::OrderPersistFailure(other.to_string()),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use interfaces::ContentKind;

    fn rendered() -> Vec<ContentItem> {
        ["news-1", "movie-1", "social-1"]
            .iter()
            .map(|id| ContentItem::new(*id, ContentKind::from_item_id(id).unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn drag_applies_immediately_and_settles_clean() {
        let backend = Arc::new(MemoryBackend::new());
        let mut reconciler = OrderReconciler::new(backend.clone());

        let items = reconciler.drag_end(&rendered(), 2, 0).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["social-1", "news-1", "movie-1"]);
        assert_eq!(reconciler.order().ids(), ["social-1", "news-1", "movie-1"]);
        assert_eq!(reconciler.status(), OrderStatus::Dirty);

        assert_eq!(reconciler.flush().await, OrderStatus::Clean);
        assert_eq!(backend.stored_order().await.unwrap().ids(), ["social-1", "news-1", "movie-1"]);
    }

    #[tokio::test]
    async fn out_of_range_move_is_rejected() {
        let mut reconciler = OrderReconciler::new(Arc::new(MemoryBackend::new()));
        let err = reconciler.drag_end(&rendered(), 0, 3).unwrap_err();
        assert!(matches!(err, AggregatorError::InvalidMove { len: 3, .. }));
        assert!(reconciler.order().is_empty());
        assert_eq!(reconciler.status(), OrderStatus::Clean);
    }
}
