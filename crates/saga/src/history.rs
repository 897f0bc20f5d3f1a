//! Saga history recorder.

use std::sync::Arc;

use common::{OrderId, OrderStatus};
use store::{OrderStore, SagaHistoryEntry};

use crate::error::Result;

/// Records one immutable audit entry per order status change.
///
/// Append-only by construction: there is no update or delete operation.
/// Invoked as a side effect of every transition (including creation) and
/// served as a diagnostic query through the read API.
pub struct HistoryRecorder<S> {
    store: Arc<S>,
}

impl<S> Clone for HistoryRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: OrderStore> HistoryRecorder<S> {
    /// Creates a recorder over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Appends an entry with the status the order just reached.
    pub async fn append(&self, order_id: OrderId, status: OrderStatus) -> Result<SagaHistoryEntry> {
        let entry = self.store.append_history(order_id, status).await?;
        tracing::debug!(%order_id, %status, "saga history recorded");
        Ok(entry)
    }

    /// Returns the full audit trail of an order in arrival order.
    pub async fn list(&self, order_id: OrderId) -> Result<Vec<SagaHistoryEntry>> {
        Ok(self.store.list_history(order_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    #[tokio::test]
    async fn append_and_list() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = HistoryRecorder::new(store);
        let order_id = OrderId::new();

        recorder
            .append(order_id, OrderStatus::DeliveryPending)
            .await
            .unwrap();
        recorder
            .append(order_id, OrderStatus::PaymentPending)
            .await
            .unwrap();
        recorder
            .append(order_id, OrderStatus::Queued)
            .await
            .unwrap();

        let trail = recorder.list(order_id).await.unwrap();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0].status, OrderStatus::DeliveryPending);
        assert_eq!(trail[2].status, OrderStatus::Queued);
    }

    #[tokio::test]
    async fn unknown_order_has_empty_trail() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = HistoryRecorder::new(store);

        let trail = recorder.list(OrderId::new()).await.unwrap();
        assert!(trail.is_empty());
    }
}
