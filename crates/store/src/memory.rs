use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ClientId, OrderId, OrderStatus, PieceId, PieceStatus};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::records::{NewOrder, Order, Piece, SagaHistoryEntry};
use crate::store::OrderStore;

#[derive(Default)]
struct State {
    orders: Vec<Order>,
    pieces: Vec<Piece>,
    history: Vec<SagaHistoryEntry>,
    next_history_id: i64,
}

/// In-memory store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation. The
/// single write lock makes every compare-and-set atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of history entries stored.
    pub async fn history_count(&self) -> usize {
        self.state.read().await.history.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let order = Order {
            id: OrderId::new(),
            client_id: new.client_id,
            number_of_pieces: new.number_of_pieces,
            description: new.description,
            status: new.status,
            creation_date: Utc::now(),
        };
        self.state.write().await.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.orders.clone())
    }

    async fn list_orders_by_client(&self, client_id: ClientId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        match state.orders.iter_mut().find(|o| o.id == id) {
            Some(order) if order.status == from => {
                order.status = to;
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_piece(&self, order_id: OrderId) -> Result<Piece> {
        let piece = Piece {
            id: PieceId::new(),
            order_id,
            status: PieceStatus::Queued,
            manufacturing_date: None,
            creation_date: Utc::now(),
        };
        self.state.write().await.pieces.push(piece.clone());
        Ok(piece)
    }

    async fn get_piece(&self, id: PieceId) -> Result<Option<Piece>> {
        let state = self.state.read().await;
        Ok(state.pieces.iter().find(|p| p.id == id).cloned())
    }

    async fn list_pieces(&self, order_id: OrderId) -> Result<Vec<Piece>> {
        let state = self.state.read().await;
        Ok(state
            .pieces
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn mark_piece_produced(
        &self,
        id: PieceId,
        produced_at: DateTime<Utc>,
    ) -> Result<Option<Piece>> {
        let mut state = self.state.write().await;
        match state.pieces.iter_mut().find(|p| p.id == id) {
            Some(piece) if piece.status == PieceStatus::Queued => {
                piece.status = PieceStatus::Produced;
                piece.manufacturing_date = Some(produced_at);
                Ok(Some(piece.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn append_history(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<SagaHistoryEntry> {
        let mut state = self.state.write().await;
        state.next_history_id += 1;
        let entry = SagaHistoryEntry {
            id: state.next_history_id,
            order_id,
            status,
            recorded_at: Utc::now(),
        };
        state.history.push(entry.clone());
        Ok(entry)
    }

    async fn list_history(&self, order_id: OrderId) -> Result<Vec<SagaHistoryEntry>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect())
    }
}
