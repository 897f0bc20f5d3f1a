//! The durable store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ClientId, OrderId, OrderStatus, PieceId};

use crate::error::Result;
use crate::records::{NewOrder, Order, Piece, SagaHistoryEntry};

/// CRUD primitives over orders, pieces and saga history.
///
/// Implementations must make the two compare-and-set operations
/// ([`update_order_status`](OrderStore::update_order_status) and
/// [`mark_piece_produced`](OrderStore::mark_piece_produced)) atomic at the
/// row level: when two handlers race on the same record, exactly one call
/// observes the expected current status and wins.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order, assigning its id and creation date.
    async fn insert_order(&self, new: NewOrder) -> Result<Order>;

    /// Loads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads every order.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Loads every order belonging to a client.
    async fn list_orders_by_client(&self, client_id: ClientId) -> Result<Vec<Order>>;

    /// Atomically moves an order from `from` to `to`.
    ///
    /// Returns the updated order, or `None` when the order does not exist
    /// or its current status is not `from` (a lost race or a late
    /// duplicate trigger). No state changes in the `None` case.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>>;

    /// Persists a new piece for an order, in `Queued` status.
    async fn insert_piece(&self, order_id: OrderId) -> Result<Piece>;

    /// Loads a piece by id.
    async fn get_piece(&self, id: PieceId) -> Result<Option<Piece>>;

    /// Loads every piece of an order, in insertion order.
    async fn list_pieces(&self, order_id: OrderId) -> Result<Vec<Piece>>;

    /// Atomically moves a piece from `Queued` to `Produced`, stamping its
    /// manufacturing date with `produced_at`.
    ///
    /// Returns the updated piece, or `None` when the piece is unknown or
    /// already produced; a redelivered production event must not re-stamp
    /// the date.
    async fn mark_piece_produced(
        &self,
        id: PieceId,
        produced_at: DateTime<Utc>,
    ) -> Result<Option<Piece>>;

    /// Appends one saga history entry. There is no update or delete.
    async fn append_history(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<SagaHistoryEntry>;

    /// Loads the saga history of an order in arrival order.
    async fn list_history(&self, order_id: OrderId) -> Result<Vec<SagaHistoryEntry>>;
}
