//! Record types persisted by the durable store.

use chrono::{DateTime, Utc};
use common::{ClientId, OrderId, OrderStatus, PieceId, PieceStatus};
use serde::{Deserialize, Serialize};

/// A customer order as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier, immutable.
    pub id: OrderId,

    /// The client the order belongs to, immutable.
    pub client_id: ClientId,

    /// How many pieces to produce; fixed at creation.
    pub number_of_pieces: u32,

    /// Free-text description.
    pub description: String,

    /// Current saga status.
    pub status: OrderStatus,

    /// Set once at insertion.
    pub creation_date: DateTime<Utc>,
}

/// The fields a caller supplies when inserting an order.
///
/// Identifier and creation date are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: ClientId,
    pub number_of_pieces: u32,
    pub description: String,
    pub status: OrderStatus,
}

/// One piece of an order.
///
/// A piece belongs to exactly one order and is cascade-deleted with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub order_id: OrderId,
    pub status: PieceStatus,

    /// Unset until the piece is produced, then stamped exactly once.
    pub manufacturing_date: Option<DateTime<Utc>>,

    pub creation_date: DateTime<Utc>,
}

/// One entry of an order's saga audit trail.
///
/// Append-only: entries are never updated or deleted, and `order_id` is not
/// a foreign key, so the trail may outlive the order itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaHistoryEntry {
    /// Store-assigned, monotonically increasing.
    pub id: i64,

    pub order_id: OrderId,

    /// The order status recorded at this point.
    pub status: OrderStatus,

    pub recorded_at: DateTime<Utc>,
}
