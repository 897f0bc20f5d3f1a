//! Wire payloads exchanged with the other saga participants.
//!
//! Bodies are JSON with the field names the other participants expect
//! (`id_order`, `id_client`, `id_piece`, `movement`, `status`).

use common::{ClientId, OrderId, PieceId};
use serde::{Deserialize, Serialize};

/// Command payload for [`DELIVERY_CHECK`](crate::topics::DELIVERY_CHECK).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryCheck {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,

    #[serde(rename = "id_client")]
    pub client_id: ClientId,
}

/// Command payload for [`PAYMENT_CHECK`](crate::topics::PAYMENT_CHECK).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCheck {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,

    #[serde(rename = "id_client")]
    pub client_id: ClientId,

    /// Debit against the client's balance of producible units: always the
    /// negative of the order's piece count. The sign convention is part of
    /// the payment participant's contract.
    pub movement: i64,
}

/// Command payload for [`DELIVERY_CANCEL`](crate::topics::DELIVERY_CANCEL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryCancel {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,
}

/// Event payload for [`PIECE_NEEDED`](crate::topics::PIECE_NEEDED).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceNeeded {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,

    #[serde(rename = "id_piece")]
    pub piece_id: PieceId,
}

/// Inbound event payload for [`PIECE_PRODUCED`](crate::topics::PIECE_PRODUCED).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceProduced {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,

    #[serde(rename = "id_piece")]
    pub piece_id: PieceId,
}

/// Event payload for [`ORDER_PRODUCED`](crate::topics::ORDER_PRODUCED).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProduced {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,
}

/// Response payload for `delivery.checked` and `payment.checked`:
/// `status` is true when the participant accepted the command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,

    pub status: bool,
}

/// Response payload for [`DELIVERY_CANCELED`](crate::topics::DELIVERY_CANCELED).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryCanceled {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,
}

/// Inbound event payload for `order.delivering` and `order.delivered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    #[serde(rename = "id_order")]
    pub order_id: OrderId,
}
