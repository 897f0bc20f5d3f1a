//! Routing keys and queue names of the saga topology.

// Commands this participant sends.

/// Ask the delivery participant whether the destination is served.
pub const DELIVERY_CHECK: &str = "delivery.check";

/// Ask the payment participant to debit the client's balance.
pub const PAYMENT_CHECK: &str = "payment.check";

/// Ask the delivery participant to undo an accepted delivery.
pub const DELIVERY_CANCEL: &str = "delivery.cancel";

// Events this participant emits.

/// A piece is queued and must be produced.
pub const PIECE_NEEDED: &str = "piece.needed";

/// Every piece of an order has been produced.
pub const ORDER_PRODUCED: &str = "order.produced";

// Inbound routing keys.

/// Production finished one piece.
pub const PIECE_PRODUCED: &str = "piece.produced";

/// Delivery picked the order up.
pub const ORDER_DELIVERING: &str = "order.delivering";

/// Delivery confirmed arrival at the client.
pub const ORDER_DELIVERED: &str = "order.delivered";

/// Response to `delivery.check`.
pub const DELIVERY_CHECKED: &str = "delivery.checked";

/// Response to `payment.check`.
pub const PAYMENT_CHECKED: &str = "payment.checked";

/// Response to `delivery.cancel`.
pub const DELIVERY_CANCELED: &str = "delivery.canceled";

/// The authentication participant rotated its signing key.
pub const CLIENT_KEY_CREATED: &str = "client.key_created";

/// Queue name for `client.key_created`; suffixed because every service
/// binds its own queue to that event.
pub const CLIENT_KEY_CREATED_QUEUE: &str = "client.key_created_order";
