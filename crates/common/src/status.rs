//! Order and piece status enums and the saga transition table.

use serde::{Deserialize, Serialize};

/// The status of an order in its saga lifecycle.
///
/// ```text
/// DeliveryPending ──► PaymentPending ──► Queued ──► Produced ──► Delivering ──► Delivered
///        │                  │
///        │                  └──► DeliveryCanceling ──► Canceled
///        └──────────────────────────────────────────► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Waiting for the delivery participant to accept the destination.
    #[default]
    DeliveryPending,

    /// Delivery accepted, waiting for the payment participant.
    PaymentPending,

    /// Payment rejected; waiting for the delivery reservation to be undone.
    DeliveryCanceling,

    /// Saga compensated, order is dead (terminal state).
    Canceled,

    /// Paid; pieces are queued for production.
    Queued,

    /// Every piece has been produced.
    Produced,

    /// Handed off to the delivery participant.
    Delivering,

    /// Confirmed delivered to the client (terminal state).
    Delivered,
}

/// The status of a single piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PieceStatus {
    /// Waiting for the production participant.
    #[default]
    Queued,

    /// Produced; `manufacturing_date` is stamped.
    Produced,
}

/// External triggers that advance an order through the saga.
///
/// Each trigger corresponds to one inbound message (or the completion
/// condition the piece aggregator detects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// `delivery.checked` response with status true.
    DeliveryAccepted,
    /// `delivery.checked` response with status false.
    DeliveryRejected,
    /// `payment.checked` response with status true.
    PaymentAccepted,
    /// `payment.checked` response with status false.
    PaymentRejected,
    /// `delivery.canceled` response.
    CancelConfirmed,
    /// Every piece of the order reached `Produced`.
    ProductionCompleted,
    /// `order.delivering` handoff event.
    DeliveryStarted,
    /// `order.delivered` confirmation event.
    DeliveryCompleted,
}

impl OrderStatus {
    /// The transition table of the saga.
    ///
    /// Returns the status the order moves to when `trigger` fires in the
    /// current status, or `None` when the pair is not a legal edge. Late
    /// and duplicate messages land in the `None` arm; callers treat that
    /// as a no-op, not an error.
    pub fn next(self, trigger: Trigger) -> Option<OrderStatus> {
        use OrderStatus::*;
        use Trigger::*;

        match (self, trigger) {
            (DeliveryPending, DeliveryAccepted) => Some(PaymentPending),
            (DeliveryPending, DeliveryRejected) => Some(Canceled),
            (PaymentPending, PaymentAccepted) => Some(Queued),
            (PaymentPending, PaymentRejected) => Some(DeliveryCanceling),
            (DeliveryCanceling, CancelConfirmed) => Some(Canceled),
            (Queued, ProductionCompleted) => Some(Produced),
            (Produced, DeliveryStarted) => Some(Delivering),
            (Delivering, DeliveryCompleted) => Some(Delivered),
            _ => None,
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Delivered)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::DeliveryPending => "DeliveryPending",
            OrderStatus::PaymentPending => "PaymentPending",
            OrderStatus::DeliveryCanceling => "DeliveryCanceling",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Queued => "Queued",
            OrderStatus::Produced => "Produced",
            OrderStatus::Delivering => "Delivering",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PieceStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceStatus::Queued => "Queued",
            PieceStatus::Produced => "Produced",
        }
    }
}

impl std::fmt::Display for PieceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DeliveryPending" => Ok(OrderStatus::DeliveryPending),
            "PaymentPending" => Ok(OrderStatus::PaymentPending),
            "DeliveryCanceling" => Ok(OrderStatus::DeliveryCanceling),
            "Canceled" => Ok(OrderStatus::Canceled),
            "Queued" => Ok(OrderStatus::Queued),
            "Produced" => Ok(OrderStatus::Produced),
            "Delivering" => Ok(OrderStatus::Delivering),
            "Delivered" => Ok(OrderStatus::Delivered),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl std::str::FromStr for PieceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(PieceStatus::Queued),
            "Produced" => Ok(PieceStatus::Produced),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_delivery_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::DeliveryPending);
    }

    #[test]
    fn test_happy_path_edges() {
        use OrderStatus::*;
        use Trigger::*;

        assert_eq!(DeliveryPending.next(DeliveryAccepted), Some(PaymentPending));
        assert_eq!(PaymentPending.next(PaymentAccepted), Some(Queued));
        assert_eq!(Queued.next(ProductionCompleted), Some(Produced));
        assert_eq!(Produced.next(DeliveryStarted), Some(Delivering));
        assert_eq!(Delivering.next(DeliveryCompleted), Some(Delivered));
    }

    #[test]
    fn test_compensation_edges() {
        use OrderStatus::*;
        use Trigger::*;

        assert_eq!(DeliveryPending.next(DeliveryRejected), Some(Canceled));
        assert_eq!(PaymentPending.next(PaymentRejected), Some(DeliveryCanceling));
        assert_eq!(DeliveryCanceling.next(CancelConfirmed), Some(Canceled));
    }

    #[test]
    fn test_terminal_statuses_accept_no_trigger() {
        use Trigger::*;

        for trigger in [
            DeliveryAccepted,
            DeliveryRejected,
            PaymentAccepted,
            PaymentRejected,
            CancelConfirmed,
            ProductionCompleted,
            DeliveryStarted,
            DeliveryCompleted,
        ] {
            assert_eq!(OrderStatus::Canceled.next(trigger), None);
            assert_eq!(OrderStatus::Delivered.next(trigger), None);
        }
    }

    #[test]
    fn test_duplicate_trigger_is_not_an_edge() {
        // A redelivered delivery.checked on an order already past
        // DeliveryPending must not match any edge.
        assert_eq!(
            OrderStatus::PaymentPending.next(Trigger::DeliveryAccepted),
            None
        );
        assert_eq!(OrderStatus::Queued.next(Trigger::PaymentAccepted), None);
        assert_eq!(
            OrderStatus::Produced.next(Trigger::ProductionCompleted),
            None
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::DeliveryPending.is_terminal());
        assert!(!OrderStatus::Queued.is_terminal());
        assert!(!OrderStatus::Delivering.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::DeliveryPending.to_string(), "DeliveryPending");
        assert_eq!(
            OrderStatus::DeliveryCanceling.to_string(),
            "DeliveryCanceling"
        );
        assert_eq!(PieceStatus::Produced.to_string(), "Produced");
    }

    #[test]
    fn test_from_str_roundtrip() {
        use std::str::FromStr;

        for status in [
            OrderStatus::DeliveryPending,
            OrderStatus::PaymentPending,
            OrderStatus::DeliveryCanceling,
            OrderStatus::Canceled,
            OrderStatus::Queued,
            OrderStatus::Produced,
            OrderStatus::Delivering,
            OrderStatus::Delivered,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(OrderStatus::from_str("Shipped").is_err());
        assert_eq!(PieceStatus::from_str("Queued"), Ok(PieceStatus::Queued));
    }

    #[test]
    fn test_serialization() {
        let status = OrderStatus::PaymentPending;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"PaymentPending\"");
        let deserialized: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, deserialized);
    }
}
