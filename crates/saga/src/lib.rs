//! The order participant of a choreography-based saga.
//!
//! Consumes domain events and command responses from the broker, advances
//! order lifecycle state against the durable store, records an immutable
//! audit trail of every transition, and emits the events/commands that
//! drive the other participants (delivery, payment, production).
//!
//! There is no central orchestrator: each transition reacts to one inbound
//! message, and coordination is expressed purely as further asynchronous
//! messages.

mod error;
mod history;
mod lifecycle;
mod pieces;
mod router;

pub mod messages;
pub mod topics;

pub use error::{Result, SagaError};
pub use history::HistoryRecorder;
pub use lifecycle::{CreateOrder, OrderLifecycle};
pub use pieces::PieceAggregator;
pub use router::MessageRouter;
