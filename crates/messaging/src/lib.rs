//! Topic-routed publish/subscribe channels for the order saga.
//!
//! Three logical channels (`events`, `commands`, `responses`) carry
//! topic-routed messages between saga participants. [`MessageBroker`] is an
//! explicitly owned handle, constructed once at startup and cloned into
//! every component that publishes or subscribes, never reached through
//! global state. Publishing is fire-and-forget: coordination happens only
//! through further asynchronous messages.

mod broker;
mod topic;

pub use broker::{BrokerError, Channel, Delivery, MessageBroker, QueueConsumer};
pub use topic::matches;
