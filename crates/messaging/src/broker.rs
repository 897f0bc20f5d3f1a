//! In-process topic broker.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{RwLock, mpsc};

use crate::topic;

/// The three logical channels of the saga, each a topic-routed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Facts that occurred (`piece.needed`, `order.produced`, ...).
    Events,
    /// Requests directed at another participant (`delivery.check`, ...).
    Commands,
    /// Replies to a command (`delivery.checked`, ...).
    Responses,
}

impl Channel {
    /// Returns the exchange name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Events => "events",
            Channel::Commands => "commands",
            Channel::Responses => "responses",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur when talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A bound queue's consumer has gone away; the broker connection is
    /// effectively lost for that route.
    #[error("queue '{0}' is gone")]
    QueueGone(String),
}

struct QueuedMessage {
    routing_key: String,
    body: Vec<u8>,
    redelivered: bool,
}

/// A message handed to a queue consumer.
///
/// Must be settled exactly once: [`ack`](Delivery::ack) consumes it,
/// [`nack`](Delivery::nack) puts it back on the queue for redelivery.
pub struct Delivery {
    routing_key: String,
    body: Vec<u8>,
    redelivered: bool,
    requeue: mpsc::UnboundedSender<QueuedMessage>,
}

impl Delivery {
    /// The routing key the message was published with.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// The message body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// True when this delivery is a redelivery after a nack.
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }

    /// Acknowledges the message, removing it from the queue.
    pub fn ack(self) {}

    /// Negatively acknowledges the message; the broker redelivers it.
    pub fn nack(self) {
        let requeued = self.requeue.send(QueuedMessage {
            routing_key: self.routing_key.clone(),
            body: self.body,
            redelivered: true,
        });
        if requeued.is_err() {
            tracing::warn!(routing_key = %self.routing_key, "nacked message lost: queue is gone");
        }
    }
}

/// The consuming end of a bound queue. One consumer per queue.
pub struct QueueConsumer {
    queue: String,
    rx: mpsc::UnboundedReceiver<QueuedMessage>,
    requeue: mpsc::UnboundedSender<QueuedMessage>,
}

impl QueueConsumer {
    /// The queue name this consumer drains.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Waits for the next delivery. Returns `None` once the broker side
    /// of the queue has been dropped and the queue is drained.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await.map(|msg| self.to_delivery(msg))
    }

    /// Returns the next delivery only if one is already queued.
    pub fn try_next(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok().map(|msg| self.to_delivery(msg))
    }

    fn to_delivery(&self, msg: QueuedMessage) -> Delivery {
        Delivery {
            routing_key: msg.routing_key,
            body: msg.body,
            redelivered: msg.redelivered,
            requeue: self.requeue.clone(),
        }
    }
}

struct Binding {
    queue: String,
    pattern: String,
    tx: mpsc::UnboundedSender<QueuedMessage>,
}

#[derive(Default)]
struct Exchanges {
    events: Vec<Binding>,
    commands: Vec<Binding>,
    responses: Vec<Binding>,
}

impl Exchanges {
    fn bindings(&self, channel: Channel) -> &Vec<Binding> {
        match channel {
            Channel::Events => &self.events,
            Channel::Commands => &self.commands,
            Channel::Responses => &self.responses,
        }
    }

    fn bindings_mut(&mut self, channel: Channel) -> &mut Vec<Binding> {
        match channel {
            Channel::Events => &mut self.events,
            Channel::Commands => &mut self.commands,
            Channel::Responses => &mut self.responses,
        }
    }
}

/// In-process topic broker over the three saga channels.
///
/// Cheap to clone; all clones share the same exchanges. A published
/// message is fanned out to every queue whose binding pattern matches the
/// routing key and delivered in publish order to that queue's consumer.
/// A message published to a routing key no queue is bound to is dropped,
/// as a topic exchange drops unroutable messages.
#[derive(Clone, Default)]
pub struct MessageBroker {
    exchanges: Arc<RwLock<Exchanges>>,
}

impl MessageBroker {
    /// Creates a broker with the three channels and no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a queue bound to `binding_key` on `channel` and returns
    /// its consumer.
    pub async fn bind(
        &self,
        channel: Channel,
        queue: impl Into<String>,
        binding_key: impl Into<String>,
    ) -> QueueConsumer {
        let queue = queue.into();
        let pattern = binding_key.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut exchanges = self.exchanges.write().await;
        exchanges.bindings_mut(channel).push(Binding {
            queue: queue.clone(),
            pattern: pattern.clone(),
            tx: tx.clone(),
        });
        tracing::debug!(%channel, %queue, %pattern, "queue bound");

        QueueConsumer {
            queue,
            rx,
            requeue: tx,
        }
    }

    /// Publishes a message to `channel` with the given routing key.
    ///
    /// Fire-and-forget: no reply is awaited. Fails only when a matching
    /// queue's consumer has gone away, which the saga treats as loss of
    /// the broker rather than a recoverable per-call error.
    pub async fn publish(
        &self,
        channel: Channel,
        routing_key: &str,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        let exchanges = self.exchanges.read().await;
        let mut gone = None;

        for binding in exchanges.bindings(channel) {
            if !topic::matches(&binding.pattern, routing_key) {
                continue;
            }
            let sent = binding.tx.send(QueuedMessage {
                routing_key: routing_key.to_string(),
                body: body.clone(),
                redelivered: false,
            });
            if sent.is_err() {
                gone.get_or_insert_with(|| binding.queue.clone());
            }
        }

        match gone {
            Some(queue) => Err(BrokerError::QueueGone(queue)),
            None => {
                tracing::trace!(%channel, %routing_key, "message published");
                Ok(())
            }
        }
    }
}
