//! Inbound message router.

use std::sync::Arc;

use messaging::{Channel, Delivery, MessageBroker, QueueConsumer};
use store::OrderStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::lifecycle::OrderLifecycle;
use crate::messages::{CheckResult, DeliveryCanceled, DeliveryEvent, PieceProduced};
use crate::pieces::PieceAggregator;
use crate::topics;

/// The handler a queue's messages are dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    PieceProduced,
    OrderDelivered,
    OrderDelivering,
    ClientKeyCreated,
    DeliveryChecked,
    PaymentChecked,
    DeliveryCanceled,
}

/// (route, channel, queue name, binding key), one row per inbound queue.
const BINDINGS: [(Route, Channel, &str, &str); 7] = [
    (
        Route::PieceProduced,
        Channel::Events,
        topics::PIECE_PRODUCED,
        topics::PIECE_PRODUCED,
    ),
    (
        Route::OrderDelivered,
        Channel::Events,
        topics::ORDER_DELIVERED,
        topics::ORDER_DELIVERED,
    ),
    (
        Route::OrderDelivering,
        Channel::Events,
        topics::ORDER_DELIVERING,
        topics::ORDER_DELIVERING,
    ),
    (
        Route::ClientKeyCreated,
        Channel::Events,
        topics::CLIENT_KEY_CREATED_QUEUE,
        topics::CLIENT_KEY_CREATED,
    ),
    (
        Route::DeliveryChecked,
        Channel::Responses,
        topics::DELIVERY_CHECKED,
        topics::DELIVERY_CHECKED,
    ),
    (
        Route::PaymentChecked,
        Channel::Responses,
        topics::PAYMENT_CHECKED,
        topics::PAYMENT_CHECKED,
    ),
    (
        Route::DeliveryCanceled,
        Channel::Responses,
        topics::DELIVERY_CANCELED,
        topics::DELIVERY_CANCELED,
    ),
];

/// Binds the inbound queues and pumps each one as its own cooperative task.
///
/// A message is acknowledged only after its handler returns `Ok`; any
/// failure (malformed payload, store error) leaves the message
/// unacknowledged so the broker redelivers it; there is no bespoke retry
/// policy on top. All tasks share one cancellation token; cancelling stops
/// every task without touching an in-flight message's acknowledgment.
pub struct MessageRouter<S> {
    lifecycle: Arc<OrderLifecycle<S>>,
    aggregator: PieceAggregator<S>,
    broker: MessageBroker,
    shutdown: CancellationToken,
}

impl<S: OrderStore + 'static> MessageRouter<S> {
    /// Creates a router over the saga components and the broker handle.
    pub fn new(
        lifecycle: Arc<OrderLifecycle<S>>,
        aggregator: PieceAggregator<S>,
        broker: MessageBroker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            lifecycle,
            aggregator,
            broker,
            shutdown,
        }
    }

    /// Binds all seven queues and spawns one consumer task per queue.
    ///
    /// Returns the task handles; they finish when the shutdown token is
    /// cancelled or the broker goes away.
    pub async fn start(self) -> Vec<JoinHandle<()>> {
        let router = Arc::new(self);
        let mut handles = Vec::with_capacity(BINDINGS.len());

        for (route, channel, queue, binding_key) in BINDINGS {
            let consumer = router.broker.bind(channel, queue, binding_key).await;
            let router = router.clone();
            handles.push(tokio::spawn(async move {
                router.consume(route, consumer).await;
            }));
        }

        tracing::info!(queues = BINDINGS.len(), "message router started");
        handles
    }

    async fn consume(&self, route: Route, mut consumer: QueueConsumer) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(queue = consumer.queue(), "router task stopped");
                    break;
                }
                delivery = consumer.next() => {
                    let Some(delivery) = delivery else {
                        tracing::warn!(queue = consumer.queue(), "queue gone, router task exiting");
                        break;
                    };
                    self.handle(route, delivery).await;
                }
            }
        }
    }

    async fn handle(&self, route: Route, delivery: Delivery) {
        let start = std::time::Instant::now();
        let result = self.dispatch(route, delivery.body()).await;
        metrics::histogram!("saga_message_handle_seconds")
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => delivery.ack(),
            Err(err) => {
                metrics::counter!("saga_message_failures_total").increment(1);
                tracing::warn!(
                    routing_key = delivery.routing_key(),
                    redelivered = delivery.redelivered(),
                    error = %err,
                    "handler failed, message left for redelivery"
                );
                delivery.nack();
            }
        }
    }

    async fn dispatch(&self, route: Route, body: &[u8]) -> Result<()> {
        match route {
            Route::PieceProduced => {
                let msg: PieceProduced = serde_json::from_slice(body)?;
                self.aggregator
                    .on_piece_produced(msg.piece_id, msg.order_id)
                    .await
            }
            Route::OrderDelivered => {
                let msg: DeliveryEvent = serde_json::from_slice(body)?;
                self.lifecycle.on_delivered(msg.order_id).await
            }
            Route::OrderDelivering => {
                let msg: DeliveryEvent = serde_json::from_slice(body)?;
                self.lifecycle.on_delivering(msg.order_id).await
            }
            Route::ClientKeyCreated => {
                // Key refresh belongs to the authentication collaborator;
                // this participant only has to drain its bound queue.
                tracing::info!("client key rotation notice received");
                Ok(())
            }
            Route::DeliveryChecked => {
                let msg: CheckResult = serde_json::from_slice(body)?;
                self.lifecycle
                    .on_delivery_checked(msg.order_id, msg.status)
                    .await
            }
            Route::PaymentChecked => {
                let msg: CheckResult = serde_json::from_slice(body)?;
                self.lifecycle
                    .on_payment_checked(msg.order_id, msg.status)
                    .await
            }
            Route::DeliveryCanceled => {
                let msg: DeliveryCanceled = serde_json::from_slice(body)?;
                self.lifecycle.on_delivery_canceled(msg.order_id).await
            }
        }
    }
}
