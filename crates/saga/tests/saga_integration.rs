//! End-to-end saga tests: inbound messages flow through the broker and the
//! router into the state machine, and outbound messages are observed on
//! probe queues.

use std::sync::Arc;
use std::time::Duration;

use common::{ClientId, OrderId, OrderStatus};
use messaging::{Channel, MessageBroker, QueueConsumer};
use saga::messages::{CheckResult, DeliveryCanceled, DeliveryEvent, PieceProduced};
use saga::{CreateOrder, MessageRouter, OrderLifecycle, PieceAggregator, topics};
use store::{InMemoryStore, OrderStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Harness {
    store: Arc<InMemoryStore>,
    lifecycle: Arc<OrderLifecycle<InMemoryStore>>,
    broker: MessageBroker,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    commands: QueueConsumer,
    events: QueueConsumer,
}

async fn start() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let broker = MessageBroker::new();

    // Probes stand in for the downstream participants.
    let commands = broker.bind(Channel::Commands, "probe.commands", "#").await;
    let events = broker.bind(Channel::Events, "probe.events", "#").await;

    let lifecycle = Arc::new(OrderLifecycle::new(store.clone(), broker.clone()));
    let aggregator = PieceAggregator::new(store.clone(), lifecycle.clone());
    let shutdown = CancellationToken::new();
    let router = MessageRouter::new(
        lifecycle.clone(),
        aggregator,
        broker.clone(),
        shutdown.clone(),
    );
    let tasks = router.start().await;

    Harness {
        store,
        lifecycle,
        broker,
        shutdown,
        tasks,
        commands,
        events,
    }
}

impl Harness {
    async fn create_order(&self, pieces: i64) -> OrderId {
        self.lifecycle
            .create_order(CreateOrder {
                client_id: ClientId::new(),
                number_of_pieces: pieces,
                description: Some("integration".to_string()),
            })
            .await
            .unwrap()
            .id
    }

    async fn respond(&self, routing_key: &str, body: impl serde::Serialize) {
        self.broker
            .publish(
                Channel::Responses,
                routing_key,
                serde_json::to_vec(&body).unwrap(),
            )
            .await
            .unwrap();
    }

    async fn emit(&self, routing_key: &str, body: impl serde::Serialize) {
        self.broker
            .publish(
                Channel::Events,
                routing_key,
                serde_json::to_vec(&body).unwrap(),
            )
            .await
            .unwrap();
    }

    async fn wait_for_status(&self, order_id: OrderId, expected: OrderStatus) {
        let deadline = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let status = self
                    .store
                    .get_order(order_id)
                    .await
                    .unwrap()
                    .map(|o| o.status);
                if status == Some(expected) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(
            deadline.is_ok(),
            "order {order_id} never reached {expected}"
        );
    }

    /// Waits for the next command with the given routing key, failing on
    /// anything unexpected in between.
    async fn expect_command(&mut self, routing_key: &str) -> Vec<u8> {
        let delivery = tokio::time::timeout(Duration::from_secs(2), self.commands.next())
            .await
            .expect("timed out waiting for a command")
            .expect("commands queue gone");
        assert_eq!(delivery.routing_key(), routing_key);
        let body = delivery.body().to_vec();
        delivery.ack();
        body
    }

    /// Drains currently queued probe events and counts those with the key.
    async fn settle_and_count_events(&mut self, routing_key: &str) -> usize {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut count = 0;
        while let Some(delivery) = self.events.try_next() {
            if delivery.routing_key() == routing_key {
                count += 1;
            }
            delivery.ack();
        }
        count
    }
}

#[tokio::test]
async fn happy_path_from_creation_to_delivered() {
    let mut h = start().await;

    // Create: DeliveryPending, delivery.check goes out.
    let order_id = h.create_order(5).await;
    let body = h.expect_command(topics::DELIVERY_CHECK).await;
    let check: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(check["id_order"], serde_json::json!(order_id));

    // Delivery accepted: PaymentPending, payment.check with movement -5.
    h.respond(
        topics::DELIVERY_CHECKED,
        CheckResult {
            order_id,
            status: true,
        },
    )
    .await;
    h.wait_for_status(order_id, OrderStatus::PaymentPending).await;
    let body = h.expect_command(topics::PAYMENT_CHECK).await;
    let payment: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payment["movement"], serde_json::json!(-5));

    // Payment accepted: Queued, five pieces, five piece.needed events.
    h.respond(
        topics::PAYMENT_CHECKED,
        CheckResult {
            order_id,
            status: true,
        },
    )
    .await;
    h.wait_for_status(order_id, OrderStatus::Queued).await;
    // Pieces are created after the status flips; settle before counting.
    assert_eq!(h.settle_and_count_events(topics::PIECE_NEEDED).await, 5);
    let pieces = h.store.list_pieces(order_id).await.unwrap();
    assert_eq!(pieces.len(), 5);

    // Production finishes every piece: Produced, one order.produced.
    for piece in &pieces {
        h.emit(
            topics::PIECE_PRODUCED,
            PieceProduced {
                order_id,
                piece_id: piece.id,
            },
        )
        .await;
    }
    h.wait_for_status(order_id, OrderStatus::Produced).await;
    assert_eq!(h.settle_and_count_events(topics::ORDER_PRODUCED).await, 1);

    // Delivery picks up and confirms.
    h.emit(topics::ORDER_DELIVERING, DeliveryEvent { order_id }).await;
    h.wait_for_status(order_id, OrderStatus::Delivering).await;
    h.emit(topics::ORDER_DELIVERED, DeliveryEvent { order_id }).await;
    h.wait_for_status(order_id, OrderStatus::Delivered).await;

    // The audit trail holds every status the order passed through.
    let statuses: Vec<_> = h
        .lifecycle
        .saga_history(order_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.status)
        .collect();
    assert_eq!(
        statuses,
        [
            OrderStatus::DeliveryPending,
            OrderStatus::PaymentPending,
            OrderStatus::Queued,
            OrderStatus::Produced,
            OrderStatus::Delivering,
            OrderStatus::Delivered,
        ]
    );

    h.shutdown.cancel();
    for task in h.tasks.drain(..) {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn rejected_delivery_cancels_the_order() {
    let mut h = start().await;

    let order_id = h.create_order(3).await;
    h.expect_command(topics::DELIVERY_CHECK).await;

    h.respond(
        topics::DELIVERY_CHECKED,
        CheckResult {
            order_id,
            status: false,
        },
    )
    .await;
    h.wait_for_status(order_id, OrderStatus::Canceled).await;

    // No payment.check was ever sent.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.commands.try_next().is_none());
    assert!(h.store.list_pieces(order_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_payment_compensates_through_delivery_cancel() {
    let mut h = start().await;

    let order_id = h.create_order(4).await;
    h.expect_command(topics::DELIVERY_CHECK).await;

    h.respond(
        topics::DELIVERY_CHECKED,
        CheckResult {
            order_id,
            status: true,
        },
    )
    .await;
    h.expect_command(topics::PAYMENT_CHECK).await;

    h.respond(
        topics::PAYMENT_CHECKED,
        CheckResult {
            order_id,
            status: false,
        },
    )
    .await;
    h.wait_for_status(order_id, OrderStatus::DeliveryCanceling).await;
    h.expect_command(topics::DELIVERY_CANCEL).await;

    h.respond(topics::DELIVERY_CANCELED, DeliveryCanceled { order_id })
        .await;
    h.wait_for_status(order_id, OrderStatus::Canceled).await;

    let statuses: Vec<_> = h
        .lifecycle
        .saga_history(order_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.status)
        .collect();
    assert_eq!(
        statuses,
        [
            OrderStatus::DeliveryPending,
            OrderStatus::PaymentPending,
            OrderStatus::DeliveryCanceling,
            OrderStatus::Canceled,
        ]
    );
}

#[tokio::test]
async fn redelivered_response_does_not_advance_twice() {
    let mut h = start().await;

    let order_id = h.create_order(2).await;
    h.expect_command(topics::DELIVERY_CHECK).await;

    // The broker may deliver the same response twice.
    for _ in 0..2 {
        h.respond(
            topics::DELIVERY_CHECKED,
            CheckResult {
                order_id,
                status: true,
            },
        )
        .await;
    }
    h.wait_for_status(order_id, OrderStatus::PaymentPending).await;

    // Exactly one payment.check despite the duplicate.
    h.expect_command(topics::PAYMENT_CHECK).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.commands.try_next().is_none());
    assert_eq!(h.lifecycle.saga_history(order_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn late_piece_event_after_completion_is_harmless() {
    let mut h = start().await;

    let order_id = h.create_order(2).await;
    h.respond(
        topics::DELIVERY_CHECKED,
        CheckResult {
            order_id,
            status: true,
        },
    )
    .await;
    h.respond(
        topics::PAYMENT_CHECKED,
        CheckResult {
            order_id,
            status: true,
        },
    )
    .await;
    h.wait_for_status(order_id, OrderStatus::Queued).await;
    assert_eq!(h.settle_and_count_events(topics::PIECE_NEEDED).await, 2);

    let pieces = h.store.list_pieces(order_id).await.unwrap();
    for piece in &pieces {
        h.emit(
            topics::PIECE_PRODUCED,
            PieceProduced {
                order_id,
                piece_id: piece.id,
            },
        )
        .await;
    }
    h.wait_for_status(order_id, OrderStatus::Produced).await;
    assert_eq!(h.settle_and_count_events(topics::ORDER_PRODUCED).await, 1);

    // Late redelivery of the first piece's event.
    h.emit(
        topics::PIECE_PRODUCED,
        PieceProduced {
            order_id,
            piece_id: pieces[0].id,
        },
    )
    .await;

    assert_eq!(h.settle_and_count_events(topics::ORDER_PRODUCED).await, 0);
    let loaded = h.store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Produced);
}

#[tokio::test]
async fn shutdown_stops_every_router_task() {
    let h = start().await;

    h.shutdown.cancel();
    for task in h.tasks {
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("router task did not stop")
            .unwrap();
    }
}
