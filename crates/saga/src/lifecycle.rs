//! Order lifecycle state machine.

use std::sync::Arc;

use common::{ClientId, OrderId, OrderStatus, Trigger};
use messaging::{Channel, MessageBroker};
use serde::Serialize;
use store::{NewOrder, Order, OrderStore, SagaHistoryEntry};

use crate::error::{Result, SagaError};
use crate::history::HistoryRecorder;
use crate::messages::{DeliveryCancel, DeliveryCheck, OrderProduced, PaymentCheck, PieceNeeded};
use crate::topics;

/// A validated-by-the-transport-layer request to create an order.
///
/// `client_id` comes from the authenticated caller's identity; the core
/// does not re-derive it.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub client_id: ClientId,
    pub number_of_pieces: i64,
    pub description: Option<String>,
}

/// Owns every `Order.status` transition of the saga.
///
/// Each transition is a single unit: load the order, consult the
/// transition table, compare-and-set the new status through the store,
/// append one history entry, and emit the follow-on message the table
/// prescribes. Triggers that do not match the current state (duplicates,
/// late arrivals, out-of-order delivery) are logged and dropped as
/// successful no-ops.
pub struct OrderLifecycle<S> {
    store: Arc<S>,
    broker: MessageBroker,
    history: HistoryRecorder<S>,
}

impl<S: OrderStore> OrderLifecycle<S> {
    /// Creates the state machine over a store and a broker handle.
    pub fn new(store: Arc<S>, broker: MessageBroker) -> Self {
        let history = HistoryRecorder::new(store.clone());
        Self {
            store,
            broker,
            history,
        }
    }

    /// The recorder used for the audit trail.
    pub fn history(&self) -> &HistoryRecorder<S> {
        &self.history
    }

    // -- Synchronous operations (invoked by the transport layer) --

    /// Creates an order and opens its saga.
    ///
    /// Rejects a non-positive piece count before any record is written.
    /// On success the order is in `DeliveryPending`, its first history
    /// entry exists, and a `delivery.check` command has been published.
    #[tracing::instrument(skip(self, cmd), fields(client_id = %cmd.client_id))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order> {
        if cmd.number_of_pieces <= 0 {
            return Err(SagaError::InvalidPieceCount {
                requested: cmd.number_of_pieces,
            });
        }

        let order = self
            .store
            .insert_order(NewOrder {
                client_id: cmd.client_id,
                number_of_pieces: cmd.number_of_pieces as u32,
                description: cmd
                    .description
                    .unwrap_or_else(|| "No description".to_string()),
                status: OrderStatus::DeliveryPending,
            })
            .await?;

        self.history.append(order.id, order.status).await?;
        self.publish(
            Channel::Commands,
            topics::DELIVERY_CHECK,
            &DeliveryCheck {
                order_id: order.id,
                client_id: order.client_id,
            },
        )
        .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, pieces = order.number_of_pieces, "order created, delivery check requested");
        Ok(order)
    }

    /// Loads an order by id.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.store.get_order(order_id).await?)
    }

    /// Loads every order. Restricting this to privileged callers is the
    /// transport layer's job.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    /// Loads every order of a client.
    pub async fn list_orders_by_client(&self, client_id: ClientId) -> Result<Vec<Order>> {
        Ok(self.store.list_orders_by_client(client_id).await?)
    }

    /// Returns an order's saga audit trail in arrival order.
    pub async fn saga_history(&self, order_id: OrderId) -> Result<Vec<SagaHistoryEntry>> {
        self.history.list(order_id).await
    }

    // -- Asynchronous operations (invoked by the message router) --

    /// Handles the delivery participant's response to `delivery.check`.
    #[tracing::instrument(skip(self))]
    pub async fn on_delivery_checked(&self, order_id: OrderId, accepted: bool) -> Result<()> {
        if accepted {
            if let Some(order) = self.apply(order_id, Trigger::DeliveryAccepted).await? {
                // Movement is a debit: the negative of the piece count.
                self.publish(
                    Channel::Commands,
                    topics::PAYMENT_CHECK,
                    &PaymentCheck {
                        order_id: order.id,
                        client_id: order.client_id,
                        movement: -(order.number_of_pieces as i64),
                    },
                )
                .await?;
            }
        } else {
            self.apply(order_id, Trigger::DeliveryRejected).await?;
        }
        Ok(())
    }

    /// Handles the payment participant's response to `payment.check`.
    ///
    /// Acceptance queues the order and creates its pieces, announcing each
    /// one with a `piece.needed` event; rejection starts compensation by
    /// asking delivery to cancel.
    #[tracing::instrument(skip(self))]
    pub async fn on_payment_checked(&self, order_id: OrderId, accepted: bool) -> Result<()> {
        if accepted {
            if let Some(order) = self.apply(order_id, Trigger::PaymentAccepted).await? {
                for _ in 0..order.number_of_pieces {
                    let piece = self.store.insert_piece(order.id).await?;
                    self.publish(
                        Channel::Events,
                        topics::PIECE_NEEDED,
                        &PieceNeeded {
                            order_id: order.id,
                            piece_id: piece.id,
                        },
                    )
                    .await?;
                }
                tracing::info!(%order_id, pieces = order.number_of_pieces, "pieces queued for production");
            }
        } else if self
            .apply(order_id, Trigger::PaymentRejected)
            .await?
            .is_some()
        {
            self.publish(
                Channel::Commands,
                topics::DELIVERY_CANCEL,
                &DeliveryCancel { order_id },
            )
            .await?;
        }
        Ok(())
    }

    /// Handles the delivery participant's confirmation of a cancel.
    #[tracing::instrument(skip(self))]
    pub async fn on_delivery_canceled(&self, order_id: OrderId) -> Result<()> {
        self.apply(order_id, Trigger::CancelConfirmed).await?;
        Ok(())
    }

    /// Moves a fully produced order to `Produced` and announces it.
    ///
    /// Called by the piece aggregator, possibly from several racing
    /// handlers; the compare-and-set picks a single winner, and only the
    /// winner emits `order.produced`.
    #[tracing::instrument(skip(self))]
    pub async fn complete_production(&self, order_id: OrderId) -> Result<()> {
        if self
            .apply(order_id, Trigger::ProductionCompleted)
            .await?
            .is_some()
        {
            self.publish(
                Channel::Events,
                topics::ORDER_PRODUCED,
                &OrderProduced { order_id },
            )
            .await?;
        }
        Ok(())
    }

    /// Handles the delivery handoff event.
    #[tracing::instrument(skip(self))]
    pub async fn on_delivering(&self, order_id: OrderId) -> Result<()> {
        self.apply(order_id, Trigger::DeliveryStarted).await?;
        Ok(())
    }

    /// Handles the delivery confirmation event.
    #[tracing::instrument(skip(self))]
    pub async fn on_delivered(&self, order_id: OrderId) -> Result<()> {
        self.apply(order_id, Trigger::DeliveryCompleted).await?;
        Ok(())
    }

    // -- Internals --

    /// Applies one transition as a unit.
    ///
    /// Returns the updated order when the transition happened, `None` when
    /// the trigger was dropped: unknown order, illegal edge, or a lost
    /// compare-and-set, in which case the winner records the history.
    async fn apply(&self, order_id: OrderId, trigger: Trigger) -> Result<Option<Order>> {
        let Some(order) = self.store.get_order(order_id).await? else {
            tracing::warn!(%order_id, ?trigger, "trigger for unknown order dropped");
            return Ok(None);
        };

        let Some(next) = order.status.next(trigger) else {
            metrics::counter!("saga_illegal_trigger_total").increment(1);
            tracing::warn!(
                %order_id,
                status = %order.status,
                ?trigger,
                "illegal trigger dropped (duplicate or out-of-order message)"
            );
            return Ok(None);
        };

        let Some(updated) = self
            .store
            .update_order_status(order_id, order.status, next)
            .await?
        else {
            tracing::debug!(%order_id, ?trigger, "transition lost its compare-and-set");
            return Ok(None);
        };

        self.history.append(order_id, updated.status).await?;
        metrics::counter!("saga_transitions_total", "to" => updated.status.as_str()).increment(1);
        tracing::info!(%order_id, from = %order.status, to = %updated.status, "order transitioned");
        Ok(Some(updated))
    }

    async fn publish<T: Serialize>(
        &self,
        channel: Channel,
        routing_key: &str,
        payload: &T,
    ) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        self.broker.publish(channel, routing_key, body).await?;
        Ok(())
    }
}
