//! Piece completion aggregator.

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, PieceId, PieceStatus};
use store::OrderStore;

use crate::error::Result;
use crate::lifecycle::OrderLifecycle;

/// Tracks per-order production state and detects when the last piece of an
/// order has been produced.
///
/// The completeness check runs on every `piece.produced` message, whatever
/// order pieces complete in; when two handlers race on the last two pieces,
/// both may see the order complete, and the lifecycle's compare-and-set
/// makes sure only one of them flips the order and emits `order.produced`.
pub struct PieceAggregator<S> {
    store: Arc<S>,
    lifecycle: Arc<OrderLifecycle<S>>,
}

impl<S> Clone for PieceAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<S: OrderStore> PieceAggregator<S> {
    /// Creates an aggregator over the store and the lifecycle it notifies.
    pub fn new(store: Arc<S>, lifecycle: Arc<OrderLifecycle<S>>) -> Self {
        Self { store, lifecycle }
    }

    /// Handles one `piece.produced` event.
    ///
    /// Marks the piece produced, stamping its manufacturing date exactly
    /// once: a redelivered event finds the piece already produced and
    /// leaves it alone. Then re-evaluates whether every piece of the
    /// order is now produced.
    #[tracing::instrument(skip(self))]
    pub async fn on_piece_produced(&self, piece_id: PieceId, order_id: OrderId) -> Result<()> {
        match self.store.mark_piece_produced(piece_id, Utc::now()).await? {
            Some(piece) => {
                metrics::counter!("pieces_produced_total").increment(1);
                tracing::info!(%piece_id, %order_id, at = ?piece.manufacturing_date, "piece produced");
            }
            None => {
                // Redelivery or a piece this service never created.
                tracing::debug!(%piece_id, %order_id, "piece already produced or unknown");
            }
        }

        let pieces = self.store.list_pieces(order_id).await?;
        let complete =
            !pieces.is_empty() && pieces.iter().all(|p| p.status == PieceStatus::Produced);

        if complete {
            self.lifecycle.complete_production(order_id).await?;
        }
        Ok(())
    }
}
