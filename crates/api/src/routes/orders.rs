//! Order endpoints: creation, reads and the saga audit trail.
//!
//! Caller identity and authorization are the transport collaborator's
//! responsibility; handlers trust the `client_id` they are given.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ClientId, OrderId};
use saga::{CreateOrder, OrderLifecycle};
use serde::{Deserialize, Serialize};
use store::{Order, OrderStore, SagaHistoryEntry};
use uuid::Uuid;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub lifecycle: Arc<OrderLifecycle<S>>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// The authenticated caller's client id, validated upstream.
    pub client_id: Uuid,
    pub number_of_pieces: i64,
    pub description: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub client_id: String,
    pub number_of_pieces: u32,
    pub description: String,
    pub status: String,
    pub creation_date: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            client_id: order.client_id.to_string(),
            number_of_pieces: order.number_of_pieces,
            description: order.description,
            status: order.status.to_string(),
            creation_date: order.creation_date.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub id: i64,
    pub order_id: String,
    pub status: String,
    pub recorded_at: String,
}

impl From<SagaHistoryEntry> for HistoryEntryResponse {
    fn from(entry: SagaHistoryEntry) -> Self {
        Self {
            id: entry.id,
            order_id: entry.order_id.to_string(),
            status: entry.status.to_string(),
            recorded_at: entry.recorded_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order and open its saga.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state
        .lifecycle
        .create_order(CreateOrder {
            client_id: ClientId::from_uuid(req.client_id),
            number_of_pieces: req.number_of_pieces,
            description: req.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id} — load a single order.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .lifecycle
        .get_order(OrderId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(order.into()))
}

/// GET /orders — list every order (privileged callers only; enforced by
/// the transport collaborator).
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.lifecycle.list_orders().await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/client/{client_id} — list a client's orders.
#[tracing::instrument(skip(state))]
pub async fn list_by_client<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .lifecycle
        .list_orders_by_client(ClientId::from_uuid(client_id))
        .await?;

    if orders.is_empty() {
        return Err(ApiError::NotFound(format!(
            "Client {client_id}'s orders not found"
        )));
    }

    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id}/history — the order's saga audit trail.
#[tracing::instrument(skip(state))]
pub async fn history<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let entries = state
        .lifecycle
        .saga_history(OrderId::from_uuid(id))
        .await?;

    if entries.is_empty() {
        return Err(ApiError::NotFound(format!(
            "Saga history for order {id} not found"
        )));
    }

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
