//! HTTP transport surface over the order saga core.
//!
//! A thin axum layer: it validates nothing the core already validates,
//! maps the core's typed errors to distinct HTTP responses, and carries
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use messaging::MessageBroker;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{MessageRouter, OrderLifecycle, PieceAggregator};
use store::OrderStore;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/client/{client_id}",
            get(routes::orders::list_by_client::<S>),
        )
        .route("/orders/{id}/history", get(routes::orders::history::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the saga core over a store and a broker handle.
///
/// Returns the shared API state and the (not yet started) inbound message
/// router; the caller decides when to start consuming.
pub fn create_state<S: OrderStore + 'static>(
    store: Arc<S>,
    broker: MessageBroker,
    shutdown: CancellationToken,
) -> (Arc<AppState<S>>, MessageRouter<S>) {
    let lifecycle = Arc::new(OrderLifecycle::new(store.clone(), broker.clone()));
    let aggregator = PieceAggregator::new(store, lifecycle.clone());
    let router = MessageRouter::new(lifecycle.clone(), aggregator, broker, shutdown);

    (Arc::new(AppState { lifecycle }), router)
}
