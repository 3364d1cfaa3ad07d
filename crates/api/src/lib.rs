//! HTTP API server with observability for the fulfillment system.
//!
//! Provides REST endpoints for checkout, payment settlement, and order
//! lifecycle, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use fulfillment::{CheckoutOrchestrator, GatewayConfig, OrderLifecycle, PaymentOrchestrator};
use metrics_exporter_prometheus::PrometheusHandle;
use services::{
    InMemoryCartGateway, InMemoryCatalog, InMemoryEventPublisher, InMemoryStockLedger,
};
use store::{InMemoryOrderStore, InMemoryPaymentStore, OrderStore, PaymentStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O, P>(state: Arc<AppState<O, P>>, metrics_handle: PrometheusHandle) -> Router
where
    O: OrderStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<O, P>))
        .route("/orders/{id}", get(routes::orders::get::<O, P>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<O, P>))
        .route("/orders/{id}/expire", post(routes::orders::expire::<O, P>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<O, P>))
        .route(
            "/orders/{id}/payment",
            post(routes::payments::create::<O, P>).get(routes::payments::get::<O, P>),
        )
        .route("/payments/callback", get(routes::payments::callback::<O, P>))
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

/// Creates the default application state: in-memory stores and service
/// doubles wired into the three orchestrators.
pub fn create_default_state(
    gateway: GatewayConfig,
) -> Arc<AppState<InMemoryOrderStore, InMemoryPaymentStore>> {
    let orders = InMemoryOrderStore::new();
    let payment_store = InMemoryPaymentStore::new();
    let stock = InMemoryStockLedger::new();
    let catalog = InMemoryCatalog::new();
    let carts = InMemoryCartGateway::new();
    let publisher = InMemoryEventPublisher::new();

    let checkout = CheckoutOrchestrator::new(
        orders.clone(),
        stock.clone(),
        catalog.clone(),
        carts.clone(),
        publisher.clone(),
    );
    let payments = PaymentOrchestrator::new(
        orders.clone(),
        payment_store,
        stock.clone(),
        publisher.clone(),
        gateway,
    );
    let lifecycle = OrderLifecycle::new(orders, stock.clone(), publisher.clone());

    Arc::new(AppState {
        checkout,
        payments,
        lifecycle,
        stock,
        catalog,
        carts,
        publisher,
    })
}
