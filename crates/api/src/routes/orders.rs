//! Order checkout and lifecycle endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus, ProductId};
use fulfillment::{CheckoutOrchestrator, OrderLifecycle, PaymentOrchestrator};
use serde::{Deserialize, Serialize};
use services::{
    InMemoryCartGateway, InMemoryCatalog, InMemoryEventPublisher, InMemoryStockLedger,
};
use store::{OrderStore, PaymentStore};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
///
/// Generic over the order and payment stores so the in-memory and
/// PostgreSQL implementations are interchangeable; the external service
/// clients are the in-memory doubles until the real integrations land.
pub struct AppState<O, P>
where
    O: OrderStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
{
    pub checkout: CheckoutOrchestrator<
        O,
        InMemoryStockLedger,
        InMemoryCatalog,
        InMemoryCartGateway,
        InMemoryEventPublisher,
    >,
    pub payments: PaymentOrchestrator<O, P, InMemoryStockLedger, InMemoryEventPublisher>,
    pub lifecycle: OrderLifecycle<O, InMemoryStockLedger, InMemoryEventPublisher>,
    pub stock: InMemoryStockLedger,
    pub catalog: InMemoryCatalog,
    pub carts: InMemoryCartGateway,
    pub publisher: InMemoryEventPublisher,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: uuid::Uuid,
    /// When present, only these products are checked out from the cart.
    pub product_ids: Option<Vec<i64>>,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub user_id: uuid::Uuid,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: uuid::Uuid,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub code: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub discount_price_cents: Option<i64>,
    pub subtotal_cents: i64,
}

impl OrderResponse {
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            code: order.code().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.as_i64(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    discount_price_cents: item.discount_price.map(|p| p.cents()),
                    subtotal_cents: item.subtotal.cents(),
                })
                .collect(),
            total_cents: order.total_amount().cents(),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}

// -- Handlers --

/// POST /orders — checkout the user's cart (or a selected subset) into an
/// order.
#[tracing::instrument(skip(state, req))]
pub async fn create<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = UserId::from_uuid(req.user_id);

    let order = match req.product_ids {
        Some(ids) => {
            let product_ids: Vec<ProductId> = ids.into_iter().map(ProductId::new).collect();
            state
                .checkout
                .create_order_with_selected_items(user_id, &product_ids)
                .await?
        }
        None => state.checkout.create_order(user_id).await?,
    };

    Ok((StatusCode::CREATED, Json(OrderResponse::from_order(&order))))
}

/// GET /orders/:id — load an order, enforcing ownership.
#[tracing::instrument(skip(state))]
pub async fn get<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .lifecycle
        .get_order(UserId::from_uuid(query.user_id), order_id)
        .await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/:id/cancel — cancel an unpaid order on behalf of its owner.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .lifecycle
        .cancel(UserId::from_uuid(req.user_id), order_id)
        .await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/:id/expire — expire an unpaid order (scheduler surface).
#[tracing::instrument(skip(state))]
pub async fn expire<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.lifecycle.expire(order_id).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// PUT /orders/:id/status — move an order along the fulfillment chain.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.lifecycle.update_status(order_id, req.status).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}
