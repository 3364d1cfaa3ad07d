//! Payment request and gateway callback endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domain::Payment;
use fulfillment::CallbackOutcome;
use serde::{Deserialize, Serialize};
use store::{OrderStore, PaymentStore};

use crate::error::ApiError;
use crate::routes::orders::{parse_order_id, AppState};

// -- Request types --

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub payment_method: String,
    pub return_url: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct PaymentRequestResponse {
    pub redirect_url: String,
    pub transaction_ref: String,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub order_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub bank_code: Option<String>,
    pub card_type: Option<String>,
}

impl PaymentResponse {
    fn from_payment(payment: &Payment) -> Self {
        Self {
            order_id: payment.order_id.to_string(),
            user_id: payment.user_id.to_string(),
            amount_cents: payment.amount.cents(),
            payment_method: payment.payment_method.clone(),
            status: payment.status.to_string(),
            transaction_id: payment.transaction_id.clone(),
            bank_code: payment.bank_code.clone(),
            card_type: payment.card_type.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub outcome: &'static str,
}

// -- Handlers --

/// POST /orders/:id/payment — create (or retry) the payment for an order
/// and return the signed gateway redirect.
#[tracing::instrument(skip(state, req))]
pub async fn create<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Path(id): Path<String>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentRequestResponse>), ApiError> {
    let order_id = parse_order_id(&id)?;
    let request = state
        .payments
        .create_payment(order_id, &req.payment_method, &req.return_url)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentRequestResponse {
            redirect_url: request.redirect_url,
            transaction_ref: request.transaction_ref,
        }),
    ))
}

/// GET /orders/:id/payment — load the payment record for an order.
#[tracing::instrument(skip(state))]
pub async fn get<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let payment = state.payments.get_payment_by_order_id(order_id).await?;
    Ok(Json(PaymentResponse::from_payment(&payment)))
}

/// GET /payments/callback — signed result redirect from the gateway.
///
/// The gateway delivers the result as query parameters; the signature is
/// one of them.
#[tracing::instrument(skip(state, params))]
pub async fn callback<O: OrderStore + Clone + 'static, P: PaymentStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, P>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let outcome = state.payments.handle_callback(&params).await?;
    Ok(Json(CallbackResponse {
        outcome: match outcome {
            CallbackOutcome::Completed => "completed",
            CallbackOutcome::Failed => "failed",
        },
    }))
}
