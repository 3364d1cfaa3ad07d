//! Payment orchestration: gateway requests and callback settlement.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use common::OrderId;
use domain::{
    DomainEvent, OrderError, OrderStatus, Payment, PaymentStatus,
};
use rand::Rng;
use services::{EventPublisher, StockDelta, StockLedger};
use store::{OrderStore, PaymentStore};

use crate::error::{FulfillmentError, Result};
use crate::publish_best_effort;
use crate::signature;

/// Gateway parameter names. The gateway speaks flat string maps; these are
/// the keys both sides agree on.
pub const PARAM_MERCHANT: &str = "merchantCode";
pub const PARAM_TXN_REF: &str = "transactionReference";
pub const PARAM_AMOUNT: &str = "amount";
pub const PARAM_ORDER_INFO: &str = "orderInfo";
pub const PARAM_METHOD: &str = "paymentMethod";
pub const PARAM_RETURN_URL: &str = "returnUrl";
pub const PARAM_TIMESTAMP: &str = "timestamp";
pub const PARAM_RESPONSE_CODE: &str = "responseCode";
pub const PARAM_TRANSACTION_ID: &str = "transactionId";
pub const PARAM_BANK_CODE: &str = "bankCode";
pub const PARAM_CARD_TYPE: &str = "cardType";

/// Gateway response code meaning the charge succeeded.
pub const RESPONSE_SUCCESS: &str = "00";

/// Static configuration for the external payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Merchant identifier assigned by the gateway.
    pub merchant_code: String,
    /// Shared secret for request signing and callback verification.
    pub secret: String,
    /// Base URL the shopper is redirected to.
    pub pay_url: String,
}

/// A signed redirect request for the shopper's browser.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Full gateway URL including the signed parameter string.
    pub redirect_url: String,
    /// The per-attempt transaction reference embedded in the request.
    pub transaction_ref: String,
}

/// The business result of a verified callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The payment completed and the order advanced (or already had).
    Completed,
    /// The payment failed; stock compensation ran (on first delivery).
    Failed,
}

/// Issues payment requests to the external gateway and settles the result
/// delivered by its signed callback.
pub struct PaymentOrchestrator<O, P, S, E>
where
    O: OrderStore,
    P: PaymentStore,
    S: StockLedger,
    E: EventPublisher,
{
    orders: O,
    payments: P,
    stock: S,
    publisher: E,
    config: GatewayConfig,
}

impl<O, P, S, E> PaymentOrchestrator<O, P, S, E>
where
    O: OrderStore,
    P: PaymentStore,
    S: StockLedger,
    E: EventPublisher,
{
    /// Creates a new payment orchestrator.
    pub fn new(orders: O, payments: P, stock: S, publisher: E, config: GatewayConfig) -> Self {
        Self {
            orders,
            payments,
            stock,
            publisher,
            config,
        }
    }

    /// Creates (or reuses) the payment for an order and builds the signed
    /// gateway redirect.
    ///
    /// The order must be exactly `PendingPayment`. A previous non-completed
    /// payment row is reset and reused, so retrying never duplicates rows;
    /// the transaction reference carries a fresh random suffix per attempt
    /// so the gateway's duplicate-transaction rejection never fires on a
    /// legitimate retry.
    #[tracing::instrument(skip(self))]
    pub async fn create_payment(
        &self,
        order_id: OrderId,
        method: &str,
        return_url: &str,
    ) -> Result<PaymentRequest> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        if order.status() != OrderStatus::PendingPayment {
            return Err(FulfillmentError::InvalidOrderStatus {
                order_id,
                expected: OrderStatus::PendingPayment,
                actual: order.status(),
            });
        }

        match self.payments.get_by_order(order_id).await? {
            Some(mut payment) => {
                payment.reset_for_retry(order.total_amount(), method)?;
                self.payments.update(&payment).await?;
            }
            None => {
                let payment =
                    Payment::new(order_id, order.user_id(), order.total_amount(), method);
                self.payments.insert(&payment).await?;
            }
        }

        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let transaction_ref = format!("{order_id}-{suffix:06}");

        let mut params = BTreeMap::new();
        params.insert(PARAM_MERCHANT.to_string(), self.config.merchant_code.clone());
        params.insert(PARAM_TXN_REF.to_string(), transaction_ref.clone());
        params.insert(
            PARAM_AMOUNT.to_string(),
            order.total_amount().cents().to_string(),
        );
        params.insert(PARAM_ORDER_INFO.to_string(), order.code().to_string());
        params.insert(PARAM_METHOD.to_string(), method.to_string());
        params.insert(PARAM_RETURN_URL.to_string(), return_url.to_string());
        params.insert(
            PARAM_TIMESTAMP.to_string(),
            Utc::now().format("%Y%m%d%H%M%S").to_string(),
        );

        let sig = signature::sign(&params, &self.config.secret);

        // Signature goes last in the query string, after the signed fields.
        let query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let redirect_url = format!(
            "{}?{}&{}={}",
            self.config.pay_url,
            query,
            signature::PARAM_SIGNATURE,
            sig
        );

        metrics::counter!("payment_requests_total").increment(1);
        tracing::info!(%order_id, %transaction_ref, "payment request created");

        Ok(PaymentRequest {
            redirect_url,
            transaction_ref,
        })
    }

    /// Settles a gateway callback.
    ///
    /// The signature is verified before anything else is parsed; a
    /// mismatch rejects the callback no matter what the response code
    /// claims. Success settlement is idempotent; failure settlement
    /// compensates stock exactly once, keyed to the payment's first
    /// transition into `Failed`.
    #[tracing::instrument(skip(self, params))]
    pub async fn handle_callback(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<CallbackOutcome> {
        metrics::counter!("payment_callbacks_total").increment(1);

        let supplied = params
            .get(signature::PARAM_SIGNATURE)
            .ok_or(FulfillmentError::InvalidSignature)?;
        let signed: BTreeMap<String, String> = params
            .iter()
            .filter(|(k, _)| k.as_str() != signature::PARAM_SIGNATURE)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !signature::verify(&signed, supplied, &self.config.secret) {
            metrics::counter!("payment_callbacks_rejected_total").increment(1);
            return Err(FulfillmentError::InvalidSignature);
        }

        let transaction_ref = params
            .get(PARAM_TXN_REF)
            .ok_or(FulfillmentError::MissingParameter(PARAM_TXN_REF))?;
        let (order_part, _suffix) = transaction_ref.rsplit_once('-').ok_or_else(|| {
            FulfillmentError::MalformedTransactionRef(transaction_ref.clone())
        })?;
        let order_id = OrderId::parse(order_part).map_err(|_| {
            FulfillmentError::MalformedTransactionRef(transaction_ref.clone())
        })?;

        let payment = self
            .payments
            .get_by_order(order_id)
            .await?
            .ok_or(FulfillmentError::PaymentNotFound(order_id))?;

        let response_code = params
            .get(PARAM_RESPONSE_CODE)
            .ok_or(FulfillmentError::MissingParameter(PARAM_RESPONSE_CODE))?;

        if response_code == RESPONSE_SUCCESS {
            self.settle_success(payment, params).await
        } else {
            self.settle_failure(payment, response_code).await
        }
    }

    /// Pure read of the payment for an order.
    pub async fn get_payment_by_order_id(&self, order_id: OrderId) -> Result<Payment> {
        self.payments
            .get_by_order(order_id)
            .await?
            .ok_or(FulfillmentError::PaymentNotFound(order_id))
    }

    async fn settle_success(
        &self,
        mut payment: Payment,
        params: &HashMap<String, String>,
    ) -> Result<CallbackOutcome> {
        let order_id = payment.order_id;

        // Idempotent on the business fields; replays only touch the audit
        // timestamp.
        payment.mark_completed(
            params.get(PARAM_TRANSACTION_ID).cloned(),
            params.get(PARAM_BANK_CODE).cloned(),
            params.get(PARAM_CARD_TYPE).cloned(),
        );
        self.payments.update(&payment).await?;

        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        match order.mark_as_paid() {
            Ok(()) => {
                self.orders.update(&order).await?;
                publish_best_effort(
                    &self.publisher,
                    DomainEvent::OrderStatusUpdated {
                        order_id,
                        user_id: order.user_id(),
                        amount: order.total_amount(),
                        status: OrderStatus::Paid,
                        timestamp: Utc::now(),
                    },
                )
                .await;
            }
            // Another consumer of the payment event may have advanced the
            // order already; a replayed callback lands here too.
            Err(OrderError::InvalidStatusTransition { .. })
                if order.status() == OrderStatus::Paid =>
            {
                tracing::info!(%order_id, "order already paid; settlement replay tolerated");
            }
            Err(e) => return Err(e.into()),
        }

        publish_best_effort(
            &self.publisher,
            DomainEvent::PaymentCompleted {
                order_id,
                user_id: payment.user_id,
                amount: payment.amount,
                timestamp: Utc::now(),
            },
        )
        .await;

        metrics::counter!("payments_completed_total").increment(1);
        tracing::info!(%order_id, "payment completed");
        Ok(CallbackOutcome::Completed)
    }

    async fn settle_failure(
        &self,
        payment: Payment,
        response_code: &str,
    ) -> Result<CallbackOutcome> {
        let order_id = payment.order_id;

        // Compensation is keyed to winning this compare-and-set; a
        // redelivered failure callback loses it and must not restore
        // stock a second time.
        let first_failure = self
            .payments
            .transition_status(order_id, PaymentStatus::Pending, PaymentStatus::Failed)
            .await?;

        if !first_failure {
            tracing::info!(%order_id, response_code, "duplicate failure callback ignored");
            return Ok(CallbackOutcome::Failed);
        }

        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        let deltas: Vec<StockDelta> = order
            .items()
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();

        // The payment is already Failed. If restoration fails here the
        // system needs manual reconciliation, so the error surfaces loudly
        // instead of being swallowed.
        self.stock.restore_batch(&deltas).await?;

        publish_best_effort(
            &self.publisher,
            DomainEvent::PaymentFailed {
                order_id,
                user_id: payment.user_id,
                amount: payment.amount,
                timestamp: Utc::now(),
            },
        )
        .await;

        metrics::counter!("payments_failed_total").increment(1);
        tracing::warn!(%order_id, response_code, "payment failed; stock restored");
        Ok(CallbackOutcome::Failed)
    }
}

/// Minimal percent-encoding for query-string keys and values.
fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
