//! End-to-end tests driving checkout, payment settlement, and order
//! lifecycle against shared in-memory stores and service doubles.

use std::collections::{BTreeMap, HashMap};

use common::UserId;
use domain::{Money, OrderStatus, PaymentStatus, ProductId};
use fulfillment::payment::{PARAM_BANK_CODE, PARAM_RESPONSE_CODE, PARAM_TRANSACTION_ID, PARAM_TXN_REF};
use fulfillment::{
    signature, CheckoutOrchestrator, FulfillmentError, GatewayConfig, OrderLifecycle,
    PaymentOrchestrator,
};
use services::{
    CartItem, InMemoryCartGateway, InMemoryCatalog, InMemoryEventPublisher, InMemoryStockLedger,
};
use store::{InMemoryOrderStore, InMemoryPaymentStore, OrderStore};

const SECRET: &str = "integration-secret";

struct World {
    checkout: CheckoutOrchestrator<
        InMemoryOrderStore,
        InMemoryStockLedger,
        InMemoryCatalog,
        InMemoryCartGateway,
        InMemoryEventPublisher,
    >,
    payments: PaymentOrchestrator<
        InMemoryOrderStore,
        InMemoryPaymentStore,
        InMemoryStockLedger,
        InMemoryEventPublisher,
    >,
    lifecycle: OrderLifecycle<InMemoryOrderStore, InMemoryStockLedger, InMemoryEventPublisher>,
    orders: InMemoryOrderStore,
    stock: InMemoryStockLedger,
    catalog: InMemoryCatalog,
    carts: InMemoryCartGateway,
    publisher: InMemoryEventPublisher,
}

fn world() -> World {
    let orders = InMemoryOrderStore::new();
    let payment_store = InMemoryPaymentStore::new();
    let stock = InMemoryStockLedger::new();
    let catalog = InMemoryCatalog::new();
    let carts = InMemoryCartGateway::new();
    let publisher = InMemoryEventPublisher::new();

    let config = GatewayConfig {
        merchant_code: "SHOP001".to_string(),
        secret: SECRET.to_string(),
        pay_url: "https://gateway.example/pay".to_string(),
    };

    World {
        checkout: CheckoutOrchestrator::new(
            orders.clone(),
            stock.clone(),
            catalog.clone(),
            carts.clone(),
            publisher.clone(),
        ),
        payments: PaymentOrchestrator::new(
            orders.clone(),
            payment_store,
            stock.clone(),
            publisher.clone(),
            config,
        ),
        lifecycle: OrderLifecycle::new(orders.clone(), stock.clone(), publisher.clone()),
        orders,
        stock,
        catalog,
        carts,
        publisher,
    }
}

/// Stocks the shelf, lists the product, and fills the user's cart.
fn seed_shopper(w: &World, user: UserId, qty: u32, shelf: u32) {
    let pid = ProductId::new(10);
    w.stock.set_quantity(pid, shelf);
    w.catalog.put_simple(pid, "Widget", Money::from_cents(5000));
    w.carts.add_item(
        user,
        CartItem {
            product_id: pid,
            quantity: qty,
            effective_price: Money::from_cents(5000),
        },
    );
}

/// Signs a gateway callback for the given transaction.
fn gateway_callback(transaction_ref: &str, response_code: &str) -> HashMap<String, String> {
    let mut signed = BTreeMap::new();
    signed.insert(PARAM_TXN_REF.to_string(), transaction_ref.to_string());
    signed.insert(PARAM_RESPONSE_CODE.to_string(), response_code.to_string());
    signed.insert(PARAM_TRANSACTION_ID.to_string(), "GTW-100".to_string());
    signed.insert(PARAM_BANK_CODE.to_string(), "NCB".to_string());

    let sig = signature::sign(&signed, SECRET);
    let mut params: HashMap<String, String> = signed.into_iter().collect();
    params.insert(signature::PARAM_SIGNATURE.to_string(), sig);
    params
}

#[tokio::test]
async fn test_happy_path_checkout_to_paid() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 2, 5);

    // Checkout: order created, stock held, cart cleared
    let order = w.checkout.create_order(user).await.unwrap();
    assert_eq!(order.status(), OrderStatus::PendingPayment);
    assert_eq!(order.total_amount(), Money::from_cents(10000));
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 3);
    assert_eq!(w.carts.item_count(user), 0);

    // Payment request
    let request = w
        .payments
        .create_payment(order.id(), "CARD", "https://shop.example/return")
        .await
        .unwrap();

    // Gateway confirms
    w.payments
        .handle_callback(&gateway_callback(&request.transaction_ref, "00"))
        .await
        .unwrap();

    let settled = w.orders.get(order.id()).await.unwrap().unwrap();
    assert_eq!(settled.status(), OrderStatus::Paid);
    let payment = w
        .payments
        .get_payment_by_order_id(order.id())
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.transaction_id.as_deref(), Some("GTW-100"));

    // Stock stays held after payment
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 3);

    assert_eq!(w.publisher.count_of("ORDER_CREATED"), 1);
    assert_eq!(w.publisher.count_of("PAYMENT_COMPLETED"), 1);
    assert_eq!(w.publisher.count_of("ORDER_STATUS_UPDATED"), 1);
}

#[tokio::test]
async fn test_failed_payment_restores_stock_and_allows_retry() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 2, 5);

    let order = w.checkout.create_order(user).await.unwrap();
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 3);

    let request = w
        .payments
        .create_payment(order.id(), "CARD", "https://shop.example/return")
        .await
        .unwrap();
    w.payments
        .handle_callback(&gateway_callback(&request.transaction_ref, "24"))
        .await
        .unwrap();

    // Compensation returned the stock; the order is still pending so the
    // shopper may try another payment method
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 5);
    let order_after = w.orders.get(order.id()).await.unwrap().unwrap();
    assert_eq!(order_after.status(), OrderStatus::PendingPayment);
    assert_eq!(w.publisher.count_of("PAYMENT_FAILED"), 1);

    // Retry reuses the payment row and can still succeed
    let retry = w
        .payments
        .create_payment(order.id(), "WALLET", "https://shop.example/return")
        .await
        .unwrap();
    assert_ne!(retry.transaction_ref, request.transaction_ref);
    w.payments
        .handle_callback(&gateway_callback(&retry.transaction_ref, "00"))
        .await
        .unwrap();

    let settled = w.orders.get(order.id()).await.unwrap().unwrap();
    assert_eq!(settled.status(), OrderStatus::Paid);
}

#[tokio::test]
async fn test_duplicate_callbacks_settle_once() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 2, 5);
    let order = w.checkout.create_order(user).await.unwrap();
    let request = w
        .payments
        .create_payment(order.id(), "CARD", "https://shop.example/return")
        .await
        .unwrap();

    let failure = gateway_callback(&request.transaction_ref, "24");
    w.payments.handle_callback(&failure).await.unwrap();
    w.payments.handle_callback(&failure).await.unwrap();
    w.payments.handle_callback(&failure).await.unwrap();

    // Stock restored exactly once despite redelivery
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 5);
    assert_eq!(w.stock.restore_calls(), 1);
    assert_eq!(w.publisher.count_of("PAYMENT_FAILED"), 1);
}

#[tokio::test]
async fn test_cancellation_compensates_and_blocks_settlement() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 2, 5);
    let order = w.checkout.create_order(user).await.unwrap();
    let request = w
        .payments
        .create_payment(order.id(), "CARD", "https://shop.example/return")
        .await
        .unwrap();

    // Owner cancels while the gateway is still thinking
    let cancelled = w.lifecycle.cancel(user, order.id()).await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 5);

    // A late success callback completes the payment row but cannot move
    // the cancelled order
    let result = w
        .payments
        .handle_callback(&gateway_callback(&request.transaction_ref, "00"))
        .await;
    assert!(matches!(
        result,
        Err(FulfillmentError::Order(
            domain::OrderError::InvalidStatusTransition { .. }
        ))
    ));
    let order_after = w.orders.get(order.id()).await.unwrap().unwrap();
    assert_eq!(order_after.status(), OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_expiry_compensates_unpaid_order() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 3, 4);
    let order = w.checkout.create_order(user).await.unwrap();
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 1);

    let expired = w.lifecycle.expire(order.id()).await.unwrap();
    assert_eq!(expired.status(), OrderStatus::Cancelled);
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 4);
    assert_eq!(w.publisher.count_of("ORDER_EXPIRED"), 1);
}

#[tokio::test]
async fn test_insufficient_stock_aborts_checkout_cleanly() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 3, 2);

    let result = w.checkout.create_order(user).await;
    assert!(matches!(
        result,
        Err(FulfillmentError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        })
    ));

    // Nothing happened: no order, no stock movement, cart intact
    assert_eq!(w.orders.order_count().await, 0);
    assert_eq!(w.stock.quantity_of(ProductId::new(10)), 2);
    assert_eq!(w.carts.item_count(user), 1);
    assert_eq!(w.publisher.published().len(), 0);
}

#[tokio::test]
async fn test_paid_order_walks_to_completion() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 1, 5);
    let order = w.checkout.create_order(user).await.unwrap();
    let request = w
        .payments
        .create_payment(order.id(), "CARD", "https://shop.example/return")
        .await
        .unwrap();
    w.payments
        .handle_callback(&gateway_callback(&request.transaction_ref, "00"))
        .await
        .unwrap();

    w.lifecycle
        .update_status(order.id(), OrderStatus::Shipping)
        .await
        .unwrap();
    w.lifecycle
        .update_status(order.id(), OrderStatus::Delivered)
        .await
        .unwrap();
    let done = w
        .lifecycle
        .update_status(order.id(), OrderStatus::Completed)
        .await
        .unwrap();
    assert!(done.status().is_terminal());

    // Paid orders can no longer be cancelled
    let result = w.lifecycle.cancel(user, order.id()).await;
    assert!(matches!(
        result,
        Err(FulfillmentError::Order(
            domain::OrderError::NotCancellable { .. }
        ))
    ));
}

#[tokio::test]
async fn test_forged_callback_changes_nothing() {
    let w = world();
    let user = UserId::new();
    seed_shopper(&w, user, 2, 5);
    let order = w.checkout.create_order(user).await.unwrap();
    let request = w
        .payments
        .create_payment(order.id(), "CARD", "https://shop.example/return")
        .await
        .unwrap();

    // Signed with the wrong secret
    let mut signed = BTreeMap::new();
    signed.insert(PARAM_TXN_REF.to_string(), request.transaction_ref.clone());
    signed.insert(PARAM_RESPONSE_CODE.to_string(), "00".to_string());
    let forged_sig = signature::sign(&signed, "attacker-secret");
    let mut params: HashMap<String, String> = signed.into_iter().collect();
    params.insert(signature::PARAM_SIGNATURE.to_string(), forged_sig);

    let result = w.payments.handle_callback(&params).await;
    assert!(matches!(result, Err(FulfillmentError::InvalidSignature)));

    let payment = w
        .payments
        .get_payment_by_order_id(order.id())
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    let order_after = w.orders.get(order.id()).await.unwrap().unwrap();
    assert_eq!(order_after.status(), OrderStatus::PendingPayment);
}
