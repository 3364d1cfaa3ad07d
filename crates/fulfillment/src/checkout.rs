//! Checkout orchestration: cart to order.

use std::collections::HashMap;

use chrono::Utc;
use common::UserId;
use domain::{DomainEvent, Order, OrderItem, ProductId};
use services::{CartGateway, CartItem, CatalogOracle, EventPublisher, StockLedger, StockDelta};
use store::{OrderStore, ReservationLine};

use crate::error::{FulfillmentError, Result};
use crate::publish_best_effort;

/// How the cart is trimmed after the order commits.
enum CartCleanup {
    /// The whole cart was checked out.
    Full,
    /// Only the selected products were checked out.
    Selected(Vec<ProductId>),
}

/// Builds orders from carts, enforcing price and stock invariants before
/// committing anything.
///
/// All items are validated against the catalog and the stock ledger before
/// any stock is reduced; validation failure for any item aborts the whole
/// checkout with no side effects. The validation and the reduction are not
/// atomic together, so a stock reservation intent is persisted around the
/// reduce call and resolved once the order commits.
pub struct CheckoutOrchestrator<O, S, C, G, P>
where
    O: OrderStore,
    S: StockLedger,
    C: CatalogOracle,
    G: CartGateway,
    P: EventPublisher,
{
    orders: O,
    stock: S,
    catalog: C,
    carts: G,
    publisher: P,
}

impl<O, S, C, G, P> CheckoutOrchestrator<O, S, C, G, P>
where
    O: OrderStore,
    S: StockLedger,
    C: CatalogOracle,
    G: CartGateway,
    P: EventPublisher,
{
    /// Creates a new checkout orchestrator.
    pub fn new(orders: O, stock: S, catalog: C, carts: G, publisher: P) -> Self {
        Self {
            orders,
            stock,
            catalog,
            carts,
            publisher,
        }
    }

    /// Creates an order from the user's entire cart.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, user_id: UserId) -> Result<Order> {
        let cart = self.carts.get_cart(user_id).await?;
        if cart.is_empty() {
            return Err(FulfillmentError::EmptyCart);
        }
        self.place_order(user_id, cart.items, CartCleanup::Full)
            .await
    }

    /// Creates an order from a selected subset of the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn create_order_with_selected_items(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<Order> {
        let cart = self.carts.get_cart(user_id).await?;
        let selected: Vec<CartItem> = cart
            .items
            .into_iter()
            .filter(|item| product_ids.contains(&item.product_id))
            .collect();
        if selected.is_empty() {
            return Err(FulfillmentError::EmptyCart);
        }
        self.place_order(user_id, selected, CartCleanup::Selected(product_ids.to_vec()))
            .await
    }

    async fn place_order(
        &self,
        user_id: UserId,
        cart_items: Vec<CartItem>,
        cleanup: CartCleanup,
    ) -> Result<Order> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        let product_ids: Vec<ProductId> =
            cart_items.iter().map(|item| item.product_id).collect();

        // One batch call each to the catalog and the ledger; everything is
        // validated before anything mutates.
        let products: HashMap<ProductId, _> = self
            .catalog
            .get_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let quantities = self.stock.get_quantities(&product_ids).await?;

        // A cart may carry several lines for the same product; sufficiency
        // is judged against the summed demand, not line by line.
        let mut required: HashMap<ProductId, u32> = HashMap::new();
        for cart_item in &cart_items {
            *required.entry(cart_item.product_id).or_insert(0) += cart_item.quantity;
        }

        let mut order_items = Vec::with_capacity(cart_items.len());
        for cart_item in &cart_items {
            let product = products
                .get(&cart_item.product_id)
                .filter(|p| p.available)
                .ok_or(FulfillmentError::ProductUnavailable {
                    product_id: cart_item.product_id,
                })?;

            // The price the user saw must still be the catalog's effective
            // price; any drift means the cart is stale.
            if cart_item.effective_price != product.effective_price() {
                return Err(FulfillmentError::PriceChanged {
                    product_id: cart_item.product_id,
                });
            }

            let available = quantities
                .get(&cart_item.product_id)
                .copied()
                .unwrap_or(0);
            let requested = required
                .get(&cart_item.product_id)
                .copied()
                .unwrap_or(cart_item.quantity);
            if requested > available {
                return Err(FulfillmentError::InsufficientStock {
                    product_id: cart_item.product_id,
                    available,
                    requested,
                });
            }

            order_items.push(OrderItem::new(
                product.id,
                product.name.clone(),
                product.description.clone(),
                product.thumbnail.clone(),
                product.price,
                product.discount_price,
                cart_item.quantity,
            ));
        }

        // All checks passed; record the intent, then reduce.
        let deltas: Vec<StockDelta> = cart_items
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();
        let lines: Vec<ReservationLine> = order_items
            .iter()
            .map(|item| ReservationLine {
                product_id: item.product_id,
                quantity: item.quantity,
                effective_price: item.effective_price(),
            })
            .collect();
        let reservation_id = self.orders.begin_reservation(lines).await?;

        if let Err(e) = self.stock.reduce_batch(&deltas).await {
            // Nothing was reduced; the intent is void.
            if let Err(abort_err) = self.orders.abort_reservation(reservation_id).await {
                tracing::error!(%reservation_id, error = %abort_err, "failed to abort reservation");
            }
            metrics::counter!("checkout_failures_total").increment(1);
            return Err(e.into());
        }

        let order = match self.orders.insert(user_id, order_items).await {
            Ok(order) => order,
            Err(e) => {
                // Stock is reduced but no order exists. Compensate now if
                // the ledger lets us; otherwise the pending reservation is
                // the trail the reconciliation job follows.
                tracing::error!(%user_id, error = %e, "order insert failed after stock reduce");
                match self.stock.restore_batch(&deltas).await {
                    Ok(()) => {
                        if let Err(abort_err) =
                            self.orders.abort_reservation(reservation_id).await
                        {
                            tracing::error!(%reservation_id, error = %abort_err, "failed to abort reservation");
                        }
                    }
                    Err(restore_err) => {
                        tracing::error!(%reservation_id, error = %restore_err, "stock restore failed; reservation left pending");
                    }
                }
                metrics::counter!("checkout_failures_total").increment(1);
                return Err(e.into());
            }
        };
        self.orders.commit_reservation(reservation_id).await?;

        // The order exists and stock is committed; a stale cart is only
        // cosmetic, so cart failures are logged and swallowed.
        let cleanup_result = match cleanup {
            CartCleanup::Full => self.carts.clear(user_id).await,
            CartCleanup::Selected(ids) => self.carts.remove_items(user_id, &ids).await,
        };
        if let Err(e) = cleanup_result {
            tracing::warn!(%user_id, order_id = %order.id(), error = %e, "cart cleanup failed");
        }

        publish_best_effort(
            &self.publisher,
            DomainEvent::OrderCreated {
                order_id: order.id(),
                user_id,
                amount: order.total_amount(),
                timestamp: Utc::now(),
            },
        )
        .await;

        metrics::counter!("checkout_orders_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id(), code = %order.code(), total = %order.total_amount(), "order created");

        Ok(order)
    }
}
