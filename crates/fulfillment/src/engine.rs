//! Order fulfillment engine.
//!
//! Turns a user's cart into an order and drives the order through its status
//! machine. Every operation is one transaction: the cart or order row is
//! locked first, then products in ascending id order.

use std::collections::BTreeMap;
use std::time::Instant;

use common::{OrderId, ProductId, UserId};
use domain::{Money, NewOrder, NewOrderItem, Order, OrderDetail, OrderStatus, Principal};
use store::Storage;

use crate::config::EngineConfig;
use crate::error::{Result, ShopError};
use crate::transaction::{settle, with_deadline};

/// Creates, cancels and transitions orders.
#[derive(Clone)]
pub struct OrderFulfillmentEngine<S: Storage> {
    store: S,
    config: EngineConfig,
}

impl<S: Storage> OrderFulfillmentEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order for everything in the caller's active cart.
    ///
    /// Stock is checked and decremented under the product row locks, the order
    /// is charged at the locked current prices and the cart is emptied. Any
    /// failure leaves stock, cart and orders untouched.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn create_order(&self, principal: &Principal) -> Result<Order> {
        let user_id = principal.user_id().ok_or(ShopError::Unauthorized)?;
        let started = Instant::now();

        let result = with_deadline(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let outcome = self.place_order(&mut tx, user_id).await;
            settle(&self.store, tx, outcome).await
        })
        .await;

        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(order_id = %order.id, total = %order.total, "order created");
            }
            Err(err) => {
                metrics::counter!("order_create_failed_total", "reason" => err.kind().as_str())
                    .increment(1);
                tracing::warn!(error = %err, "order creation failed");
            }
        }
        result
    }

    async fn place_order(&self, tx: &mut S::Tx, user_id: UserId) -> Result<Order> {
        let cart = self
            .store
            .lock_active_cart(tx, user_id)
            .await?
            .ok_or(ShopError::CartIsEmpty)?;
        let items = self.store.cart_items(tx, cart.id).await?;
        if items.is_empty() {
            return Err(ShopError::CartIsEmpty);
        }

        let mut requested: BTreeMap<ProductId, u32> = BTreeMap::new();
        for item in &items {
            let quantity = requested.entry(item.product_id).or_default();
            *quantity = quantity
                .checked_add(item.quantity)
                .ok_or(ShopError::InvalidQuantity)?;
        }

        let mut prices: BTreeMap<ProductId, Money> = BTreeMap::new();
        for (&product_id, &quantity) in &requested {
            let product = self.store.get_product_for_update(tx, product_id).await?;
            if !product.has_stock_for(quantity) {
                return Err(ShopError::ProductNotEnough {
                    product_id,
                    available: product.stock,
                    requested: quantity,
                });
            }
            prices.insert(product_id, product.price);
        }

        let lines = items
            .iter()
            .map(|item| {
                let price = prices
                    .get(&item.product_id)
                    .copied()
                    .ok_or(ShopError::ProductNotFound(item.product_id))?;
                Ok(NewOrderItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price_at_purchase: price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let order = NewOrder::new(user_id, lines)?;
        let order = self.store.insert_order(tx, &order).await?;

        for (&product_id, &quantity) in &requested {
            self.store.decrease_stock(tx, product_id, quantity).await?;
        }
        self.store.clear_cart(tx, cart.id).await?;

        Ok(order)
    }

    /// Cancels a pending order on behalf of its owner and returns its stock.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn cancel_order(&self, principal: &Principal, order_id: OrderId) -> Result<Order> {
        let user_id = principal.user_id().ok_or(ShopError::Unauthorized)?;

        let order = with_deadline(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let outcome = self.cancel_locked(&mut tx, user_id, order_id).await;
            settle(&self.store, tx, outcome).await
        })
        .await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, "order cancelled");
        Ok(order)
    }

    async fn cancel_locked(
        &self,
        tx: &mut S::Tx,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order> {
        let order = self.store.get_order_for_update(tx, order_id).await?;
        if !order.is_owned_by(user_id) {
            return Err(ShopError::NoPermissions);
        }
        if !order.status.can_cancel() {
            return Err(ShopError::CannotCancelOrder(order.status));
        }

        let cancelled = self
            .store
            .set_order_status(tx, order_id, OrderStatus::Cancelled)
            .await?;
        self.return_stock(tx, order_id).await?;
        Ok(cancelled)
    }

    /// Moves an order along the status machine. Admins only.
    ///
    /// Entering `cancelled` returns the order's stock in the same transaction.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn update_order_status(
        &self,
        principal: &Principal,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        if principal.user_id().is_none() {
            return Err(ShopError::Unauthorized);
        }
        if !principal.is_admin() {
            return Err(ShopError::NoPermissions);
        }

        let (from, order) = with_deadline(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let outcome = self.transition_locked(&mut tx, order_id, status).await;
            settle(&self.store, tx, outcome).await
        })
        .await?;

        metrics::counter!(
            "order_status_changes_total",
            "from" => from.as_str(),
            "to" => status.as_str()
        )
        .increment(1);
        tracing::info!(%order_id, %from, to = %status, "order status changed");
        Ok(order)
    }

    async fn transition_locked(
        &self,
        tx: &mut S::Tx,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(OrderStatus, Order)> {
        let order = self.store.get_order_for_update(tx, order_id).await?;
        if !order.status.can_transition_to(status) {
            return Err(ShopError::InvalidStatusChange {
                from: order.status,
                to: status,
            });
        }

        let updated = self.store.set_order_status(tx, order_id, status).await?;
        if status.returns_stock() {
            self.return_stock(tx, order_id).await?;
        }
        Ok((order.status, updated))
    }

    /// Gives every unit of the order back to stock. The order row must be locked.
    async fn return_stock(&self, tx: &mut S::Tx, order_id: OrderId) -> Result<()> {
        let items = self.store.order_items(tx, order_id).await?;

        let mut returned: BTreeMap<ProductId, u32> = BTreeMap::new();
        for item in &items {
            let quantity = returned.entry(item.product_id).or_default();
            *quantity = quantity
                .checked_add(item.quantity)
                .ok_or(ShopError::InvalidQuantity)?;
        }

        for (&product_id, &quantity) in &returned {
            self.store.get_product_for_update(tx, product_id).await?;
            self.store.increase_stock(tx, product_id, quantity).await?;
            metrics::counter!("stock_units_returned_total").increment(u64::from(quantity));
        }
        Ok(())
    }

    /// Returns an order with its lines. Visible to the owner and to admins.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn get_order_detail(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderDetail> {
        let user_id = principal.user_id().ok_or(ShopError::Unauthorized)?;

        with_deadline(
            self.config.transaction_timeout,
            self.load_detail(principal, user_id, order_id),
        )
        .await
    }

    async fn load_detail(
        &self,
        principal: &Principal,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail> {
        let order = self.store.get_order(order_id).await?;
        if !order.is_owned_by(user_id) && !principal.is_admin() {
            return Err(ShopError::NoPermissions);
        }
        let items = self.store.order_lines(order_id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Lists the caller's orders, newest first.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn list_my_orders(&self, principal: &Principal) -> Result<Vec<Order>> {
        let user_id = principal.user_id().ok_or(ShopError::Unauthorized)?;

        with_deadline(self.config.transaction_timeout, async {
            self.store
                .list_orders_for_user(user_id)
                .await
                .map_err(ShopError::from)
        })
        .await
    }
}
