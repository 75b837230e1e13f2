use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, OrderItemId, UserId};
use domain::{NewOrder, Order, OrderItem, OrderLine, OrderStatus};

use super::{InMemoryStore, MemoryTx, Sequences};
use crate::locks::RowKey;
use crate::{OrderLedger, Result, StoreError};

impl InMemoryStore {
    async fn order_in_tx(&self, tx: &MemoryTx, id: OrderId) -> Result<Order> {
        if let Some(order) = tx.orders.get(&id) {
            return Ok(order.clone());
        }
        self.get_order(id).await
    }
}

#[async_trait]
impl OrderLedger for InMemoryStore {
    async fn insert_order(&self, tx: &mut MemoryTx, order: &NewOrder) -> Result<Order> {
        let id = OrderId::new(Sequences::next(&self.ids.order));
        tx.locks.lock(&self.locks, RowKey::Order(id)).await;

        let now = Utc::now();
        let record = Order {
            id,
            user_id: order.user_id,
            total: order.total(),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let items = order
            .items()
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(Sequences::next(&self.ids.order_item)),
                order_id: id,
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_purchase: item.price_at_purchase,
            })
            .collect();

        tx.orders.insert(id, record.clone());
        tx.order_items.insert(id, items);
        Ok(record)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.tables
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn get_order_for_update(&self, tx: &mut MemoryTx, id: OrderId) -> Result<Order> {
        tx.locks.lock(&self.locks, RowKey::Order(id)).await;
        self.order_in_tx(tx, id).await
    }

    async fn order_items(&self, tx: &mut MemoryTx, id: OrderId) -> Result<Vec<OrderItem>> {
        if let Some(items) = tx.order_items.get(&id) {
            return Ok(items.clone());
        }
        Ok(self
            .tables
            .read()
            .await
            .order_items
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn order_lines(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        let tables = self.tables.read().await;
        let Some(items) = tables.order_items.get(&id) else {
            return Ok(Vec::new());
        };

        items
            .iter()
            .map(|item| {
                let product = tables
                    .products
                    .get(&item.product_id)
                    .ok_or(StoreError::ProductNotFound(item.product_id))?;
                Ok(OrderLine {
                    product_id: item.product_id,
                    name: product.name.clone(),
                    sku: product.sku.clone(),
                    quantity: item.quantity,
                    price_at_purchase: item.price_at_purchase,
                    line_total: item
                        .price_at_purchase
                        .checked_multiply(item.quantity)
                        .map_err(|_| StoreError::Corrupt(format!("order item {}", item.id)))?,
                })
            })
            .collect()
    }

    async fn set_order_status(
        &self,
        tx: &mut MemoryTx,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        tx.require(RowKey::Order(id))?;
        let mut order = self.order_in_tx(tx, id).await?;

        order.status = status;
        order.updated_at = Utc::now();
        tx.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }
}
