use async_trait::async_trait;
use common::{OrderId, OrderItemId, ProductId, UserId};
use domain::{Money, NewOrder, Order, OrderItem, OrderLine, OrderStatus};
use sqlx::{Postgres, Row, Transaction, postgres::PgRow};

use super::{PostgresStore, to_u32};
use crate::{OrderLedger, Result, StoreError};

const ORDER_COLUMNS: &str = "id, user_id, total_cents, status, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_at_purchase_cents";

fn row_to_order(row: PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_item(row: PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        price_at_purchase: Money::from_cents(row.try_get("price_at_purchase_cents")?),
    })
}

fn row_to_line(row: PgRow) -> Result<OrderLine> {
    let quantity = to_u32(row.try_get("quantity")?, "quantity")?;
    let price_at_purchase = Money::from_cents(row.try_get("price_at_purchase_cents")?);

    Ok(OrderLine {
        product_id: ProductId::new(row.try_get("product_id")?),
        name: row.try_get("name")?,
        sku: row.try_get("sku")?,
        quantity,
        price_at_purchase,
        line_total: price_at_purchase.checked_multiply(quantity).map_err(|_| {
            StoreError::Corrupt(format!("line total of {price_at_purchase} x {quantity}"))
        })?,
    })
}

#[async_trait]
impl OrderLedger for PostgresStore {
    async fn insert_order(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        order: &NewOrder,
    ) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (user_id, total_cents, status)
            VALUES ($1, $2, $3)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.user_id.get())
        .bind(order.total().cents())
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut **tx)
        .await?;
        let record = row_to_order(row)?;

        for item in order.items() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(record.id.get())
            .bind(item.product_id.get())
            .bind(i64::from(item.quantity))
            .bind(item.price_at_purchase.cents())
            .execute(&mut **tx)
            .await?;
        }

        Ok(record)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        row_to_order(row)
    }

    async fn get_order_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: OrderId,
    ) -> Result<Order> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::OrderNotFound(id))?;

        row_to_order(row)
    }

    async fn order_items(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: OrderId,
    ) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(id.get())
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }

    async fn order_lines(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.product_id, oi.quantity, oi.price_at_purchase_cents, p.name, p.sku
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_line).collect()
    }

    async fn set_order_status(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(status.as_str())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::OrderNotFound(id))?;

        row_to_order(row)
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }
}
