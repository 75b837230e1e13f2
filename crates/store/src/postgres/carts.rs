use async_trait::async_trait;
use common::{CartId, CartItemId, ProductId, SessionId, UserId};
use domain::{Cart, CartItem, CartLine, CartOwner, CartStatus, Money};
use sqlx::{Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use super::{PostgresStore, to_u32};
use crate::{CartStore, Result, StoreError};

const CART_COLUMNS: &str = "id, user_id, session_id, status, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, cart_id, product_id, quantity, price_at_add_cents, created_at, updated_at";

fn row_to_cart(row: PgRow) -> Result<Cart> {
    let user_id: Option<i64> = row.try_get("user_id")?;
    let session_id: Option<String> = row.try_get("session_id")?;
    let owner = match (user_id, session_id) {
        (Some(user_id), None) => CartOwner::User(UserId::new(user_id)),
        (None, Some(session_id)) => CartOwner::Session(SessionId::new(session_id)),
        _ => {
            return Err(StoreError::Corrupt(
                "cart must have exactly one owner".to_string(),
            ));
        }
    };
    let status: String = row.try_get("status")?;

    Ok(Cart {
        id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
        owner,
        status: status
            .parse::<CartStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_item(row: PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::new(row.try_get("id")?),
        cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        price_at_add: Money::from_cents(row.try_get("price_at_add_cents")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_line(row: PgRow) -> Result<CartLine> {
    Ok(CartLine {
        item_id: CartItemId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        price_at_add: Money::from_cents(row.try_get("price_at_add_cents")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32(row.try_get("stock")?, "stock")?,
        sku: row.try_get("sku")?,
    })
}

impl PostgresStore {
    async fn find_open_cart(&self, owner: &CartOwner) -> Result<Option<Cart>> {
        let row = match owner {
            CartOwner::User(user_id) => {
                sqlx::query(&format!(
                    "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND status = 'active'"
                ))
                .bind(user_id.get())
                .fetch_optional(&self.pool)
                .await?
            }
            CartOwner::Session(session_id) => {
                sqlx::query(&format!(
                    "SELECT {CART_COLUMNS} FROM carts WHERE session_id = $1 AND status = 'guest'"
                ))
                .bind(session_id.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(row_to_cart).transpose()
    }

    async fn lock_cart(&self, tx: &mut Transaction<'static, Postgres>, cart_id: CartId) -> Result<()> {
        sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
            .bind(cart_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(StoreError::CartNotFound(cart_id))?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn get_or_create_active_cart(&self, owner: &CartOwner) -> Result<Cart> {
        if let Some(cart) = self.find_open_cart(owner).await? {
            return Ok(cart);
        }

        // A concurrent insert for the same owner loses on the partial unique
        // index and falls through to the read below.
        let cart = Cart::open(owner.clone());
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, session_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(owner.user_id().map(|id| id.get()))
        .bind(owner.session_id().map(SessionId::as_str))
        .bind(cart.status.as_str())
        .bind(cart.created_at)
        .execute(&self.pool)
        .await?;

        self.find_open_cart(owner)
            .await?
            .ok_or(StoreError::CartNotFound(cart.id))
    }

    async fn lock_active_cart(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: UserId,
    ) -> Result<Option<Cart>> {
        sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND status = 'active' FOR UPDATE"
        ))
        .bind(user_id.get())
        .fetch_optional(&mut **tx)
        .await?
        .map(row_to_cart)
        .transpose()
    }

    async fn add_item(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
        price_at_add: Money,
    ) -> Result<CartItem> {
        self.lock_cart(tx, cart_id).await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, price_at_add_cents)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id) DO UPDATE
                SET quantity = cart_items.quantity + EXCLUDED.quantity,
                    updated_at = NOW()
                WHERE cart_items.quantity + EXCLUDED.quantity <= $5
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(cart_id.as_uuid())
        .bind(product_id.get())
        .bind(i64::from(quantity))
        .bind(price_at_add.cents())
        .bind(i64::from(u32::MAX))
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::QuantityOverflow {
            cart_id,
            product_id,
        })?;

        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut **tx)
            .await?;

        row_to_item(row)
    }

    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.product_id, ci.quantity, ci.price_at_add_cents,
                   p.name, p.price_cents, p.stock, p.sku
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id DESC
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_line).collect()
    }

    async fn cart_items(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        cart_id: CartId,
    ) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY id ASC"
        ))
        .bind(cart_id.as_uuid())
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }

    async fn get_item_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<CartItem> {
        self.lock_cart(tx, cart_id).await?;

        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE id = $1 AND cart_id = $2 FOR UPDATE"
        ))
        .bind(item_id.get())
        .bind(cart_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::ItemNotInCart(item_id))?;

        row_to_item(row)
    }

    async fn update_item_quantity(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()> {
        self.lock_cart(tx, cart_id).await?;

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE id = $1 AND cart_id = $2",
        )
        .bind(item_id.get())
        .bind(cart_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotInCart(item_id));
        }
        Ok(())
    }

    async fn remove_item(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<()> {
        self.lock_cart(tx, cart_id).await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id.get())
            .bind(cart_id.as_uuid())
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotInCart(item_id));
        }
        Ok(())
    }

    async fn clear_cart(&self, tx: &mut Transaction<'static, Postgres>, cart_id: CartId) -> Result<()> {
        self.lock_cart(tx, cart_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut **tx)
            .await?;
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
