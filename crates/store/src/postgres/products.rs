use async_trait::async_trait;
use common::{ProductId, UserId};
use domain::{Money, NewProduct, Product, ProductUpdate};
use sqlx::{Postgres, Row, Transaction, postgres::PgRow};

use super::{PostgresStore, to_u32};
use crate::{ProductStock, Result, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, price_cents, stock, sku, owner_id, created_at, updated_at";

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32(row.try_get("stock")?, "stock")?,
        sku: row.try_get("sku")?,
        owner_id: UserId::new(row.try_get("owner_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Maps a violation of the SKU unique constraint to `DuplicateSku`.
fn sku_conflict(error: sqlx::Error, sku: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = error
        && db_err.constraint() == Some("products_sku_key")
    {
        return StoreError::DuplicateSku(sku.to_string());
    }
    StoreError::Database(error)
}

/// Maps a foreign key violation from cart or order lines to `ProductInUse`.
fn reference_conflict(error: sqlx::Error, id: ProductId) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = error
        && db_err.is_foreign_key_violation()
    {
        return StoreError::ProductInUse(id);
    }
    StoreError::Database(error)
}

#[async_trait]
impl ProductStock for PostgresStore {
    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ProductNotFound(id))?;

        row_to_product(row)
    }

    async fn get_product_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: ProductId,
    ) -> Result<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::ProductNotFound(id))?;

        row_to_product(row)
    }

    async fn decrease_stock(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
        )
        .bind(id.get())
        .bind(i64::from(quantity))
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await?;

        match available {
            None => Err(StoreError::ProductNotFound(id)),
            Some(stock) => Err(StoreError::StockUnderflow {
                product_id: id,
                available: to_u32(stock, "stock")?,
                requested: quantity,
            }),
        }
    }

    async fn increase_stock(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1 AND stock + $2 <= $3",
        )
        .bind(id.get())
        .bind(i64::from(quantity))
        .bind(i64::from(u32::MAX))
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM products WHERE id = $1")
                .bind(id.get())
                .fetch_optional(&mut **tx)
                .await?
                .is_some();
            return Err(if exists {
                StoreError::StockOverflow(id)
            } else {
                StoreError::ProductNotFound(id)
            });
        }
        Ok(())
    }

    async fn sku_exists(&self, sku: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
            .bind(sku)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, price_cents, stock, sku, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(&product.sku)
        .bind(product.owner_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| sku_conflict(e, &product.sku))?;

        row_to_product(row)
    }

    async fn update_product(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: ProductId,
        changes: &ProductUpdate,
    ) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                price_cents = COALESCE($3, price_cents),
                stock = COALESCE($4, stock),
                sku = COALESCE($5, sku),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(changes.name.as_deref())
        .bind(changes.price.map(|price| price.cents()))
        .bind(changes.stock.map(i64::from))
        .bind(changes.sku.as_deref())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| sku_conflict(e, changes.sku.as_deref().unwrap_or_default()))?
        .ok_or(StoreError::ProductNotFound(id))?;

        row_to_product(row)
    }

    async fn delete_product(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: ProductId,
    ) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&mut **tx)
            .await
            .map_err(|e| reference_conflict(e, id))?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }
}
