use async_trait::async_trait;
use chrono::Utc;
use common::ProductId;
use domain::{NewProduct, Product, ProductUpdate};

use super::{InMemoryStore, MemoryTx, Sequences};
use crate::locks::RowKey;
use crate::{ProductStock, Result, StoreError};

impl InMemoryStore {
    /// The product as seen by the transaction.
    async fn product_in_tx(&self, tx: &MemoryTx, id: ProductId) -> Result<Product> {
        if tx.deleted_products.contains(&id) {
            return Err(StoreError::ProductNotFound(id));
        }
        if let Some(product) = tx.products.get(&id) {
            return Ok(product.clone());
        }
        self.get_product(id).await
    }
}

#[async_trait]
impl ProductStock for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.tables
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProductNotFound(id))
    }

    async fn get_product_for_update(&self, tx: &mut MemoryTx, id: ProductId) -> Result<Product> {
        tx.locks.lock(&self.locks, RowKey::Product(id)).await;
        self.product_in_tx(tx, id).await
    }

    async fn decrease_stock(&self, tx: &mut MemoryTx, id: ProductId, quantity: u32) -> Result<()> {
        tx.require(RowKey::Product(id))?;
        let mut product = self.product_in_tx(tx, id).await?;

        product.stock =
            product
                .stock
                .checked_sub(quantity)
                .ok_or(StoreError::StockUnderflow {
                    product_id: id,
                    available: product.stock,
                    requested: quantity,
                })?;
        product.updated_at = Utc::now();
        tx.products.insert(id, product);
        Ok(())
    }

    async fn increase_stock(&self, tx: &mut MemoryTx, id: ProductId, quantity: u32) -> Result<()> {
        tx.require(RowKey::Product(id))?;
        let mut product = self.product_in_tx(tx, id).await?;

        product.stock = product
            .stock
            .checked_add(quantity)
            .ok_or(StoreError::StockOverflow(id))?;
        product.updated_at = Utc::now();
        tx.products.insert(id, product);
        Ok(())
    }

    async fn sku_exists(&self, sku: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().any(|p| p.sku == sku))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::DuplicateSku(product.sku));
        }

        let now = Utc::now();
        let record = Product {
            id: ProductId::new(Sequences::next(&self.ids.product)),
            name: product.name,
            price: product.price,
            stock: product.stock,
            sku: product.sku,
            owner_id: product.owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_product(
        &self,
        tx: &mut MemoryTx,
        id: ProductId,
        changes: &ProductUpdate,
    ) -> Result<Product> {
        tx.require(RowKey::Product(id))?;
        let mut product = self.product_in_tx(tx, id).await?;

        if let Some(sku) = &changes.sku
            && *sku != product.sku
            && self.sku_exists(sku).await?
        {
            return Err(StoreError::DuplicateSku(sku.clone()));
        }

        changes.apply_to(&mut product);
        product.updated_at = Utc::now();
        tx.products.insert(id, product.clone());
        Ok(product)
    }

    async fn delete_product(&self, tx: &mut MemoryTx, id: ProductId) -> Result<()> {
        tx.require(RowKey::Product(id))?;
        self.product_in_tx(tx, id).await?;

        let staged = tx
            .cart_items
            .values()
            .flatten()
            .any(|item| item.product_id == id)
            || tx
                .order_items
                .values()
                .flatten()
                .any(|item| item.product_id == id);
        let committed = {
            let tables = self.tables.read().await;
            tables
                .cart_items
                .iter()
                .filter(|(cart_id, _)| !tx.cart_items.contains_key(*cart_id))
                .flat_map(|(_, items)| items)
                .any(|item| item.product_id == id)
                || tables
                    .order_items
                    .values()
                    .flatten()
                    .any(|item| item.product_id == id)
        };
        if staged || committed {
            return Err(StoreError::ProductInUse(id));
        }

        tx.products.remove(&id);
        tx.deleted_products.insert(id);
        Ok(())
    }
}
