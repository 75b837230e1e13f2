//! Product catalog.

use common::{ProductId, UserId};
use domain::{Money, NewProduct, Principal, Product, ProductUpdate};
use serde::Deserialize;
use store::Storage;

use crate::config::EngineConfig;
use crate::error::{Result, ShopError};
use crate::transaction::{settle, with_deadline};

/// Fields of a product to list. Stock is signed so that negative input can
/// be rejected as such.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub sku: String,
}

/// A partial change to a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i64>,
    pub sku: Option<String>,
}

fn checked_price(price: Money) -> Result<Money> {
    if price.is_negative() || price > Money::MAX_UNIT_PRICE {
        return Err(ShopError::InvalidPrice);
    }
    Ok(price)
}

fn checked_stock(stock: i64) -> Result<u32> {
    u32::try_from(stock).map_err(|_| ShopError::InvalidStock)
}

impl ProductInput {
    fn validate(self, owner_id: UserId) -> Result<NewProduct> {
        Ok(NewProduct {
            price: checked_price(self.price)?,
            stock: checked_stock(self.stock)?,
            name: self.name,
            sku: self.sku,
            owner_id,
        })
    }
}

impl ProductPatch {
    fn validate(self) -> Result<ProductUpdate> {
        let update = ProductUpdate {
            price: self.price.map(checked_price).transpose()?,
            stock: self.stock.map(checked_stock).transpose()?,
            name: self.name,
            sku: self.sku,
        };
        if update.is_empty() {
            return Err(ShopError::NoFieldsToUpdate);
        }
        Ok(update)
    }
}

/// Lists, reads and edits products.
#[derive(Clone)]
pub struct ProductCatalog<S: Storage> {
    store: S,
    config: EngineConfig,
}

impl<S: Storage> ProductCatalog<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Lists a new product owned by the caller.
    #[tracing::instrument(skip(self, principal, input), fields(user_id = ?principal.user_id(), sku = %input.sku))]
    pub async fn create_product(
        &self,
        principal: &Principal,
        input: ProductInput,
    ) -> Result<Product> {
        let owner_id = principal.user_id().ok_or(ShopError::Unauthorized)?;
        let product = input.validate(owner_id)?;

        let created = with_deadline(self.config.transaction_timeout, async {
            if self.store.sku_exists(&product.sku).await? {
                return Err(ShopError::SkuExists(product.sku.clone()));
            }
            self.store
                .insert_product(product.clone())
                .await
                .map_err(ShopError::from)
        })
        .await?;

        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        with_deadline(self.config.transaction_timeout, async {
            self.store.get_product(id).await.map_err(ShopError::from)
        })
        .await
    }

    /// Edits a product. Only its owner and admins may do so.
    #[tracing::instrument(skip(self, principal, patch), fields(user_id = ?principal.user_id()))]
    pub async fn update_product(
        &self,
        principal: &Principal,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product> {
        let user_id = principal.user_id().ok_or(ShopError::Unauthorized)?;
        let changes = patch.validate()?;

        with_deadline(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let outcome = self.edit_locked(&mut tx, principal, user_id, id, &changes).await;
            settle(&self.store, tx, outcome).await
        })
        .await
    }

    async fn edit_locked(
        &self,
        tx: &mut S::Tx,
        principal: &Principal,
        user_id: UserId,
        id: ProductId,
        changes: &ProductUpdate,
    ) -> Result<Product> {
        let product = self.store.get_product_for_update(tx, id).await?;
        if product.owner_id != user_id && !principal.is_admin() {
            return Err(ShopError::NoPermissions);
        }

        if let Some(sku) = &changes.sku
            && *sku != product.sku
            && self.store.sku_exists(sku).await?
        {
            return Err(ShopError::SkuExists(sku.clone()));
        }

        Ok(self.store.update_product(tx, id, changes).await?)
    }

    /// Removes a product. Only its owner and admins may do so, and only
    /// while no cart or order refers to it.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn delete_product(&self, principal: &Principal, id: ProductId) -> Result<()> {
        let user_id = principal.user_id().ok_or(ShopError::Unauthorized)?;

        with_deadline(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let outcome = self.delete_locked(&mut tx, principal, user_id, id).await;
            settle(&self.store, tx, outcome).await
        })
        .await?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    async fn delete_locked(
        &self,
        tx: &mut S::Tx,
        principal: &Principal,
        user_id: UserId,
        id: ProductId,
    ) -> Result<()> {
        let product = self.store.get_product_for_update(tx, id).await?;
        if product.owner_id != user_id && !principal.is_admin() {
            return Err(ShopError::NoPermissions);
        }
        Ok(self.store.delete_product(tx, id).await?)
    }
}
