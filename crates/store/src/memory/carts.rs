use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartItemId, ProductId, UserId};
use domain::{Cart, CartItem, CartLine, CartOwner, CartStatus, Money};

use super::{InMemoryStore, MemoryTx, Sequences};
use crate::locks::RowKey;
use crate::{CartStore, Result, StoreError};

impl InMemoryStore {
    async fn lock_cart(&self, tx: &mut MemoryTx, cart_id: CartId) -> Result<()> {
        tx.locks.lock(&self.locks, RowKey::Cart(cart_id)).await;
        if self.tables.read().await.carts.contains_key(&cart_id) {
            Ok(())
        } else {
            Err(StoreError::CartNotFound(cart_id))
        }
    }

    /// The cart's items as seen by the transaction.
    async fn items_in_tx(&self, tx: &MemoryTx, cart_id: CartId) -> Vec<CartItem> {
        if let Some(items) = tx.cart_items.get(&cart_id) {
            return items.clone();
        }
        self.tables
            .read()
            .await
            .cart_items
            .get(&cart_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn get_or_create_active_cart(&self, owner: &CartOwner) -> Result<Cart> {
        let mut tables = self.tables.write().await;
        if let Some(cart) = tables
            .carts
            .values()
            .find(|cart| &cart.owner == owner && cart.status.is_open())
        {
            return Ok(cart.clone());
        }

        let cart = Cart::open(owner.clone());
        tables.carts.insert(cart.id, cart.clone());
        tracing::debug!(cart_id = %cart.id, "cart created");
        Ok(cart)
    }

    async fn lock_active_cart(&self, tx: &mut MemoryTx, user_id: UserId) -> Result<Option<Cart>> {
        let owner = CartOwner::User(user_id);
        let cart_id = {
            let tables = self.tables.read().await;
            tables
                .carts
                .values()
                .find(|cart| cart.owner == owner && cart.status == CartStatus::Active)
                .map(|cart| cart.id)
        };
        let Some(cart_id) = cart_id else {
            return Ok(None);
        };

        tx.locks.lock(&self.locks, RowKey::Cart(cart_id)).await;
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .get(&cart_id)
            .filter(|cart| cart.status == CartStatus::Active)
            .cloned())
    }

    async fn add_item(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
        price_at_add: Money,
    ) -> Result<CartItem> {
        self.lock_cart(tx, cart_id).await?;
        let mut items = self.items_in_tx(tx, cart_id).await;
        let now = Utc::now();

        let item = match items.iter_mut().find(|item| item.product_id == product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(StoreError::QuantityOverflow {
                        cart_id,
                        product_id,
                    })?;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let item = CartItem {
                    id: CartItemId::new(Sequences::next(&self.ids.cart_item)),
                    cart_id,
                    product_id,
                    quantity,
                    price_at_add,
                    created_at: now,
                    updated_at: now,
                };
                items.push(item.clone());
                item
            }
        };

        tx.cart_items.insert(cart_id, items);
        Ok(item)
    }

    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let tables = self.tables.read().await;
        let Some(items) = tables.cart_items.get(&cart_id) else {
            return Ok(Vec::new());
        };

        let mut lines: Vec<CartLine> = items
            .iter()
            .filter_map(|item| {
                let product = tables.products.get(&item.product_id)?;
                Some(CartLine {
                    item_id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price_at_add: item.price_at_add,
                    name: product.name.clone(),
                    price: product.price,
                    stock: product.stock,
                    sku: Some(product.sku.clone()),
                })
            })
            .collect();
        lines.sort_by(|a, b| b.item_id.cmp(&a.item_id));
        Ok(lines)
    }

    async fn cart_items(&self, tx: &mut MemoryTx, cart_id: CartId) -> Result<Vec<CartItem>> {
        let mut items = self.items_in_tx(tx, cart_id).await;
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    async fn get_item_for_update(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<CartItem> {
        self.lock_cart(tx, cart_id).await?;
        self.items_in_tx(tx, cart_id)
            .await
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or(StoreError::ItemNotInCart(item_id))
    }

    async fn update_item_quantity(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()> {
        self.lock_cart(tx, cart_id).await?;
        let mut items = self.items_in_tx(tx, cart_id).await;
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(StoreError::ItemNotInCart(item_id))?;

        item.quantity = quantity;
        item.updated_at = Utc::now();
        tx.cart_items.insert(cart_id, items);
        Ok(())
    }

    async fn remove_item(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<()> {
        self.lock_cart(tx, cart_id).await?;
        let mut items = self.items_in_tx(tx, cart_id).await;
        let position = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(StoreError::ItemNotInCart(item_id))?;

        items.remove(position);
        tx.cart_items.insert(cart_id, items);
        Ok(())
    }

    async fn clear_cart(&self, tx: &mut MemoryTx, cart_id: CartId) -> Result<()> {
        self.lock_cart(tx, cart_id).await?;
        tx.cart_items.insert(cart_id, Vec::new());
        Ok(())
    }
}
